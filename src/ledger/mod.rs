pub mod models;
pub mod repository;

pub use models::{Payment, PaymentStatus, UserInfo};
pub use repository::{PaymentLedger, PaymentRepository};
