pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod transport;
