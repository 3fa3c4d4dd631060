pub mod executor;

#[cfg(test)]
pub mod testutil;

pub use executor::{DeliveryExecutor, DeliveryOutcome, OutcomeStatus};
