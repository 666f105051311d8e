pub mod aggregator;
pub mod config;
pub mod providers;

pub use aggregator::{Aggregate, Aggregator, FetchStatus, ProviderReport};
pub use config::{ProviderSettings, ProvidersConfig};
pub use providers::{FetchOutcome, Provider};
