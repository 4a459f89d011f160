pub mod agent;
pub mod cache;
pub mod fetch;
pub mod registry;

pub use agent::{Agent, GenerateError, HealthAgent};
pub use cache::{Cache, StatsCache};
pub use fetch::{FetchError, StatResult, StatsFetcher};
pub use registry::AgentRegistry;
