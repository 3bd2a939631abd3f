pub mod auth;
pub mod flight;
pub mod gateway;
pub mod http;
pub mod mutation;
pub mod reorder;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{Session, Token};
pub use flight::{Phase, SingleFlight};
pub use gateway::Gateway;
pub use http::HttpGateway;
pub use mutation::{MutationEngine, Outcome, Skip};
pub use reorder::{ReorderCoordinator, ReorderOutcome};
