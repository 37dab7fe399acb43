pub mod bootstrap;
pub mod catchers;
pub mod config;
pub mod error;
pub mod processor;
pub mod queue;
pub mod registry;
pub mod routes;
pub mod signal;
pub mod store;
pub mod utils;
pub use vote_shared::{models::*, error::ErrorResponse, validation::*};

#[cfg(test)]
mod tests;
