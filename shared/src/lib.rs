pub mod error;
pub mod models;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ErrorResponse};
pub use models::*;
pub use validation::*;
