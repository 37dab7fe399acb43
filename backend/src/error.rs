use std::time::Duration;

use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use thiserror::Error;
use vote_shared::{Error as BodyError, ErrorCode, ValidationError};

/// A client could not connect at boot. The server must not start serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid {extension} url: {reason}")]
    InvalidUrl { extension: &'static str, reason: String },
    #[error("{extension} failed to connect: {reason}")]
    Connect { extension: &'static str, reason: String },
    #[error("{extension} did not connect within {timeout:?}")]
    Timeout { extension: &'static str, timeout: Duration },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Queue producer is not connected")]
    NotConnected,
    #[error("Broker rejected message: {0}")]
    Rejected(String),
    #[error("Broker did not accept message within {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Counter store is not connected")]
    NotConnected,
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
    #[error("Counter store did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Extension not registered: {0}")]
    NotFound(String),
    #[error("Extension already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Extension {0} has a different type")]
    TypeMismatch(String),
}

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Startup signal has already fired")]
    InvalidState,
    #[error(transparent)]
    Startup(#[from] StartupError),
}

/// Everything that can abort process boot.
#[derive(Error, Debug)]
pub enum BootError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Startup(#[from] StartupError),
}

/// Per-request failures, turned into a response at the route boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid vote: {0}")]
    InvalidVote(#[from] ValidationError),
    #[error("Vote could not be queued: {0}")]
    Publish(#[from] PublishError),
    #[error("Tally unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::InvalidVote(ValidationError::Encode(_)) => Status::InternalServerError,
            ApiError::InvalidVote(_) => Status::BadRequest,
            ApiError::Publish(_) => Status::ServiceUnavailable,
            ApiError::Store(_) => Status::ServiceUnavailable,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            ApiError::InvalidVote(ValidationError::Encode(_)) => ErrorCode::SystemError,
            ApiError::InvalidVote(_) => ErrorCode::InvalidInput,
            ApiError::Publish(_) | ApiError::Store(_) => ErrorCode::Unavailable,
            ApiError::Internal(_) => ErrorCode::SystemError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = match &self {
            ApiError::InvalidVote(e) => BodyError::with_details(self.code(), "Invalid vote", e.to_string()),
            _ => BodyError::new(self.code(), self.to_string()),
        };

        rocket::Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}
