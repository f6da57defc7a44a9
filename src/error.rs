use thiserror::Error;

use crate::domain::{BookingStatus, Precondition};

/// Errors surfaced to callers of the negotiation engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Caller does not own this booking in the required role")]
    Forbidden,
    #[error("Operation not allowed while booking is {0}")]
    InvalidTransition(BookingStatus),
    #[error("Customer has not agreed to the final price")]
    AgreementRequired,
    #[error("Technician does not belong to the requested category")]
    InvalidCategory,
    #[error("Booking was modified concurrently")]
    Conflict,
    #[error("Actor communication error: {0}")]
    ActorCommunication(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Booking not found: {0}")]
    NotFound(String),
    #[error("Update precondition failed: {0}")]
    PreconditionFailed(Precondition),
    #[error("Actor communication error: {0}")]
    ActorCommunication(String),
}

/// The directory answers missing lookups with `Ok(None)`; callers decide
/// what absence means, so the only failure left is the channel itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DirectoryError {
    #[error("Actor communication error: {0}")]
    ActorCommunication(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(u64),
    #[error("Actor communication error: {0}")]
    ActorCommunication(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BookingError::NotFound(format!("Booking not found: {id}")),
            // The engine re-validates preconditions against a fresh read before
            // every conditional write, so a store-side mismatch means another
            // caller moved the record in between.
            StoreError::PreconditionFailed(_) => BookingError::Conflict,
            StoreError::ActorCommunication(msg) => BookingError::ActorCommunication(msg),
        }
    }
}

impl From<DirectoryError> for BookingError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::ActorCommunication(msg) => BookingError::ActorCommunication(msg),
        }
    }
}
