//! # Mock Framework
//!
//! Utilities for testing clients and the engine in isolation.
//!
//! [`create_mock_store`] / [`create_mock_directory`] give a client plus the
//! receiver its requests arrive on, so tests can assert the exact messages
//! sent and script the responses deterministically. [`RecordingDispatch`]
//! is a fake transport for the engine's dispatch port: it records every
//! emit instead of delivering it.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::clients::{DirectoryClient, StoreClient};
use crate::dispatch::{DispatchPort, PushMessage, RoomKey};
use crate::domain::{Booking, BookingPatch, Expected};
use crate::error::StoreError;
use crate::messages::{DirectoryRequest, ServiceResponse, StoreRequest};

pub fn create_mock_store(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

pub fn create_mock_directory(
    buffer_size: usize,
) -> (DirectoryClient, mpsc::Receiver<DirectoryRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (DirectoryClient::new(sender), receiver)
}

/// Helper to verify that the next store message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, ServiceResponse<Option<Booking>, StoreError>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next store message is a ConditionalUpdate request
pub async fn expect_conditional_update(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(
    String,
    Expected,
    BookingPatch,
    ServiceResponse<Booking, StoreError>,
)> {
    match receiver.recv().await {
        Some(StoreRequest::ConditionalUpdate {
            id,
            expect,
            patch,
            respond_to,
        }) => Some((id, expect, patch, respond_to)),
        _ => None,
    }
}

/// Fake dispatch transport: records emits instead of delivering them.
#[derive(Default)]
pub struct RecordingDispatch {
    events: Mutex<Vec<(RoomKey, PushMessage)>>,
}

impl RecordingDispatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drains and returns everything emitted so far.
    pub fn take(&self) -> Vec<(RoomKey, PushMessage)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl DispatchPort for RecordingDispatch {
    fn emit(&self, room: RoomKey, message: PushMessage) {
        self.events.lock().unwrap().push((room, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingMethod, BookingStatus, NewBooking};

    #[tokio::test]
    async fn mock_store_scripts_a_get_response() {
        let (client, mut receiver) = create_mock_store(10);

        let get_task = tokio::spawn(async move { client.get("booking_1".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "booking_1");
        responder.send(Ok(None)).unwrap();

        let result = get_task.await.unwrap();
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn mock_store_exposes_update_predicates() {
        let (client, mut receiver) = create_mock_store(10);

        let update_task = tokio::spawn(async move {
            client
                .conditional_update(
                    "booking_1".to_string(),
                    Expected::status_in(&[BookingStatus::Pending]),
                    BookingPatch {
                        final_price: Some(1800.0),
                        ..Default::default()
                    },
                )
                .await
        });

        let (id, expect, patch, responder) = expect_conditional_update(&mut receiver)
            .await
            .expect("Expected ConditionalUpdate request");
        assert_eq!(id, "booking_1");
        assert_eq!(expect.status, Some(vec![BookingStatus::Pending]));
        assert_eq!(patch.final_price, Some(1800.0));

        let booking = Booking::create(
            id,
            "customer_1".to_string(),
            NewBooking {
                technician_id: "tech_1".to_string(),
                category_id: "cat_1".to_string(),
                title: "Leaking sink".to_string(),
                description: "Kitchen sink drips overnight".to_string(),
                location: "12 Hill Road".to_string(),
                initial_price: 2000.0,
                booking_method: BookingMethod::Manual,
            },
            chrono::Utc::now(),
        );
        responder.send(Ok(booking)).unwrap();

        assert!(update_task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn mock_directory_scripts_guard_resolution() {
        let (client, mut receiver) = create_mock_directory(10);

        let guard_task =
            tokio::spawn(async move { crate::guard::require_technician(&client, "user_9").await });

        match receiver.recv().await {
            Some(DirectoryRequest::GetTechnicianByUser {
                user_id,
                respond_to,
            }) => {
                assert_eq!(user_id, "user_9");
                respond_to.send(Ok(None)).unwrap();
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let result = guard_task.await.unwrap();
        assert!(matches!(
            result,
            Err(crate::error::BookingError::NotFound(_))
        ));
    }
}
