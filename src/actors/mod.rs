use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::clients::{DirectoryClient, StoreClient};
use crate::domain::{
    Booking, BookingPatch, Category, CustomerAccount, Expected, NewBooking, TechnicianProfile,
};
use crate::error::StoreError;
use crate::messages::{DirectoryRequest, ServiceResponse, StoreRequest};
use tokio::sync::mpsc;

// =============================================================================
// BOOKING STORE
// =============================================================================

/// Owns the durable booking records. Every mutation after creation goes
/// through [`StoreRequest::ConditionalUpdate`], which checks its predicate
/// and applies its patch within one message handling.
pub struct BookingStore {
    receiver: mpsc::Receiver<StoreRequest>,
    bookings: HashMap<String, Booking>,
    next_id_fn: Box<dyn Fn() -> String + Send + Sync>,
}

impl BookingStore {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            bookings: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = StoreClient::new(sender);
        (store, client)
    }

    #[instrument(name = "booking_store", skip(self))]
    pub async fn run(mut self) {
        info!("BookingStore starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Create {
                    customer_id,
                    payload,
                    respond_to,
                } => self.handle_create(customer_id, payload, respond_to),
                StoreRequest::Get { id, respond_to } => self.handle_get(id, respond_to),
                StoreRequest::ConditionalUpdate {
                    id,
                    expect,
                    patch,
                    respond_to,
                } => self.handle_conditional_update(id, expect, patch, respond_to),
            }
        }
        info!("BookingStore stopped");
    }

    #[instrument(fields(customer_id = %customer_id), skip(self, customer_id, payload, respond_to))]
    fn handle_create(
        &mut self,
        customer_id: String,
        payload: NewBooking,
        respond_to: ServiceResponse<Booking, StoreError>,
    ) {
        debug!("Processing create request");
        let id = (self.next_id_fn)();
        let booking = Booking::create(id.clone(), customer_id, payload, Utc::now());
        self.bookings.insert(id.clone(), booking.clone());
        info!(booking_id = %id, "Booking created successfully");
        let _ = respond_to.send(Ok(booking));
    }

    #[instrument(fields(booking_id = %id), skip(self, id, respond_to))]
    fn handle_get(&self, id: String, respond_to: ServiceResponse<Option<Booking>, StoreError>) {
        debug!("Processing get request");
        let booking = self.bookings.get(&id).cloned();
        let _ = respond_to.send(Ok(booking));
    }

    #[instrument(fields(booking_id = %id), skip(self, id, expect, patch, respond_to))]
    fn handle_conditional_update(
        &mut self,
        id: String,
        expect: Expected,
        patch: BookingPatch,
        respond_to: ServiceResponse<Booking, StoreError>,
    ) {
        debug!("Processing conditional update request");

        let result = match self.bookings.get_mut(&id) {
            None => {
                error!("Booking not found for update");
                Err(StoreError::NotFound(id))
            }
            Some(booking) => match expect.check(booking) {
                Err(failed) => {
                    info!(precondition = %failed, "Update precondition failed");
                    Err(StoreError::PreconditionFailed(failed))
                }
                Ok(()) => {
                    patch.apply(booking, Utc::now());
                    info!(status = %booking.status, "Booking updated successfully");
                    Ok(booking.clone())
                }
            },
        };

        let _ = respond_to.send(result);
    }
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// In-process stand-in for the external identity/category collaborator.
/// Resolves customer, technician and category records for authorization
/// and for the read projection.
pub struct Directory {
    receiver: mpsc::Receiver<DirectoryRequest>,
    technicians: HashMap<String, TechnicianProfile>,
    customers: HashMap<String, CustomerAccount>,
    categories: HashMap<String, Category>,
}

impl Directory {
    pub fn new(buffer_size: usize) -> (Self, DirectoryClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let directory = Self {
            receiver,
            technicians: HashMap::new(),
            customers: HashMap::new(),
            categories: HashMap::new(),
        };
        let client = DirectoryClient::new(sender);
        (directory, client)
    }

    #[instrument(name = "directory", skip(self))]
    pub async fn run(mut self) {
        info!("Directory starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                DirectoryRequest::GetTechnician { id, respond_to } => {
                    debug!(technician_id = %id, "Processing get_technician request");
                    let _ = respond_to.send(Ok(self.technicians.get(&id).cloned()));
                }
                DirectoryRequest::GetTechnicianByUser {
                    user_id,
                    respond_to,
                } => {
                    debug!(user_id = %user_id, "Processing get_technician_by_user request");
                    let profile = self
                        .technicians
                        .values()
                        .find(|t| t.user_id == user_id)
                        .cloned();
                    let _ = respond_to.send(Ok(profile));
                }
                DirectoryRequest::GetCustomer { id, respond_to } => {
                    debug!(customer_id = %id, "Processing get_customer request");
                    let _ = respond_to.send(Ok(self.customers.get(&id).cloned()));
                }
                DirectoryRequest::GetCategory { id, respond_to } => {
                    debug!(category_id = %id, "Processing get_category request");
                    let _ = respond_to.send(Ok(self.categories.get(&id).cloned()));
                }
                DirectoryRequest::GetCategoryByName { name, respond_to } => {
                    debug!(category = %name, "Processing get_category_by_name request");
                    let category = self.categories.values().find(|c| c.name == name).cloned();
                    let _ = respond_to.send(Ok(category));
                }
                DirectoryRequest::AddTechnician {
                    profile,
                    respond_to,
                } => {
                    info!(technician_id = %profile.id, "Technician registered");
                    self.technicians.insert(profile.id.clone(), profile);
                    let _ = respond_to.send(Ok(()));
                }
                DirectoryRequest::AddCustomer {
                    account,
                    respond_to,
                } => {
                    info!(customer_id = %account.id, "Customer registered");
                    self.customers.insert(account.id.clone(), account);
                    let _ = respond_to.send(Ok(()));
                }
                DirectoryRequest::AddCategory {
                    category,
                    respond_to,
                } => {
                    info!(category = %category.name, "Category registered");
                    self.categories.insert(category.id.clone(), category);
                    let _ = respond_to.send(Ok(()));
                }
            }
        }
        info!("Directory stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingMethod, BookingStatus};

    fn new_booking_payload() -> NewBooking {
        NewBooking {
            technician_id: "tech_1".to_string(),
            category_id: "cat_1".to_string(),
            title: "Broken boiler".to_string(),
            description: "No hot water since Monday".to_string(),
            location: "4 Mill Lane".to_string(),
            initial_price: 1500.0,
            booking_method: BookingMethod::Manual,
        }
    }

    fn spawn_store() -> StoreClient {
        let counter = std::sync::atomic::AtomicU64::new(1);
        let (store, client) = BookingStore::new(16, move || {
            let id = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("booking_{id}")
        });
        tokio::spawn(store.run());
        client
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let client = spawn_store();

        let booking = client
            .create("customer_1".to_string(), new_booking_payload())
            .await
            .unwrap();
        assert_eq!(booking.id, "booking_1");
        assert_eq!(booking.status, BookingStatus::Pending);

        let fetched = client.get(booking.id.clone()).await.unwrap().unwrap();
        assert_eq!(fetched.customer_id, "customer_1");
        assert_eq!(fetched.final_price, None);
    }

    #[tokio::test]
    async fn conditional_update_applies_patch_when_predicate_holds() {
        let client = spawn_store();
        let booking = client
            .create("customer_1".to_string(), new_booking_payload())
            .await
            .unwrap();

        let updated = client
            .conditional_update(
                booking.id.clone(),
                Expected::status_in(&[BookingStatus::Pending]),
                BookingPatch {
                    final_price: Some(1800.0),
                    customer_agreed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.final_price, Some(1800.0));
        assert!(!updated.customer_agreed);
    }

    #[tokio::test]
    async fn conditional_update_rejects_and_leaves_record_unchanged() {
        let client = spawn_store();
        let booking = client
            .create("customer_1".to_string(), new_booking_payload())
            .await
            .unwrap();

        let err = client
            .conditional_update(
                booking.id.clone(),
                Expected::status_in(&[BookingStatus::Accepted]),
                BookingPatch {
                    status: Some(BookingStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::PreconditionFailed(crate::domain::Precondition::Status(
                BookingStatus::Pending
            ))
        );

        let unchanged = client.get(booking.id.clone()).await.unwrap().unwrap();
        assert_eq!(unchanged.status, BookingStatus::Pending);
        assert_eq!(unchanged.completed_at, None);
    }

    #[tokio::test]
    async fn conditional_update_on_missing_booking_is_not_found() {
        let client = spawn_store();
        let err = client
            .conditional_update(
                "missing".to_string(),
                Expected::default(),
                BookingPatch::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn directory_resolves_technician_by_linked_account() {
        let (directory, client) = Directory::new(16);
        tokio::spawn(directory.run());

        let profile = TechnicianProfile::new(
            "tech_1", "user_9", "Bob", "bob@example.com", "555-0101", "cat_1",
        );
        client.add_technician(profile.clone()).await.unwrap();

        let by_user = client
            .technician_by_user("user_9".to_string())
            .await
            .unwrap();
        assert_eq!(by_user, Some(profile));

        let missing = client
            .technician_by_user("user_404".to_string())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
