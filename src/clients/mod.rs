use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{
    Booking, BookingPatch, Category, CustomerAccount, Expected, NewBooking, TechnicianProfile,
};
use crate::error::{DirectoryError, StoreError};
use crate::messages::{DirectoryRequest, StoreRequest};

// =============================================================================
// STORE CLIENT
// =============================================================================

/// Thin handle for the [`BookingStore`](crate::actors::BookingStore) actor.
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self, payload))]
    pub async fn create(
        &self,
        customer_id: String,
        payload: NewBooking,
    ) -> Result<Booking, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Create {
                customer_id,
                payload,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor dropped".to_string()))?
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: String) -> Result<Option<Booking>, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor dropped".to_string()))?
    }

    #[instrument(skip(self, expect, patch))]
    pub async fn conditional_update(
        &self,
        id: String,
        expect: Expected,
        patch: BookingPatch,
    ) -> Result<Booking, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::ConditionalUpdate {
                id,
                expect,
                patch,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunication("Actor dropped".to_string()))?
    }
}

// =============================================================================
// DIRECTORY CLIENT
// =============================================================================

/// Thin handle for the [`Directory`](crate::actors::Directory) actor.
#[derive(Clone)]
pub struct DirectoryClient {
    sender: mpsc::Sender<DirectoryRequest>,
}

macro_rules! directory_method {
    (fn $method:ident($param:ident: $param_type:ty) -> $return_type:ty as $variant:ident) => {
        #[instrument(skip(self))]
        pub async fn $method(&self, $param: $param_type) -> Result<$return_type, DirectoryError> {
            debug!("Sending request");
            let (respond_to, response) = oneshot::channel();
            self.sender
                .send(DirectoryRequest::$variant {
                    $param,
                    respond_to,
                })
                .await
                .map_err(|_| DirectoryError::ActorCommunication("Actor closed".to_string()))?;
            response
                .await
                .map_err(|_| DirectoryError::ActorCommunication("Actor dropped".to_string()))?
        }
    };
}

impl DirectoryClient {
    pub fn new(sender: mpsc::Sender<DirectoryRequest>) -> Self {
        Self { sender }
    }

    directory_method!(fn technician(id: String) -> Option<TechnicianProfile> as GetTechnician);
    directory_method!(fn technician_by_user(user_id: String) -> Option<TechnicianProfile> as GetTechnicianByUser);
    directory_method!(fn customer(id: String) -> Option<CustomerAccount> as GetCustomer);
    directory_method!(fn category(id: String) -> Option<Category> as GetCategory);
    directory_method!(fn category_by_name(name: String) -> Option<Category> as GetCategoryByName);
    directory_method!(fn add_technician(profile: TechnicianProfile) -> () as AddTechnician);
    directory_method!(fn add_customer(account: CustomerAccount) -> () as AddCustomer);
    directory_method!(fn add_category(category: Category) -> () as AddCategory);
}
