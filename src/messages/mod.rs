use tokio::sync::oneshot;

use crate::domain::{
    Booking, BookingPatch, Category, CustomerAccount, Expected, NewBooking, TechnicianProfile,
};
use crate::error::{DirectoryError, StoreError};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes
/// parameters and a oneshot channel for responses.

#[derive(Debug)]
pub enum StoreRequest {
    Create {
        customer_id: String,
        payload: NewBooking,
        respond_to: ServiceResponse<Booking, StoreError>,
    },
    Get {
        id: String,
        respond_to: ServiceResponse<Option<Booking>, StoreError>,
    },
    /// The only mutation path. The predicate is evaluated against the
    /// current record inside the store actor, so transitions cannot race.
    ConditionalUpdate {
        id: String,
        expect: Expected,
        patch: BookingPatch,
        respond_to: ServiceResponse<Booking, StoreError>,
    },
}

#[derive(Debug)]
pub enum DirectoryRequest {
    GetTechnician {
        id: String,
        respond_to: ServiceResponse<Option<TechnicianProfile>, DirectoryError>,
    },
    GetTechnicianByUser {
        user_id: String,
        respond_to: ServiceResponse<Option<TechnicianProfile>, DirectoryError>,
    },
    GetCustomer {
        id: String,
        respond_to: ServiceResponse<Option<CustomerAccount>, DirectoryError>,
    },
    GetCategory {
        id: String,
        respond_to: ServiceResponse<Option<Category>, DirectoryError>,
    },
    GetCategoryByName {
        name: String,
        respond_to: ServiceResponse<Option<Category>, DirectoryError>,
    },
    AddTechnician {
        profile: TechnicianProfile,
        respond_to: ServiceResponse<(), DirectoryError>,
    },
    AddCustomer {
        account: CustomerAccount,
        respond_to: ServiceResponse<(), DirectoryError>,
    },
    AddCategory {
        category: Category,
        respond_to: ServiceResponse<(), DirectoryError>,
    },
}
