use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Booking, BookingMethod, BookingStatus, Category, CustomerAccount, TechnicianProfile};

/// Contact card for one party of a booking, resolved from the directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyRef {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// The outward-facing, denormalized view of a booking.
///
/// Returned by pull queries and embedded in every dispatch envelope, so a
/// recipient never has to chase customer/technician/category references.
/// Serializes with the camelCase field names of the wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub customer: PartyRef,
    pub technician: PartyRef,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub initial_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,
    pub platform_fee: f64,
    pub customer_agreed: bool,
    pub status: BookingStatus,
    pub booking_method: BookingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn assemble(
        booking: &Booking,
        customer: &CustomerAccount,
        technician: &TechnicianProfile,
        category: &Category,
    ) -> Self {
        Self {
            id: booking.id.clone(),
            customer: PartyRef {
                id: customer.id.clone(),
                name: customer.name.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
            technician: PartyRef {
                id: technician.id.clone(),
                name: technician.name.clone(),
                email: technician.email.clone(),
                phone: technician.phone.clone(),
            },
            category: category.name.clone(),
            title: booking.title.clone(),
            description: booking.description.clone(),
            location: booking.location.clone(),
            initial_price: booking.initial_price,
            final_price: booking.final_price,
            platform_fee: booking.platform_fee,
            customer_agreed: booking.customer_agreed,
            status: booking.status,
            booking_method: booking.booking_method,
            completed_at: booking.completed_at,
            created_at: booking.created_at,
        }
    }
}
