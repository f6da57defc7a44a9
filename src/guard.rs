//! Ownership checks run before any negotiation transition.
//!
//! Technician-scoped calls arrive with the caller's account id; the guard
//! resolves the linked professional profile and compares it against the
//! booking's technician. Customers own their bookings directly by account
//! id. The guard keeps no state between calls.

use tracing::error;

use crate::clients::DirectoryClient;
use crate::domain::{Booking, TechnicianProfile};
use crate::error::BookingError;

/// Resolves the technician profile linked to the caller's account.
/// A caller without a provisioned profile is indistinguishable from an
/// unknown technician.
pub async fn require_technician(
    directory: &DirectoryClient,
    caller_id: &str,
) -> Result<TechnicianProfile, BookingError> {
    match directory.technician_by_user(caller_id.to_string()).await? {
        Some(profile) => Ok(profile),
        None => {
            error!(caller_id = %caller_id, "No technician profile for caller");
            Err(BookingError::NotFound(format!(
                "Technician profile not found for account: {caller_id}"
            )))
        }
    }
}

pub fn require_booking_technician(
    profile: &TechnicianProfile,
    booking: &Booking,
) -> Result<(), BookingError> {
    if profile.id != booking.technician_id {
        error!(
            technician_id = %profile.id,
            booking_id = %booking.id,
            "Caller is not the booking's technician"
        );
        return Err(BookingError::Forbidden);
    }
    Ok(())
}

pub fn require_booking_customer(caller_id: &str, booking: &Booking) -> Result<(), BookingError> {
    if caller_id != booking.customer_id {
        error!(
            customer_id = %caller_id,
            booking_id = %booking.id,
            "Caller is not the booking's customer"
        );
        return Err(BookingError::Forbidden);
    }
    Ok(())
}
