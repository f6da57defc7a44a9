use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Share of the final price retained by the platform at completion.
pub const PLATFORM_FEE_RATE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingMethod {
    Manual,
    Bid,
}

/// The unit of negotiation between one customer and one technician.
///
/// Identity, category and the free-text fields are fixed at creation; only
/// the negotiation fields (`final_price`, `customer_agreed`, `status` and
/// its derivatives) move afterwards, and only through conditional updates.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub technician_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub initial_price: f64,
    pub final_price: Option<f64>,
    pub platform_fee: f64,
    pub customer_agreed: bool,
    pub status: BookingStatus,
    pub booking_method: BookingMethod,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Constructs a freshly requested booking. No price has been proposed
    /// yet, so the customer agrees by default.
    pub fn create(id: String, customer_id: String, payload: NewBooking, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            technician_id: payload.technician_id,
            category_id: payload.category_id,
            title: payload.title,
            description: payload.description,
            location: payload.location,
            initial_price: payload.initial_price,
            final_price: None,
            platform_fee: 0.0,
            customer_agreed: true,
            status: BookingStatus::Pending,
            booking_method: payload.booking_method,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload for creating a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub technician_id: String,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub initial_price: f64,
    pub booking_method: BookingMethod,
}

/// Which part of a conditional update's predicate the record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The current status was not among the allowed ones.
    Status(BookingStatus),
    /// `customer_agreed` did not match the required value.
    Agreement,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Status(current) => write!(f, "booking is {current}"),
            Precondition::Agreement => f.write_str("customer agreement does not match"),
        }
    }
}

/// Predicate a conditional update must satisfy against the current record.
///
/// Checked inside the store's single update handler, so no caller-side read
/// can interleave with another caller's write. Status is checked before
/// agreement.
#[derive(Debug, Clone, Default)]
pub struct Expected {
    pub status: Option<Vec<BookingStatus>>,
    pub customer_agreed: Option<bool>,
}

impl Expected {
    pub fn status_in(allowed: &[BookingStatus]) -> Self {
        Self {
            status: Some(allowed.to_vec()),
            customer_agreed: None,
        }
    }

    pub fn with_agreement(mut self, agreed: bool) -> Self {
        self.customer_agreed = Some(agreed);
        self
    }

    pub fn check(&self, booking: &Booking) -> Result<(), Precondition> {
        if let Some(allowed) = &self.status {
            if !allowed.contains(&booking.status) {
                return Err(Precondition::Status(booking.status));
            }
        }
        if let Some(agreed) = self.customer_agreed {
            if booking.customer_agreed != agreed {
                return Err(Precondition::Agreement);
            }
        }
        Ok(())
    }
}

/// Field changes applied once the predicate holds.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub final_price: Option<f64>,
    pub customer_agreed: Option<bool>,
    pub platform_fee: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    /// When set, a booking that was never counter-offered has its final
    /// price fixed to the initial asking price in the same atomic update.
    pub default_final_price: bool,
}

impl BookingPatch {
    pub fn apply(&self, booking: &mut Booking, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(price) = self.final_price {
            booking.final_price = Some(price);
        }
        if self.default_final_price && booking.final_price.is_none() {
            booking.final_price = Some(booking.initial_price);
        }
        if let Some(agreed) = self.customer_agreed {
            booking.customer_agreed = agreed;
        }
        if let Some(fee) = self.platform_fee {
            booking.platform_fee = fee;
        }
        if let Some(at) = self.completed_at {
            booking.completed_at = Some(at);
        }
        booking.updated_at = now;
    }
}
