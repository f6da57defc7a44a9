use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::clients::{DirectoryClient, StoreClient};
use crate::dispatch::{DispatchPort, EventEnvelope, EventName, PushMessage, RoomKey};
use crate::domain::{
    Booking, BookingPatch, BookingStatus, Expected, NewBooking, PLATFORM_FEE_RATE,
};
use crate::error::BookingError;
use crate::guard;
use crate::projection::BookingView;

/// The booking negotiation state machine.
///
/// Each operation authorizes the caller, applies its transition through a
/// single conditional store update, then pushes the updated projection to
/// the counter-party's identity room. Pre-checks against a fresh read give
/// precise errors for sequential misuse; a conditional write that still
/// fails means a concurrent caller won the race and surfaces as
/// [`BookingError::Conflict`].
#[derive(Clone)]
pub struct NegotiationEngine {
    store: StoreClient,
    directory: DirectoryClient,
    dispatch: Arc<dyn DispatchPort>,
}

impl NegotiationEngine {
    pub fn new(
        store: StoreClient,
        directory: DirectoryClient,
        dispatch: Arc<dyn DispatchPort>,
    ) -> Self {
        Self {
            store,
            directory,
            dispatch,
        }
    }

    /// Customer requests a technician directly.
    #[instrument(skip(self, payload), fields(technician_id = %payload.technician_id))]
    pub async fn create_booking(
        &self,
        customer_id: &str,
        payload: NewBooking,
    ) -> Result<BookingView, BookingError> {
        info!("Processing create_booking request");

        let technician = self
            .directory
            .technician(payload.technician_id.clone())
            .await?
            .ok_or_else(|| {
                error!("Technician not found");
                BookingError::NotFound(format!(
                    "Technician not found: {}",
                    payload.technician_id
                ))
            })?;
        let category = self
            .directory
            .category(payload.category_id.clone())
            .await?
            .ok_or_else(|| {
                error!("Requested category does not exist");
                BookingError::InvalidCategory
            })?;
        if technician.category_id != category.id {
            error!("Technician does not belong to the requested category");
            return Err(BookingError::InvalidCategory);
        }

        let booking = self.store.create(customer_id.to_string(), payload).await?;
        info!(booking_id = %booking.id, "Booking created successfully");

        let view = self.project(&booking).await?;
        self.dispatch.emit(
            RoomKey::identity(&booking.technician_id),
            PushMessage {
                event: EventName::NewBookingRequest,
                envelope: EventEnvelope::for_booking("You have a new booking request", view.clone()),
            },
        );
        Ok(view)
    }

    /// Technician proposes a final price differing from the asking price.
    /// The customer's standing agreement is withdrawn until they re-agree.
    #[instrument(skip(self))]
    pub async fn counter_offer(
        &self,
        caller_id: &str,
        booking_id: &str,
        final_price: f64,
    ) -> Result<BookingView, BookingError> {
        info!("Processing counter_offer request");

        let booking = self.load(booking_id).await?;
        let profile = guard::require_technician(&self.directory, caller_id).await?;
        guard::require_booking_technician(&profile, &booking)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition(booking.status));
        }

        let updated = self
            .store
            .conditional_update(
                booking_id.to_string(),
                Expected::status_in(&[BookingStatus::Pending]),
                BookingPatch {
                    final_price: Some(final_price),
                    customer_agreed: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        info!(final_price, "Counter-offer recorded");

        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.customer_id),
            PushMessage {
                event: EventName::PriceUpdated,
                envelope: EventEnvelope::for_booking(
                    "The booking price has been raised",
                    view.clone(),
                ),
            },
        );
        Ok(view)
    }

    /// Customer agrees to the currently proposed final price.
    #[instrument(skip(self))]
    pub async fn customer_agree(
        &self,
        caller_id: &str,
        booking_id: &str,
    ) -> Result<BookingView, BookingError> {
        info!("Processing customer_agree request");

        let booking = self.load(booking_id).await?;
        guard::require_booking_customer(caller_id, &booking)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition(booking.status));
        }

        let updated = self
            .store
            .conditional_update(
                booking_id.to_string(),
                Expected::status_in(&[BookingStatus::Pending]),
                BookingPatch {
                    customer_agreed: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!("Customer agreement recorded");

        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.technician_id),
            PushMessage {
                event: EventName::CustomerAgreed,
                envelope: EventEnvelope::for_booking(
                    "The customer has agreed to the final price",
                    view.clone(),
                ),
            },
        );
        Ok(view)
    }

    /// Technician accepts the booking. A booking that was never
    /// counter-offered is accepted at the asking price.
    #[instrument(skip(self))]
    pub async fn accept(
        &self,
        caller_id: &str,
        booking_id: &str,
    ) -> Result<BookingView, BookingError> {
        info!("Processing accept request");

        let booking = self.load(booking_id).await?;
        let profile = guard::require_technician(&self.directory, caller_id).await?;
        guard::require_booking_technician(&profile, &booking)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition(booking.status));
        }
        if !booking.customer_agreed {
            error!("Customer has not agreed to the final price");
            return Err(BookingError::AgreementRequired);
        }

        let updated = self
            .store
            .conditional_update(
                booking_id.to_string(),
                Expected::status_in(&[BookingStatus::Pending]).with_agreement(true),
                BookingPatch {
                    status: Some(BookingStatus::Accepted),
                    customer_agreed: Some(true),
                    default_final_price: true,
                    ..Default::default()
                },
            )
            .await?;
        info!(final_price = ?updated.final_price, "Booking accepted");

        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.customer_id),
            PushMessage {
                event: EventName::Accepted,
                envelope: EventEnvelope::for_booking("Your booking has been accepted", view.clone()),
            },
        );
        Ok(view)
    }

    /// Technician marks accepted work as done; the platform fee is settled
    /// in the same transition.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        caller_id: &str,
        booking_id: &str,
    ) -> Result<BookingView, BookingError> {
        info!("Processing complete request");

        let booking = self.load(booking_id).await?;
        let profile = guard::require_technician(&self.directory, caller_id).await?;
        guard::require_booking_technician(&profile, &booking)?;
        if booking.status != BookingStatus::Accepted {
            return Err(BookingError::InvalidTransition(booking.status));
        }

        // The final price is frozen once a booking is accepted, so the fee
        // computed from this read cannot go stale before the write.
        let settled_price = booking.final_price.unwrap_or(booking.initial_price);
        let updated = self
            .store
            .conditional_update(
                booking_id.to_string(),
                Expected::status_in(&[BookingStatus::Accepted]),
                BookingPatch {
                    status: Some(BookingStatus::Completed),
                    completed_at: Some(chrono::Utc::now()),
                    platform_fee: Some(settled_price * PLATFORM_FEE_RATE),
                    ..Default::default()
                },
            )
            .await?;
        info!(platform_fee = updated.platform_fee, "Booking completed");

        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.customer_id),
            PushMessage {
                event: EventName::Completed,
                envelope: EventEnvelope::for_booking("Your booking has been completed", view.clone()),
            },
        );
        Ok(view)
    }

    /// Technician withdraws from a booking that has not been accepted.
    #[instrument(skip(self))]
    pub async fn cancel_by_technician(
        &self,
        caller_id: &str,
        booking_id: &str,
    ) -> Result<BookingView, BookingError> {
        info!("Processing cancel_by_technician request");

        let booking = self.load(booking_id).await?;
        let profile = guard::require_technician(&self.directory, caller_id).await?;
        guard::require_booking_technician(&profile, &booking)?;

        let updated = self.cancel(&booking).await?;
        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.customer_id),
            PushMessage {
                event: EventName::Cancelled,
                envelope: EventEnvelope::for_booking("Your booking has been cancelled", view.clone()),
            },
        );
        Ok(view)
    }

    /// Customer withdraws a booking that has not been accepted.
    #[instrument(skip(self))]
    pub async fn cancel_by_customer(
        &self,
        caller_id: &str,
        booking_id: &str,
    ) -> Result<BookingView, BookingError> {
        info!("Processing cancel_by_customer request");

        let booking = self.load(booking_id).await?;
        guard::require_booking_customer(caller_id, &booking)?;

        let updated = self.cancel(&booking).await?;
        let view = self.project(&updated).await?;
        self.dispatch.emit(
            RoomKey::identity(&updated.technician_id),
            PushMessage {
                event: EventName::Cancelled,
                envelope: EventEnvelope::for_booking(
                    "The booking has been cancelled by the customer",
                    view.clone(),
                ),
            },
        );
        Ok(view)
    }

    /// Pull query: the reconcile path for anyone who missed a push.
    #[instrument(skip(self))]
    pub async fn get_booking(&self, booking_id: &str) -> Result<BookingView, BookingError> {
        let booking = self.load(booking_id).await?;
        self.project(&booking).await
    }

    /// Broadcasts an open call to every technician connected to the
    /// category room. Degenerate sibling of the direct-booking flow.
    #[instrument(skip(self))]
    pub async fn announce_open_call(
        &self,
        category_name: &str,
        message: &str,
    ) -> Result<(), BookingError> {
        info!("Processing announce_open_call request");

        if self
            .directory
            .category_by_name(category_name.to_string())
            .await?
            .is_none()
        {
            error!("Requested category does not exist");
            return Err(BookingError::InvalidCategory);
        }

        self.dispatch.emit(
            RoomKey::category(category_name),
            PushMessage {
                event: EventName::NewBid,
                envelope: EventEnvelope::announcement(message),
            },
        );
        Ok(())
    }

    async fn load(&self, booking_id: &str) -> Result<Booking, BookingError> {
        self.store
            .get(booking_id.to_string())
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking not found: {booking_id}")))
    }

    /// Cancellation is blocked once work has been agreed to; re-cancelling
    /// an already cancelled booking stays an idempotent success.
    async fn cancel(&self, booking: &Booking) -> Result<Booking, BookingError> {
        if matches!(
            booking.status,
            BookingStatus::Accepted | BookingStatus::Completed
        ) {
            return Err(BookingError::InvalidTransition(booking.status));
        }
        let updated = self
            .store
            .conditional_update(
                booking.id.clone(),
                Expected::status_in(&[BookingStatus::Pending, BookingStatus::Cancelled]),
                BookingPatch {
                    status: Some(BookingStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await?;
        info!(booking_id = %updated.id, "Booking cancelled");
        Ok(updated)
    }

    async fn project(&self, booking: &Booking) -> Result<BookingView, BookingError> {
        let customer = self
            .directory
            .customer(booking.customer_id.clone())
            .await?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Customer not found: {}", booking.customer_id))
            })?;
        let technician = self
            .directory
            .technician(booking.technician_id.clone())
            .await?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Technician not found: {}", booking.technician_id))
            })?;
        let category = self
            .directory
            .category(booking.category_id.clone())
            .await?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Category not found: {}", booking.category_id))
            })?;
        Ok(BookingView::assemble(booking, &customer, &technician, &category))
    }
}
