mod actors;
mod app_system;
mod clients;
mod dispatch;
mod domain;
mod engine;
mod error;
mod guard;
mod messages;
mod projection;

#[cfg(test)]
mod mock_framework;

use tracing::{info, Instrument};

use crate::app_system::{setup_tracing, BookingSystem};
use crate::domain::{BookingMethod, Category, CustomerAccount, NewBooking, TechnicianProfile};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting booking broker");

    let system = BookingSystem::new();

    // Seed the directory collaborator with a category, a customer and a
    // technician profile linked to its login account.
    let directory = &system.directory_client;
    directory
        .add_category(Category::new("cat_plumbing", "plumbing"))
        .await
        .map_err(|e| e.to_string())?;
    directory
        .add_customer(CustomerAccount::new(
            "customer_alice",
            "Alice",
            "alice@example.com",
            "555-0100",
        ))
        .await
        .map_err(|e| e.to_string())?;
    directory
        .add_technician(TechnicianProfile::new(
            "tech_bob",
            "account_bob",
            "Bob",
            "bob@example.com",
            "555-0101",
            "cat_plumbing",
        ))
        .await
        .map_err(|e| e.to_string())?;

    // Both parties connect. The technician joins its identity room and its
    // category room; the customer only its identity room.
    let mut technician_session = system
        .dispatch_client
        .open_technician_session("tech_bob", "plumbing")
        .await
        .map_err(|e| e.to_string())?;
    let mut customer_session = system
        .dispatch_client
        .open_customer_session("customer_alice")
        .await
        .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("negotiation");
    let booking_id = async {
        info!("Running a full negotiation");

        let view = system
            .engine
            .create_booking(
                "customer_alice",
                NewBooking {
                    technician_id: "tech_bob".to_string(),
                    category_id: "cat_plumbing".to_string(),
                    title: "Leaking sink".to_string(),
                    description: "Kitchen sink drips overnight".to_string(),
                    location: "12 Hill Road".to_string(),
                    initial_price: 2000.0,
                    booking_method: BookingMethod::Manual,
                },
            )
            .await
            .map_err(|e| e.to_string())?;

        system
            .engine
            .counter_offer("account_bob", &view.id, 2500.0)
            .await
            .map_err(|e| e.to_string())?;
        system
            .engine
            .customer_agree("customer_alice", &view.id)
            .await
            .map_err(|e| e.to_string())?;
        system
            .engine
            .accept("account_bob", &view.id)
            .await
            .map_err(|e| e.to_string())?;
        let completed = system
            .engine
            .complete("account_bob", &view.id)
            .await
            .map_err(|e| e.to_string())?;

        info!(
            booking_id = %completed.id,
            final_price = ?completed.final_price,
            platform_fee = completed.platform_fee,
            "Negotiation settled"
        );
        Ok::<_, String>(view.id)
    }
    .instrument(span)
    .await?;

    // Give the fabric a beat to deliver, then drain the live pushes both
    // parties received along the way.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    while let Ok(push) = technician_session.inbox.try_recv() {
        info!(event = push.event.as_str(), message = %push.envelope.message, "Technician push");
    }
    while let Ok(push) = customer_session.inbox.try_recv() {
        info!(event = push.event.as_str(), message = %push.envelope.message, "Customer push");
    }

    let settled = system
        .engine
        .get_booking(&booking_id)
        .await
        .map_err(|e| e.to_string())?;
    info!(status = %settled.status, "Final booking state");

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
