use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::entities::{Booking, TripKind};
use crate::error::{upstream_error, Error};

/// Told about new bookings once they are committed.
#[async_trait]
pub trait Notifier {
    async fn booking_created(&self, booking: &Booking) -> Result<(), Error>;
}

pub type DynNotifier = Arc<dyn Notifier + Send + Sync>;

/// Runs the notifier on its own task. The booking is already stored, so a
/// failing notifier only gets logged.
pub fn notify_detached(notifier: DynNotifier, booking: Booking) {
    tokio::spawn(async move {
        if let Err(err) = notifier.booking_created(&booking).await {
            tracing::warn!(
                booking_id = %booking.booking_id,
                error = %err,
                "failed to send booking notification"
            );
        }
    });
}

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_created(&self, booking: &Booking) -> Result<(), Error> {
        tracing::info!(
            booking_id = %booking.booking_id,
            origin = %booking.trip.origin,
            destination = %booking.trip.destination,
            "new booking received"
        );

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct BookingCreatedMessage<'a> {
    subject: &'static str,
    booking_id: &'a str,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    trip_type: &'a TripKind,
    origin: &'a str,
    destination: &'a str,
    pickup_at: String,
    return_at: Option<String>,
    price: String,
}

impl<'a> From<&'a Booking> for BookingCreatedMessage<'a> {
    fn from(booking: &'a Booking) -> Self {
        Self {
            subject: "New booking received",
            booking_id: booking.booking_id.as_str(),
            name: &booking.customer.name,
            email: &booking.customer.email,
            phone: &booking.customer.phone,
            trip_type: &booking.trip.kind,
            origin: &booking.trip.origin,
            destination: &booking.trip.destination,
            pickup_at: booking.trip.pickup_at.to_rfc3339(),
            return_at: booking.trip.return_at.map(|t| t.to_rfc3339()),
            price: booking.price().to_string(),
        }
    }
}

/// Posts a summary of each new booking to an operator webhook (mail relay,
/// chat channel, ...).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[tracing::instrument(skip_all, fields(booking_id = %booking.booking_id))]
    async fn booking_created(&self, booking: &Booking) -> Result<(), Error> {
        let res = self
            .client
            .post(&self.url)
            .json(&BookingCreatedMessage::from(booking))
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::warn!(status = res.status().as_u16(), "webhook rejected notification");
            return Err(upstream_error());
        }

        Ok(())
    }
}

#[test]
fn booking_created_message_test() {
    use crate::entities::test_request;

    let (booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();
    let message = serde_json::to_value(BookingCreatedMessage::from(&booking)).unwrap();

    assert_eq!(message["booking_id"], booking.booking_id.as_str());
    assert_eq!(message["trip_type"], "one-way");
    assert_eq!(message["price"], "3937.50");
    assert!(message["return_at"].is_null());
}

#[test]
fn failing_notifier_is_swallowed_test() {
    use crate::entities::test_request;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    struct Failing {
        ran: Mutex<Option<oneshot::Sender<String>>>,
    }

    #[async_trait]
    impl Notifier for Failing {
        async fn booking_created(&self, booking: &Booking) -> Result<(), Error> {
            if let Some(ran) = self.ran.lock().unwrap().take() {
                ran.send(booking.booking_id.to_string()).unwrap();
            }

            Err(upstream_error())
        }
    }

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();
    let booking_id = booking.booking_id.to_string();
    let (tx, rx) = oneshot::channel();

    let notified = runtime.block_on(async move {
        notify_detached(
            Arc::new(Failing {
                ran: Mutex::new(Some(tx)),
            }),
            booking,
        );

        rx.await.unwrap()
    });

    assert_eq!(notified, booking_id);
}
