//! Outbound notifications.
//!
//! Request handlers never talk to the mail transport. They enqueue a [`PasswordResetRequested`]
//! on the [`NotificationQueue`] after their transaction commits, and a background worker delivers
//! it through a [`Notifier`]. Enqueue never blocks: when the queue is full or the worker is gone
//! the event is dropped with a warning. Delivery failures are logged and not retried.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::Error;

/// A freshly issued reset token needs to reach its account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetRequested {
    pub name: String,
    pub email: String,
    pub reset_url: String,
    pub subject: String,
}

/// Delivers notifications to account holders
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn password_reset_requested(&self, event: &PasswordResetRequested) -> Result<(), Error>;
}

#[derive(Clone, Debug)]
pub struct NotificationQueue {
    sender: Sender<PasswordResetRequested>,
}

impl NotificationQueue {
    /// A bounded queue and the receiving end to hand to [`run_notification_worker`]
    pub fn new(capacity: usize) -> (Self, Receiver<PasswordResetRequested>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queue an event for delivery. Returns false when it was dropped.
    #[instrument(skip_all, fields(to = %event.email))]
    pub fn enqueue(&self, event: PasswordResetRequested) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => {
                debug!("Queued password reset notification");
                true
            }
            Err(TrySendError::Full(event)) => {
                warn!(to = %event.email, "Notification queue full, dropping password reset notification");
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(to = %event.email, "Notification worker stopped, dropping password reset notification");
                false
            }
        }
    }
}

/// Deliver queued notifications until `shutdown` fires. Events already queued at shutdown are
/// still delivered.
pub async fn run_notification_worker(
    mut receiver: Receiver<PasswordResetRequested>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
) {
    info!("Starting notification worker");

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(event) => deliver(notifier.as_ref(), &event).await,
                None => break,
            },
            _ = shutdown.cancelled() => {
                receiver.close();
                while let Some(event) = receiver.recv().await {
                    deliver(notifier.as_ref(), &event).await;
                }
                break;
            }
        }
    }

    info!("Notification worker shutting down");
}

async fn deliver(notifier: &dyn Notifier, event: &PasswordResetRequested) {
    match notifier.password_reset_requested(event).await {
        Ok(()) => info!(to = %event.email, "Sent password reset notification"),
        Err(e) => error!(to = %event.email, error = %e, "Failed to send password reset notification"),
    }
}
