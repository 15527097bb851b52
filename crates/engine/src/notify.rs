//! Notification collaborator boundary.
//!
//! Delivery is somebody else's job (email, in-app feed, chat bridge). The
//! engine hands a [`Notification`] to the configured [`Notifier`] strictly
//! **after** the owning transaction commits; a delivery failure is logged and
//! never fails or rolls back the state transition.

use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// Domain events the engine raises for interested users.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    InvoicePendingApproval,
    InvoiceApproved,
    InvoiceRejected,
    InvoicePutOnHold,
    VendorRejected,
    RequestApproved,
    RequestRejected,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvoicePendingApproval => "invoice.pending_approval",
            Self::InvoiceApproved => "invoice.approved",
            Self::InvoiceRejected => "invoice.rejected",
            Self::InvoicePutOnHold => "invoice.put_on_hold",
            Self::VendorRejected => "vendor.rejected",
            Self::RequestApproved => "request.approved",
            Self::RequestRejected => "request.rejected",
        }
    }
}

/// One event for one recipient about one subject entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub target_user_id: i32,
    pub subject_id: i32,
    pub context: Value,
}

impl Notification {
    #[must_use]
    pub fn new(kind: NotificationKind, target_user_id: i32, subject_id: i32) -> Self {
        Self {
            kind,
            target_user_id,
            subject_id,
            context: Value::Null,
        }
    }

    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Delivery failure surfaced by a [`Notifier`]; logged by the engine, never
/// propagated.
#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Discards everything; the default when no collaborator is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Collects notifications in memory; used by tests and embedders that drain
/// events themselves.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError("notifier mutex poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}
