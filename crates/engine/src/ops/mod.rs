//! Engine operations.
//!
//! Every mutating operation runs inside one database transaction: the
//! authorization check happens first (before any read), state predicates are
//! re-checked inside the transaction to close races, and side effects
//! (notifications, file moves) are issued only after commit, best effort.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    EngineError, ResultEngine,
    notify::{Notification, Notifier, NullNotifier},
    storage::{AttachmentStore, NullAttachmentStore},
};

mod access;
mod archive;
mod currencies;
mod invoices;
mod payments;
mod requests;
mod users;
mod vendors;
mod worklist;

pub use payments::SettlementSummary;
pub use requests::BulkOutcome;
pub use vendors::VendorGate;
pub use worklist::{InvoiceListFilter, WorklistItem, WorklistPage, WorklistSort};

/// Default window for the "due soon" flag, in days.
const DEFAULT_DUE_SOON_DAYS: i64 = 3;
/// Default minimum length for hold/reject/archive reasons.
const DEFAULT_MIN_REASON_LEN: usize = 10;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    attachments: Arc<dyn AttachmentStore>,
    due_soon_days: i64,
    min_reason_len: usize,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Hand an event to the notification collaborator; failure is logged and
    /// never surfaces to the caller.
    pub(crate) fn dispatch(&self, notification: Notification) {
        let kind = notification.kind;
        if let Err(err) = self.notifier.notify(notification) {
            tracing::warn!("failed to deliver {}: {err}", kind.as_str());
        }
    }

    /// Validate a hold/reject/archive reason against the configured minimum.
    pub(crate) fn normalize_reason(&self, value: &str, label: &str) -> ResultEngine<String> {
        let trimmed = value.trim();
        if trimmed.chars().count() < self.min_reason_len {
            return Err(EngineError::Validation(format!(
                "{label} reason must be at least {} characters",
                self.min_reason_len
            )));
        }
        Ok(trimmed.to_string())
    }
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Case/diacritic-insensitive key used for name uniqueness checks.
pub(crate) fn normalize_name_key(value: &str) -> String {
    value
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    attachments: Arc<dyn AttachmentStore>,
    due_soon_days: i64,
    min_reason_len: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            notifier: Arc::new(NullNotifier),
            attachments: Arc::new(NullAttachmentStore),
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            min_reason_len: DEFAULT_MIN_REASON_LEN,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Notification collaborator (defaults to a no-op).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = notifier;
        self
    }

    /// Attachment relocation collaborator (defaults to a no-op).
    pub fn attachments(mut self, attachments: Arc<dyn AttachmentStore>) -> EngineBuilder {
        self.attachments = attachments;
        self
    }

    /// Window for the "due soon" worklist flag.
    pub fn due_soon_days(mut self, days: i64) -> EngineBuilder {
        self.due_soon_days = days;
        self
    }

    /// Minimum accepted length for hold/reject/archive reasons.
    pub fn min_reason_len(mut self, len: usize) -> EngineBuilder {
        self.min_reason_len = len;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            notifier: self.notifier,
            attachments: self.attachments,
            due_soon_days: self.due_soon_days,
            min_reason_len: self.min_reason_len,
        })
    }
}
