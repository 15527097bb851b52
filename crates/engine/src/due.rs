//! Due-date classification and worklist priority ranking.
//!
//! Both functions are pure: they take the effective (payment-derived) status,
//! the midnight-normalized "today", and return values that are never
//! persisted. The due-soon window is configurable on the engine builder
//! (default 3 days) since the threshold is a presentation rule, not a hard
//! business constant.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::InvoiceStatus;

/// Urgency tier attached to a due label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueSeverity {
    Info,
    Warning,
    Critical,
}

/// Where an open invoice stands relative to its due date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueState {
    /// Days from today to the due date; negative means overdue.
    pub days_until_due: i64,
    pub label: String,
    pub severity: DueSeverity,
    pub due_soon: bool,
}

impl DueState {
    pub fn is_overdue(&self) -> bool {
        self.days_until_due < 0
    }
}

/// Classifies an invoice against its due date.
///
/// Only meaningful for open money: the status must be `unpaid` or `partial`,
/// something must still be owed, and a due date must be set — otherwise there
/// is no due state.
#[must_use]
pub fn classify(
    status: InvoiceStatus,
    due_date: Option<NaiveDate>,
    remaining_minor: i64,
    today: NaiveDate,
    due_soon_days: i64,
) -> Option<DueState> {
    if !matches!(status, InvoiceStatus::Unpaid | InvoiceStatus::Partial) || remaining_minor <= 0 {
        return None;
    }
    let due_date = due_date?;

    let days = (due_date - today).num_days();
    let state = if days < 0 {
        DueState {
            days_until_due: days,
            label: format!("overdue by {} days", -days),
            severity: DueSeverity::Critical,
            due_soon: false,
        }
    } else if days == 0 {
        DueState {
            days_until_due: 0,
            label: "due today".to_string(),
            severity: DueSeverity::Warning,
            due_soon: true,
        }
    } else if days <= due_soon_days {
        DueState {
            days_until_due: days,
            label: format!("due in {days} days"),
            severity: DueSeverity::Warning,
            due_soon: true,
        }
    } else {
        DueState {
            days_until_due: days,
            label: format!("due in {days} days"),
            severity: DueSeverity::Info,
            due_soon: false,
        }
    };
    Some(state)
}

/// Total-order sort key for the default worklist view (ascending = first).
///
/// Rank classes: awaiting review (0), overdue (1, most overdue first),
/// due soon (2, soonest first), other open (3), on hold (4), paid (5),
/// everything else (6). Remaining ties break by most recently created.
#[must_use]
pub fn priority_key(
    status: InvoiceStatus,
    archived: bool,
    due: Option<&DueState>,
    created_at: DateTime<Utc>,
) -> (u8, i64, i64) {
    let class = if archived {
        6
    } else {
        match status {
            InvoiceStatus::PendingApproval => 0,
            InvoiceStatus::Unpaid | InvoiceStatus::Partial => match due {
                Some(due) if due.is_overdue() => 1,
                Some(due) if due.due_soon => 2,
                _ => 3,
            },
            InvoiceStatus::OnHold => 4,
            InvoiceStatus::Paid => 5,
            InvoiceStatus::Rejected => 6,
        }
    };

    // Classes 1 and 2 order by the day distance (most overdue first, soonest
    // due first); both fall out of sorting days_until_due ascending.
    let days = match class {
        1 | 2 => due.map(|d| d.days_until_due).unwrap_or(0),
        _ => 0,
    };

    (class, days, -created_at.timestamp_millis())
}
