//! Invoice records and the status vocabulary.
//!
//! Only `pending_approval`, `unpaid`, `on_hold` and `rejected` are ever
//! persisted. `partial` and `paid` are derived at read time from the approved
//! payment total (see the payment ops) so that the stored row can never
//! disagree with the money that actually moved.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    tds::{self, TdsBreakdown, TdsRounding},
};

/// Invoice status lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    PendingApproval,
    Unpaid,
    Partial,
    Paid,
    OnHold,
    Rejected,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::OnHold => "on_hold",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for InvoiceStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_approval" => Ok(Self::PendingApproval),
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "on_hold" => Ok(Self::OnHold),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid invoice status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i32,
    pub invoice_number: String,
    pub vendor_id: i32,
    pub amount_minor: i64,
    pub currency_code: String,
    pub status: InvoiceStatus,
    pub invoice_date: Date,
    pub due_date: Option<Date>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
    pub category_id: Option<i32>,
    pub profile_id: Option<i32>,
    pub tds_applicable: bool,
    pub tds_rate_percent: Option<i64>,
    pub tds_rounding: TdsRounding,
    pub archived: bool,
    pub archived_by: Option<i32>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<String>,
    pub held_by: Option<i32>,
    pub held_at: Option<DateTime<Utc>>,
    pub hold_reason: Option<String>,
    pub rejected_by: Option<i32>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Withholding split under the invoice's current TDS settings.
    ///
    /// Payments capture their own split at record time; this one is for
    /// previewing the payable amount of the invoice as configured today.
    pub fn tds_breakdown(&self) -> TdsBreakdown {
        let rate = self.tds_applicable.then_some(self.tds_rate_percent).flatten();
        tds::calculate(self.amount_minor, rate, self.tds_rounding)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub invoice_number: String,
    pub vendor_id: i32,
    pub amount_minor: i64,
    pub currency_code: String,
    pub status: String,
    pub invoice_date: Date,
    pub due_date: Option<Date>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
    pub category_id: Option<i32>,
    pub profile_id: Option<i32>,
    pub tds_applicable: bool,
    pub tds_rate_percent: Option<i64>,
    pub tds_rounding: String,
    pub archived: bool,
    pub archived_by: Option<i32>,
    pub archived_at: Option<DateTimeUtc>,
    pub archive_reason: Option<String>,
    pub held_by: Option<i32>,
    pub held_at: Option<DateTimeUtc>,
    pub hold_reason: Option<String>,
    pub rejected_by: Option<i32>,
    pub rejected_at: Option<DateTimeUtc>,
    pub rejection_reason: Option<String>,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendors::Entity",
        from = "Column::VendorId",
        to = "super::vendors::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Vendors,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
    #[sea_orm(has_many = "super::attachments::Entity")]
    Attachments,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::vendors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendors.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Invoice {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            invoice_number: model.invoice_number,
            vendor_id: model.vendor_id,
            amount_minor: model.amount_minor,
            currency_code: model.currency_code,
            status: InvoiceStatus::try_from(model.status.as_str())?,
            invoice_date: model.invoice_date,
            due_date: model.due_date,
            period_start: model.period_start,
            period_end: model.period_end,
            category_id: model.category_id,
            profile_id: model.profile_id,
            tds_applicable: model.tds_applicable,
            tds_rate_percent: model.tds_rate_percent,
            tds_rounding: TdsRounding::try_from(model.tds_rounding.as_str())?,
            archived: model.archived,
            archived_by: model.archived_by,
            archived_at: model.archived_at,
            archive_reason: model.archive_reason,
            held_by: model.held_by,
            held_at: model.held_at,
            hold_reason: model.hold_reason,
            rejected_by: model.rejected_by,
            rejected_at: model.rejected_at,
            rejection_reason: model.rejection_reason,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
