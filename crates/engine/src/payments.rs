//! Payment rows: partial or full settlements against one invoice.
//!
//! Only `approved` payments count toward an invoice's paid total. Each row
//! captures the TDS amount and rounding policy **as applied at record time**,
//! independent of the invoice's current settings, for audit fidelity.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, tds::TdsRounding};

/// Payment review lifecycle; reviewed exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i32,
    pub invoice_id: i32,
    pub amount_paid_minor: i64,
    pub payment_date: Date,
    pub payment_type_id: Option<i32>,
    pub status: PaymentStatus,
    pub tds_withheld_minor: i64,
    pub tds_rounding: TdsRounding,
    pub reference: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub invoice_id: i32,
    pub amount_paid_minor: i64,
    pub payment_date: Date,
    pub payment_type_id: Option<i32>,
    pub status: String,
    pub tds_withheld_minor: i64,
    pub tds_rounding: String,
    pub reference: Option<String>,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub rejection_note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Invoices,
    #[sea_orm(
        belongs_to = "super::payment_types::Entity",
        from = "Column::PaymentTypeId",
        to = "super::payment_types::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    PaymentTypes,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::payment_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            invoice_id: model.invoice_id,
            amount_paid_minor: model.amount_paid_minor,
            payment_date: model.payment_date,
            payment_type_id: model.payment_type_id,
            status: PaymentStatus::try_from(model.status.as_str())?,
            tds_withheld_minor: model.tds_withheld_minor,
            tds_rounding: TdsRounding::try_from(model.tds_rounding.as_str())?,
            reference: model.reference,
            created_by: model.created_by,
            created_at: model.created_at,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at,
            rejection_note: model.rejection_note,
        })
    }
}
