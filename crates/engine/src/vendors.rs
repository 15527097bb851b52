//! Vendor (payee) records and their vetting status.
//!
//! A vendor is reviewed exactly once: `pending_approval` terminates in
//! `approved` or `rejected`. Rejecting a vendor cascades to its still-pending
//! invoices (see the vendor ops). Vendors are soft-deleted via `deleted_at`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Vendor vetting lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl VendorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for VendorStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid vendor status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub tax_exempt: bool,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub status: VendorStatus,
    pub created_by: i32,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Case/diacritic-insensitive key; uniqueness is enforced in-transaction
    /// against non-deleted rows.
    pub name_norm: String,
    pub address: Option<String>,
    pub tax_exempt: bool,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub status: String,
    pub created_by: i32,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTimeUtc>,
    pub rejection_reason: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoices::Entity")]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Vendor {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            address: model.address,
            tax_exempt: model.tax_exempt,
            bank_name: model.bank_name,
            bank_account: model.bank_account,
            status: VendorStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            deleted_at: model.deleted_at,
            created_at: model.created_at,
        })
    }
}
