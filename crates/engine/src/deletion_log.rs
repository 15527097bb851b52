//! Tombstones for hard-deleted invoices.
//!
//! Permanent deletion is the only true delete in the model; the tombstone is
//! written while the invoice row still exists so the audit trail survives the
//! cascade.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deletion_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub invoice_id: i32,
    pub invoice_number: String,
    pub vendor_id: i32,
    pub reason: String,
    pub deleted_by: i32,
    pub deleted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
