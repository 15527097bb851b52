//! Vendor vetting, the invoice/vendor approval gate and the rejection
//! cascade.
//!
//! The cascade is a deliberate, ordered transaction script rather than an
//! event fan-out: vendor rejection and the bulk invoice rejection either all
//! commit or none do, and only then are creators notified.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde_json::json;

use crate::{
    Actor, CreateVendorCmd, EngineError, InvoiceStatus, ResultEngine, Vendor, VendorStatus,
    invoices,
    notify::{Notification, NotificationKind},
    vendors,
};

use super::{
    Engine,
    access::{require_actor, require_privileged},
    normalize_name_key, normalize_optional_text, normalize_required_name, with_tx,
};

/// Answer to "can this invoice be approved on its own?".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorGate {
    /// True when the vendor still awaits vetting; approval must go through
    /// the joint path.
    pub vendor_pending: bool,
    pub vendor: Vendor,
}

impl Engine {
    /// Creates a vendor.
    ///
    /// Privileged actors create vendors born `approved`; anyone else submits
    /// a `pending_approval` vendor for review.
    pub async fn create_vendor(
        &self,
        cmd: CreateVendorCmd,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vendor> {
        require_actor(actor)?;
        let name = normalize_required_name(&cmd.name, "vendor")?;
        let name_norm = normalize_name_key(&name);

        let (status, approved_by, approved_at) = if actor.is_privileged() {
            (VendorStatus::Approved, Some(actor.id), Some(now))
        } else {
            (VendorStatus::PendingApproval, None, None)
        };

        let model = with_tx!(self, |db_tx| {
            let exists = vendors::Entity::find()
                .filter(vendors::Column::NameNorm.eq(name_norm.clone()))
                .filter(vendors::Column::DeletedAt.is_null())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let active = vendors::ActiveModel {
                id: ActiveValue::NotSet,
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                address: ActiveValue::Set(normalize_optional_text(cmd.address.as_deref())),
                tax_exempt: ActiveValue::Set(cmd.tax_exempt),
                bank_name: ActiveValue::Set(normalize_optional_text(cmd.bank_name.as_deref())),
                bank_account: ActiveValue::Set(normalize_optional_text(
                    cmd.bank_account.as_deref(),
                )),
                status: ActiveValue::Set(status.as_str().to_string()),
                created_by: ActiveValue::Set(actor.id),
                approved_by: ActiveValue::Set(approved_by),
                approved_at: ActiveValue::Set(approved_at),
                rejection_reason: ActiveValue::Set(None),
                deleted_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(now),
            };
            let model = active.insert(&db_tx).await?;
            Ok(model)
        })?;

        Vendor::try_from(model)
    }

    /// Approves a vendor awaiting review. Vetting happens exactly once.
    pub async fn approve_vendor(
        &self,
        vendor_id: i32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;

        with_tx!(self, |db_tx| {
            let model = self.require_vendor(&db_tx, vendor_id).await?;
            if VendorStatus::try_from(model.status.as_str())? != VendorStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "vendor already reviewed".to_string(),
                ));
            }

            let active = vendors::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(VendorStatus::Approved.as_str().to_string()),
                approved_by: ActiveValue::Set(Some(actor.id)),
                approved_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Rejects a vendor and cascades to its invoices.
    ///
    /// Every invoice of the vendor still in `pending_approval` is rejected in
    /// the same transaction with a synthesized reason that spells out the
    /// vendor rejection — leaving them pending forever would be a silent
    /// deadlock. Creators are notified individually after commit.
    pub async fn reject_vendor(
        &self,
        vendor_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let reason = self.normalize_reason(reason, "rejection")?;

        let (vendor_creator, cascade_reason, affected) = with_tx!(self, |db_tx| {
            let model = self.require_vendor(&db_tx, vendor_id).await?;
            if VendorStatus::try_from(model.status.as_str())? != VendorStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "vendor already reviewed".to_string(),
                ));
            }

            let active = vendors::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(VendorStatus::Rejected.as_str().to_string()),
                rejection_reason: ActiveValue::Set(Some(reason.clone())),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            // The synthesized reason explains the cascade without requiring a
            // join at read time.
            let cascade_reason = format!("vendor \"{}\" was rejected: {reason}", model.name);

            let pending: Vec<invoices::Model> = invoices::Entity::find()
                .filter(invoices::Column::VendorId.eq(vendor_id))
                .filter(
                    invoices::Column::Status.eq(InvoiceStatus::PendingApproval.as_str()),
                )
                .all(&db_tx)
                .await?;

            let affected: Vec<(i32, i32)> = pending
                .iter()
                .map(|invoice| (invoice.id, invoice.created_by))
                .collect();

            if !pending.is_empty() {
                invoices::Entity::update_many()
                    .col_expr(
                        invoices::Column::Status,
                        Expr::value(InvoiceStatus::Rejected.as_str()),
                    )
                    .col_expr(invoices::Column::RejectedBy, Expr::value(actor.id))
                    .col_expr(invoices::Column::RejectedAt, Expr::value(now))
                    .col_expr(
                        invoices::Column::RejectionReason,
                        Expr::value(cascade_reason.clone()),
                    )
                    .filter(invoices::Column::VendorId.eq(vendor_id))
                    .filter(
                        invoices::Column::Status.eq(InvoiceStatus::PendingApproval.as_str()),
                    )
                    .exec(&db_tx)
                    .await?;
            }

            Ok((model.created_by, cascade_reason, affected))
        })?;

        self.dispatch(
            Notification::new(NotificationKind::VendorRejected, vendor_creator, vendor_id)
                .context(json!({ "reason": reason })),
        );
        for (invoice_id, creator) in affected {
            self.dispatch(
                Notification::new(NotificationKind::InvoiceRejected, creator, invoice_id)
                    .context(json!({ "reason": cascade_reason.clone() })),
            );
        }
        Ok(())
    }

    /// Reports whether an invoice's vendor still awaits vetting.
    pub async fn vendor_gate(&self, invoice_id: i32) -> ResultEngine<VendorGate> {
        let invoice = self.require_invoice(&self.database, invoice_id).await?;
        let vendor = self.require_vendor(&self.database, invoice.vendor_id).await?;
        let vendor = Vendor::try_from(vendor)?;
        Ok(VendorGate {
            vendor_pending: vendor.status == VendorStatus::PendingApproval,
            vendor,
        })
    }

    /// Approves a vendor and one of its invoices as a single unit.
    ///
    /// Both rows are re-read and re-checked inside the transaction; if either
    /// was resolved by a concurrent reviewer the whole operation fails and
    /// nothing changes. A half-approved pair is never observable.
    pub async fn approve_invoice_with_vendor(
        &self,
        invoice_id: i32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;

        let (creator, vendor_id, vendor_name, number) = with_tx!(self, |db_tx| {
            let invoice = self.require_invoice(&db_tx, invoice_id).await?;
            if invoice.archived {
                return Err(EngineError::StateConflict(
                    "invoice is archived".to_string(),
                ));
            }
            if InvoiceStatus::try_from(invoice.status.as_str())? != InvoiceStatus::PendingApproval
            {
                return Err(EngineError::StateConflict(
                    "invoice is not pending approval".to_string(),
                ));
            }

            let vendor = self.require_vendor(&db_tx, invoice.vendor_id).await?;
            if VendorStatus::try_from(vendor.status.as_str())? != VendorStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "vendor is not pending approval".to_string(),
                ));
            }

            let vendor_active = vendors::ActiveModel {
                id: ActiveValue::Set(vendor.id),
                status: ActiveValue::Set(VendorStatus::Approved.as_str().to_string()),
                approved_by: ActiveValue::Set(Some(actor.id)),
                approved_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            vendor_active.update(&db_tx).await?;

            let invoice_active = invoices::ActiveModel {
                id: ActiveValue::Set(invoice.id),
                status: ActiveValue::Set(InvoiceStatus::Unpaid.as_str().to_string()),
                ..Default::default()
            };
            invoice_active.update(&db_tx).await?;

            Ok((
                invoice.created_by,
                vendor.id,
                vendor.name,
                invoice.invoice_number,
            ))
        })?;

        // The combined audit entry exists only once the transaction holds.
        tracing::info!(
            "vendor {vendor_id} ({vendor_name}) and invoice {invoice_id} ({number}) approved jointly by user {}",
            actor.id
        );
        self.dispatch(
            Notification::new(NotificationKind::InvoiceApproved, creator, invoice_id).context(
                json!({
                    "invoice_number": number,
                    "vendor_approved": true,
                }),
            ),
        );
        Ok(())
    }

    /// Returns a single vendor.
    pub async fn vendor(&self, vendor_id: i32) -> ResultEngine<Vendor> {
        let model = self.require_vendor(&self.database, vendor_id).await?;
        Vendor::try_from(model)
    }
}
