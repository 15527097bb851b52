//! Payment recording, review and the settlement reconciler.
//!
//! Only approved payments move money: the settlement summary derives the
//! remaining balance and the `partial`/`paid` classification at read time.
//! Mutating paths recompute the authoritative totals inside their own
//! transaction instead of trusting an earlier read.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};

use crate::{
    Actor, EngineError, InvoiceStatus, Payment, PaymentStatus, RecordPaymentCmd, ResultEngine,
    VendorStatus, invoices, payments, tds,
};

use super::{
    Engine,
    access::{require_actor, require_privileged},
    normalize_optional_text, with_tx,
};

/// Read-time reconciliation of an invoice against its approved payments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementSummary {
    pub invoice_id: i32,
    pub approved_total_minor: i64,
    /// `max(0, amount - approved total)`; never negative.
    pub remaining_balance_minor: i64,
    /// Persisted status, overridden to `partial`/`paid` by approved money.
    pub derived_status: InvoiceStatus,
    /// True when a payment still awaits review — flagged separately so a
    /// worklist can distinguish payment review from invoice review.
    pub has_pending_payment: bool,
}

/// `paid` needs at least one approved payment; `partial` needs some money in;
/// every other persisted status governs untouched.
pub(super) fn derive_status(
    persisted: InvoiceStatus,
    amount_minor: i64,
    approved_total_minor: i64,
    approved_count: i64,
) -> InvoiceStatus {
    if persisted != InvoiceStatus::Unpaid {
        return persisted;
    }
    if approved_count > 0 && approved_total_minor >= amount_minor {
        InvoiceStatus::Paid
    } else if approved_total_minor > 0 {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Unpaid
    }
}

impl Engine {
    /// Records a settlement against an unpaid invoice.
    ///
    /// The TDS amount and rounding policy are computed from the invoice's
    /// settings *now* and frozen onto the payment row; later changes to the
    /// invoice never rewrite recorded payments. Privileged actors record
    /// directly in `approved`, everyone else awaits review.
    pub async fn record_payment(
        &self,
        cmd: RecordPaymentCmd,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        require_actor(actor)?;
        if cmd.amount_paid_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_paid_minor must be > 0".to_string(),
            ));
        }

        let model = with_tx!(self, |db_tx| {
            let invoice = self.require_invoice(&db_tx, cmd.invoice_id).await?;
            if invoice.archived {
                return Err(EngineError::StateConflict(
                    "invoice is archived".to_string(),
                ));
            }
            if InvoiceStatus::try_from(invoice.status.as_str())? != InvoiceStatus::Unpaid {
                return Err(EngineError::StateConflict(
                    "invoice is not open for payment".to_string(),
                ));
            }
            let vendor = self.require_vendor(&db_tx, invoice.vendor_id).await?;
            if VendorStatus::try_from(vendor.status.as_str())? != VendorStatus::Approved {
                return Err(EngineError::StateConflict(
                    "vendor is not approved".to_string(),
                ));
            }
            if let Some(payment_type_id) = cmd.payment_type_id {
                self.require_active_payment_type(&db_tx, payment_type_id)
                    .await?;
            }

            let (approved_total, _) = self.approved_payment_totals(&db_tx, invoice.id).await?;
            let remaining = (invoice.amount_minor - approved_total).max(0);
            if cmd.amount_paid_minor > remaining {
                return Err(EngineError::Validation(
                    "payment exceeds remaining balance".to_string(),
                ));
            }

            let rounding = tds::TdsRounding::try_from(invoice.tds_rounding.as_str())?;
            let rate = invoice
                .tds_applicable
                .then_some(invoice.tds_rate_percent)
                .flatten();
            let breakdown = tds::calculate(cmd.amount_paid_minor, rate, rounding);

            let (status, reviewed_by, reviewed_at) = if actor.is_privileged() {
                (PaymentStatus::Approved, Some(actor.id), Some(now))
            } else {
                (PaymentStatus::Pending, None, None)
            };

            let active = payments::ActiveModel {
                id: ActiveValue::NotSet,
                invoice_id: ActiveValue::Set(invoice.id),
                amount_paid_minor: ActiveValue::Set(cmd.amount_paid_minor),
                payment_date: ActiveValue::Set(cmd.payment_date),
                payment_type_id: ActiveValue::Set(cmd.payment_type_id),
                status: ActiveValue::Set(status.as_str().to_string()),
                tds_withheld_minor: ActiveValue::Set(breakdown.withheld_minor),
                tds_rounding: ActiveValue::Set(rounding.as_str().to_string()),
                reference: ActiveValue::Set(normalize_optional_text(cmd.reference.as_deref())),
                created_by: ActiveValue::Set(actor.id),
                created_at: ActiveValue::Set(now),
                reviewed_by: ActiveValue::Set(reviewed_by),
                reviewed_at: ActiveValue::Set(reviewed_at),
                rejection_note: ActiveValue::Set(None),
            };
            let model = active.insert(&db_tx).await?;
            Ok(model)
        })?;

        Payment::try_from(model)
    }

    /// Approves a pending payment. Review happens exactly once.
    pub async fn approve_payment(
        &self,
        payment_id: i32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;

        with_tx!(self, |db_tx| {
            let model = self.require_payment(&db_tx, payment_id).await?;
            if PaymentStatus::try_from(model.status.as_str())? != PaymentStatus::Pending {
                return Err(EngineError::StateConflict(
                    "payment already reviewed".to_string(),
                ));
            }
            let invoice = self.require_invoice(&db_tx, model.invoice_id).await?;
            if invoice.archived {
                return Err(EngineError::StateConflict(
                    "invoice is archived".to_string(),
                ));
            }

            let active = payments::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(PaymentStatus::Approved.as_str().to_string()),
                reviewed_by: ActiveValue::Set(Some(actor.id)),
                reviewed_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Rejects a pending payment, optionally with a reviewer note.
    pub async fn reject_payment(
        &self,
        payment_id: i32,
        note: Option<&str>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;

        with_tx!(self, |db_tx| {
            let model = self.require_payment(&db_tx, payment_id).await?;
            if PaymentStatus::try_from(model.status.as_str())? != PaymentStatus::Pending {
                return Err(EngineError::StateConflict(
                    "payment already reviewed".to_string(),
                ));
            }

            let active = payments::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(PaymentStatus::Rejected.as_str().to_string()),
                reviewed_by: ActiveValue::Set(Some(actor.id)),
                reviewed_at: ActiveValue::Set(Some(now)),
                rejection_note: ActiveValue::Set(normalize_optional_text(note)),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Reconciles one invoice against its payments.
    pub async fn invoice_settlement(&self, invoice_id: i32) -> ResultEngine<SettlementSummary> {
        let invoice = self.require_invoice(&self.database, invoice_id).await?;
        self.settlement_for(&self.database, &invoice).await
    }

    /// All payments recorded against an invoice, newest first.
    pub async fn invoice_payments(&self, invoice_id: i32) -> ResultEngine<Vec<Payment>> {
        self.require_invoice(&self.database, invoice_id).await?;
        let rows = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice_id))
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    pub(super) async fn require_payment<C: ConnectionTrait>(
        &self,
        db: &C,
        payment_id: i32,
    ) -> ResultEngine<payments::Model> {
        payments::Entity::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("payment".to_string()))
    }

    pub(super) async fn settlement_for<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice: &invoices::Model,
    ) -> ResultEngine<SettlementSummary> {
        let (approved_total, approved_count) =
            self.approved_payment_totals(db, invoice.id).await?;
        let persisted = InvoiceStatus::try_from(invoice.status.as_str())?;
        let has_pending_payment = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice.id))
            .filter(payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .one(db)
            .await?
            .is_some();

        Ok(SettlementSummary {
            invoice_id: invoice.id,
            approved_total_minor: approved_total,
            remaining_balance_minor: (invoice.amount_minor - approved_total).max(0),
            derived_status: derive_status(
                persisted,
                invoice.amount_minor,
                approved_total,
                approved_count,
            ),
            has_pending_payment,
        })
    }

    /// `(sum, count)` of approved payments for one invoice.
    pub(super) async fn approved_payment_totals<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice_id: i32,
    ) -> ResultEngine<(i64, i64)> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_paid_minor), 0) AS sum, COUNT(*) AS cnt \
             FROM payments \
             WHERE invoice_id = ? AND status = ?",
            vec![
                invoice_id.into(),
                PaymentStatus::Approved.as_str().into(),
            ],
        );
        let row = db.query_one(stmt).await?;
        let total = row
            .as_ref()
            .and_then(|r| r.try_get("", "sum").ok())
            .unwrap_or(0);
        let count = row
            .as_ref()
            .and_then(|r| r.try_get("", "cnt").ok())
            .unwrap_or(0);
        Ok((total, count))
    }
}
