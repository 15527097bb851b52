//! Invoice lifecycle transitions.
//!
//! Persisted states move `pending_approval -> {unpaid, rejected}` and
//! `unpaid <-> on_hold`; `partial`/`paid` are derived from approved payments
//! and never written. Every transition re-checks the current state inside its
//! transaction, so two racing reviewers cannot both win.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use serde_json::json;

use crate::{
    Actor, EngineError, Invoice, InvoiceStatus, ResultEngine, SubmitInvoiceCmd, UpdateInvoiceCmd,
    VendorStatus, invoices,
    notify::{Notification, NotificationKind},
};

use super::{
    Engine,
    access::{require_actor, require_privileged},
    with_tx,
};

fn validate_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::Validation(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_tds_rate(rate_percent: Option<i64>) -> ResultEngine<()> {
    if let Some(rate) = rate_percent
        && !(0..=100).contains(&rate)
    {
        return Err(EngineError::Validation(
            "TDS rate must be between 0 and 100 percent".to_string(),
        ));
    }
    Ok(())
}

fn ensure_not_archived(model: &invoices::Model) -> ResultEngine<()> {
    if model.archived {
        return Err(EngineError::StateConflict(
            "invoice is archived".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Creates an invoice.
    ///
    /// Privileged actors create directly in `unpaid`; everyone else starts in
    /// `pending_approval` and the active admins are notified.
    pub async fn submit_invoice(
        &self,
        cmd: SubmitInvoiceCmd,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Invoice> {
        require_actor(actor)?;

        let invoice_number = cmd.invoice_number.trim().to_string();
        if invoice_number.is_empty() {
            return Err(EngineError::Validation(
                "invoice number must not be empty".to_string(),
            ));
        }
        validate_amount(cmd.amount_minor)?;
        validate_tds_rate(cmd.tds_rate_percent)?;

        let status = if actor.is_privileged() {
            InvoiceStatus::Unpaid
        } else {
            InvoiceStatus::PendingApproval
        };

        let (model, admin_ids) = with_tx!(self, |db_tx| {
            self.require_vendor(&db_tx, cmd.vendor_id).await?;
            self.require_active_currency(&db_tx, &cmd.currency_code)
                .await?;
            if let Some(category_id) = cmd.category_id {
                self.require_active_category(&db_tx, category_id).await?;
            }
            if let Some(profile_id) = cmd.profile_id {
                self.require_active_profile(&db_tx, profile_id).await?;
            }
            self.ensure_unique_invoice_number(&db_tx, cmd.vendor_id, &invoice_number, None)
                .await?;

            let active = invoices::ActiveModel {
                id: ActiveValue::NotSet,
                invoice_number: ActiveValue::Set(invoice_number.clone()),
                vendor_id: ActiveValue::Set(cmd.vendor_id),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                currency_code: ActiveValue::Set(cmd.currency_code.clone()),
                status: ActiveValue::Set(status.as_str().to_string()),
                invoice_date: ActiveValue::Set(cmd.invoice_date),
                due_date: ActiveValue::Set(cmd.due_date),
                period_start: ActiveValue::Set(cmd.period_start),
                period_end: ActiveValue::Set(cmd.period_end),
                category_id: ActiveValue::Set(cmd.category_id),
                profile_id: ActiveValue::Set(cmd.profile_id),
                tds_applicable: ActiveValue::Set(cmd.tds_rate_percent.is_some()),
                tds_rate_percent: ActiveValue::Set(cmd.tds_rate_percent),
                tds_rounding: ActiveValue::Set(cmd.tds_rounding.as_str().to_string()),
                archived: ActiveValue::Set(false),
                archived_by: ActiveValue::Set(None),
                archived_at: ActiveValue::Set(None),
                archive_reason: ActiveValue::Set(None),
                held_by: ActiveValue::Set(None),
                held_at: ActiveValue::Set(None),
                hold_reason: ActiveValue::Set(None),
                rejected_by: ActiveValue::Set(None),
                rejected_at: ActiveValue::Set(None),
                rejection_reason: ActiveValue::Set(None),
                created_by: ActiveValue::Set(actor.id),
                created_at: ActiveValue::Set(now),
            };
            let model = active.insert(&db_tx).await?;

            let admin_ids = if status == InvoiceStatus::PendingApproval {
                self.active_admin_ids(&db_tx).await?
            } else {
                Vec::new()
            };
            Ok((model, admin_ids))
        })?;

        let context = json!({
            "invoice_number": model.invoice_number.clone(),
            "vendor_id": model.vendor_id,
            "amount_minor": model.amount_minor,
        });
        for admin_id in admin_ids {
            self.dispatch(
                Notification::new(NotificationKind::InvoicePendingApproval, admin_id, model.id)
                    .context(context.clone()),
            );
        }

        Invoice::try_from(model)
    }

    /// Edits an invoice.
    ///
    /// Archived invoices are immutable. A non-privileged edit to anything
    /// other than a `pending_approval` invoice forces the status back to
    /// `pending_approval` — changed content requires re-review.
    pub async fn update_invoice(
        &self,
        cmd: UpdateInvoiceCmd,
        actor: &Actor,
    ) -> ResultEngine<Invoice> {
        require_actor(actor)?;
        if let Some(amount) = cmd.amount_minor {
            validate_amount(amount)?;
        }
        validate_tds_rate(cmd.tds_rate_percent)?;

        let model = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, cmd.invoice_id).await?;
            ensure_not_archived(&model)?;
            let current = InvoiceStatus::try_from(model.status.as_str())?;

            let mut active = invoices::ActiveModel {
                id: ActiveValue::Set(model.id),
                ..Default::default()
            };

            if let Some(number) = &cmd.invoice_number {
                let number = number.trim().to_string();
                if number.is_empty() {
                    return Err(EngineError::Validation(
                        "invoice number must not be empty".to_string(),
                    ));
                }
                if number != model.invoice_number {
                    self.ensure_unique_invoice_number(
                        &db_tx,
                        model.vendor_id,
                        &number,
                        Some(model.id),
                    )
                    .await?;
                    active.invoice_number = ActiveValue::Set(number);
                }
            }
            if let Some(amount) = cmd.amount_minor {
                active.amount_minor = ActiveValue::Set(amount);
            }
            if let Some(code) = &cmd.currency_code {
                self.require_active_currency(&db_tx, code).await?;
                active.currency_code = ActiveValue::Set(code.clone());
            }
            if let Some(invoice_date) = cmd.invoice_date {
                active.invoice_date = ActiveValue::Set(invoice_date);
            }
            if let Some(due_date) = cmd.due_date {
                active.due_date = ActiveValue::Set(Some(due_date));
            }
            if let Some(category_id) = cmd.category_id {
                self.require_active_category(&db_tx, category_id).await?;
                active.category_id = ActiveValue::Set(Some(category_id));
            }
            if let Some(profile_id) = cmd.profile_id {
                self.require_active_profile(&db_tx, profile_id).await?;
                active.profile_id = ActiveValue::Set(Some(profile_id));
            }
            if let Some(rate) = cmd.tds_rate_percent {
                active.tds_applicable = ActiveValue::Set(true);
                active.tds_rate_percent = ActiveValue::Set(Some(rate));
            }
            if let Some(rounding) = cmd.tds_rounding {
                active.tds_rounding = ActiveValue::Set(rounding.as_str().to_string());
            }

            if !actor.is_privileged() && current != InvoiceStatus::PendingApproval {
                active.status =
                    ActiveValue::Set(InvoiceStatus::PendingApproval.as_str().to_string());
                // Resubmission wipes the old verdict.
                active.rejected_by = ActiveValue::Set(None);
                active.rejected_at = ActiveValue::Set(None);
                active.rejection_reason = ActiveValue::Set(None);
            }

            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })?;

        Invoice::try_from(model)
    }

    /// Puts an unpaid invoice on hold, notifying its creator.
    pub async fn hold_invoice(
        &self,
        invoice_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let reason = self.normalize_reason(reason, "hold")?;

        let (creator, subject) = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;
            ensure_not_archived(&model)?;
            match InvoiceStatus::try_from(model.status.as_str())? {
                InvoiceStatus::OnHold => {
                    return Err(EngineError::StateConflict(
                        "invoice is already on hold".to_string(),
                    ));
                }
                InvoiceStatus::Unpaid => {}
                _ => {
                    return Err(EngineError::StateConflict(
                        "only unpaid invoices can be put on hold".to_string(),
                    ));
                }
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(InvoiceStatus::OnHold.as_str().to_string()),
                held_by: ActiveValue::Set(Some(actor.id)),
                held_at: ActiveValue::Set(Some(now)),
                hold_reason: ActiveValue::Set(Some(reason.clone())),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok((model.created_by, model.id))
        })?;

        self.dispatch(
            Notification::new(NotificationKind::InvoicePutOnHold, creator, subject)
                .context(json!({ "reason": reason })),
        );
        Ok(())
    }

    /// Releases a hold, returning the invoice to `unpaid`.
    pub async fn release_invoice_hold(&self, invoice_id: i32, actor: &Actor) -> ResultEngine<()> {
        require_privileged(actor)?;

        with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;
            ensure_not_archived(&model)?;
            if InvoiceStatus::try_from(model.status.as_str())? != InvoiceStatus::OnHold {
                return Err(EngineError::StateConflict(
                    "invoice is not on hold".to_string(),
                ));
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(InvoiceStatus::Unpaid.as_str().to_string()),
                held_by: ActiveValue::Set(None),
                held_at: ActiveValue::Set(None),
                hold_reason: ActiveValue::Set(None),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Approves a `pending_approval` invoice whose vendor is already vetted.
    ///
    /// A vendor still in review requires the joint path
    /// (`approve_invoice_with_vendor`); a rejected vendor blocks approval
    /// outright.
    pub async fn approve_invoice(&self, invoice_id: i32, actor: &Actor) -> ResultEngine<()> {
        require_privileged(actor)?;

        let (creator, subject, number) = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;
            ensure_not_archived(&model)?;
            if InvoiceStatus::try_from(model.status.as_str())? != InvoiceStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "invoice is not pending approval".to_string(),
                ));
            }

            let vendor = self.require_vendor(&db_tx, model.vendor_id).await?;
            match VendorStatus::try_from(vendor.status.as_str())? {
                VendorStatus::PendingApproval => {
                    return Err(EngineError::StateConflict(
                        "vendor approval required".to_string(),
                    ));
                }
                VendorStatus::Rejected => {
                    return Err(EngineError::StateConflict("vendor is rejected".to_string()));
                }
                VendorStatus::Approved => {}
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(InvoiceStatus::Unpaid.as_str().to_string()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok((model.created_by, model.id, model.invoice_number))
        })?;

        self.dispatch(
            Notification::new(NotificationKind::InvoiceApproved, creator, subject)
                .context(json!({ "invoice_number": number })),
        );
        Ok(())
    }

    /// Rejects a `pending_approval` invoice, stamping the verdict.
    pub async fn reject_invoice(
        &self,
        invoice_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let reason = self.normalize_reason(reason, "rejection")?;

        let (creator, subject) = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;
            ensure_not_archived(&model)?;
            if InvoiceStatus::try_from(model.status.as_str())? != InvoiceStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "invoice is not pending approval".to_string(),
                ));
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(InvoiceStatus::Rejected.as_str().to_string()),
                rejected_by: ActiveValue::Set(Some(actor.id)),
                rejected_at: ActiveValue::Set(Some(now)),
                rejection_reason: ActiveValue::Set(Some(reason.clone())),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok((model.created_by, model.id))
        })?;

        self.dispatch(
            Notification::new(NotificationKind::InvoiceRejected, creator, subject)
                .context(json!({ "reason": reason })),
        );
        Ok(())
    }

    /// Returns a single invoice.
    pub async fn invoice(&self, invoice_id: i32) -> ResultEngine<Invoice> {
        let model = self.require_invoice(&self.database, invoice_id).await?;
        Invoice::try_from(model)
    }
}
