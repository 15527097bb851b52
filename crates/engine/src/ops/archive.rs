//! Archival and permanent deletion.
//!
//! Archiving freezes an invoice and relocates its files into an archival
//! area; a failed file move is logged and skipped, never a reason to abort —
//! files are never destroyed, at worst left in place. Permanent deletion is
//! the only true delete in the model and is reserved for the highest tier.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, Statement, TransactionTrait,
    prelude::*,
};
use serde_json::json;

use crate::{
    Actor, EngineError, MasterDataRequest, RequestPayload, ResultEngine, attachments,
    deletion_log, invoices,
};

use super::{
    Engine,
    access::{require_actor, require_privileged, require_super_admin},
    with_tx,
};

/// One pending file relocation, executed after the owning transaction
/// commits.
pub(super) struct AttachmentMove {
    pub(super) attachment_id: i32,
    pub(super) source: String,
    pub(super) destination: String,
}

impl Engine {
    /// Archives an invoice directly (privileged path).
    pub async fn archive_invoice(
        &self,
        invoice_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let reason = self.normalize_reason(reason, "archive")?;

        let (moves, manifest) = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;
            self.archive_invoice_in_tx(&db_tx, &model, &reason, actor.id, now)
                .await
        })?;

        self.perform_attachment_moves(invoice_id, moves, manifest)
            .await;
        Ok(())
    }

    /// Files an archive request for later admin review (non-privileged path).
    ///
    /// At most one pending request may exist per invoice.
    pub async fn request_invoice_archive(
        &self,
        invoice_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<MasterDataRequest> {
        require_actor(actor)?;
        let reason = self.normalize_reason(reason, "archive")?;
        self.submit_request(
            RequestPayload::InvoiceArchive { invoice_id, reason },
            None,
            actor,
            now,
        )
        .await
    }

    /// Irreversibly removes an invoice and everything hanging off it.
    ///
    /// Attachments are first relocated to the deleted area and a tombstone is
    /// written while the invoice row still exists; dependent payments,
    /// attachments and comments then fall in one transaction with the row.
    pub async fn permanently_delete_invoice(
        &self,
        invoice_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_super_admin(actor)?;
        let reason = self.normalize_reason(reason, "deletion")?;

        let files = with_tx!(self, |db_tx| {
            let model = self.require_invoice(&db_tx, invoice_id).await?;

            let tombstone = deletion_log::ActiveModel {
                id: ActiveValue::NotSet,
                invoice_id: ActiveValue::Set(model.id),
                invoice_number: ActiveValue::Set(model.invoice_number.clone()),
                vendor_id: ActiveValue::Set(model.vendor_id),
                reason: ActiveValue::Set(reason.clone()),
                deleted_by: ActiveValue::Set(actor.id),
                deleted_at: ActiveValue::Set(now),
            };
            tombstone.insert(&db_tx).await?;

            let files = attachments::Entity::find()
                .filter(attachments::Column::InvoiceId.eq(model.id))
                .all(&db_tx)
                .await?;
            Ok(files)
        })?;

        for file in files {
            let destination = format!("deleted/{invoice_id}/{}", file.file_name);
            if let Err(err) = self.attachments.relocate(&file.storage_path, &destination) {
                tracing::warn!(
                    "leaving attachment {} in place during delete of invoice {invoice_id}: {err}",
                    file.storage_path
                );
            }
        }

        with_tx!(self, |db_tx| {
            let backend = db_tx.get_database_backend();
            for table in ["payments", "attachments", "comments"] {
                db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        format!("DELETE FROM {table} WHERE invoice_id = ?;"),
                        vec![invoice_id.into()],
                    ))
                    .await?;
            }
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM invoices WHERE id = ?;",
                    vec![invoice_id.into()],
                ))
                .await?;
            Ok(())
        })
    }

    /// Flags the invoice archived and plans the file relocations; shared by
    /// the direct path and the approved archive request.
    pub(super) async fn archive_invoice_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        model: &invoices::Model,
        reason: &str,
        actor_id: i32,
        now: DateTime<Utc>,
    ) -> ResultEngine<(Vec<AttachmentMove>, serde_json::Value)> {
        if model.archived {
            return Err(EngineError::StateConflict(
                "invoice is already archived".to_string(),
            ));
        }

        let active = invoices::ActiveModel {
            id: ActiveValue::Set(model.id),
            archived: ActiveValue::Set(true),
            archived_by: ActiveValue::Set(Some(actor_id)),
            archived_at: ActiveValue::Set(Some(now)),
            archive_reason: ActiveValue::Set(Some(reason.to_string())),
            ..Default::default()
        };
        active.update(db_tx).await?;

        let files = attachments::Entity::find()
            .filter(attachments::Column::InvoiceId.eq(model.id))
            .all(db_tx)
            .await?;
        let moves = files
            .into_iter()
            .map(|file| AttachmentMove {
                attachment_id: file.id,
                destination: format!("archive/{}/{}", model.id, file.file_name),
                source: file.storage_path,
            })
            .collect();

        let manifest = json!({
            "invoice_id": model.id,
            "invoice_number": model.invoice_number,
            "vendor_id": model.vendor_id,
            "amount_minor": model.amount_minor,
            "currency_code": model.currency_code,
            "archived_by": actor_id,
            "archived_at": now,
            "reason": reason,
        });
        Ok((moves, manifest))
    }

    /// Best-effort relocation pass, run strictly after commit. A move that
    /// fails keeps its row's original path.
    pub(super) async fn perform_attachment_moves(
        &self,
        invoice_id: i32,
        moves: Vec<AttachmentMove>,
        manifest: serde_json::Value,
    ) {
        for planned in moves {
            match self.attachments.relocate(&planned.source, &planned.destination) {
                Ok(()) => {
                    let active = attachments::ActiveModel {
                        id: ActiveValue::Set(planned.attachment_id),
                        storage_path: ActiveValue::Set(planned.destination),
                        ..Default::default()
                    };
                    if let Err(err) = active.update(&self.database).await {
                        tracing::warn!(
                            "failed to record new path for attachment {}: {err}",
                            planned.attachment_id
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        "leaving attachment {} in place during archive of invoice {invoice_id}: {err}",
                        planned.source
                    );
                }
            }
        }

        let destination = format!("archive/{invoice_id}/invoice.json");
        let bytes = manifest.to_string().into_bytes();
        if let Err(err) = self.attachments.write(&bytes, &destination) {
            tracing::warn!("failed to write archive manifest for invoice {invoice_id}: {err}");
        }
    }
}
