//! The generic propose → review workflow for master data.
//!
//! One implementation serves vendors, categories, payment types, invoice
//! profiles and invoice-archive actions. Approval materializes the target
//! entity in the same transaction that stamps the request; bulk operations
//! apply the single-item path per id and tolerate individual failures.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde_json::{Value, json};

use crate::{
    Actor, EngineError, MasterDataRequest, RequestPayload, RequestStatus, ResultEngine,
    VendorStatus, categories, invoice_profiles, payment_types, requests, vendors,
    notify::{Notification, NotificationKind},
};

use super::{
    Engine,
    access::{require_actor, require_privileged},
    archive::AttachmentMove,
    normalize_name_key, normalize_optional_text, normalize_required_name, with_tx,
};

/// Result of a best-effort batch: one count per side, never an abort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: u32,
    pub failed: u32,
}

/// File work an approved archive request leaves for after commit.
type ArchiveSideEffect = (i32, Vec<AttachmentMove>, Value);

impl Engine {
    /// Files a proposal for admin review.
    ///
    /// Targets with single-flight semantics (archive requests) reject a
    /// second pending proposal. A resubmission references the rejected
    /// attempt it supersedes.
    pub async fn submit_request(
        &self,
        payload: RequestPayload,
        previous_attempt_id: Option<i32>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<MasterDataRequest> {
        require_actor(actor)?;
        self.validate_payload(&payload)?;

        let entity_type = payload.entity_type();
        let target_ref = payload.target_ref();
        let encoded = payload.encode()?;

        let model = with_tx!(self, |db_tx| {
            if let RequestPayload::InvoiceArchive { invoice_id, .. } = &payload {
                let invoice = self.require_invoice(&db_tx, *invoice_id).await?;
                if invoice.archived {
                    return Err(EngineError::StateConflict(
                        "invoice is already archived".to_string(),
                    ));
                }
            }

            if let Some(target) = &target_ref {
                let pending = requests::Entity::find()
                    .filter(requests::Column::EntityType.eq(entity_type.as_str()))
                    .filter(requests::Column::TargetRef.eq(target.clone()))
                    .filter(
                        requests::Column::Status.eq(RequestStatus::PendingApproval.as_str()),
                    )
                    .one(&db_tx)
                    .await?;
                if pending.is_some() {
                    return Err(EngineError::StateConflict(
                        "a request is already pending for this target".to_string(),
                    ));
                }
            }

            let resubmission_count = match previous_attempt_id {
                Some(prev_id) => {
                    let prev = self.require_request(&db_tx, prev_id).await?;
                    if prev.entity_type != entity_type.as_str() {
                        return Err(EngineError::Validation(
                            "resubmission must match the original entity type".to_string(),
                        ));
                    }
                    if RequestStatus::try_from(prev.status.as_str())? != RequestStatus::Rejected {
                        return Err(EngineError::StateConflict(
                            "only rejected requests can be resubmitted".to_string(),
                        ));
                    }
                    prev.resubmission_count + 1
                }
                None => 0,
            };

            let active = requests::ActiveModel {
                id: ActiveValue::NotSet,
                entity_type: ActiveValue::Set(entity_type.as_str().to_string()),
                status: ActiveValue::Set(RequestStatus::PendingApproval.as_str().to_string()),
                payload: ActiveValue::Set(encoded.clone()),
                target_ref: ActiveValue::Set(target_ref.clone()),
                requested_by: ActiveValue::Set(actor.id),
                reviewed_by: ActiveValue::Set(None),
                reviewed_at: ActiveValue::Set(None),
                review_notes: ActiveValue::Set(None),
                admin_edits: ActiveValue::Set(None),
                rejection_reason: ActiveValue::Set(None),
                resubmission_count: ActiveValue::Set(resubmission_count),
                previous_attempt_id: ActiveValue::Set(previous_attempt_id),
                superseded_by_id: ActiveValue::Set(None),
                created_entity_id: ActiveValue::Set(None),
                created_at: ActiveValue::Set(now),
            };
            let model = active.insert(&db_tx).await?;
            Ok(model)
        })?;

        MasterDataRequest::try_from(model)
    }

    /// Approves a request, materializing the proposed entity.
    ///
    /// Reviewer edits are merged over the proposal (edits win) before
    /// materialization. Approving a resubmission stamps the predecessor's
    /// `superseded_by_id`; the predecessor's own status stays `rejected`.
    pub async fn approve_request(
        &self,
        request_id: i32,
        admin_edits: Option<Value>,
        notes: Option<&str>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<MasterDataRequest> {
        require_privileged(actor)?;

        let (model, side_effect) = with_tx!(self, |db_tx| {
            let model = self.require_request(&db_tx, request_id).await?;
            if RequestStatus::try_from(model.status.as_str())? != RequestStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "request already reviewed".to_string(),
                ));
            }

            let payload = RequestPayload::decode(&model.payload)?;
            let effective = match &admin_edits {
                Some(edits) => payload.merged_with(edits)?,
                None => payload,
            };
            self.validate_payload(&effective)?;

            let (created_entity_id, side_effect) = self
                .materialize_request(&db_tx, &effective, model.requested_by, actor, now)
                .await?;

            let active = requests::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(RequestStatus::Approved.as_str().to_string()),
                reviewed_by: ActiveValue::Set(Some(actor.id)),
                reviewed_at: ActiveValue::Set(Some(now)),
                review_notes: ActiveValue::Set(normalize_optional_text(notes)),
                admin_edits: ActiveValue::Set(admin_edits.clone()),
                created_entity_id: ActiveValue::Set(Some(created_entity_id)),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;

            if let Some(prev_id) = model.previous_attempt_id {
                let predecessor = requests::ActiveModel {
                    id: ActiveValue::Set(prev_id),
                    superseded_by_id: ActiveValue::Set(Some(model.id)),
                    ..Default::default()
                };
                predecessor.update(&db_tx).await?;
            }

            Ok((updated, side_effect))
        })?;

        if let Some((invoice_id, moves, manifest)) = side_effect {
            self.perform_attachment_moves(invoice_id, moves, manifest)
                .await;
        }

        self.dispatch(
            Notification::new(
                NotificationKind::RequestApproved,
                model.requested_by,
                model.id,
            )
            .context(json!({
                "entity_type": model.entity_type.clone(),
                "created_entity_id": model.created_entity_id,
            })),
        );

        MasterDataRequest::try_from(model)
    }

    /// Rejects a request with a substantive reason.
    pub async fn reject_request(
        &self,
        request_id: i32,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let reason = self.normalize_reason(reason, "rejection")?;

        let (requester, subject) = with_tx!(self, |db_tx| {
            let model = self.require_request(&db_tx, request_id).await?;
            if RequestStatus::try_from(model.status.as_str())? != RequestStatus::PendingApproval {
                return Err(EngineError::StateConflict(
                    "request already reviewed".to_string(),
                ));
            }

            let active = requests::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(RequestStatus::Rejected.as_str().to_string()),
                reviewed_by: ActiveValue::Set(Some(actor.id)),
                reviewed_at: ActiveValue::Set(Some(now)),
                rejection_reason: ActiveValue::Set(Some(reason.clone())),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok((model.requested_by, model.id))
        })?;

        self.dispatch(
            Notification::new(NotificationKind::RequestRejected, requester, subject)
                .context(json!({ "reason": reason })),
        );
        Ok(())
    }

    /// Approves each request in turn; one bad item never blocks the rest.
    pub async fn bulk_approve_requests(
        &self,
        request_ids: &[i32],
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &request_id in request_ids {
            match self.approve_request(request_id, None, None, actor, now).await {
                Ok(_) => outcome.succeeded += 1,
                Err(err) => {
                    tracing::warn!("skipping request {request_id} in bulk approve: {err}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Rejects each request in turn; one bad item never blocks the rest.
    pub async fn bulk_reject_requests(
        &self,
        request_ids: &[i32],
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &request_id in request_ids {
            match self.reject_request(request_id, reason, actor, now).await {
                Ok(()) => outcome.succeeded += 1,
                Err(err) => {
                    tracing::warn!("skipping request {request_id} in bulk reject: {err}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Returns a single request.
    pub async fn request(&self, request_id: i32) -> ResultEngine<MasterDataRequest> {
        let model = self.require_request(&self.database, request_id).await?;
        MasterDataRequest::try_from(model)
    }

    /// The admin review queue, oldest first.
    pub async fn pending_requests(&self) -> ResultEngine<Vec<MasterDataRequest>> {
        let rows = requests::Entity::find()
            .filter(requests::Column::Status.eq(RequestStatus::PendingApproval.as_str()))
            .order_by_asc(requests::Column::CreatedAt)
            .order_by_asc(requests::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter().map(MasterDataRequest::try_from).collect()
    }

    fn validate_payload(&self, payload: &RequestPayload) -> ResultEngine<()> {
        match payload {
            RequestPayload::Vendor { name, .. } => {
                normalize_required_name(name, "vendor")?;
            }
            RequestPayload::Category { name, .. } => {
                normalize_required_name(name, "category")?;
            }
            RequestPayload::PaymentType { name } => {
                normalize_required_name(name, "payment type")?;
            }
            RequestPayload::InvoiceProfile { name, .. } => {
                normalize_required_name(name, "invoice profile")?;
            }
            RequestPayload::InvoiceArchive { reason, .. } => {
                self.normalize_reason(reason, "archive")?;
            }
        }
        Ok(())
    }

    /// Dispatches on the payload variant and creates the target entity.
    ///
    /// Missing required foreign keys fall back to the first active row.
    async fn materialize_request(
        &self,
        db_tx: &DatabaseTransaction,
        payload: &RequestPayload,
        requested_by: i32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<(i32, Option<ArchiveSideEffect>)> {
        match payload {
            RequestPayload::Vendor {
                name,
                address,
                tax_exempt,
                bank_name,
                bank_account,
            } => {
                let name = normalize_required_name(name, "vendor")?;
                let name_norm = normalize_name_key(&name);
                let exists = vendors::Entity::find()
                    .filter(vendors::Column::NameNorm.eq(name_norm.clone()))
                    .filter(vendors::Column::DeletedAt.is_null())
                    .one(db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(name));
                }

                let active = vendors::ActiveModel {
                    id: ActiveValue::NotSet,
                    name: ActiveValue::Set(name.clone()),
                    name_norm: ActiveValue::Set(name_norm),
                    address: ActiveValue::Set(normalize_optional_text(address.as_deref())),
                    tax_exempt: ActiveValue::Set(*tax_exempt),
                    bank_name: ActiveValue::Set(normalize_optional_text(bank_name.as_deref())),
                    bank_account: ActiveValue::Set(normalize_optional_text(
                        bank_account.as_deref(),
                    )),
                    status: ActiveValue::Set(VendorStatus::Approved.as_str().to_string()),
                    created_by: ActiveValue::Set(requested_by),
                    approved_by: ActiveValue::Set(Some(actor.id)),
                    approved_at: ActiveValue::Set(Some(now)),
                    rejection_reason: ActiveValue::Set(None),
                    deleted_at: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                };
                let model = active.insert(db_tx).await?;
                Ok((model.id, None))
            }
            RequestPayload::Category { name, description } => {
                let name = normalize_required_name(name, "category")?;
                let name_norm = normalize_name_key(&name);
                let exists = categories::Entity::find()
                    .filter(categories::Column::NameNorm.eq(name_norm.clone()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(name));
                }

                let active = categories::ActiveModel {
                    id: ActiveValue::NotSet,
                    name: ActiveValue::Set(name),
                    name_norm: ActiveValue::Set(name_norm),
                    description: ActiveValue::Set(normalize_optional_text(
                        description.as_deref(),
                    )),
                    active: ActiveValue::Set(true),
                };
                let model = active.insert(db_tx).await?;
                Ok((model.id, None))
            }
            RequestPayload::PaymentType { name } => {
                let name = normalize_required_name(name, "payment type")?;
                let name_norm = normalize_name_key(&name);
                let exists = payment_types::Entity::find()
                    .filter(payment_types::Column::NameNorm.eq(name_norm.clone()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(name));
                }

                let active = payment_types::ActiveModel {
                    id: ActiveValue::NotSet,
                    name: ActiveValue::Set(name),
                    name_norm: ActiveValue::Set(name_norm),
                    active: ActiveValue::Set(true),
                };
                let model = active.insert(db_tx).await?;
                Ok((model.id, None))
            }
            RequestPayload::InvoiceProfile {
                name,
                category_id,
                day_of_month,
            } => {
                let name = normalize_required_name(name, "invoice profile")?;
                let name_norm = normalize_name_key(&name);
                let exists = invoice_profiles::Entity::find()
                    .filter(invoice_profiles::Column::NameNorm.eq(name_norm.clone()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(name));
                }

                let category_id = match category_id {
                    Some(category_id) => {
                        self.require_active_category(db_tx, *category_id).await?.id
                    }
                    None => {
                        // Sensible default: the first active category.
                        categories::Entity::find()
                            .filter(categories::Column::Active.eq(true))
                            .order_by_asc(categories::Column::Id)
                            .one(db_tx)
                            .await?
                            .ok_or_else(|| {
                                EngineError::Validation(
                                    "no active category available for the profile".to_string(),
                                )
                            })?
                            .id
                    }
                };

                let active = invoice_profiles::ActiveModel {
                    id: ActiveValue::NotSet,
                    name: ActiveValue::Set(name),
                    name_norm: ActiveValue::Set(name_norm),
                    category_id: ActiveValue::Set(category_id),
                    day_of_month: ActiveValue::Set(*day_of_month),
                    active: ActiveValue::Set(true),
                };
                let model = active.insert(db_tx).await?;
                Ok((model.id, None))
            }
            RequestPayload::InvoiceArchive { invoice_id, reason } => {
                let invoice = self.require_invoice(db_tx, *invoice_id).await?;
                let (moves, manifest) = self
                    .archive_invoice_in_tx(db_tx, &invoice, reason, actor.id, now)
                    .await?;
                Ok((invoice.id, Some((invoice.id, moves, manifest))))
            }
        }
    }
}
