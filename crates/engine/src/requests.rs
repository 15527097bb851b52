//! Master-data change requests.
//!
//! One generic propose → review workflow covers vendors, categories, payment
//! types, invoice profiles and invoice-archive actions. The proposal travels
//! as a tagged JSON payload, decoded into [`RequestPayload`] at the workflow
//! boundary — nothing downstream ever sees opaque text. A resubmission links
//! back to the attempt it supersedes; approving it stamps the predecessor's
//! `superseded_by_id` without touching the predecessor's own status, so the
//! audit chain stays traceable.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EngineError;

/// Workflow state; `pending_approval` terminates in one of the other two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid request status: {other}"
            ))),
        }
    }
}

/// Discriminant of the proposed entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEntityType {
    Vendor,
    Category,
    PaymentType,
    InvoiceProfile,
    InvoiceArchive,
}

impl RequestEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Category => "category",
            Self::PaymentType => "payment_type",
            Self::InvoiceProfile => "invoice_profile",
            Self::InvoiceArchive => "invoice_archive",
        }
    }
}

impl TryFrom<&str> for RequestEntityType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "vendor" => Ok(Self::Vendor),
            "category" => Ok(Self::Category),
            "payment_type" => Ok(Self::PaymentType),
            "invoice_profile" => Ok(Self::InvoiceProfile),
            "invoice_archive" => Ok(Self::InvoiceArchive),
            other => Err(EngineError::Validation(format!(
                "invalid request entity type: {other}"
            ))),
        }
    }
}

/// The typed proposal, serialized into the `payload` column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum RequestPayload {
    Vendor {
        name: String,
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        tax_exempt: bool,
        #[serde(default)]
        bank_name: Option<String>,
        #[serde(default)]
        bank_account: Option<String>,
    },
    Category {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    PaymentType {
        name: String,
    },
    InvoiceProfile {
        name: String,
        /// Defaults to the first active category when absent.
        #[serde(default)]
        category_id: Option<i32>,
        #[serde(default)]
        day_of_month: Option<i16>,
    },
    InvoiceArchive {
        invoice_id: i32,
        reason: String,
    },
}

impl RequestPayload {
    pub fn entity_type(&self) -> RequestEntityType {
        match self {
            Self::Vendor { .. } => RequestEntityType::Vendor,
            Self::Category { .. } => RequestEntityType::Category,
            Self::PaymentType { .. } => RequestEntityType::PaymentType,
            Self::InvoiceProfile { .. } => RequestEntityType::InvoiceProfile,
            Self::InvoiceArchive { .. } => RequestEntityType::InvoiceArchive,
        }
    }

    /// Single-flight key: at most one pending request may exist per target.
    pub fn target_ref(&self) -> Option<String> {
        match self {
            Self::InvoiceArchive { invoice_id, .. } => Some(invoice_id.to_string()),
            _ => None,
        }
    }

    pub fn decode(value: &Value) -> Result<Self, EngineError> {
        serde_json::from_value(value.clone())
            .map_err(|err| EngineError::Validation(format!("invalid request payload: {err}")))
    }

    pub fn encode(&self) -> Result<Value, EngineError> {
        serde_json::to_value(self)
            .map_err(|err| EngineError::Validation(format!("invalid request payload: {err}")))
    }

    /// Applies reviewer edits on top of the proposal; edits win field by
    /// field, but the entity type tag can never be rewritten.
    pub fn merged_with(&self, edits: &Value) -> Result<Self, EngineError> {
        let mut base = self.encode()?;
        merge_overlay(&mut base, edits);
        if let Value::Object(map) = &mut base {
            map.insert(
                "entity_type".to_string(),
                Value::String(self.entity_type().as_str().to_string()),
            );
        }
        Self::decode(&base)
    }
}

/// Recursive object merge; `edits` values replace `base` values.
fn merge_overlay(base: &mut Value, edits: &Value) {
    match (base, edits) {
        (Value::Object(base_map), Value::Object(edit_map)) => {
            for (key, edit_value) in edit_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_overlay(base_value, edit_value),
                    None => {
                        base_map.insert(key.clone(), edit_value.clone());
                    }
                }
            }
        }
        (base, edits) => *base = edits.clone(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasterDataRequest {
    pub id: i32,
    pub entity_type: RequestEntityType,
    pub status: RequestStatus,
    pub payload: RequestPayload,
    pub target_ref: Option<String>,
    pub requested_by: i32,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub admin_edits: Option<Value>,
    pub rejection_reason: Option<String>,
    pub resubmission_count: i32,
    pub previous_attempt_id: Option<i32>,
    pub superseded_by_id: Option<i32>,
    pub created_entity_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "master_data_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_type: String,
    pub status: String,
    pub payload: Json,
    pub target_ref: Option<String>,
    pub requested_by: i32,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub review_notes: Option<String>,
    pub admin_edits: Option<Json>,
    pub rejection_reason: Option<String>,
    pub resubmission_count: i32,
    pub previous_attempt_id: Option<i32>,
    pub superseded_by_id: Option<i32>,
    pub created_entity_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::PreviousAttemptId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    PreviousAttempt,
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for MasterDataRequest {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            entity_type: RequestEntityType::try_from(model.entity_type.as_str())?,
            status: RequestStatus::try_from(model.status.as_str())?,
            payload: RequestPayload::decode(&model.payload)?,
            target_ref: model.target_ref,
            requested_by: model.requested_by,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at,
            review_notes: model.review_notes,
            admin_edits: model.admin_edits,
            rejection_reason: model.rejection_reason,
            resubmission_count: model.resubmission_count,
            previous_attempt_id: model.previous_attempt_id,
            superseded_by_id: model.superseded_by_id,
            created_entity_id: model.created_entity_id,
            created_at: model.created_at,
        })
    }
}
