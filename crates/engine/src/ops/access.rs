//! Role guards and row lookups shared by the operation modules.
//!
//! Role checks run before anything touches the database, and the same
//! generic "<Role> access required" wording is used everywhere so error
//! responses never leak whether a row exists.

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    Actor, EngineError, ResultEngine, Role, categories, currencies, invoice_profiles, invoices,
    payment_types, requests, users, vendors,
};

use super::Engine;

pub(super) fn require_actor(actor: &Actor) -> ResultEngine<()> {
    if !actor.active {
        return Err(EngineError::Unauthorized("User".to_string()));
    }
    Ok(())
}

pub(super) fn require_privileged(actor: &Actor) -> ResultEngine<()> {
    if !actor.is_privileged() {
        return Err(EngineError::Unauthorized("Admin".to_string()));
    }
    Ok(())
}

pub(super) fn require_super_admin(actor: &Actor) -> ResultEngine<()> {
    if !actor.active || actor.role != Role::SuperAdmin {
        return Err(EngineError::Unauthorized("Super admin".to_string()));
    }
    Ok(())
}

/// Generates a lookup that requires an **active** master-data row.
macro_rules! impl_require_active {
    ($fn_name:ident, $module:ident, $err_msg:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            &self,
            db: &C,
            id: i32,
        ) -> ResultEngine<$module::Model> {
            $module::Entity::find_by_id(id)
                .filter($module::Column::Active.eq(true))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_active!(require_active_category, categories, "category");
    impl_require_active!(require_active_payment_type, payment_types, "payment type");
    impl_require_active!(require_active_profile, invoice_profiles, "invoice profile");

    pub(super) async fn require_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice_id: i32,
    ) -> ResultEngine<invoices::Model> {
        invoices::Entity::find_by_id(invoice_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("invoice".to_string()))
    }

    /// Vendor lookup that hides soft-deleted rows.
    pub(super) async fn require_vendor<C: ConnectionTrait>(
        &self,
        db: &C,
        vendor_id: i32,
    ) -> ResultEngine<vendors::Model> {
        vendors::Entity::find_by_id(vendor_id)
            .filter(vendors::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("vendor".to_string()))
    }

    pub(super) async fn require_active_currency<C: ConnectionTrait>(
        &self,
        db: &C,
        code: &str,
    ) -> ResultEngine<currencies::Model> {
        currencies::Entity::find_by_id(code.to_string())
            .filter(currencies::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("currency".to_string()))
    }

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i32,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))
    }

    pub(super) async fn require_request<C: ConnectionTrait>(
        &self,
        db: &C,
        request_id: i32,
    ) -> ResultEngine<requests::Model> {
        requests::Entity::find_by_id(request_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("request".to_string()))
    }

    /// Active privileged users; notified when something enters review.
    pub(super) async fn active_admin_ids<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> ResultEngine<Vec<i32>> {
        let rows = users::Entity::find()
            .filter(users::Column::Active.eq(true))
            .filter(
                users::Column::Role
                    .is_in([Role::Admin.as_str(), Role::SuperAdmin.as_str()]),
            )
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|u| u.id).collect())
    }

    /// Enforces the `(invoice_number, vendor_id)` natural key.
    pub(super) async fn ensure_unique_invoice_number<C: ConnectionTrait>(
        &self,
        db: &C,
        vendor_id: i32,
        invoice_number: &str,
        exclude_id: Option<i32>,
    ) -> ResultEngine<()> {
        let mut query = invoices::Entity::find()
            .filter(invoices::Column::VendorId.eq(vendor_id))
            .filter(invoices::Column::InvoiceNumber.eq(invoice_number.to_string()));
        if let Some(id) = exclude_id {
            query = query.filter(invoices::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(invoice_number.to_string()));
        }
        Ok(())
    }
}
