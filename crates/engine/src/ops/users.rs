//! User administration guarded by the last-super-admin rule.
//!
//! The guardian count runs inside the same transaction as the mutation:
//! two concurrent demotions cannot both read a count of two and leave the
//! system with no active super admin.

use sea_orm::{ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Actor, EngineError, ResultEngine, Role,
    guardian::{self, GuardianVerdict},
    users,
};

use super::{Engine, access::require_super_admin, with_tx};

impl Engine {
    /// Activates or deactivates a user account.
    ///
    /// Deactivating the last active super admin is vetoed.
    pub async fn set_user_active(
        &self,
        user_id: i32,
        active: bool,
        actor: &Actor,
    ) -> ResultEngine<()> {
        require_super_admin(actor)?;

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            if !active {
                self.check_super_admin_guardian(&db_tx, &user).await?;
            }

            let update = users::ActiveModel {
                id: ActiveValue::Set(user.id),
                active: ActiveValue::Set(active),
                ..Default::default()
            };
            update.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Changes a user's role.
    ///
    /// Demoting the last active super admin is vetoed.
    pub async fn set_user_role(&self, user_id: i32, role: Role, actor: &Actor) -> ResultEngine<()> {
        require_super_admin(actor)?;

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            if role != Role::SuperAdmin {
                self.check_super_admin_guardian(&db_tx, &user).await?;
            }

            let update = users::ActiveModel {
                id: ActiveValue::Set(user.id),
                role: ActiveValue::Set(role.as_str().to_string()),
                ..Default::default()
            };
            update.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Advisory check for UIs: would removing this user empty the super-admin
    /// capability? The authoritative check still runs inside the mutation.
    pub async fn would_empty_super_admins(&self, user_id: i32) -> ResultEngine<GuardianVerdict> {
        let user = self.require_user(&self.database, user_id).await?;
        let holders = self.active_super_admin_count(&self.database).await?;
        Ok(guardian::check(holders, is_active_super_admin(&user)))
    }

    async fn check_super_admin_guardian<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &users::Model,
    ) -> ResultEngine<()> {
        let holders = self.active_super_admin_count(db).await?;
        if guardian::check(holders, is_active_super_admin(user)).is_blocked() {
            return Err(EngineError::StateConflict(
                "cannot remove the last active super admin".to_string(),
            ));
        }
        Ok(())
    }

    async fn active_super_admin_count<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<u64> {
        let count = users::Entity::find()
            .filter(users::Column::Role.eq(Role::SuperAdmin.as_str()))
            .filter(users::Column::Active.eq(true))
            .count(db)
            .await?;
        Ok(count)
    }
}

fn is_active_super_admin(user: &users::Model) -> bool {
    user.active && user.role == Role::SuperAdmin.as_str()
}
