//! Currency master data, guarded so at least one currency stays active.

use sea_orm::{ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{Actor, Currency, EngineError, ResultEngine, currencies, guardian};

use super::{Engine, access::require_privileged, normalize_required_name, with_tx};

impl Engine {
    /// Registers a currency (active immediately).
    pub async fn create_currency(
        &self,
        code: &str,
        name: &str,
        decimal_places: i16,
        actor: &Actor,
    ) -> ResultEngine<Currency> {
        require_privileged(actor)?;
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(EngineError::Validation(
                "currency code must not be empty".to_string(),
            ));
        }
        let name = normalize_required_name(name, "currency")?;
        if !(0..=6).contains(&decimal_places) {
            return Err(EngineError::Validation(
                "decimal_places must be between 0 and 6".to_string(),
            ));
        }

        let model = with_tx!(self, |db_tx| {
            let exists = currencies::Entity::find_by_id(code.clone())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(code));
            }

            let active = currencies::ActiveModel {
                code: ActiveValue::Set(code.clone()),
                name: ActiveValue::Set(name.clone()),
                decimal_places: ActiveValue::Set(decimal_places),
                active: ActiveValue::Set(true),
            };
            let model = active.insert(&db_tx).await?;
            Ok(model)
        })?;

        Ok(Currency::from(model))
    }

    /// Activates or deactivates a currency.
    ///
    /// Deactivating the last active currency is vetoed — invoices always need
    /// at least one currency to reference.
    pub async fn set_currency_active(
        &self,
        code: &str,
        active: bool,
        actor: &Actor,
    ) -> ResultEngine<()> {
        require_privileged(actor)?;
        let code = code.trim().to_ascii_uppercase();

        with_tx!(self, |db_tx| {
            let model = currencies::Entity::find_by_id(code.clone())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("currency".to_string()))?;

            if !active {
                let holders = self.active_currency_count(&db_tx).await?;
                if guardian::check(holders, model.active).is_blocked() {
                    return Err(EngineError::StateConflict(
                        "cannot deactivate the last active currency".to_string(),
                    ));
                }
            }

            let update = currencies::ActiveModel {
                code: ActiveValue::Set(model.code),
                active: ActiveValue::Set(active),
                ..Default::default()
            };
            update.update(&db_tx).await?;
            Ok(())
        })
    }

    /// All currencies, active first, then by code.
    pub async fn list_currencies(&self) -> ResultEngine<Vec<Currency>> {
        let rows = currencies::Entity::find().all(&self.database).await?;
        let mut currencies: Vec<Currency> = rows.into_iter().map(Currency::from).collect();
        currencies.sort_by(|a, b| b.active.cmp(&a.active).then(a.code.cmp(&b.code)));
        Ok(currencies)
    }

    async fn active_currency_count<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<u64> {
        let count = currencies::Entity::find()
            .filter(currencies::Column::Active.eq(true))
            .count(db)
            .await?;
        Ok(count)
    }
}
