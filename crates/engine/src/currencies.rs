//! Currencies master data.
//!
//! Monetary values are stored as `i64` minor units; `decimal_places` records
//! the minor-unit scale for presentation (EUR = 2, JPY = 0). The engine keeps
//! at least one active currency at all times (guardian rule).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A currency row as exposed by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub decimal_places: i16,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub decimal_places: i16,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Currency {
    fn from(model: Model) -> Self {
        Self {
            code: model.code,
            name: model.name,
            decimal_places: model.decimal_places,
            active: model.active,
        }
    }
}
