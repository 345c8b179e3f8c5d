//! Contributor primitives.
//!
//! A `Contributor` is a member of the group who may pay into the fund. The
//! running `balance_minor` and `total_contributed_minor` fields change only
//! through contribution postings (see `Engine::add_contribution`);
//! `total_contributed_minor` never decreases.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub balance_minor: i64,
    pub total_contributed_minor: i64,
    pub total_owed_minor: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contributor {
    pub fn new(
        name: String,
        phone: Option<String>,
        email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation(
                "contributor name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            phone,
            email,
            balance_minor: 0,
            total_contributed_minor: 0,
            total_owed_minor: 0,
            active: true,
            created_at,
            updated_at: created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contributors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub balance_minor: i64,
    pub total_contributed_minor: i64,
    pub total_owed_minor: i64,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contributions::Entity")]
    Contributions,
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Contributor> for ActiveModel {
    fn from(contributor: &Contributor) -> Self {
        Self {
            id: ActiveValue::Set(contributor.id.to_string()),
            name: ActiveValue::Set(contributor.name.clone()),
            phone: ActiveValue::Set(contributor.phone.clone()),
            email: ActiveValue::Set(contributor.email.clone()),
            balance_minor: ActiveValue::Set(contributor.balance_minor),
            total_contributed_minor: ActiveValue::Set(contributor.total_contributed_minor),
            total_owed_minor: ActiveValue::Set(contributor.total_owed_minor),
            active: ActiveValue::Set(contributor.active),
            created_at: ActiveValue::Set(contributor.created_at),
            updated_at: ActiveValue::Set(contributor.updated_at),
        }
    }
}

impl TryFrom<Model> for Contributor {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("contributor".to_string()))?,
            name: model.name,
            phone: model.phone,
            email: model.email,
            balance_minor: model.balance_minor,
            total_contributed_minor: model.total_contributed_minor,
            total_owed_minor: model.total_owed_minor,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
