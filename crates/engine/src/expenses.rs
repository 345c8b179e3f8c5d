//! Expense primitives.
//!
//! An `Expense` is an outgoing payment. It only counts against the aggregate
//! balance once approved; approval is one-way.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// The fixed expense category set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Equipment,
    Transportation,
    VenueRental,
    Uniforms,
    RefereeFees,
    TournamentFees,
    FoodAndDrinks,
    TrainingMaterials,
    MedicalSupplies,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 10] = [
        Self::Equipment,
        Self::Transportation,
        Self::VenueRental,
        Self::Uniforms,
        Self::RefereeFees,
        Self::TournamentFees,
        Self::FoodAndDrinks,
        Self::TrainingMaterials,
        Self::MedicalSupplies,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equipment => "Equipment",
            Self::Transportation => "Transportation",
            Self::VenueRental => "Venue Rental",
            Self::Uniforms => "Uniforms",
            Self::RefereeFees => "Referee Fees",
            Self::TournamentFees => "Tournament Fees",
            Self::FoodAndDrinks => "Food & Drinks",
            Self::TrainingMaterials => "Training Materials",
            Self::MedicalSupplies => "Medical Supplies",
            Self::Other => "Other",
        }
    }
}

impl TryFrom<&str> for ExpenseCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| EngineError::Validation(format!("invalid expense category: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub amount_minor: i64,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub date: DateTime<Utc>,
    pub approved: bool,
    pub synced_to_sheets: bool,
    pub notes: Option<String>,
}

impl Expense {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        amount_minor: i64,
        category: ExpenseCategory,
        description: Option<String>,
        sms_content: Option<String>,
        sms_sender: Option<String>,
        notes: Option<String>,
        date: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            amount_minor,
            category,
            description,
            sms_content,
            sms_sender,
            date,
            approved: false,
            synced_to_sheets: false,
            notes,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub amount_minor: i64,
    pub category: String,
    pub description: Option<String>,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub date: DateTimeUtc,
    pub approved: bool,
    pub synced_to_sheets: bool,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            sms_content: ActiveValue::Set(expense.sms_content.clone()),
            sms_sender: ActiveValue::Set(expense.sms_sender.clone()),
            date: ActiveValue::Set(expense.date),
            approved: ActiveValue::Set(expense.approved),
            synced_to_sheets: ActiveValue::Set(expense.synced_to_sheets),
            notes: ActiveValue::Set(expense.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("expense".to_string()))?,
            amount_minor: model.amount_minor,
            category: ExpenseCategory::try_from(model.category.as_str())?,
            description: model.description,
            sms_content: model.sms_content,
            sms_sender: model.sms_sender,
            date: model.date,
            approved: model.approved,
            synced_to_sheets: model.synced_to_sheets,
            notes: model.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_by_label() {
        for category in ExpenseCategory::ALL {
            assert_eq!(ExpenseCategory::try_from(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(
            ExpenseCategory::try_from("venue rental").unwrap(),
            ExpenseCategory::VenueRental
        );
        assert!(ExpenseCategory::try_from("Gambling").is_err());
    }
}
