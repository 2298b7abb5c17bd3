//! Budget types and the rules for creating and querying budgets.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    amount::Amount,
    category::CategoryId,
    database_id::DatabaseId,
    validation::{FieldError, Validate, ValidationErrors, boolean, iso_date, positive_id},
};

/// The database ID of a budget.
pub type BudgetId = DatabaseId;

/// How often a budget's spending limit resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetPeriod {
    /// Resets every day.
    Daily,
    /// Resets every seven days.
    Weekly,
    /// Resets every calendar month.
    Monthly,
    /// Resets every year.
    Yearly,
    /// Never resets: one window from the start date to the end date.
    Custom,
}

impl BudgetPeriod {
    /// The representation used in the database and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "DAILY",
            BudgetPeriod::Weekly => "WEEKLY",
            BudgetPeriod::Monthly => "MONTHLY",
            BudgetPeriod::Yearly => "YEARLY",
            BudgetPeriod::Custom => "CUSTOM",
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(BudgetPeriod::Daily),
            "WEEKLY" => Ok(BudgetPeriod::Weekly),
            "MONTHLY" => Ok(BudgetPeriod::Monthly),
            "YEARLY" => Ok(BudgetPeriod::Yearly),
            "CUSTOM" => Ok(BudgetPeriod::Custom),
            _ => Err(FieldError::new(
                "Period must be one of DAILY, WEEKLY, MONTHLY, YEARLY or CUSTOM",
            )),
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for BudgetPeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for BudgetPeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: FieldError| FromSqlError::Other(Box::new(error)))
    }
}

/// A spending limit for one category over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category whose expenses count against the budget.
    pub category_id: CategoryId,
    /// The most that should be spent in one window.
    pub amount: Amount,
    /// How often the limit resets.
    pub period: BudgetPeriod,
    /// The first day the budget applies to.
    pub start_date: Date,
    /// The last day the budget applies to, if it ends.
    pub end_date: Option<Date>,
}

impl Budget {
    /// Whether the budget applies to `today`.
    pub fn is_active(&self, today: Date) -> bool {
        self.start_date <= today && self.end_date.is_none_or(|end_date| end_date >= today)
    }
}

/// The data for a budget that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// The category whose expenses count against the budget.
    pub category_id: CategoryId,
    /// The most that should be spent in one window.
    pub amount: Amount,
    /// How often the limit resets.
    pub period: BudgetPeriod,
    /// The first day the budget applies to.
    pub start_date: Date,
    /// The last day the budget applies to, required for custom budgets.
    pub end_date: Option<Date>,
}

/// The raw create-budget request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    /// The category to budget for.
    pub category_id: Option<i64>,
    /// The spending limit, greater than zero.
    pub amount: Option<Decimal>,
    /// How often the limit resets.
    pub period: String,
    /// The first day as `YYYY-MM-DD`.
    pub start_date: String,
    /// The last day as `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl Validate for CreateBudgetRequest {
    type Output = NewBudget;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let category_id = errors.check(
            "categoryId",
            match self.category_id {
                Some(id) if id > 0 => Ok(id),
                Some(_) => Err(FieldError::new("Category must be a positive integer")),
                None => Err(FieldError::new("Category is required")),
            },
        );
        let amount = errors.check("amount", Amount::new(self.amount));
        let period = errors.check("period", self.period.parse::<BudgetPeriod>());
        let start_date = errors.check("startDate", iso_date(&self.start_date, "Start date"));
        let end_date = errors.check_optional(
            "endDate",
            self.end_date.filter(|end_date| !end_date.trim().is_empty()),
            |end_date| iso_date(&end_date, "End date"),
        );

        if period == Some(BudgetPeriod::Custom) && end_date == Some(None) {
            errors.add("endDate", "End date is required for custom budgets");
        }

        if let (Some(start_date), Some(Some(end_date))) = (start_date, end_date)
            && end_date < start_date
        {
            errors.add("endDate", "End date must not be before start date");
        }

        match (category_id, amount, period, start_date, end_date) {
            (Some(category_id), Some(amount), Some(period), Some(start_date), Some(end_date))
                if errors.is_empty() =>
            {
                Ok(NewBudget {
                    category_id,
                    amount,
                    period,
                    start_date,
                    end_date,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Which budgets to list. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetFilter {
    /// Only budgets for this category.
    pub category_id: Option<CategoryId>,
    /// Only budgets with this period.
    pub period: Option<BudgetPeriod>,
    /// Only budgets that apply today (`true`) or do not (`false`).
    pub active: Option<bool>,
}

impl BudgetFilter {
    /// Whether `budget` passes the filter on `today`.
    pub fn matches(&self, budget: &Budget, today: Date) -> bool {
        self.category_id
            .is_none_or(|category_id| budget.category_id == category_id)
            && self.period.is_none_or(|period| budget.period == period)
            && self
                .active
                .is_none_or(|active| budget.is_active(today) == active)
    }
}

/// The query parameters for listing budgets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetQuery {
    /// Only this category.
    pub category_id: Option<String>,
    /// Only this period.
    pub period: Option<String>,
    /// `true` for budgets that apply today, `false` for the rest.
    pub active: Option<String>,
}

impl Validate for BudgetQuery {
    type Output = BudgetFilter;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let category_id = errors.check_optional("categoryId", self.category_id, |id| {
            positive_id(&id, "Category")
        });
        let period = errors.check_optional("period", self.period, |period| {
            period.parse::<BudgetPeriod>()
        });
        let active = errors.check_optional("active", self.active, |active| {
            boolean(&active, "Active")
        });

        match (category_id, period, active) {
            (Some(category_id), Some(period), Some(active)) if errors.is_empty() => {
                Ok(BudgetFilter {
                    category_id,
                    period,
                    active,
                })
            }
            _ => Err(errors),
        }
    }
}
