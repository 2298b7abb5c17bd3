//! The summary report: income and expense totals for a date range.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, EntryType, Error,
    auth::CurrentUser,
    category::{Category, CategoryId, list_categories},
    transaction::{Transaction, TransactionFilter, list_transactions},
    user::UserID,
    validation::{Validate, ValidationErrors, iso_date},
};

/// The state needed by the report endpoints.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the summary report. Both dates are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    /// The first day as `YYYY-MM-DD`.
    pub from: String,
    /// The last day as `YYYY-MM-DD`.
    pub to: String,
}

/// A validated, inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day.
    pub from: Date,
    /// The last day.
    pub to: Date,
}

impl Validate for ReportQuery {
    type Output = DateRange;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let from = errors.check("from", iso_date(&self.from, "From date"));
        let to = errors.check("to", iso_date(&self.to, "To date"));

        if let (Some(from), Some(to)) = (from, to)
            && to < from
        {
            errors.add("to", "To date must not be before from date");
        }

        match (from, to) {
            (Some(from), Some(to)) if errors.is_empty() => Ok(DateRange { from, to }),
            _ => Err(errors),
        }
    }
}

/// The total for one category in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    /// The category's ID.
    pub category_id: CategoryId,
    /// The category's name at the time of the report.
    pub name: String,
    /// The sum of the category's transactions in the range.
    pub total: Decimal,
    /// How many transactions were summed.
    pub transaction_count: usize,
}

/// Income, expenses and net for a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    /// The first day of the range.
    pub from: Date,
    /// The last day of the range.
    pub to: Date,
    /// The sum of income transactions.
    pub total_income: Decimal,
    /// The sum of expense transactions.
    pub total_expense: Decimal,
    /// `total_income - total_expense`.
    pub net: Decimal,
    /// Per-category income, largest first.
    pub income_by_category: Vec<CategoryTotal>,
    /// Per-category expenses, largest first.
    pub expense_by_category: Vec<CategoryTotal>,
}

fn saturating_total(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}

fn totals_by_category(
    transactions: &[Transaction],
    categories: &HashMap<CategoryId, &Category>,
    transaction_type: EntryType,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<CategoryId, (Decimal, usize)> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
    {
        let (total, count) = totals.entry(transaction.category_id).or_default();
        *total = total.saturating_add(transaction.amount.value());
        *count += 1;
    }

    let mut totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, (total, transaction_count))| CategoryTotal {
            category_id,
            name: categories
                .get(&category_id)
                .map(|category| category.name.as_ref().to_owned())
                .unwrap_or_default(),
            total,
            transaction_count,
        })
        .collect();

    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}

/// Summarize `transactions` over `range`.
///
/// Transactions outside the range are ignored.
pub fn summarize(range: DateRange, transactions: &[Transaction], categories: &[Category]) -> SummaryReport {
    let transactions: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| range.from <= transaction.date && transaction.date <= range.to)
        .cloned()
        .collect();
    let categories: HashMap<CategoryId, &Category> = categories
        .iter()
        .map(|category| (category.id, category))
        .collect();

    let income_by_category = totals_by_category(&transactions, &categories, EntryType::Income);
    let expense_by_category = totals_by_category(&transactions, &categories, EntryType::Expense);
    let total_income = saturating_total(income_by_category.iter().map(|total| total.total));
    let total_expense = saturating_total(expense_by_category.iter().map(|total| total.total));

    SummaryReport {
        from: range.from,
        to: range.to,
        total_income,
        total_expense,
        net: total_income.saturating_sub(total_expense),
        income_by_category,
        expense_by_category,
    }
}

fn build_report(
    user_id: UserID,
    range: DateRange,
    connection: &Connection,
) -> Result<SummaryReport, Error> {
    let filter = TransactionFilter {
        from: Some(range.from),
        to: Some(range.to),
        ..Default::default()
    };
    let transactions = list_transactions(user_id, &filter, connection)?;
    let categories = list_categories(user_id, connection)?;

    Ok(summarize(range, &transactions, &categories))
}

/// Get the logged in user's income and expense summary for a date range.
pub async fn get_summary_report_endpoint(
    State(state): State<ReportState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SummaryReport>, Error> {
    let range = query.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    build_report(user_id, range, &connection).map(Json)
}


#[cfg(test)]
mod report_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        EntryType, endpoints,
        test_utils::{
            assert_violation, get_test_app_state, get_test_server, must_create_category,
            must_create_test_user,
        },
    };

    #[tokio::test]
    async fn summary_report_totals_transactions() {
        let state = get_test_app_state();
        let (user, token) = must_create_test_user(&state);
        let (food, salary) = {
            let connection = state.db_connection.lock().unwrap();
            (
                must_create_category(&connection, user.id, "Food", EntryType::Expense),
                must_create_category(&connection, user.id, "Salary", EntryType::Income),
            )
        };
        let server = get_test_server(state);
        for (amount, transaction_type, category_id) in [
            (40, "EXPENSE", food.id),
            (2000, "INCOME", salary.id),
        ] {
            server
                .post(endpoints::TRANSACTIONS)
                .authorization_bearer(&token)
                .json(&json!({
                    "amount": amount,
                    "type": transaction_type,
                    "categoryId": category_id,
                    "date": "2025-03-01",
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get(endpoints::REPORT_SUMMARY)
            .authorization_bearer(&token)
            .add_query_param("from", "2025-03-01")
            .add_query_param("to", "2025-03-31")
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["totalIncome"], 2000.0);
        assert_eq!(body["totalExpense"], 40.0);
        assert_eq!(body["net"], 1960.0);
        assert_eq!(body["expenseByCategory"][0]["name"], "Food");
    }

    #[tokio::test]
    async fn summary_report_requires_a_range() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);

        let response = server
            .get(endpoints::REPORT_SUMMARY)
            .authorization_bearer(&token)
            .add_query_param("from", "2025-03-31")
            .add_query_param("to", "2025-03-01")
            .await;

        assert_violation(&response, "to");
    }
}
