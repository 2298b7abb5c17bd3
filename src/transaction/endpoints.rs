//! JSON endpoints for creating, listing, updating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    AppState, EntryType, Error,
    amount::Amount,
    auth::CurrentUser,
    category::ensure_category_owned,
    extract::AppJson,
    transaction::{
        Transaction, TransactionBuilder, TransactionFilter, TransactionId, TransactionPatch,
        create_transaction, delete_transaction, get_transaction, list_transactions,
        update_transaction,
    },
    validation::{
        FieldError, Validate, ValidationErrors, character_count, iso_date, positive_id,
    },
};

/// The longest description a transaction may have.
pub const DESCRIPTION_MAX_LENGTH: usize = 255;

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Trim a description, treating blank text as no description.
///
/// # Errors
/// Returns an error if the trimmed text is longer than
/// [DESCRIPTION_MAX_LENGTH] characters.
pub fn parse_description(raw: String) -> Result<Option<String>, FieldError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        Ok(None)
    } else if character_count(trimmed) > DESCRIPTION_MAX_LENGTH {
        Err(FieldError::new(format!(
            "Description must be at most {DESCRIPTION_MAX_LENGTH} characters"
        )))
    } else {
        Ok(Some(trimmed.to_owned()))
    }
}

fn category_id(raw: Option<i64>) -> Result<i64, FieldError> {
    match raw {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(FieldError::new("Category must be a positive integer")),
        None => Err(FieldError::new("Category is required")),
    }
}

/// The raw create-transaction request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    /// The amount, greater than zero.
    pub amount: Option<Decimal>,
    /// `INCOME` or `EXPENSE`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// The category the transaction belongs to.
    pub category_id: Option<i64>,
    /// An optional description.
    pub description: Option<String>,
    /// The date as `YYYY-MM-DD`.
    pub date: String,
}

impl Validate for CreateTransactionRequest {
    type Output = TransactionBuilder;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let amount = errors.check("amount", Amount::new(self.amount));
        let transaction_type = errors.check("type", self.transaction_type.parse::<EntryType>());
        let category_id = errors.check("categoryId", category_id(self.category_id));
        let description = errors.check_optional("description", self.description, parse_description);
        let date = errors.check("date", iso_date(&self.date, "Date"));

        match (amount, transaction_type, category_id, description, date) {
            (
                Some(amount),
                Some(transaction_type),
                Some(category_id),
                Some(description),
                Some(date),
            ) if errors.is_empty() => Ok(Transaction::build(
                amount,
                transaction_type,
                date,
                category_id,
            )
            .description(description.flatten())),
            _ => Err(errors),
        }
    }
}

/// The raw update-transaction request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    /// The new amount.
    pub amount: Option<Decimal>,
    /// The new type.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// The new category.
    pub category_id: Option<i64>,
    /// The new description. An empty string clears it.
    pub description: Option<String>,
    /// The new date as `YYYY-MM-DD`.
    pub date: Option<String>,
}

impl Validate for UpdateTransactionRequest {
    type Output = TransactionPatch;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let amount = errors.check_optional("amount", self.amount, |amount| {
            Amount::new(Some(amount))
        });
        let transaction_type = errors.check_optional(
            "type",
            self.transaction_type,
            |transaction_type| transaction_type.parse::<EntryType>(),
        );
        let category_id = errors.check_optional("categoryId", self.category_id, |id| {
            category_id(Some(id))
        });
        let description = errors.check_optional("description", self.description, parse_description);
        let date = errors.check_optional("date", self.date, |date| iso_date(&date, "Date"));

        match (amount, transaction_type, category_id, description, date) {
            (
                Some(amount),
                Some(transaction_type),
                Some(category_id),
                Some(description),
                Some(date),
            ) if errors.is_empty() => Ok(TransactionPatch {
                amount,
                transaction_type,
                category_id,
                description,
                date,
            }),
            _ => Err(errors),
        }
    }
}

/// The query parameters for listing transactions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionQuery {
    /// The earliest date as `YYYY-MM-DD`.
    pub from: Option<String>,
    /// The latest date as `YYYY-MM-DD`.
    pub to: Option<String>,
    /// Only this category.
    pub category_id: Option<String>,
    /// Only `INCOME` or `EXPENSE`.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

impl Validate for TransactionQuery {
    type Output = TransactionFilter;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let from = errors.check_optional("from", self.from, |from| iso_date(&from, "From"));
        let to = errors.check_optional("to", self.to, |to| iso_date(&to, "To"));
        let category_id = errors.check_optional("categoryId", self.category_id, |id| {
            positive_id(&id, "Category")
        });
        let transaction_type = errors.check_optional(
            "type",
            self.transaction_type,
            |transaction_type| transaction_type.parse::<EntryType>(),
        );

        if let (Some(Some(from)), Some(Some(to))) = (from, to)
            && to < from
        {
            errors.add("to", "To must not be before From");
        }

        match (from, to, category_id, transaction_type) {
            (Some(from), Some(to), Some(category_id), Some(transaction_type))
                if errors.is_empty() =>
            {
                Ok(TransactionFilter {
                    from,
                    to,
                    category_id,
                    transaction_type,
                })
            }
            _ => Err(errors),
        }
    }
}

/// List the logged in user's transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let filter = query.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    list_transactions(user_id, &filter, &connection).map(Json)
}

/// Create a transaction for the logged in user.
///
/// # Errors
/// Returns a validation error for bad fields, including a `categoryId` that
/// does not belong to the user.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let builder = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    ensure_category_owned(builder.category_id, user_id, &connection)?;
    let transaction = create_transaction(user_id, builder, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Get one of the logged in user's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user_id): CurrentUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_transaction(transaction_id, user_id, &connection).map(Json)
}

/// Apply a partial update to one of the logged in user's transactions.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user_id): CurrentUser,
    Path(transaction_id): Path<TransactionId>,
    AppJson(request): AppJson<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, Error> {
    let patch = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    if let Some(category_id) = patch.category_id {
        ensure_category_owned(category_id, user_id, &connection)?;
    }

    update_transaction(transaction_id, user_id, patch, &connection).map(Json)
}

/// Delete one of the logged in user's transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user_id): CurrentUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_transaction(transaction_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod request_tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        EntryType,
        transaction::{
            CreateTransactionRequest, TransactionQuery, UpdateTransactionRequest,
            TransactionPatch,
        },
        validation::Validate,
    };

    fn valid_request() -> CreateTransactionRequest {
        CreateTransactionRequest {
            amount: Some(Decimal::new(1999, 2)),
            transaction_type: "expense".to_owned(),
            category_id: Some(1),
            description: Some("  Pizza  ".to_owned()),
            date: "2025-03-01".to_owned(),
        }
    }

    #[test]
    fn valid_create_request_is_normalized() {
        let builder = valid_request().validate().unwrap();

        assert_eq!(builder.transaction_type, EntryType::Expense);
        assert_eq!(builder.description.as_deref(), Some("Pizza"));
        assert_eq!(builder.date, date!(2025 - 03 - 01));
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for amount in [Decimal::ZERO, Decimal::new(-5, 0)] {
            let request = CreateTransactionRequest {
                amount: Some(amount),
                ..valid_request()
            };

            assert!(request.validate().unwrap_err().has_field("amount"));
        }
    }

    #[test]
    fn blank_description_becomes_none() {
        let request = CreateTransactionRequest {
            description: Some("   ".to_owned()),
            ..valid_request()
        };

        assert_eq!(request.validate().unwrap().description, None);
    }

    #[test]
    fn empty_create_request_reports_required_fields() {
        let errors = CreateTransactionRequest::default().validate().unwrap_err();

        for field in ["amount", "type", "categoryId", "date"] {
            assert!(errors.has_field(field), "want violation for {field}");
        }
        assert!(!errors.has_field("description"));
    }

    #[test]
    fn empty_update_is_valid() {
        let patch = UpdateTransactionRequest::default().validate().unwrap();

        assert_eq!(patch, TransactionPatch::default());
    }

    #[test]
    fn query_rejects_reversed_range() {
        let query = TransactionQuery {
            from: Some("2025-02-01".to_owned()),
            to: Some("2025-01-01".to_owned()),
            ..Default::default()
        };

        assert!(query.validate().unwrap_err().has_field("to"));
    }
}
