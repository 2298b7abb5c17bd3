//! JSON endpoints for budgets. Every budget is returned with its progress.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    AppState, EntryType, Error,
    auth::CurrentUser,
    budget::{
        Budget, BudgetId, BudgetProgress, BudgetQuery, CreateBudgetRequest, compute_progress,
        create_budget, current_window, delete_budget, get_budget, list_budgets,
    },
    category::ensure_category_owned,
    extract::AppJson,
    timezone,
    transaction::{TransactionFilter, list_transactions},
    user::UserID,
    validation::Validate,
};

/// The state needed by the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone used to decide what "today" is, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A budget together with its spending in the current window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWithProgress {
    /// The stored budget.
    #[serde(flatten)]
    pub budget: Budget,
    /// The spending in the current window.
    pub progress: BudgetProgress,
}

fn with_progress(
    budget: Budget,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<BudgetWithProgress, Error> {
    let window = current_window(&budget, today);
    let filter = TransactionFilter {
        from: Some(window.start),
        to: Some(window.end),
        category_id: Some(budget.category_id),
        transaction_type: Some(EntryType::Expense),
    };
    let transactions = list_transactions(user_id, &filter, connection)?;
    let progress = compute_progress(&budget, &transactions, today);

    Ok(BudgetWithProgress { budget, progress })
}

/// List the logged in user's budgets with their progress.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<Vec<BudgetWithProgress>>, Error> {
    let filter = query.validate()?;
    let today = timezone::today(&state.local_timezone)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    list_budgets(user_id, filter.category_id, filter.period, &connection)?
        .into_iter()
        .filter(|budget| filter.matches(budget, today))
        .map(|budget| with_progress(budget, user_id, today, &connection))
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Create a budget for the logged in user.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<BudgetWithProgress>), Error> {
    let new_budget = request.validate()?;
    let today = timezone::today(&state.local_timezone)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    ensure_category_owned(new_budget.category_id, user_id, &connection)?;
    let budget = create_budget(user_id, new_budget, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(with_progress(budget, user_id, today, &connection)?),
    ))
}

/// Get one of the logged in user's budgets with its progress.
pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    CurrentUser(user_id): CurrentUser,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<BudgetWithProgress>, Error> {
    let today = timezone::today(&state.local_timezone)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let budget = get_budget(budget_id, user_id, &connection)?;

    with_progress(budget, user_id, today, &connection).map(Json)
}

/// Delete one of the logged in user's budgets.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    CurrentUser(user_id): CurrentUser,
    Path(budget_id): Path<BudgetId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_budget(budget_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
