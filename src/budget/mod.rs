//! Budgets cap the spending in one category over a recurring or custom period.

mod db;
mod domain;
mod endpoints;
mod progress;

pub use db::{create_budget, create_budget_table, delete_budget, get_budget, list_budgets};
pub use domain::{
    Budget, BudgetFilter, BudgetId, BudgetPeriod, BudgetQuery, CreateBudgetRequest, NewBudget,
};
pub use endpoints::{
    BudgetState, BudgetWithProgress, create_budget_endpoint, delete_budget_endpoint,
    get_budget_endpoint, list_budgets_endpoint,
};
pub use progress::{ALERT_THRESHOLDS, BudgetProgress, BudgetWindow, compute_progress, current_window};
