//! Database operations for budgets.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    budget::{Budget, BudgetId, BudgetPeriod, NewBudget},
    category::CategoryId,
    user::UserID,
};

/// Create the budget table.
///
/// Categories that budgets refer to cannot be deleted.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            period TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user ON budget(user_id);",
    )
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: row.get(2)?,
        period: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
    })
}

/// Store a new budget for `user_id`.
///
/// The caller should check that the category belongs to `user_id`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category does not exist.
pub fn create_budget(
    user_id: UserID,
    budget: NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, amount, period, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, category_id, amount, period, start_date, end_date",
        )?
        .query_row(
            (
                user_id.as_i64(),
                budget.category_id,
                budget.amount,
                budget.period,
                budget.start_date,
                budget.end_date,
            ),
            map_budget_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidCategory(budget.category_id)
            }
            error => error.into(),
        })
}

/// Retrieve the budget `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such budget.
pub fn get_budget(id: BudgetId, user_id: UserID, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, category_id, amount, period, start_date, end_date FROM budget
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_budget_row,
        )
        .map_err(Error::from)
}

/// Retrieve the user's budgets, optionally narrowed to one category and
/// period, newest start date first.
pub fn list_budgets(
    user_id: UserID,
    category_id: Option<CategoryId>,
    period: Option<BudgetPeriod>,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, amount, period, start_date, end_date FROM budget
            WHERE user_id = ?1
                AND (?2 IS NULL OR category_id = ?2)
                AND (?3 IS NULL OR period = ?3)
            ORDER BY start_date DESC, id DESC",
        )?
        .query_map((user_id.as_i64(), category_id, period), map_budget_row)?
        .map(|budget_result| budget_result.map_err(Error::from))
        .collect()
}

/// Delete the budget `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such budget.
pub fn delete_budget(id: BudgetId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod budget_query_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        EntryType, Error,
        amount::Amount,
        budget::{BudgetPeriod, NewBudget, create_budget, delete_budget, get_budget, list_budgets},
        category::{CategoryId, delete_category},
        db::initialize,
        test_utils::{must_create_category, must_insert_user},
        user::UserID,
    };

    fn get_test_connection() -> (Connection, UserID, CategoryId) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user_id = must_insert_user(&connection, "foo@bar.baz").id;
        let category_id =
            must_create_category(&connection, user_id, "Groceries", EntryType::Expense).id;

        (connection, user_id, category_id)
    }

    fn new_budget(category_id: CategoryId, period: BudgetPeriod) -> NewBudget {
        NewBudget {
            category_id,
            amount: Amount::new_unchecked(Decimal::new(50_000, 2)),
            period,
            start_date: date!(2025 - 01 - 01),
            end_date: None,
        }
    }

    #[test]
    fn create_and_get_budget() {
        let (connection, user_id, category_id) = get_test_connection();

        let budget =
            create_budget(user_id, new_budget(category_id, BudgetPeriod::Monthly), &connection)
                .unwrap();

        assert!(budget.id > 0);
        assert_eq!(budget.amount.value(), Decimal::new(500, 0));
        assert_eq!(get_budget(budget.id, user_id, &connection), Ok(budget));
    }

    #[test]
    fn create_budget_with_missing_category_fails() {
        let (connection, user_id, _) = get_test_connection();

        let result = create_budget(user_id, new_budget(999, BudgetPeriod::Monthly), &connection);

        assert_eq!(result, Err(Error::InvalidCategory(999)));
    }

    #[test]
    fn list_budgets_filters_by_period() {
        let (connection, user_id, category_id) = get_test_connection();
        create_budget(user_id, new_budget(category_id, BudgetPeriod::Monthly), &connection)
            .unwrap();
        let weekly =
            create_budget(user_id, new_budget(category_id, BudgetPeriod::Weekly), &connection)
                .unwrap();

        let budgets =
            list_budgets(user_id, None, Some(BudgetPeriod::Weekly), &connection).unwrap();

        assert_eq!(budgets, vec![weekly]);
    }

    #[test]
    fn budgets_are_private_to_their_owner() {
        let (connection, user_id, category_id) = get_test_connection();
        let other_user = must_insert_user(&connection, "other@bar.baz").id;
        let budget =
            create_budget(user_id, new_budget(category_id, BudgetPeriod::Monthly), &connection)
                .unwrap();

        assert_eq!(get_budget(budget.id, other_user, &connection), Err(Error::NotFound));
        assert!(list_budgets(other_user, None, None, &connection).unwrap().is_empty());
        assert_eq!(delete_budget(budget.id, other_user, &connection), Err(Error::NotFound));
    }

    #[test]
    fn budgeted_category_cannot_be_deleted() {
        let (connection, user_id, category_id) = get_test_connection();
        let budget =
            create_budget(user_id, new_budget(category_id, BudgetPeriod::Monthly), &connection)
                .unwrap();

        assert_eq!(
            delete_category(category_id, user_id, &connection),
            Err(Error::CategoryInUse)
        );

        delete_budget(budget.id, user_id, &connection).unwrap();
        assert_eq!(delete_category(category_id, user_id, &connection), Ok(()));
    }
}
