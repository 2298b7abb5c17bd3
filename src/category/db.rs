//! Database operations for categories.
//!
//! Every query is scoped to the owning user. A category that belongs to
//! someone else is reported as not found.

use rusqlite::{Connection, OptionalExtension, Row, named_params};

use crate::{
    Error,
    category::{
        Category, CategoryId, CategoryName, CategoryPatch, Color, IconName, NewCategory,
        name_key,
    },
    user::UserID,
};

/// Initialize the category table.
///
/// Uniqueness and look-ups use `name_key`, the case-folded name, so that
/// case is ignored for every letter and not only ASCII ones.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            type TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            UNIQUE(user_id, name_key),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_color: String = row.get(3)?;
    let raw_icon: String = row.get(4)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        category_type: row.get(2)?,
        color: Color::new_unchecked(&raw_color),
        icon: IconName::new_unchecked(&raw_icon),
    })
}

fn map_constraint_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(_))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateCategoryName(name.to_owned())
        }
        error => error.into(),
    }
}

/// Create a category for `user_id` and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if the user already has a category
/// with the same name, ignoring case.
pub fn create_category(
    user_id: UserID,
    category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, name, name_key, type, color, icon)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                user_id.as_i64(),
                category.name.as_ref(),
                category.name.key(),
                category.category_type,
                category.color.as_ref(),
                category.icon.as_ref(),
            ),
        )
        .map_err(|error| map_constraint_error(error, category.name.as_ref()))?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: category.name,
        category_type: category.category_type,
        color: category.color,
        icon: category.icon,
    })
}

/// Retrieve the category `category_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category for the user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, type, color, icon FROM category
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of the user's categories ordered by name.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, type, color, icon FROM category
            WHERE user_id = :user_id ORDER BY name_key ASC, name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Find the user's category named `name`, ignoring case.
pub fn find_category_by_name(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, type, color, icon FROM category
            WHERE user_id = :user_id AND name_key = :name_key",
        )?
        .query_row(
            named_params! { ":user_id": user_id.as_i64(), ":name_key": name_key(name) },
            map_row,
        )
        .optional()
        .map_err(|error| error.into())
}

/// Apply `patch` to the category and return the updated category.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such category, or
/// [Error::DuplicateCategoryName] if the new name is taken.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserID,
    patch: CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    let name_for_error = patch
        .name
        .as_ref()
        .map(|name| name.as_ref().to_owned())
        .unwrap_or_default();

    let rows_affected = connection
        .execute(
            "UPDATE category SET
                name = COALESCE(?1, name),
                name_key = COALESCE(?2, name_key),
                type = COALESCE(?3, type),
                color = COALESCE(?4, color),
                icon = COALESCE(?5, icon)
            WHERE id = ?6 AND user_id = ?7",
            (
                patch.name.as_ref().map(|name| name.as_ref()),
                patch.name.as_ref().map(CategoryName::key),
                patch.category_type,
                patch.color.as_ref().map(|color| color.as_ref()),
                patch.icon.as_ref().map(|icon| icon.as_ref()),
                category_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_constraint_error(error, &name_for_error))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_category(category_id, user_id, connection)
}

/// Delete the category `category_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such category, or
/// [Error::CategoryInUse] if transactions or budgets still refer to it.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            (category_id, user_id.as_i64()),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::CategoryInUse
            }
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Check that `category_id` belongs to `user_id`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if it does not.
pub fn ensure_category_owned(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    match get_category(category_id, user_id, connection) {
        Err(Error::NotFound) => Err(Error::InvalidCategory(category_id)),
        result => result,
    }
}
