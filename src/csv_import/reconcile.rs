//! Turning CSV rows into transactions, creating missing categories on the way.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    EntryType, Error,
    amount::Amount,
    category::{CategoryId, CategoryName, NewCategory, create_category, find_category_by_name},
    csv_import::CsvRow,
    transaction::{Transaction, create_transaction, parse_description},
    user::UserID,
    validation::{FieldError, ValidationErrors, bounded_text},
};

const IMPORT_DATE_FORMATS: [&[BorrowedFormatItem]; 3] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
    format_description!("[day]/[month]/[year]"),
];

/// Why one row was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// The 1-based data row number.
    pub row: usize,
    /// A message that can be shown to the user.
    pub reason: String,
}

/// The outcome of importing one file.
///
/// `success_count + failed_count` is always the number of data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// How many rows were stored as transactions.
    pub success_count: usize,
    /// How many rows were rejected.
    pub failed_count: usize,
    /// The names of the categories created for this import, in the order
    /// they were first seen.
    pub auto_created_categories: Vec<String>,
    /// Why each rejected row was rejected, in row order.
    pub failures: Vec<RowFailure>,
}

/// A row whose every field is valid.
#[derive(Debug, Clone, PartialEq)]
struct ImportRow {
    row: usize,
    date: Date,
    amount: Amount,
    transaction_type: EntryType,
    category: CategoryName,
    description: Option<String>,
}

/// Parse a date written as `YYYY-MM-DD`, `YYYY/MM/DD` or `DD/MM/YYYY`.
pub fn parse_import_date(value: &str) -> Result<Date, FieldError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(FieldError::new("Date is required"));
    }

    IMPORT_DATE_FORMATS
        .iter()
        .find_map(|format| Date::parse(value, format).ok())
        .ok_or_else(|| {
            FieldError::new(format!(
                "Date \"{value}\" must be in the format YYYY-MM-DD, YYYY/MM/DD or DD/MM/YYYY"
            ))
        })
}

fn parse_amount(value: &str) -> Result<Decimal, FieldError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(FieldError::new("Amount is required"));
    }

    value
        .parse::<Decimal>()
        .map_err(|_| FieldError::new(format!("Amount \"{value}\" is not a number")))
}

/// Decide a row's type and positive amount.
///
/// A type hint requires a positive amount. Without one, negative amounts
/// are expenses and positive amounts are income. Zero is never valid, and
/// the positive amount follows the same rules as amounts sent to the API.
pub fn resolve_type(
    amount: Decimal,
    type_hint: Option<EntryType>,
) -> Result<(Amount, EntryType), FieldError> {
    if amount.is_zero() {
        return Err(FieldError::new("Amount must not be zero"));
    }

    match type_hint {
        Some(_) if amount.is_sign_negative() => Err(FieldError::new(
            "Amount must be greater than zero when a type is given",
        )),
        Some(transaction_type) => Ok((Amount::new(Some(amount))?, transaction_type)),
        None if amount.is_sign_negative() => {
            Ok((Amount::new(Some(amount.abs()))?, EntryType::Expense))
        }
        None => Ok((Amount::new(Some(amount))?, EntryType::Income)),
    }
}

fn validate_row(raw: CsvRow) -> Result<ImportRow, RowFailure> {
    let mut errors = ValidationErrors::new();

    let date = errors.check("date", parse_import_date(&raw.date));
    let amount = errors.check("amount", parse_amount(&raw.amount));
    let type_hint = errors.check_optional("type", raw.type_hint, |hint| hint.parse::<EntryType>());
    let category = errors.check(
        "category",
        bounded_text(&raw.category, "Category", 2, 50)
            .map(|name| CategoryName::new_unchecked(&name)),
    );
    let description = errors.check_optional("description", raw.description, parse_description);

    let resolved = match (amount, type_hint) {
        (Some(amount), Some(type_hint)) => errors.check("amount", resolve_type(amount, type_hint)),
        _ => None,
    };

    match (date, resolved, category, description) {
        (Some(date), Some((amount, transaction_type)), Some(category), Some(description))
            if errors.is_empty() =>
        {
            Ok(ImportRow {
                row: raw.row,
                date,
                amount,
                transaction_type,
                category,
                description: description.flatten(),
            })
        }
        _ => Err(RowFailure {
            row: raw.row,
            reason: errors
                .violations()
                .iter()
                .map(|violation| violation.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }),
    }
}

/// Find or create a category for every distinct name in `rows`.
///
/// Names are matched ignoring case. A new category takes the type of the
/// first row that names it.
fn resolve_categories(
    user_id: UserID,
    rows: &[ImportRow],
    connection: &Connection,
) -> Result<(HashMap<String, CategoryId>, Vec<String>), Error> {
    let mut category_ids = HashMap::new();
    let mut created = Vec::new();

    for row in rows {
        let key = row.category.key();

        if category_ids.contains_key(&key) {
            continue;
        }

        let category_id = match find_category_by_name(user_id, row.category.as_ref(), connection)? {
            Some(category) => category.id,
            None => {
                let category = create_category(
                    user_id,
                    NewCategory::with_defaults(row.category.clone(), row.transaction_type),
                    connection,
                )?;
                tracing::debug!("created category \"{}\" during import", category.name);
                created.push(category.name.as_ref().to_owned());
                category.id
            }
        };

        category_ids.insert(key, category_id);
    }

    Ok((category_ids, created))
}

/// Import `rows` as transactions for `user_id`.
///
/// Invalid rows are counted and described in the result. They never stop
/// the other rows from being imported. Pass a database transaction as
/// `connection` to make the import all or nothing.
///
/// # Errors
/// Returns an error only if the database fails.
pub fn import_rows(
    user_id: UserID,
    rows: Vec<CsvRow>,
    connection: &Connection,
) -> Result<ImportResult, Error> {
    let mut failures = Vec::new();
    let mut valid_rows = Vec::new();

    for raw in rows {
        match validate_row(raw) {
            Ok(row) => valid_rows.push(row),
            Err(failure) => failures.push(failure),
        }
    }

    let (category_ids, auto_created_categories) =
        resolve_categories(user_id, &valid_rows, connection)?;

    let mut success_count = 0;

    for row in valid_rows {
        let Some(&category_id) = category_ids.get(&row.category.key()) else {
            failures.push(RowFailure {
                row: row.row,
                reason: format!("Category \"{}\" could not be resolved", row.category),
            });
            continue;
        };

        let builder = Transaction::build(row.amount, row.transaction_type, row.date, category_id)
            .description(row.description);
        create_transaction(user_id, builder, connection)?;
        success_count += 1;
    }

    failures.sort_by_key(|failure| failure.row);

    Ok(ImportResult {
        success_count,
        failed_count: failures.len(),
        auto_created_categories,
        failures,
    })
}

#[cfg(test)]
mod resolve_type_tests {
    use rust_decimal::Decimal;

    use crate::{EntryType, amount::MAX_AMOUNT, csv_import::resolve_type};

    #[test]
    fn sign_decides_without_hint() {
        let (amount, transaction_type) = resolve_type(Decimal::new(-1250, 2), None).unwrap();
        assert_eq!(amount.value(), Decimal::new(1250, 2));
        assert_eq!(transaction_type, EntryType::Expense);

        let (amount, transaction_type) = resolve_type(Decimal::from(100), None).unwrap();
        assert_eq!(amount.value(), Decimal::from(100));
        assert_eq!(transaction_type, EntryType::Income);
    }

    #[test]
    fn hint_requires_positive_amount() {
        assert!(resolve_type(Decimal::from(-5), Some(EntryType::Expense)).is_err());

        let (_, transaction_type) =
            resolve_type(Decimal::from(5), Some(EntryType::Expense)).unwrap();
        assert_eq!(transaction_type, EntryType::Expense);
    }

    #[test]
    fn zero_is_never_valid() {
        assert!(resolve_type(Decimal::ZERO, None).is_err());
        assert!(resolve_type(Decimal::ZERO, Some(EntryType::Income)).is_err());
    }

    #[test]
    fn amounts_over_the_maximum_are_rejected_either_sign() {
        let huge = MAX_AMOUNT + Decimal::ONE;

        assert!(resolve_type(huge, None).is_err());
        assert!(resolve_type(-huge, None).is_err());
        assert!(resolve_type(huge, Some(EntryType::Expense)).is_err());
        assert!(resolve_type(-MAX_AMOUNT, None).is_ok());
    }
}
