use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, Duration, OffsetDateTime};

use fintrack::{
    Amount, EntryType, PasswordHash, ValidatedPassword,
    budget::{BudgetPeriod, NewBudget, create_budget},
    category::{Category, CategoryName, NewCategory, create_category},
    initialize_db,
    transaction::{Transaction, create_transaction},
    user::{Email, NewUser, PersonName, UserID, create_user},
};

/// The email of the demo user.
const DEMO_EMAIL: &str = "demo@example.com";
/// The password of the demo user.
const DEMO_PASSWORD: &str = "Demo1234";

/// A utility for creating a test database for the REST API server of fintrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo user {DEMO_EMAIL} with password {DEMO_PASSWORD}...");
    let user = create_user(
        NewUser {
            email: Email::new(DEMO_EMAIL)?,
            name: PersonName::new("Demo User")?,
            password_hash: PasswordHash::new(
                ValidatedPassword::new(DEMO_PASSWORD)?,
                PasswordHash::DEFAULT_COST,
            )?,
        },
        &conn,
    )?;

    println!("Creating categories...");
    let salary = demo_category(user.id, "Salary", EntryType::Income, &conn)?;
    let groceries = demo_category(user.id, "Groceries", EntryType::Expense, &conn)?;
    let transport = demo_category(user.id, "Transport", EntryType::Expense, &conn)?;
    let entertainment = demo_category(user.id, "Entertainment", EntryType::Expense, &conn)?;

    println!("Creating transactions...");
    let today = OffsetDateTime::now_utc().date();
    let mut transaction_count = 0;

    for week in 0..12 {
        let date = today - Duration::weeks(week);

        if week % 2 == 0 {
            demo_transaction(user.id, &salary, 2_500_00, date, "Pay day", &conn)?;
            transaction_count += 1;
        }

        demo_transaction(user.id, &groceries, 142_37 + week * 311, date, "Supermarket", &conn)?;
        demo_transaction(user.id, &transport, 45_00, date, "Bus pass top-up", &conn)?;
        demo_transaction(user.id, &entertainment, 18_99, date, "Streaming", &conn)?;
        transaction_count += 3;
    }

    println!("Creating budgets...");
    let start_date = today - Duration::weeks(12);

    create_budget(
        user.id,
        NewBudget {
            category_id: groceries.id,
            amount: Amount::new_unchecked(Decimal::new(600_00, 2)),
            period: BudgetPeriod::Monthly,
            start_date,
            end_date: None,
        },
        &conn,
    )?;
    create_budget(
        user.id,
        NewBudget {
            category_id: transport.id,
            amount: Amount::new_unchecked(Decimal::new(50_00, 2)),
            period: BudgetPeriod::Weekly,
            start_date,
            end_date: None,
        },
        &conn,
    )?;
    create_budget(
        user.id,
        NewBudget {
            category_id: entertainment.id,
            amount: Amount::new_unchecked(Decimal::new(150_00, 2)),
            period: BudgetPeriod::Custom,
            start_date,
            end_date: Some(today + Duration::weeks(4)),
        },
        &conn,
    )?;

    println!("Created 4 categories, {transaction_count} transactions and 3 budgets.");
    println!("Success!");

    Ok(())
}

fn demo_category(
    user_id: UserID,
    name: &str,
    category_type: EntryType,
    conn: &Connection,
) -> Result<Category, fintrack::Error> {
    create_category(
        user_id,
        NewCategory::with_defaults(CategoryName::new_unchecked(name), category_type),
        conn,
    )
}

fn demo_transaction(
    user_id: UserID,
    category: &Category,
    cents: i64,
    date: Date,
    description: &str,
    conn: &Connection,
) -> Result<Transaction, fintrack::Error> {
    let builder = Transaction::build(
        Amount::new_unchecked(Decimal::new(cents, 2)),
        category.category_type,
        date,
        category.id,
    )
    .description(Some(description.to_owned()));

    create_transaction(user_id, builder, conn)
}
