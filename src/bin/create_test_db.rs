use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use tally_rs::{
    NewRecord, PasswordHash, Username, ValidatedPassword, create_record, create_user,
    initialize_db,
};

/// A utility for creating a test database for tally_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// How many days of records to generate, counting back from today.
const DAYS_OF_RECORDS: i64 = 90;

const EXPENSE_CATEGORIES: [(&str, &str); 5] = [
    ("food", "12.50"),
    ("transport", "4.20"),
    ("entertainment", "25.00"),
    ("utilities", "80.15"),
    ("", "3.99"),
];

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

    println!("Creating test user \"test\" with the password \"test\"...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(Username::new_unchecked("test"), password_hash, None, &conn)?;

    println!("Creating records for the last {DAYS_OF_RECORDS} days...");

    let today = OffsetDateTime::now_utc().date();
    let mut count = 0;

    for days_ago in 0..DAYS_OF_RECORDS {
        let date = today - Duration::days(days_ago);
        let date_text = date.to_string();

        if date.day() == 1 {
            let salary =
                NewRecord::parse(Some(user.id), "income", "4200", "salary", &date_text, "")?;
            let rent = NewRecord::parse(
                Some(user.id),
                "expense",
                "1650",
                "rent",
                &date_text,
                "monthly rent",
            )?;
            create_record(salary, &conn)?;
            create_record(rent, &conn)?;
            count += 2;
        }

        // One expense every other day, cycling through the categories.
        if days_ago % 2 == 0 {
            let (category, amount) =
                EXPENSE_CATEGORIES[(days_ago / 2) as usize % EXPENSE_CATEGORIES.len()];
            let expense =
                NewRecord::parse(Some(user.id), "expense", amount, category, &date_text, "")?;
            create_record(expense, &conn)?;
            count += 1;
        }
    }

    println!("Created {count} records.");
    println!("Success!");

    Ok(())
}
