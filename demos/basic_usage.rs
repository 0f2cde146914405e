//! Basic usage example
//!
//! This example demonstrates the layer without mappers:
//! - Connecting to a database
//! - Building conditions with WhereSet
//! - Parameterized fetches and updates
//!
//! Run with: cargo run --example basic_usage

use rust_record_mapper::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Record Mapper - Basic Usage Example ===\n");

    // Create a new SQLite database (in-memory)
    let db = SqliteDatabase::new();

    println!("1. Connecting to database...");
    db.connect(":memory:").await?;
    println!("   ✓ Connected\n");

    println!("2. Creating table...");
    db.execute(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            age INTEGER,
            is_active INTEGER DEFAULT 1
        )",
    )
    .await?;
    println!("   ✓ Table created\n");

    println!("3. Inserting records...");
    for (username, email, age) in [
        ("alice", "alice@example.com", 30i64),
        ("bob", "bob@example.com", 25),
        ("carol", "carol@example.com", 41),
    ] {
        let mut record = Record::new();
        record.insert("username".to_string(), DatabaseValue::from(username));
        record.insert("email".to_string(), DatabaseValue::from(email));
        record.insert("age".to_string(), DatabaseValue::from(age));
        db.insert(&record, "users").await?;
    }
    println!("   ✓ {} rows\n", db.count("users").await?);

    println!("4. Querying with a condition set...");
    let mut condition = WhereSet::new();
    condition.add_greater_equal("age", 30, false);
    condition.add_equal("is_active", SqliteDatabase::BOOLEAN_TRUE, false);

    let sql = format!(
        "SELECT * FROM users WHERE {} ORDER BY age",
        condition.build_parameter_clause()
    );
    let rows = db.fetch_records(&sql, &condition.build_parameters()).await?;
    for row in &rows {
        println!(
            "   {} <{}> age {}",
            row.get("username").map(|v| v.as_string()).unwrap_or_default(),
            row.get("email").map(|v| v.as_string()).unwrap_or_default(),
            row.get("age").map(|v| v.as_string()).unwrap_or_default(),
        );
    }
    println!();

    println!("5. Updating through a condition...");
    let mut scope = WhereSet::new();
    scope.add_equal("username", "bob", false);
    let mut changes = Record::new();
    changes.insert("age".to_string(), DatabaseValue::from(26i64));
    let affected = db.update(&changes, "users", &scope).await?;
    println!("   ✓ {} row updated\n", affected);

    println!("6. Introspection...");
    println!("   table exists: {}", db.exists_table("users").await?);
    println!("   columns: {:?}", db.fetch_column_names("users").await?);
    println!(
        "   last auto-increment id: {}",
        db.last_auto_increment_id().await?.as_string()
    );

    Ok(())
}
