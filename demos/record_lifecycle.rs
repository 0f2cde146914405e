//! Record mapper lifecycle example
//!
//! This example defines a concrete mapper for a `task` table and walks the
//! explicit lifecycle: insert, edit, mutate, update, soft delete, probe.
//!
//! Run with: cargo run --example record_lifecycle

use async_trait::async_trait;
use std::sync::Arc;

use rust_record_mapper::prelude::*;

struct TaskColumn;

impl TaskColumn {
    const ID: Column = Column::new("task", "id");
    const TITLE: Column = Column::new("task", "title");
    const DONE: Column = Column::new("task", "done");
    const DELETED: Column = Column::new("task", "deleted");

    const COLUMNS: Columns =
        Columns::new(&[Self::ID, Self::TITLE, Self::DONE, Self::DELETED]);
}

struct TaskMapper {
    database: Arc<dyn Database>,
    where_set: Option<WhereSet>,
    record: Record,
}

impl TaskMapper {
    fn new(database: Arc<dyn Database>) -> Self {
        let record = Self::default_record();
        Self {
            database,
            where_set: None,
            record,
        }
    }

    fn default_record() -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), DatabaseValue::Null);
        record.insert("title".to_string(), DatabaseValue::from(""));
        record.insert("done".to_string(), DatabaseValue::Long(0));
        record.insert("deleted".to_string(), DatabaseValue::Long(0));
        record
    }
}

#[async_trait]
impl TableMapper for TaskMapper {
    fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    fn table_name(&self) -> &'static str {
        "task"
    }

    fn columns(&self) -> Columns {
        TaskColumn::COLUMNS
    }

    fn create_default_record(&self) -> Record {
        Self::default_record()
    }

    fn where_set(&self) -> Option<&WhereSet> {
        self.where_set.as_ref()
    }

    fn set_where_set(&mut self, where_set: WhereSet) {
        self.where_set = Some(where_set);
    }

    fn take_where_set(&mut self) -> Option<WhereSet> {
        self.where_set.take()
    }

    fn validate(&self, record: &Record) -> std::result::Result<(), ValidationError> {
        let mut error = ValidationError::new("task record is invalid");
        if record
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::is_empty)
            .unwrap_or(true)
        {
            error.add_cause(TaskColumn::TITLE, "title is required");
        }
        if error.has_causes() {
            return Err(error);
        }
        Ok(())
    }

    fn normalize(&self, record: &mut Record) {
        if let Some(DatabaseValue::String(title)) = record.get("title").cloned() {
            record.insert(
                "title".to_string(),
                DatabaseValue::from(title.trim().to_string()),
            );
        }
    }
}

#[async_trait]
impl RecordMapper for TaskMapper {
    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn set_record(&mut self, record: Record) {
        self.record = record;
    }

    fn is_deleted(&self, record: &Record) -> bool {
        record
            .get("deleted")
            .and_then(|v| v.as_long())
            .map(|flag| flag != 0)
            .unwrap_or(false)
    }

    async fn delete(&mut self) -> Result<()> {
        self.record_mut()
            .insert("deleted".to_string(), DatabaseValue::Long(1));
        self.update().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Record Mapper - Lifecycle Example ===\n");

    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::new());
    db.connect(":memory:").await?;
    db.execute(
        "CREATE TABLE task (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            done INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0
        )",
    )
    .await?;

    println!("1. Insert a task...");
    let mut mapper = TaskMapper::new(Arc::clone(&db));
    mapper
        .record_mut()
        .insert("title".to_string(), DatabaseValue::from("  write demo  "));
    let mut record = mapper.record().clone();
    mapper.normalize(&mut record);
    mapper.set_record(record);
    mapper.validate(mapper.record())?;
    mapper.insert().await?;
    println!("   ✓ inserted\n");

    println!("2. Edit it back and mark it done...");
    let mut condition = WhereSet::new();
    condition.add_equal("title", "write demo", false);
    mapper.set_where_set(condition);
    mapper.edit().await?;
    mapper
        .record_mut()
        .insert("done".to_string(), DatabaseValue::Long(1));
    mapper.update().await?;
    println!(
        "   ✓ task #{} done\n",
        mapper
            .record()
            .get("id")
            .map(|v| v.as_string())
            .unwrap_or_default()
    );

    println!("3. Probe existence (state is untouched)...");
    println!("   exists: {}\n", mapper.exists().await?);

    println!("4. Soft delete and probe again...");
    mapper.delete().await?;
    println!("   exists (physical rows): {}", mapper.exists().await?);
    let edit_result = mapper.edit().await;
    println!(
        "   edit after delete: {}\n",
        match edit_result {
            Err(ref e) if e.is_not_found() => "row treated as absent".to_string(),
            other => format!("{:?}", other),
        }
    );

    Ok(())
}
