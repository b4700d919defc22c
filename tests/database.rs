use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rowdb::{Constraint, Database, DataType, DbConfig, DbError, RowFilter, Schema, Value};
use tempfile::TempDir;

fn test_schema() -> Arc<Schema> {
    Schema::builder("TestTable")
        .column_with("id", DataType::Integer, &[Constraint::PrimaryKey])
        .column("str", DataType::Text)
        .column("date", DataType::DateTime)
        .column("num", DataType::Int)
        .build()
        .unwrap()
}

fn open_db(path: &Path, schemas: Vec<Arc<Schema>>) -> Result<Database> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut db = Database::new(DbConfig::new(path, schemas))?;
    db.init()?;
    Ok(db)
}

#[test]
fn init_creates_database_when_missing() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("test.db");
    assert!(!path.exists());

    let db = open_db(&path, vec![test_schema()])?;
    assert!(db.is_ready());
    assert!(path.exists());
    assert_eq!(db.list_tables()?, vec!["TestTable".to_string()]);
    Ok(())
}

#[test]
fn init_loads_database_when_present() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("test.db");

    let schema = test_schema();
    let db = open_db(&path, vec![schema.clone()])?;
    db.upsert(&schema.new_row().with("num", 7)?)?;
    drop(db);

    let db = open_db(&path, vec![schema.clone()])?;
    assert_eq!(db.list_tables()?, vec!["TestTable".to_string()]);
    assert_eq!(db.read_all_rows(&schema)?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn init_async_matches_sync_init() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("test.db");

    let mut db = Database::new(DbConfig::new(&path, vec![test_schema()]))?;
    assert!(!db.is_ready());
    db.init_async().await?;
    assert!(db.is_ready());
    assert!(path.exists());
    Ok(())
}

#[test]
fn operations_before_init_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = Database::new(DbConfig::new(
        dir.path().join("test.db"),
        vec![schema.clone()],
    ))?;
    assert!(matches!(
        db.upsert(&schema.new_row().with("num", 1)?),
        Err(DbError::NotReady)
    ));
    assert!(matches!(db.list_tables(), Err(DbError::NotReady)));
    Ok(())
}

#[test]
fn duplicate_table_names_are_rejected() -> Result<()> {
    let result = Database::new(DbConfig::new(
        "unused.db",
        vec![test_schema(), test_schema()],
    ));
    assert!(matches!(result, Err(DbError::InvalidSchema { .. })));
    Ok(())
}

#[test]
fn upsert_then_read_round_trips() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let entity = schema
        .new_row()
        .with("num", 7)?
        .with("str", "string")?
        .with("date", date)?;
    db.upsert(&entity)?;

    let rows = db.read_all_rows(&schema)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("num"), Some(&Value::Integer(7)));
    assert_eq!(rows[0].get("str"), Some(&Value::Text("string".into())));
    // Day granularity only; time of day is dropped by design.
    assert_eq!(rows[0].get("date"), Some(&Value::Date(date)));
    // The omitted primary key falls back to the engine's rowid.
    assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    Ok(())
}

#[test]
fn zero_valued_filter_field_is_not_treated_as_unset() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    db.upsert(&schema.new_row().with("id", 1)?.with("num", 0)?)?;
    db.upsert(&schema.new_row().with("id", 2)?.with("num", 1)?)?;
    db.upsert(&schema.new_row().with("id", 3)?)?;

    let matches = db.read_rows(&schema.new_row().with("num", 0)?, None)?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get("id"), Some(&Value::Integer(1)));
    Ok(())
}

#[test]
fn count_and_sum_respect_the_filter() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    db.upsert(&schema.new_row().with("num", 10)?.with("str", "thing1")?)?;
    db.upsert(&schema.new_row().with("num", 20)?.with("str", "thing1")?)?;
    db.upsert(&schema.new_row().with("num", 30)?.with("str", "thing2")?)?;

    assert_eq!(db.count(&schema.new_row(), None)?, 3);
    assert_eq!(db.sum(&schema.new_row(), "num", None)?, 60.0);

    let filter = schema.new_row().with("str", "thing1")?;
    assert_eq!(db.count(&filter, None)?, 2);
    assert_eq!(db.sum(&filter, "num", None)?, 30.0);

    // No matching rows sums to zero rather than failing.
    let none = schema.new_row().with("str", "absent")?;
    assert_eq!(db.sum(&none, "num", None)?, 0.0);
    assert_eq!(db.count(&none, None)?, 0);
    Ok(())
}

#[test]
fn summing_a_non_numeric_column_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;
    db.upsert(&schema.new_row().with("num", 10)?.with("str", "a")?)?;

    assert!(matches!(
        db.sum(&schema.new_row(), "str", None),
        Err(DbError::NonNumericSum { .. })
    ));
    assert!(matches!(
        db.sum(&schema.new_row(), "missing", None),
        Err(DbError::UnknownColumn { .. })
    ));
    Ok(())
}

#[test]
fn raw_predicates_accept_any_where_spelling() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    db.upsert(&schema.new_row().with("str", "str1")?.with("num", 4)?)?;
    db.upsert(&schema.new_row().with("str", "str2")?.with("num", 5)?)?;

    for raw in ["str = 'str1'", "where str = 'str1'", "WHERE str = 'str1'"] {
        let rows = db.read_rows_where(&schema, raw)?;
        assert_eq!(rows.len(), 1, "predicate: {raw:?}");
        assert_eq!(rows[0].get("num"), Some(&Value::Integer(4)));
        assert_eq!(db.sum_where(&schema, "num", raw)?, 4.0);
    }
    Ok(())
}

#[test]
fn new_columns_are_added_without_losing_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("test.db");

    let v1 = Schema::builder("TestTable")
        .column_with("id", DataType::Integer, &[Constraint::PrimaryKey])
        .column("str", DataType::Text)
        .build()
        .unwrap();
    let db = open_db(&path, vec![v1.clone()])?;
    db.upsert(&v1.new_row().with("id", 1)?.with("str", "kept")?)?;
    drop(db);

    // The entity type grows a column; re-initializing migrates in place.
    let v2 = test_schema();
    let db = open_db(&path, vec![v2.clone()])?;
    let columns = db.list_columns(&v2)?;
    assert!(columns.contains(&"date".to_string()));
    assert!(columns.contains(&"num".to_string()));

    let rows = db.read_all_rows(&v2)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("str"), Some(&Value::Text("kept".into())));
    assert!(!rows[0].is_set("num"));
    drop(db);

    // Reconciling a third time changes nothing.
    let db = open_db(&path, vec![v2.clone()])?;
    assert_eq!(db.list_columns(&v2)?, columns);
    assert_eq!(db.read_all_rows(&v2)?.len(), 1);
    Ok(())
}

#[test]
fn delete_refuses_an_empty_predicate() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    db.upsert(&schema.new_row().with("id", 1)?.with("num", 0)?)?;
    db.upsert(&schema.new_row().with("id", 2)?.with("num", 5)?)?;

    // Nothing set: refused, nothing executed.
    assert_eq!(db.delete(&schema.new_row())?, 0);
    // Only falsy fields set: still refused.
    assert_eq!(db.delete(&schema.new_row().with("num", 0)?)?, 0);
    assert_eq!(db.count(&schema.new_row(), None)?, 2);

    // A truthy field deletes as usual.
    assert_eq!(db.delete(&schema.new_row().with("id", 2)?)?, 1);
    assert_eq!(db.count(&schema.new_row(), None)?, 1);
    Ok(())
}

#[test]
fn date_bounds_and_sort_order_shape_the_result() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    let days = [
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    ];
    for (i, day) in days.iter().enumerate() {
        db.upsert(
            &schema
                .new_row()
                .with("id", i as i64 + 1)?
                .with("num", i as i64)?
                .with("date", *day)?,
        )?;
    }

    let filter = RowFilter::new()
        .since(days[1])
        .until(days[2])
        .on_field("date")
        .sort_by("num")
        .descending();
    let rows = db.read_rows(&schema.new_row(), Some(&filter))?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("num"), Some(&Value::Integer(2)));
    assert_eq!(rows[1].get("num"), Some(&Value::Integer(1)));

    // Bounds are inclusive.
    let exact = RowFilter::new().since(days[0]).until(days[0]).on_field("date");
    assert_eq!(db.count(&schema.new_row(), Some(&exact))?, 1);
    Ok(())
}

#[test]
fn upsert_by_primary_key_replaces_the_row() -> Result<()> {
    let dir = TempDir::new()?;
    let schema = test_schema();
    let db = open_db(&dir.path().join("test.db"), vec![schema.clone()])?;

    db.upsert(&schema.new_row().with("id", 1)?.with("num", 1)?)?;
    db.upsert(&schema.new_row().with("id", 1)?.with("num", 2)?)?;

    let rows = db.read_all_rows(&schema)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("num"), Some(&Value::Integer(2)));
    Ok(())
}
