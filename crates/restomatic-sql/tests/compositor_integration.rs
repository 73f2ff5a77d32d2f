//! Integration tests for the query compositor
//!
//! Runs builders end to end against a file-backed SQLite database.

use restomatic_sql::{
    CompositorError, Database, DatabaseConfig, ErrorKind, Filterable, MappedRows, OrderBy,
    SchemaRegistry, Selector, Statement, TableSchema,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::TempDir;

const USERS_DDL: &str = r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER,
        status TEXT,
        avatar BLOB
    );
"#;

fn registry() -> Arc<SchemaRegistry> {
    let users = TableSchema::new("users", ["id", "name", "age", "status", "avatar"])
        .unwrap()
        .with_preprocessor("name", |v, _| Ok(json!(v.as_str().unwrap_or_default().trim())))
        .unwrap()
        .with_postprocessor("status", |v, _| match v {
            Value::String(s) => Ok(json!(s.to_uppercase())),
            other => Ok(other),
        })
        .unwrap();
    Arc::new(SchemaRegistry::new().with_table(users).unwrap())
}

/// Setup helper: file database with three users committed
fn setup_with_users() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(DatabaseConfig::new(dir.path().join("users.db")), registry()).unwrap();
    db.execute_batch(USERS_DDL).unwrap();

    db.insert("users", ["id", "name", "age", "status"])
        .unwrap()
        .values_and_run(vec![
            vec![json!(1), json!("ann"), json!(31), json!("active")],
            vec![json!(2), json!("bo"), json!(17), json!("active")],
            vec![json!(3), json!("cy"), json!(45), json!("banned")],
        ])
        .unwrap();
    db.commit(false).unwrap();

    (dir, db)
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_mapped_insert_then_select_by_key() {
    let (_dir, db) = setup_with_users();

    let result = db
        .insert_mapped_and_run("users", object(json!({"id": 10, "name": "  dee  ", "age": 22})))
        .unwrap();
    assert_eq!(result.changes(), 1);
    assert_eq!(result.last_insert_rowid(), 10);
    db.commit(false).unwrap();

    let row = db
        .select("users")
        .unwrap()
        .columns(["id", "name", "age", "status"])
        .unwrap()
        .by_id(10)
        .unwrap()
        .one_mapped()
        .unwrap();

    assert_eq!(
        row,
        object(json!({"id": 10, "name": "dee", "age": 22, "status": null}))
    );
}

#[test]
fn test_batch_insert_from_json() {
    let (_dir, db) = setup_with_users();
    let rows = MappedRows::try_from(&json!([
        {"id": 4, "name": "ed"},
        {"id": 5, "name": "flo", "status": "active"}
    ]))
    .unwrap();

    let result = db.insert_mapped_and_run("users", rows).unwrap();
    assert_eq!(result.changes(), 2);

    let count = db.select_all("users").unwrap().count().unwrap().scalar().unwrap();
    assert_eq!(count, json!(5));
}

#[test]
fn test_blob_read_back_as_hex() {
    let (_dir, db) = setup_with_users();
    db.connection()
        .execute("UPDATE users SET avatar = x'CAFE' WHERE id = 1", [])
        .unwrap();

    let avatar = db
        .select("users")
        .unwrap()
        .columns("avatar")
        .unwrap()
        .by_id(1)
        .unwrap()
        .scalar()
        .unwrap();
    assert_eq!(avatar, json!("cafe"));
}

// =============================================================================
// Filtering and ordering
// =============================================================================

#[test]
fn test_conjunction_filters_rows() {
    let (_dir, db) = setup_with_users();

    let rows = db
        .select("users")
        .unwrap()
        .columns(["name"])
        .unwrap()
        .filter_json(&json!({"and": [["age", "gte", 18], ["status", "eq", "active"]]}))
        .unwrap()
        .all()
        .unwrap();

    assert_eq!(rows, vec![vec![json!("ann")]]);
}

#[test]
fn test_order_limit_offset() {
    let (_dir, db) = setup_with_users();

    let rows = db
        .select("users")
        .unwrap()
        .columns(["id"])
        .unwrap()
        .order_by([OrderBy::desc("age")])
        .unwrap()
        .limit(2)
        .unwrap()
        .offset(1)
        .unwrap()
        .all()
        .unwrap();

    assert_eq!(rows, vec![vec![json!(1)], vec![json!(2)]]);
}

#[test]
fn test_in_and_null_checks() {
    let (_dir, db) = setup_with_users();

    let ids = db
        .select("users")
        .unwrap()
        .columns("id")
        .unwrap()
        .filter(Selector::and([
            Selector::is_in("id", [1, 3]),
            Selector::is_null("avatar"),
        ]))
        .unwrap()
        .order_by(["id"])
        .unwrap()
        .all()
        .unwrap();

    assert_eq!(ids, vec![vec![json!(1)], vec![json!(3)]]);
}

#[test]
fn test_injection_attempt_is_just_a_value() {
    let (_dir, db) = setup_with_users();

    let rows = db
        .select_all("users")
        .unwrap()
        .filter(Selector::eq("name", "ann' OR '1'='1"))
        .unwrap()
        .all()
        .unwrap();

    assert!(rows.is_empty());
}

// =============================================================================
// Result view
// =============================================================================

#[test]
fn test_postprocessor_runs_on_read() {
    let (_dir, db) = setup_with_users();

    let status = db
        .select("users")
        .unwrap()
        .columns(["status"])
        .unwrap()
        .by_id(3)
        .unwrap()
        .scalar()
        .unwrap();

    assert_eq!(status, json!("BANNED"));
}

#[test]
fn test_count_skips_postprocessors() {
    let (_dir, db) = setup_with_users();

    let count = db
        .select("users")
        .unwrap()
        .columns(["status"])
        .unwrap()
        .count()
        .unwrap()
        .scalar()
        .unwrap();

    assert_eq!(count, json!(3));
}

#[test]
fn test_one_variants() {
    let (_dir, db) = setup_with_users();
    let select = |selector: Selector| {
        db.select_all("users")
            .unwrap()
            .filter(selector)
            .unwrap()
    };

    assert!(select(Selector::eq("id", 1)).one().is_ok());
    assert!(matches!(
        select(Selector::eq("id", 99)).one(),
        Err(CompositorError::NoRows)
    ));
    assert_eq!(select(Selector::eq("id", 99)).one_or_none().unwrap(), None);
    assert!(matches!(
        select(Selector::eq("status", "active")).one_or_none(),
        Err(CompositorError::TooManyRows)
    ));
}

#[test]
fn test_rows_walk_once() {
    let (_dir, db) = setup_with_users();
    let mut result = db.select_all("users").unwrap().run().unwrap();

    let first_pass = result.rows().unwrap().count();
    assert_eq!(first_pass, 3);

    assert!(matches!(result.rows(), Err(CompositorError::ResultConsumed)));
}

#[test]
fn test_scalar_requires_one_column() {
    let (_dir, db) = setup_with_users();
    let result = db.select_all("users").unwrap().by_id(1).unwrap().scalar();
    assert!(matches!(result, Err(CompositorError::NotScalar(5))));
}

// =============================================================================
// Writes and transactions
// =============================================================================

#[test]
fn test_update_and_delete_report_changes() {
    let (_dir, db) = setup_with_users();

    let updated = db
        .update_mapped("users", [("status", "idle")])
        .unwrap()
        .filter(Selector::lt("age", 40))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(updated.changes(), 2);

    let deleted = db
        .delete("users")
        .unwrap()
        .filter(Selector::eq("status", "idle"))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(deleted.changes(), 2);
    db.commit(false).unwrap();

    let remaining = db.select("users").unwrap().columns("id").unwrap().all().unwrap();
    assert_eq!(remaining, vec![vec![json!(3)]]);
}

#[test]
fn test_uncommitted_writes_invisible_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tx.db");
    {
        let db = Database::open(DatabaseConfig::new(&path), registry()).unwrap();
        db.execute_batch(USERS_DDL).unwrap();
        db.insert("users", ["id", "name"])
            .unwrap()
            .values_and_run(vec![json!(1), json!("kept")])
            .unwrap();
        db.commit(false).unwrap();
        db.insert("users", ["id", "name"])
            .unwrap()
            .values_and_run(vec![json!(2), json!("dropped")])
            .unwrap();
        db.close().unwrap();
    }

    let db = Database::open(DatabaseConfig::new(&path), registry()).unwrap();
    let names = db.select("users").unwrap().columns("name").unwrap().all().unwrap();
    assert_eq!(names, vec![vec![json!("kept")]]);
}

// =============================================================================
// Misuse
// =============================================================================

#[test]
fn test_builder_misuse_kinds() {
    let (_dir, db) = setup_with_users();

    let err = db
        .select_all("users")
        .unwrap()
        .limit(5)
        .unwrap()
        .limit(6)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::BuilderMisuse);

    let err = db.select("users").unwrap().all().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::BuilderMisuse);

    let err = db
        .select_all("users")
        .unwrap()
        .filter_json(&json!(["age", "between", 1]))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.status_code(), 400);
}
