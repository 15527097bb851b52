#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Actor, CreateVendorCmd, Engine, Role, SubmitInvoiceCmd, notify::MemoryNotifier,
    storage::MemoryAttachmentStore,
};
use migration::MigratorTrait;

pub struct TestHarness {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub notifier: Arc<MemoryNotifier>,
    pub store: Arc<MemoryAttachmentStore>,
}

pub async fn engine_with_db() -> TestHarness {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let notifier = Arc::new(MemoryNotifier::new());
    let store = Arc::new(MemoryAttachmentStore::new());
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(notifier.clone())
        .attachments(store.clone())
        .build()
        .await
        .unwrap();

    TestHarness {
        engine,
        db,
        notifier,
        store,
    }
}

/// Inserts a user row and returns the matching actor.
pub async fn seed_user(db: &DatabaseConnection, username: &str, role: Role) -> Actor {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, role, active) VALUES (?, ?, ?)",
        vec![username.into(), role.as_str().into(), true.into()],
    ))
    .await
    .unwrap();

    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT id FROM users WHERE username = ?",
            vec![username.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let id: i32 = row.try_get("", "id").unwrap();
    Actor::new(id, role)
}

pub async fn seed_eur(engine: &Engine, admin: &Actor) {
    engine
        .create_currency("EUR", "Euro", 2, admin)
        .await
        .unwrap();
}

/// A vendor created by a privileged actor, hence born approved.
pub async fn approved_vendor(engine: &Engine, admin: &Actor, name: &str) -> i32 {
    engine
        .create_vendor(CreateVendorCmd::new(name), admin, Utc::now())
        .await
        .unwrap()
        .id
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).unwrap()
}

pub fn invoice_cmd(invoice_number: &str, vendor_id: i32, amount_minor: i64) -> SubmitInvoiceCmd {
    SubmitInvoiceCmd::new(invoice_number, vendor_id, amount_minor, "EUR", day(2026, 7, 1))
}

/// Inserts an attachment row directly; upload handling is outside the engine.
pub async fn seed_attachment(
    db: &DatabaseConnection,
    invoice_id: i32,
    file_name: &str,
    storage_path: &str,
    uploaded_by: i32,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO attachments (invoice_id, file_name, storage_path, uploaded_by, uploaded_at) \
         VALUES (?, ?, ?, ?, ?)",
        vec![
            invoice_id.into(),
            file_name.into(),
            storage_path.into(),
            uploaded_by.into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();
}

pub async fn count_rows(db: &DatabaseConnection, table: &str, invoice_id: i32) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            format!("SELECT COUNT(*) AS cnt FROM {table} WHERE invoice_id = ?"),
            vec![invoice_id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "cnt").unwrap()
}
