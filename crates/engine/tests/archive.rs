mod common;

use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};

use common::{
    approved_vendor, count_rows, day, engine_with_db, invoice_cmd, seed_attachment, seed_eur,
    seed_user,
};
use engine::{EngineError, RecordPaymentCmd, Role, UpdateInvoiceCmd};

#[tokio::test]
async fn archive_relocates_files_and_writes_a_manifest() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;

    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    seed_attachment(&h.db, invoice.id, "scan.pdf", "uploads/scan.pdf", admin.id).await;

    h.engine
        .archive_invoice(invoice.id, "fiscal year 2025 closed", &admin, Utc::now())
        .await
        .unwrap();

    let archived = h.engine.invoice(invoice.id).await.unwrap();
    assert!(archived.archived);
    assert_eq!(archived.archived_by, Some(admin.id));

    let expected_dest = format!("archive/{}/scan.pdf", invoice.id);
    assert_eq!(
        h.store.moves(),
        vec![("uploads/scan.pdf".to_string(), expected_dest.clone())]
    );
    assert!(h.store.contains(&format!("archive/{}/invoice.json", invoice.id)));

    // The row follows the file.
    let backend = h.db.get_database_backend();
    let row = h
        .db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT storage_path FROM attachments WHERE invoice_id = ?",
            vec![invoice.id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let path: String = row.try_get("", "storage_path").unwrap();
    assert_eq!(path, expected_dest);
}

#[tokio::test]
async fn failed_file_moves_never_abort_the_archive() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;

    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    seed_attachment(&h.db, invoice.id, "scan.pdf", "uploads/scan.pdf", admin.id).await;

    h.store.set_failing(true);
    h.engine
        .archive_invoice(invoice.id, "fiscal year 2025 closed", &admin, Utc::now())
        .await
        .unwrap();

    // Archived anyway; the file stays where it was.
    let archived = h.engine.invoice(invoice.id).await.unwrap();
    assert!(archived.archived);
    assert!(h.store.moves().is_empty());

    let backend = h.db.get_database_backend();
    let row = h
        .db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT storage_path FROM attachments WHERE invoice_id = ?",
            vec![invoice.id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let path: String = row.try_get("", "storage_path").unwrap();
    assert_eq!(path, "uploads/scan.pdf");
}

#[tokio::test]
async fn archived_invoices_are_immutable() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;

    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    h.engine
        .archive_invoice(invoice.id, "fiscal year 2025 closed", &admin, Utc::now())
        .await
        .unwrap();

    // Again: state conflict.
    let err = h
        .engine
        .archive_invoice(invoice.id, "fiscal year 2025 closed", &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("invoice is already archived".to_string())
    );

    let err = h
        .engine
        .update_invoice(UpdateInvoiceCmd::new(invoice.id).amount_minor(1), &admin)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("invoice is archived".to_string())
    );

    let err = h
        .engine
        .record_payment(
            RecordPaymentCmd::new(invoice.id, 1_000, day(2026, 7, 5)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("invoice is archived".to_string())
    );
}

#[tokio::test]
async fn permanent_deletion_is_super_admin_only_and_total() {
    let h = engine_with_db().await;
    let root = seed_user(&h.db, "root", Role::SuperAdmin).await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;

    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    h.engine
        .record_payment(
            RecordPaymentCmd::new(invoice.id, 4_000, day(2026, 7, 5)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();
    seed_attachment(&h.db, invoice.id, "scan.pdf", "uploads/scan.pdf", admin.id).await;

    let err = h
        .engine
        .permanently_delete_invoice(invoice.id, "entered in the wrong tenant", &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unauthorized("Super admin".to_string()));

    h.engine
        .permanently_delete_invoice(invoice.id, "entered in the wrong tenant", &root, Utc::now())
        .await
        .unwrap();

    let err = h.engine.invoice(invoice.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("invoice".to_string()));
    assert_eq!(count_rows(&h.db, "payments", invoice.id).await, 0);
    assert_eq!(count_rows(&h.db, "attachments", invoice.id).await, 0);
    assert_eq!(count_rows(&h.db, "comments", invoice.id).await, 0);

    // Files went to the deleted area and the tombstone survives.
    assert_eq!(
        h.store.moves(),
        vec![(
            "uploads/scan.pdf".to_string(),
            format!("deleted/{}/scan.pdf", invoice.id)
        )]
    );
    assert_eq!(count_rows(&h.db, "deletion_log", invoice.id).await, 1);
}
