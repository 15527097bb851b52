mod common;

use chrono::Utc;

use common::{approved_vendor, engine_with_db, invoice_cmd, seed_eur, seed_user};
use engine::{
    CreateVendorCmd, EngineError, InvoiceStatus, Role, VendorStatus, notify::NotificationKind,
};

#[tokio::test]
async fn standard_user_vendor_awaits_vetting() {
    let h = engine_with_db().await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    assert_eq!(vendor.status, VendorStatus::PendingApproval);
    assert_eq!(vendor.approved_by, None);
}

#[tokio::test]
async fn vendor_names_are_unique_ignoring_case() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;

    approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let err = h
        .engine
        .create_vendor(CreateVendorCmd::new("ACME supplies"), &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("ACME supplies".to_string()));
}

#[tokio::test]
async fn gate_reports_an_unvetted_vendor() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor.id, 10_000), &clerk, Utc::now())
        .await
        .unwrap();

    let gate = h.engine.vendor_gate(invoice.id).await.unwrap();
    assert!(gate.vendor_pending);
    assert_eq!(gate.vendor.name, "Acme Supplies");

    // Standalone approval is blocked while the vendor is unvetted.
    let err = h
        .engine
        .approve_invoice(invoice.id, &admin)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("vendor approval required".to_string())
    );
}

#[tokio::test]
async fn joint_approval_moves_both_or_neither() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor.id, 10_000), &clerk, Utc::now())
        .await
        .unwrap();

    h.engine
        .approve_invoice_with_vendor(invoice.id, &admin, Utc::now())
        .await
        .unwrap();

    let vendor = h.engine.vendor(vendor.id).await.unwrap();
    let invoice = h.engine.invoice(invoice.id).await.unwrap();
    assert_eq!(vendor.status, VendorStatus::Approved);
    assert_eq!(vendor.approved_by, Some(admin.id));
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
}

#[tokio::test]
async fn joint_approval_loses_cleanly_to_a_vendor_rejection() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor.id, 10_000), &clerk, Utc::now())
        .await
        .unwrap();

    // Another reviewer resolves the vendor first; the joint path re-reads the
    // rows and must fail without touching either entity.
    h.engine
        .reject_vendor(vendor.id, "failed the compliance check", &admin, Utc::now())
        .await
        .unwrap();

    let err = h
        .engine
        .approve_invoice_with_vendor(invoice.id, &admin, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // The final state is exactly the rejection's outcome, nothing mixed.
    let vendor = h.engine.vendor(vendor.id).await.unwrap();
    let invoice = h.engine.invoice(invoice.id).await.unwrap();
    assert_eq!(vendor.status, VendorStatus::Rejected);
    assert_eq!(invoice.status, InvoiceStatus::Rejected);
}

#[tokio::test]
async fn vendor_rejection_wins_are_symmetric() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor.id, 10_000), &clerk, Utc::now())
        .await
        .unwrap();

    // Joint approval resolves first; the late rejection must fail and leave
    // the approved pair intact.
    h.engine
        .approve_invoice_with_vendor(invoice.id, &admin, Utc::now())
        .await
        .unwrap();
    let err = h
        .engine
        .reject_vendor(vendor.id, "failed the compliance check", &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("vendor already reviewed".to_string())
    );

    let vendor = h.engine.vendor(vendor.id).await.unwrap();
    let invoice = h.engine.invoice(invoice.id).await.unwrap();
    assert_eq!(vendor.status, VendorStatus::Approved);
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
}

#[tokio::test]
async fn rejecting_a_vendor_cascades_to_exactly_its_pending_invoices() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let carl = seed_user(&h.db, "carl", Role::StandardUser).await;
    let dana = seed_user(&h.db, "dana", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;

    let suspect = h
        .engine
        .create_vendor(CreateVendorCmd::new("Shady Traders"), &carl, Utc::now())
        .await
        .unwrap();
    let innocent = approved_vendor(&h.engine, &admin, "Globex").await;

    let pending_one = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", suspect.id, 10_000), &carl, Utc::now())
        .await
        .unwrap();
    let pending_two = h
        .engine
        .submit_invoice(invoice_cmd("INV-002", suspect.id, 4_000), &dana, Utc::now())
        .await
        .unwrap();
    let unrelated = h
        .engine
        .submit_invoice(invoice_cmd("INV-003", innocent, 7_000), &carl, Utc::now())
        .await
        .unwrap();

    h.engine
        .reject_vendor(suspect.id, "failed the compliance check", &admin, Utc::now())
        .await
        .unwrap();

    for id in [pending_one.id, pending_two.id] {
        let invoice = h.engine.invoice(id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Rejected);
        assert_eq!(invoice.rejected_by, Some(admin.id));
        let reason = invoice.rejection_reason.unwrap();
        assert!(reason.contains("Shady Traders"), "reason: {reason}");
        assert!(reason.contains("failed the compliance check"));
    }

    // Invoices of other vendors are untouched.
    let unrelated = h.engine.invoice(unrelated.id).await.unwrap();
    assert_eq!(unrelated.status, InvoiceStatus::PendingApproval);

    let sent = h.notifier.sent();
    let vendor_notices: Vec<_> = sent
        .iter()
        .filter(|n| n.kind == NotificationKind::VendorRejected)
        .collect();
    assert_eq!(vendor_notices.len(), 1);
    assert_eq!(vendor_notices[0].target_user_id, carl.id);

    let invoice_notices: Vec<_> = sent
        .iter()
        .filter(|n| n.kind == NotificationKind::InvoiceRejected)
        .collect();
    assert_eq!(invoice_notices.len(), 2);
    assert!(invoice_notices.iter().any(|n| n.target_user_id == carl.id));
    assert!(invoice_notices.iter().any(|n| n.target_user_id == dana.id));
}

#[tokio::test]
async fn vendor_review_happens_exactly_once() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let vendor = h
        .engine
        .create_vendor(CreateVendorCmd::new("Acme Supplies"), &clerk, Utc::now())
        .await
        .unwrap();
    h.engine
        .approve_vendor(vendor.id, &admin, Utc::now())
        .await
        .unwrap();

    let err = h
        .engine
        .approve_vendor(vendor.id, &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("vendor already reviewed".to_string())
    );
}
