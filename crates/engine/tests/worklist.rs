mod common;

use chrono::Utc;

use common::{approved_vendor, day, engine_with_db, invoice_cmd, seed_eur, seed_user};
use engine::{
    InvoiceListFilter, InvoiceStatus, RecordPaymentCmd, Role, SubmitInvoiceCmd, WorklistSort,
};

/// One invoice awaiting review, one overdue by 5 days, one due in 2 days,
/// one fully paid.
async fn seed_ranking_fixture(
    h: &common::TestHarness,
) -> (engine::Actor, Vec<i32>, chrono::NaiveDate) {
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let today = day(2026, 7, 10);

    let pending = h
        .engine
        .submit_invoice(invoice_cmd("INV-REVIEW", vendor_id, 10_000), &clerk, Utc::now())
        .await
        .unwrap();

    let overdue = h
        .engine
        .submit_invoice(
            SubmitInvoiceCmd::new("INV-OVERDUE", vendor_id, 20_000, "EUR", day(2026, 6, 1))
                .due_date(day(2026, 7, 5)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();

    let due_soon = h
        .engine
        .submit_invoice(
            SubmitInvoiceCmd::new("INV-SOON", vendor_id, 30_000, "EUR", day(2026, 6, 15))
                .due_date(day(2026, 7, 12)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();

    let paid = h
        .engine
        .submit_invoice(
            SubmitInvoiceCmd::new("INV-PAID", vendor_id, 5_000, "EUR", day(2026, 6, 1))
                .due_date(day(2026, 7, 3)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();
    h.engine
        .record_payment(
            RecordPaymentCmd::new(paid.id, 5_000, day(2026, 7, 2)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();

    (admin, vec![pending.id, overdue.id, due_soon.id, paid.id], today)
}

#[tokio::test]
async fn default_order_surfaces_action_required_items_first() {
    let h = engine_with_db().await;
    let (_admin, ids, today) = seed_ranking_fixture(&h).await;

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::Priority,
            50,
            0,
            today,
        )
        .await
        .unwrap();

    let order: Vec<i32> = page.items.iter().map(|item| item.invoice.id).collect();
    assert_eq!(order, ids, "pending, overdue, due soon, paid");

    let overdue = &page.items[1];
    assert_eq!(overdue.settlement.derived_status, InvoiceStatus::Unpaid);
    let due = overdue.due.as_ref().unwrap();
    assert!(due.is_overdue());
    assert_eq!(due.days_until_due, -5);

    let soon = &page.items[2];
    assert!(soon.due.as_ref().unwrap().due_soon);

    let paid = &page.items[3];
    assert_eq!(paid.settlement.derived_status, InvoiceStatus::Paid);
    assert!(paid.due.is_none());
}

#[tokio::test]
async fn explicit_stored_column_sort_bypasses_the_ranking() {
    let h = engine_with_db().await;
    let (_admin, _, today) = seed_ranking_fixture(&h).await;

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::Amount,
            50,
            0,
            today,
        )
        .await
        .unwrap();

    let amounts: Vec<i64> = page
        .items
        .iter()
        .map(|item| item.invoice.amount_minor)
        .collect();
    assert_eq!(amounts, vec![30_000, 20_000, 10_000, 5_000]);
}

#[tokio::test]
async fn derived_sort_keys_are_computed_then_sorted_in_memory() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let today = day(2026, 7, 10);

    let small_debt = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    h.engine
        .record_payment(
            RecordPaymentCmd::new(small_debt.id, 9_000, day(2026, 7, 5)),
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();

    let large_debt = h
        .engine
        .submit_invoice(invoice_cmd("INV-002", vendor_id, 8_000), &admin, Utc::now())
        .await
        .unwrap();

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::RemainingBalance,
            50,
            0,
            today,
        )
        .await
        .unwrap();

    // 8_000 outstanding sorts above 1_000 outstanding even though the face
    // amount is smaller.
    let order: Vec<i32> = page.items.iter().map(|item| item.invoice.id).collect();
    assert_eq!(order, vec![large_debt.id, small_debt.id]);
    assert_eq!(page.items[0].settlement.remaining_balance_minor, 8_000);
    assert_eq!(page.items[1].settlement.remaining_balance_minor, 1_000);
}

#[tokio::test]
async fn derived_status_and_overdue_filters() {
    let h = engine_with_db().await;
    let (_admin, ids, today) = seed_ranking_fixture(&h).await;

    let partial_filter = InvoiceListFilter {
        statuses: Some(vec![InvoiceStatus::Paid]),
        ..Default::default()
    };
    let page = h
        .engine
        .invoice_worklist(&partial_filter, WorklistSort::Priority, 50, 0, today)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].invoice.id, ids[3]);

    let overdue_filter = InvoiceListFilter {
        overdue_only: true,
        ..Default::default()
    };
    let page = h
        .engine
        .invoice_worklist(&overdue_filter, WorklistSort::Priority, 50, 0, today)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].invoice.id, ids[1]);
}

#[tokio::test]
async fn archived_invoices_are_hidden_by_default() {
    let h = engine_with_db().await;
    let (admin, ids, today) = seed_ranking_fixture(&h).await;

    h.engine
        .archive_invoice(ids[3], "fiscal year 2025 closed", &admin, Utc::now())
        .await
        .unwrap();

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::Priority,
            50,
            0,
            today,
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|item| item.invoice.id != ids[3]));

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter {
                include_archived: true,
                ..Default::default()
            },
            WorklistSort::Priority,
            50,
            0,
            today,
        )
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    // Archived rows sink to the bottom of the ranking.
    assert_eq!(page.items.last().unwrap().invoice.id, ids[3]);
}

#[tokio::test]
async fn pagination_applies_after_the_ranking() {
    let h = engine_with_db().await;
    let (_admin, ids, today) = seed_ranking_fixture(&h).await;

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::Priority,
            2,
            1,
            today,
        )
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    let order: Vec<i32> = page.items.iter().map(|item| item.invoice.id).collect();
    assert_eq!(order, vec![ids[1], ids[2]]);
}

#[tokio::test]
async fn pending_payment_review_is_flagged_separately() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let today = day(2026, 7, 10);

    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();
    h.engine
        .record_payment(
            RecordPaymentCmd::new(invoice.id, 4_000, day(2026, 7, 5)),
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();

    let page = h
        .engine
        .invoice_worklist(
            &InvoiceListFilter::default(),
            WorklistSort::Priority,
            50,
            0,
            today,
        )
        .await
        .unwrap();
    let item = &page.items[0];
    assert!(item.settlement.has_pending_payment);
    assert_eq!(item.settlement.approved_total_minor, 0);
}
