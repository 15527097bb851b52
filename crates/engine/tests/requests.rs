mod common;

use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;

use common::{approved_vendor, engine_with_db, invoice_cmd, seed_eur, seed_user};
use engine::{EngineError, RequestPayload, RequestStatus, Role, notify::NotificationKind};

async fn approved_category(h: &common::TestHarness, admin: &engine::Actor, name: &str) -> i32 {
    let request = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: name.to_string(),
                description: None,
            },
            None,
            admin,
            Utc::now(),
        )
        .await
        .unwrap();
    let approved = h
        .engine
        .approve_request(request.id, None, None, admin, Utc::now())
        .await
        .unwrap();
    approved.created_entity_id.unwrap()
}

#[tokio::test]
async fn approval_materializes_the_proposed_entity() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let request = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: "Travel".to_string(),
                description: Some("Flights and hotels".to_string()),
            },
            None,
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::PendingApproval);
    assert_eq!(request.requested_by, clerk.id);

    let approved = h
        .engine
        .approve_request(request.id, None, Some("looks fine"), &admin, Utc::now())
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(admin.id));
    let category_id = approved.created_entity_id.unwrap();

    let backend = h.db.get_database_backend();
    let row = h
        .db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT name, active FROM categories WHERE id = ?",
            vec![category_id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let name: String = row.try_get("", "name").unwrap();
    let active: bool = row.try_get("", "active").unwrap();
    assert_eq!(name, "Travel");
    assert!(active);

    let notice = h
        .notifier
        .sent()
        .into_iter()
        .find(|n| n.kind == NotificationKind::RequestApproved)
        .unwrap();
    assert_eq!(notice.target_user_id, clerk.id);
    assert_eq!(notice.subject_id, request.id);
}

#[tokio::test]
async fn reviewer_edits_win_over_the_proposal() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let request = h
        .engine
        .submit_request(
            RequestPayload::Vendor {
                name: "acme supplies".to_string(),
                address: None,
                tax_exempt: false,
                bank_name: None,
                bank_account: None,
            },
            None,
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();

    let approved = h
        .engine
        .approve_request(
            request.id,
            Some(json!({ "name": "Acme Supplies Ltd", "tax_exempt": true })),
            None,
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();
    let vendor = h
        .engine
        .vendor(approved.created_entity_id.unwrap())
        .await
        .unwrap();
    assert_eq!(vendor.name, "Acme Supplies Ltd");
    assert!(vendor.tax_exempt);
    assert_eq!(vendor.status, engine::VendorStatus::Approved);
    assert_eq!(vendor.created_by, clerk.id);
    assert_eq!(vendor.approved_by, Some(admin.id));
}

#[tokio::test]
async fn rejection_needs_a_reason_and_review_is_final() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let request = h
        .engine
        .submit_request(
            RequestPayload::PaymentType {
                name: "Cheque".to_string(),
            },
            None,
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();

    let err = h
        .engine
        .reject_request(request.id, "no", &admin, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    h.engine
        .reject_request(request.id, "we do not issue cheques", &admin, Utc::now())
        .await
        .unwrap();

    let err = h
        .engine
        .approve_request(request.id, None, None, &admin, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("request already reviewed".to_string())
    );
}

#[tokio::test]
async fn approving_a_resubmission_marks_the_predecessor_superseded() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let first = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: "Travel".to_string(),
                description: None,
            },
            None,
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();
    h.engine
        .reject_request(first.id, "name the spend type precisely", &admin, Utc::now())
        .await
        .unwrap();

    let second = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: "Business Travel".to_string(),
                description: None,
            },
            Some(first.id),
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(second.previous_attempt_id, Some(first.id));
    assert_eq!(second.resubmission_count, 1);

    h.engine
        .approve_request(second.id, None, None, &admin, Utc::now())
        .await
        .unwrap();

    // The predecessor keeps its rejected verdict; only the backlink is set.
    let first = h.engine.request(first.id).await.unwrap();
    assert_eq!(first.status, RequestStatus::Rejected);
    assert_eq!(first.superseded_by_id, Some(second.id));
}

#[tokio::test]
async fn resubmitting_an_unreviewed_request_is_blocked() {
    let h = engine_with_db().await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let first = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: "Travel".to_string(),
                description: None,
            },
            None,
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap();

    let err = h
        .engine
        .submit_request(
            RequestPayload::Category {
                name: "Travel again".to_string(),
                description: None,
            },
            Some(first.id),
            &clerk,
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("only rejected requests can be resubmitted".to_string())
    );
}

#[tokio::test]
async fn archive_requests_are_single_flight_per_invoice() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();

    h.engine
        .request_invoice_archive(invoice.id, "settled outside the system", &clerk, Utc::now())
        .await
        .unwrap();

    let err = h
        .engine
        .request_invoice_archive(invoice.id, "settled outside the system", &clerk, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("a request is already pending for this target".to_string())
    );
}

#[tokio::test]
async fn approving_an_archive_request_archives_the_invoice() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;
    seed_eur(&h.engine, &admin).await;
    let vendor_id = approved_vendor(&h.engine, &admin, "Acme Supplies").await;
    let invoice = h
        .engine
        .submit_invoice(invoice_cmd("INV-001", vendor_id, 10_000), &admin, Utc::now())
        .await
        .unwrap();

    let request = h
        .engine
        .request_invoice_archive(invoice.id, "settled outside the system", &clerk, Utc::now())
        .await
        .unwrap();
    let approved = h
        .engine
        .approve_request(request.id, None, None, &admin, Utc::now())
        .await
        .unwrap();
    assert_eq!(approved.created_entity_id, Some(invoice.id));

    let archived = h.engine.invoice(invoice.id).await.unwrap();
    assert!(archived.archived);
    assert_eq!(archived.archived_by, Some(admin.id));
    assert_eq!(
        archived.archive_reason.as_deref(),
        Some("settled outside the system")
    );
}

#[tokio::test]
async fn profile_without_category_falls_back_to_the_first_active_one() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let first_category = approved_category(&h, &admin, "General").await;
    approved_category(&h, &admin, "Travel").await;

    let request = h
        .engine
        .submit_request(
            RequestPayload::InvoiceProfile {
                name: "Office rent".to_string(),
                category_id: None,
                day_of_month: Some(1),
            },
            None,
            &admin,
            Utc::now(),
        )
        .await
        .unwrap();
    let approved = h
        .engine
        .approve_request(request.id, None, None, &admin, Utc::now())
        .await
        .unwrap();

    let backend = h.db.get_database_backend();
    let row = h
        .db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT category_id FROM invoice_profiles WHERE id = ?",
            vec![approved.created_entity_id.unwrap().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let category_id: i32 = row.try_get("", "category_id").unwrap();
    assert_eq!(category_id, first_category);
}

#[tokio::test]
async fn bulk_review_tolerates_bad_items() {
    let h = engine_with_db().await;
    let admin = seed_user(&h.db, "ada", Role::Admin).await;
    let clerk = seed_user(&h.db, "carl", Role::StandardUser).await;

    let mut ids = Vec::new();
    for name in ["Travel", "Meals", "Hardware"] {
        let request = h
            .engine
            .submit_request(
                RequestPayload::Category {
                    name: name.to_string(),
                    description: None,
                },
                None,
                &clerk,
                Utc::now(),
            )
            .await
            .unwrap();
        ids.push(request.id);
    }

    // One of the batch is already resolved; the rest must still go through.
    h.engine
        .reject_request(ids[1], "duplicate of an existing category", &admin, Utc::now())
        .await
        .unwrap();

    let outcome = h.engine.bulk_approve_requests(&ids, &admin, Utc::now()).await;
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);

    assert!(h.engine.pending_requests().await.unwrap().is_empty());
}
