//! Change-log guarantees of the record store.
//!
//! - one entry per successful create/update/delete, none for failures
//! - field naming (`creation`, single field, `multiple fields`, `deletion`)
//! - secrets redacted from snapshots
//! - log-write failures reported, never surfaced

mod common;

use common::{ACTOR, count_rows, fields, seed_business, service, service_with_reporter};
use crm_core::audit::{FieldName, REDACTED};
use crm_core::entities::{Business, Task};
use crm_core::enums::{BusinessStatus, EntityType, TaskStatus};
use crm_core::errors::ErrorKind;
use crm_db::error::DatabaseError;
use crm_db::report::Incident;
use crm_db::repos::audit::AuditFilter;
use pretty_assertions::assert_eq;
use serde_json::json;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn business_lifecycle_is_logged() {
    let svc = service().await;

    let acme: Business = svc
        .create_as(ACTOR, fields(json!({"name": "Acme", "status": "Researching"})))
        .await
        .unwrap();
    assert_eq!(count_rows(&svc, "businesses").await, 1);

    let log = svc.history("businesses", &acme.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].field_name, FieldName::Creation);
    assert_eq!(log[0].old_value, None);
    assert_eq!(log[0].changed_by, ACTOR);
    assert_eq!(log[0].new_snapshot().unwrap()["name"], json!("Acme"));

    let partner: Business = svc
        .update_as(ACTOR, &acme.id, fields(json!({"status": "Partner"})))
        .await
        .unwrap();
    assert_eq!(partner.status, BusinessStatus::Partner);

    let log = svc.history("businesses", &acme.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].field_name, FieldName::Field("status".into()));
    assert!(log[1].old_value.as_deref().unwrap().contains("Researching"));
    assert!(log[1].new_value.as_deref().unwrap().contains("Partner"));

    svc.delete(ACTOR, EntityType::Business, &acme.id).await.unwrap();
    assert_eq!(count_rows(&svc, "businesses").await, 0);

    let log = svc.history("businesses", &acme.id).await.unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[2].field_name, FieldName::Deletion);
    assert_eq!(log[2].new_value, None);
    assert_eq!(log[2].old_snapshot().unwrap()["status"], json!("Partner"));
}

#[tokio::test]
async fn multi_column_update_is_multiple_fields() {
    let svc = service().await;
    let id = seed_business(&svc, "Acme").await;

    svc.update(
        ACTOR,
        EntityType::Business,
        &id,
        fields(json!({"status": "Contacting", "industry": "Retail"})),
    )
    .await
    .unwrap();

    let last = svc.history("businesses", &id).await.unwrap().pop().unwrap();
    assert_eq!(last.field_name, FieldName::MultipleFields);
    assert_eq!(last.field_name.as_str(), "multiple fields");
}

#[tokio::test]
async fn patch_with_one_real_change_names_that_field() {
    let svc = service().await;
    let id = seed_business(&svc, "Acme").await;

    svc.update(
        ACTOR,
        EntityType::Business,
        &id,
        fields(json!({"name": "Acme", "status": "Negotiating"})),
    )
    .await
    .unwrap();

    let last = svc.history("businesses", &id).await.unwrap().pop().unwrap();
    assert_eq!(last.field_name, FieldName::Field("status".into()));
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_mutation_of_every_entity_is_logged_once() {
    let svc = service().await;
    let biz = seed_business(&svc, "Acme").await;

    let children = [
        (EntityType::Contact, json!({"name": "Bob", "business_id": biz}), json!({"title": "CTO"})),
        (
            EntityType::Task,
            json!({"title": "Call", "due_date": "2024-05-01", "business_id": biz}),
            json!({"status": "Completed"}),
        ),
        (EntityType::Note, json!({"title": "Kickoff", "business_id": biz}), json!({"category": "Meeting"})),
        (EntityType::Document, json!({"name": "Deck", "business_id": biz}), json!({"path": "/decks"})),
        (EntityType::User, json!({"id": "usr-ada", "email": "ada@example.com"}), json!({"approved": true})),
        (EntityType::SystemSetting, json!({"key": "theme", "value": {"dark": true}}), json!({"value": {"dark": false}})),
    ];

    for (entity, create, patch) in children {
        let table = entity.table_name();
        let record = svc.create(ACTOR, entity, fields(create)).await.unwrap();
        let key = schema_key(entity);
        let id = record[key].as_str().unwrap().to_string();

        svc.update(ACTOR, entity, &id, fields(patch)).await.unwrap();
        svc.delete(ACTOR, entity, &id).await.unwrap();

        let page = svc
            .query_audit(&AuditFilter {
                table_name: Some(table.into()),
                record_id: Some(id.clone()),
                ..AuditFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3, "{entity}");
        assert!(page.entries.iter().all(|e| e.table_name == table && e.record_id == id));
    }
}

fn schema_key(entity: EntityType) -> &'static str {
    crm_core::schema::schema_for(entity).primary_key
}

#[tokio::test]
async fn failed_mutations_leave_no_entry() {
    let svc = service().await;
    let biz = seed_business(&svc, "Acme").await;
    let before = svc.query_audit(&AuditFilter::default()).await.unwrap().total;

    // missing row
    assert!(svc.delete(ACTOR, EntityType::Task, "tsk-missing").await.is_err());
    // bad enum
    assert!(
        svc.update(ACTOR, EntityType::Business, &biz, fields(json!({"status": "Friends"})))
            .await
            .is_err()
    );
    // dangling reference
    let err = svc
        .create(ACTOR, EntityType::Note, fields(json!({"title": "x", "business_id": "biz-ghost"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(svc.query_audit(&AuditFilter::default()).await.unwrap().total, before);
}

// ---------------------------------------------------------------------------
// Validation short-circuit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn contact_without_business_is_rejected_up_front() {
    let svc = service().await;

    let err = svc
        .create(ACTOR, EntityType::Contact, fields(json!({"name": "Bob"})))
        .await
        .unwrap_err();

    let DatabaseError::Validation(validation) = &err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(validation.fields, vec!["business_id".to_string()]);
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count_rows(&svc, "contacts").await, 0);
    assert_eq!(count_rows(&svc, "change_logs").await, 0);
}

#[tokio::test]
async fn task_requires_title_due_date_and_business() {
    let svc = service().await;
    let err = svc
        .create(ACTOR, EntityType::Task, fields(json!({"description": "later"})))
        .await
        .unwrap_err();
    let DatabaseError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(validation.fields, vec!["title", "due_date", "business_id"]);
}

#[tokio::test]
async fn typed_task_roundtrip_uses_defaults() {
    let svc = service().await;
    let biz = seed_business(&svc, "Acme").await;
    let task: Task = svc
        .create_as(
            ACTOR,
            fields(json!({"title": "Send NDA", "due_date": "2024-05-01T09:00:00Z", "business_id": biz})),
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.due_date.to_string(), "2024-05-01");
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn setting_secrets_are_redacted_in_every_snapshot() {
    let svc = service().await;
    svc.put_setting(
        ACTOR,
        "storage_settings",
        json!({"bucket_name": "crm", "secret_access_key": "hunter2", "nested": {"refresh_token": "rt-42"}}),
    )
    .await
    .unwrap();
    svc.put_setting(
        ACTOR,
        "storage_settings",
        json!({"bucket_name": "crm-2", "secret_access_key": "hunter3"}),
    )
    .await
    .unwrap();
    svc.delete(ACTOR, EntityType::SystemSetting, "storage_settings")
        .await
        .unwrap();

    let log = svc.history("system_settings", "storage_settings").await.unwrap();
    assert_eq!(log.len(), 3);
    for entry in &log {
        for snapshot in [&entry.old_value, &entry.new_value].into_iter().flatten() {
            for secret in ["hunter2", "hunter3", "rt-42"] {
                assert!(!snapshot.contains(secret), "{snapshot}");
            }
        }
    }
    let first = log[0].new_snapshot().unwrap();
    assert_eq!(first["value"]["secret_access_key"], json!(REDACTED));
    assert_eq!(first["value"]["bucket_name"], json!("crm"));
}

// ---------------------------------------------------------------------------
// Log-write failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn log_failure_keeps_the_mutation_and_reports() {
    let (svc, reporter) = service_with_reporter().await;
    svc.db()
        .conn()
        .execute("DROP TABLE change_logs", ())
        .await
        .unwrap();

    let created = svc
        .create(ACTOR, EntityType::Business, fields(json!({"name": "Acme", "status": "Partner"})))
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    assert!(svc.get(EntityType::Business, id).await.is_ok());
    let incidents = reporter.incidents();
    assert_eq!(incidents.len(), 1);
    let Incident::AuditWriteFailed {
        table_name,
        record_id,
        field_name,
        ..
    } = &incidents[0]
    else {
        panic!("unexpected incident {:?}", incidents[0]);
    };
    assert_eq!(table_name, "businesses");
    assert_eq!(record_id, id);
    assert_eq!(field_name, "creation");
}
