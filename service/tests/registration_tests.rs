//! End-to-end scenarios for the registration service and resolver over the in-memory
//! store.

#![allow(clippy::unwrap_used)] // Test code

use chrono::{DateTime, Duration, FixedOffset, Utc};
use helpdesk_core::error::HelpdeskError;
use helpdesk_core::ids::{AreaCode, EmployeeId, RecordId, TicketId};
use helpdesk_core::record::{Classification, NewRecord};
use helpdesk_core::status::StatusCode;
use helpdesk_service::config::HelpdeskConfig;
use helpdesk_service::{OperationResult, OwnershipResolver, RetryPolicy, TicketRegistrationService};
use helpdesk_testing::{
    FailPoint, FixedClock, InMemoryTicketStore, RecordingEmployeeDirectory, fixtures, test_clock,
};
use std::sync::Arc;

struct Harness {
    store: InMemoryTicketStore,
    directory: RecordingEmployeeDirectory,
    clock: FixedClock,
    service: TicketRegistrationService,
    resolver: OwnershipResolver,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            RecordingEmployeeDirectory::with_employees([("E100", "J. Perez")]),
            HelpdeskConfig::default(),
        )
    }

    fn with(directory: RecordingEmployeeDirectory, config: HelpdeskConfig) -> Self {
        let store = InMemoryTicketStore::new();
        let clock = test_clock();
        let service = TicketRegistrationService::new(
            Arc::new(store.clone()),
            Arc::new(directory.clone()),
            Arc::new(clock.clone()),
            &config,
        )
        .with_retry_policy(RetryPolicy::immediate(config.conflict_retries));
        let resolver = OwnershipResolver::new(Arc::new(store.clone()));
        Self {
            store,
            directory,
            clock,
            service,
            resolver,
        }
    }

    async fn open_ticket(&self) -> TicketId {
        self.service
            .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
            .await
            .unwrap()
            .ticket
            .id
    }
}

fn assign(employee: &str) -> NewRecord {
    fixtures::status_record(StatusCode::assigned())
        .assign_to(EmployeeId::new(employee))
        .content("Assigned to technician")
}

#[tokio::test]
async fn same_day_folios_are_sequential() {
    let harness = Harness::new();

    let first = harness
        .service
        .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
        .await
        .unwrap();
    let second = harness
        .service
        .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
        .await
        .unwrap();

    assert_eq!(first.ticket.folio.as_str(), "202401150001");
    assert_eq!(second.ticket.folio.as_str(), "202401150002");
    assert_eq!(first.first_record.id, RecordId::FIRST);
    assert_eq!(first.first_record.status, StatusCode::open());
}

#[tokio::test]
async fn folio_counter_restarts_each_day() {
    let harness = Harness::new();
    harness.open_ticket().await;

    harness.clock.advance(Duration::days(1));
    let next_day = harness
        .service
        .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
        .await
        .unwrap();

    assert_eq!(next_day.ticket.folio.as_str(), "202401160001");
}

#[tokio::test]
async fn folio_day_follows_the_configured_offset() {
    let config = HelpdeskConfig {
        utc_offset: FixedOffset::west_opt(6 * 3600).unwrap(),
        ..HelpdeskConfig::default()
    };
    let harness = Harness::with(RecordingEmployeeDirectory::default(), config);
    // 03:00 UTC on the 16th is still the evening of the 15th six hours west.
    harness.clock.set(
        DateTime::parse_from_rfc3339("2024-01-16T03:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
    );

    let created = harness
        .service
        .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
        .await
        .unwrap();

    assert_eq!(created.ticket.folio.as_str(), "202401150001");
}

#[tokio::test]
async fn completed_ticket_only_offers_completion() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;
    harness.service.append_record(ticket_id, assign("E100")).await.unwrap();
    harness
        .service
        .append_record(ticket_id, fixtures::status_record(StatusCode::completed()))
        .await
        .unwrap();

    let details = harness.service.ticket_details(ticket_id).await.unwrap();
    assert_eq!(details.latest.as_ref().unwrap().id, RecordId::new(3));
    assert_eq!(details.current_status(), Some(&StatusCode::completed()));
    assert_eq!(details.allowed_statuses, vec![StatusCode::completed()]);

    for locked in [StatusCode::open(), StatusCode::assigned(), StatusCode::escalated()] {
        let error = harness
            .service
            .append_record(ticket_id, fixtures::status_record(locked.clone()))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            HelpdeskError::TransitionDenied {
                current: StatusCode::completed(),
                requested: locked,
            }
        );
    }

    // Annotating a completed ticket stays possible.
    let note = fixtures::status_record(StatusCode::completed()).note("Customer confirmed");
    assert_eq!(
        harness.service.append_record(ticket_id, note).await.unwrap().id,
        RecordId::new(4)
    );
}

#[tokio::test]
async fn open_ticket_offers_the_whole_catalog() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;

    let details = harness.service.ticket_details(ticket_id).await.unwrap();
    assert_eq!(details.allowed_statuses.len(), 4);
    assert_eq!(details.current_owner(), None);
}

#[tokio::test]
async fn updating_a_missing_ticket_writes_nothing() {
    let harness = Harness::new();
    harness.open_ticket().await;

    let error = harness
        .service
        .update_ticket_details(
            TicketId::new(404),
            fixtures::contact(),
            assign("E100"),
            Some("Juan Perez".to_string()),
        )
        .await
        .unwrap_err();

    assert_eq!(error, HelpdeskError::TicketNotFound(TicketId::new(404)));
    assert_eq!(harness.store.record_count(), 1);
    assert!(harness.directory.updates().is_empty());
    assert_eq!(OperationResult::<()>::failure(&error).message, "not_found");
}

#[tokio::test]
async fn failure_mid_create_leaves_no_partial_state() {
    let harness = Harness::new();
    harness.store.fail_next(FailPoint::AfterTicketInsert);

    let result = OperationResult::from_result(
        harness
            .service
            .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
            .await,
    );

    assert!(!result.success);
    assert_eq!(result.message, "persistence_error");
    assert_eq!(harness.store.ticket_count(), 0);
    assert_eq!(harness.store.record_count(), 0);

    // The lost folio is not consumed.
    let created = harness
        .service
        .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
        .await
        .unwrap();
    assert_eq!(created.ticket.folio.sequence(), 1);
}

#[tokio::test]
async fn failure_mid_update_keeps_old_contact() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;
    harness.store.fail_next(FailPoint::AfterTicketUpdate);

    let result = harness
        .service
        .update_ticket_details(ticket_id, fixtures::contact(), assign("E100"), None)
        .await;

    assert!(matches!(result, Err(HelpdeskError::Persistence(_))));
    let details = harness.service.ticket_details(ticket_id).await.unwrap();
    assert_eq!(details.ticket.requester.email, fixtures::requester().email);
    assert_eq!(details.latest.unwrap().id, RecordId::FIRST);
}

#[tokio::test]
async fn update_changes_contact_and_syncs_employee_name() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;

    let snapshot = harness
        .service
        .update_ticket_details(
            ticket_id,
            fixtures::contact(),
            assign("E100"),
            Some("Juan Perez".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(snapshot.record.id, RecordId::new(2));
    assert_eq!(snapshot.ticket.requester.email, fixtures::contact().email);
    assert_eq!(snapshot.ticket.requester.full_name, fixtures::requester().full_name);
    assert_eq!(
        harness.directory.name_of(&EmployeeId::new("E100")).as_deref(),
        Some("Juan Perez")
    );
}

#[tokio::test]
async fn directory_failure_does_not_undo_the_update() {
    let harness = Harness::with(RecordingEmployeeDirectory::failing(), HelpdeskConfig::default());
    let ticket_id = harness.open_ticket().await;

    let snapshot = harness
        .service
        .update_ticket_details(
            ticket_id,
            fixtures::contact(),
            assign("E100"),
            Some("Juan Perez".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(snapshot.record.id, RecordId::new(2));
    assert_eq!(harness.service.history(ticket_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn owner_follows_the_latest_record() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;
    let first = EmployeeId::new("E100");
    let second = EmployeeId::new("E200");

    harness.service.append_record(ticket_id, assign("E100")).await.unwrap();
    assert!(harness.resolver.is_owner(ticket_id, &first).await.unwrap());

    harness.service.append_record(ticket_id, assign("E200")).await.unwrap();
    assert!(!harness.resolver.is_owner(ticket_id, &first).await.unwrap());
    assert!(harness.resolver.is_owner(ticket_id, &second).await.unwrap());
    assert_eq!(harness.resolver.current_owner(ticket_id).await.unwrap(), Some(second));
    assert_eq!(
        harness.resolver.current_status(ticket_id).await.unwrap(),
        Some(StatusCode::assigned())
    );
    assert!(harness.resolver.is_in_area(ticket_id, &AreaCode::new(fixtures::AREA)).await.unwrap());
}

#[tokio::test]
async fn concurrent_appends_number_records_without_gaps() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;
    let writers = 32;

    let tasks: Vec<_> = (0..writers)
        .map(|n| {
            let service = harness.service.clone();
            tokio::spawn(async move {
                service
                    .append_record(
                        ticket_id,
                        NewRecord::with_status(StatusCode::assigned(), format!("tech-{n}")),
                    )
                    .await
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let ids: Vec<i32> = harness
        .service
        .history(ticket_id)
        .await
        .unwrap()
        .iter()
        .map(|record| record.id.value())
        .collect();
    assert_eq!(ids, (1..=writers + 1).collect::<Vec<_>>());
}

#[tokio::test]
async fn invalid_requests_never_reach_the_store() {
    let harness = Harness::new();

    let mut blank_title = fixtures::new_ticket();
    blank_title.title = "  ".to_string();
    let error = harness
        .service
        .create_ticket(blank_title, fixtures::opening_record())
        .await
        .unwrap_err();
    assert!(matches!(error, HelpdeskError::Validation { field: "title", .. }));

    let unknown_status = NewRecord::with_status(StatusCode::new("XYZ"), fixtures::AGENT);
    let error = harness
        .service
        .create_ticket(fixtures::new_ticket(), unknown_status)
        .await
        .unwrap_err();
    assert!(matches!(error, HelpdeskError::Validation { .. }));

    assert_eq!(harness.store.ticket_count(), 0);
}

#[tokio::test]
async fn classification_is_kept_on_the_record() {
    let harness = Harness::new();
    let ticket_id = harness.open_ticket().await;
    let classification = Classification {
        service_id: Some(3),
        sub_service_id: Some(12),
        priority_id: Some("HIGH".to_string()),
        category_id: None,
    };

    harness
        .service
        .append_record(ticket_id, assign("E100").classified(classification.clone()))
        .await
        .unwrap();

    let latest = harness.service.ticket_details(ticket_id).await.unwrap().latest.unwrap();
    assert_eq!(latest.classification, classification);
}

#[tokio::test]
async fn history_of_a_missing_ticket_is_not_found() {
    let harness = Harness::new();
    assert_eq!(
        harness.service.history(TicketId::new(5)).await.unwrap_err(),
        HelpdeskError::TicketNotFound(TicketId::new(5))
    );
    assert!(matches!(
        harness.service.ticket_details(TicketId::new(5)).await,
        Err(HelpdeskError::TicketNotFound(_))
    ));
}

#[tokio::test]
async fn offline_store_reports_persistence() {
    let harness = Harness::new();
    harness.store.set_offline(true);

    let result = OperationResult::from_result(
        harness
            .service
            .create_ticket(fixtures::new_ticket(), fixtures::opening_record())
            .await,
    );

    assert_eq!(result.message, "persistence_error");
    assert_eq!(
        result.error.as_deref(),
        Some("The changes could not be saved, please try again.")
    );
}
