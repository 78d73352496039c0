use chrono::{Duration, Utc};
use tenant_maintenance::workflows::maintenance::{
    MaintenanceError, NewTenantRequest, PropertyContact, TenantContact, TenantRequest,
    TenantRequestEventKind, TenantRequestStatus, UrgencyLevel, WorkerSpecialization,
};

fn heating_request() -> NewTenantRequest {
    NewTenantRequest {
        code: "MR-7731".to_string(),
        title: "No heat in unit".to_string(),
        description: "Thermostat reads 58F and the furnace never kicks on".to_string(),
        urgency: UrgencyLevel::Critical,
        tenant: TenantContact {
            tenant_id: "tenant-318".to_string(),
            name: "Morgan Reyes".to_string(),
            email: "morgan.reyes@example.com".to_string(),
            unit_number: "318".to_string(),
        },
        property: PropertyContact {
            property_id: "prop-riverside".to_string(),
            name: "Riverside Commons".to_string(),
            phone: "515-555-0100".to_string(),
            superintendent_name: "Jordan Pike".to_string(),
            superintendent_email: "jordan.pike@riverside.example.com".to_string(),
        },
    }
}

#[test]
fn request_moves_from_draft_to_closed_with_ordered_events() {
    let mut request = TenantRequest::create_new(heating_request()).expect("valid request");
    assert_eq!(request.required_specialization(), WorkerSpecialization::Hvac);
    assert!(request.is_emergency());
    assert_eq!(request.urgency().expected_response_hours(), 4);

    request.submit().expect("submit");
    assert_eq!(request.events().len(), 2);

    let tomorrow = Utc::now() + Duration::days(1);
    request
        .schedule(tomorrow, "w@test.com", "WO-1")
        .expect("schedule");
    request.report_work_completed(true, "done").expect("complete");
    request.close("resolved").expect("close");

    assert_eq!(request.status(), TenantRequestStatus::Closed);
    assert!(request.status().is_terminal());

    let kinds: Vec<&TenantRequestEventKind> =
        request.events().iter().map(|event| &event.kind).collect();
    assert_eq!(kinds.len(), 5);
    assert!(matches!(kinds[0], TenantRequestEventKind::Created { urgency: UrgencyLevel::Critical }));
    assert!(matches!(kinds[1], TenantRequestEventKind::Submitted));
    assert!(matches!(
        kinds[2],
        TenantRequestEventKind::Scheduled { worker_email, work_order_number, .. }
            if worker_email == "w@test.com" && work_order_number == "WO-1"
    ));
    assert!(matches!(
        kinds[3],
        TenantRequestEventKind::Completed { successful: true, .. }
    ));
    assert!(matches!(kinds[4], TenantRequestEventKind::Closed { .. }));

    let history: Vec<TenantRequestStatus> =
        request.history().iter().map(|record| record.to).collect();
    assert_eq!(
        history,
        vec![
            TenantRequestStatus::Draft,
            TenantRequestStatus::Submitted,
            TenantRequestStatus::Scheduled,
            TenantRequestStatus::Done,
            TenantRequestStatus::Closed,
        ]
    );
}

#[test]
fn scheduling_a_draft_is_an_invalid_transition() {
    let mut request = TenantRequest::create_new(heating_request()).expect("valid request");

    let err = request
        .schedule(Utc::now() + Duration::days(2), "w@test.com", "WO-1")
        .expect_err("draft cannot be scheduled");

    assert!(matches!(
        err,
        MaintenanceError::InvalidTransition {
            status: TenantRequestStatus::Draft,
            action: "schedule",
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "cannot schedule request MR-7731 while it is Draft"
    );
}

#[test]
fn closed_and_declined_requests_reject_further_changes() {
    let mut declined = TenantRequest::create_new(heating_request()).expect("valid request");
    declined.submit().expect("submit");
    declined.decline("building-wide boiler outage").expect("decline");

    assert!(declined.submit().is_err());
    assert!(declined
        .update_tenant_info(heating_request().tenant)
        .is_err());

    declined.close("handled by boiler repair").expect("administrative close");
    assert!(declined.close("again").is_err());
    assert!(declined.decline("again").is_err());
}
