use crate::infra::{
    parse_date, parse_specialization, InMemoryEventPublisher, InMemoryTenantRequestRepository,
    InMemoryWorkerRepository,
};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tenant_maintenance::config::MaintenanceConfig;
use tenant_maintenance::error::AppError;
use tenant_maintenance::workflows::maintenance::{
    determine_required_specialization, load_roster, MaintenanceEvent, MaintenanceService,
    NewTenantRequest, PropertyContact, SelectionCriteria, TenantContact, UrgencyLevel,
    WorkerAvailabilitySummary, WorkerContact, WorkerSelection, WorkerSpecialization,
};

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Request title as written by the tenant
    pub(crate) title: String,
    /// Optional longer description
    #[arg(default_value = "")]
    pub(crate) description: String,
}

#[derive(Args, Debug)]
pub(crate) struct FindWorkersArgs {
    /// Roster CSV export (Email, First Name, Last Name, Phone, Specialization, Active, Work Order, Scheduled Date, Completed)
    #[arg(long, value_name = "PATH")]
    pub(crate) roster: PathBuf,
    /// Required trade; inferred from --title/--description when omitted
    #[arg(long, value_parser = parse_specialization)]
    pub(crate) specialization: Option<WorkerSpecialization>,
    #[arg(long, default_value = "")]
    pub(crate) title: String,
    #[arg(long, default_value = "")]
    pub(crate) description: String,
    /// Target service date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Days to scan past the target date. Defaults to MAINTENANCE_LOOKAHEAD_DAYS.
    #[arg(long)]
    pub(crate) lookahead: Option<u32>,
    /// Rank by earliest availability alone
    #[arg(long)]
    pub(crate) emergency: bool,
    /// Maximum candidates to print. Defaults to MAINTENANCE_MAX_CANDIDATES.
    #[arg(long)]
    pub(crate) max: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Mark the demo request as an emergency
    #[arg(long)]
    pub(crate) emergency: bool,
    /// Report the work as failed and reschedule it once
    #[arg(long)]
    pub(crate) fail_first_visit: bool,
}

pub(crate) fn run_classify(args: ClassifyArgs) {
    let specialization = determine_required_specialization(&args.title, &args.description);
    println!("{}", specialization.label());
}

pub(crate) fn run_find_workers(args: FindWorkersArgs) -> Result<(), AppError> {
    let config = MaintenanceConfig::from_env()?;
    let workers = load_roster(BufReader::new(File::open(&args.roster)?))?;

    let required_specialization = args.specialization.unwrap_or_else(|| {
        determine_required_specialization(&args.title, &args.description)
    });
    let criteria = SelectionCriteria {
        required_specialization,
        target_date: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        look_ahead_days: args.lookahead.unwrap_or(config.look_ahead_days),
        is_emergency: args.emergency,
        max_workers: args.max.unwrap_or(config.max_candidates),
    };
    let ranked = WorkerSelection::default().find_available_workers(&criteria, &workers);

    println!(
        "{} candidates for {} on {} ({} workers in roster)",
        ranked.len(),
        required_specialization.label(),
        criteria.target_date,
        workers.len()
    );
    print_candidates(&ranked, criteria.target_date);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let publisher = Arc::new(InMemoryEventPublisher::default());
    let service = MaintenanceService::new(
        Arc::new(InMemoryTenantRequestRepository::default()),
        Arc::new(InMemoryWorkerRepository::default()),
        publisher.clone(),
        MaintenanceConfig::default().service_settings(),
    );

    println!("Tenant maintenance demo");
    for (first, last, specialization) in [
        ("Pat", "Nguyen", Some(WorkerSpecialization::Plumbing)),
        ("Gus", "Alvarez", None),
        ("Eli", "Brooks", Some(WorkerSpecialization::Electrical)),
    ] {
        let worker = service.register_worker(
            WorkerContact {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!(
                    "{}.{}@riverside.example.com",
                    first.to_ascii_lowercase(),
                    last.to_ascii_lowercase()
                ),
                phone: None,
            },
            specialization,
        )?;
        println!(
            "- Registered {} <{}> ({})",
            worker.display_name(),
            worker.email(),
            worker.specialization()
        );
    }

    let urgency = if args.emergency {
        UrgencyLevel::Emergency
    } else {
        UrgencyLevel::High
    };
    let request = service.create_request(NewTenantRequest {
        code: "MR-2041".to_string(),
        title: "Kitchen sink leaking".to_string(),
        description: "Water pooling in the cabinet under the sink since this morning".to_string(),
        urgency,
        tenant: TenantContact {
            tenant_id: "tenant-204".to_string(),
            name: "Morgan Reyes".to_string(),
            email: "morgan.reyes@example.com".to_string(),
            unit_number: "204".to_string(),
        },
        property: PropertyContact {
            property_id: "prop-riverside".to_string(),
            name: "Riverside Commons".to_string(),
            phone: "515-555-0100".to_string(),
            superintendent_name: "Jordan Pike".to_string(),
            superintendent_email: "jordan.pike@riverside.example.com".to_string(),
        },
    })?;
    let id = request.id().clone();
    println!(
        "\nCreated request {} ({}) -> {} trade, respond within {}h",
        request.code(),
        id,
        request.required_specialization(),
        request.urgency().expected_response_hours()
    );

    service.submit_request(&id)?;

    let mut visit_date = Utc::now().date_naive() + Duration::days(1);
    let candidates = service.find_workers_for_request(&id, Some(visit_date))?;
    println!("\nCandidates for {visit_date}");
    print_candidates(&candidates, visit_date);

    let Some(first_choice) = candidates.first() else {
        println!("No qualified worker available; request stays submitted");
        return Ok(());
    };
    let mut worker_email = first_choice.worker_email.clone();
    let scheduled = service.schedule_request(&id, at_noon(visit_date), &worker_email, None)?;
    println!(
        "\nScheduled {} with {} on {} (work order {})",
        scheduled.code(),
        worker_email,
        visit_date,
        scheduled.work_order_number().unwrap_or("-")
    );

    if args.fail_first_visit {
        service.report_work_completed(&id, false, "shutoff valve seized; part on order")?;
        println!("First visit failed; rescheduling");
        visit_date += Duration::days(1);
        let retry = service.find_workers_for_request(&id, Some(visit_date))?;
        if let Some(candidate) = retry.first() {
            worker_email = candidate.worker_email.clone();
        }
        let rescheduled = service.schedule_request(&id, at_noon(visit_date), &worker_email, None)?;
        println!(
            "Rescheduled with {} on {} (work order {})",
            worker_email,
            visit_date,
            rescheduled.work_order_number().unwrap_or("-")
        );
    }

    service.report_work_completed(&id, true, "replaced trap and supply line")?;
    let closed = service.close_request(&id, "tenant confirmed no further leaking")?;
    println!("Request {} is now {}", closed.code(), closed.status());

    let worker = service.get_worker(&worker_email)?;
    println!(
        "{} has {} assignment(s), {} still open",
        worker.display_name(),
        worker.assignments().len(),
        worker.current_workload()
    );

    println!("\nPublished events");
    for event in publisher.events() {
        match &event {
            MaintenanceEvent::Request(inner) => {
                println!("- {} [{}]", event.name(), inner.code)
            }
            MaintenanceEvent::Worker(inner) => {
                println!("- {} [{}]", event.name(), inner.email)
            }
        }
    }
    Ok(())
}

fn print_candidates(candidates: &[WorkerAvailabilitySummary], target_date: NaiveDate) {
    for (rank, candidate) in candidates.iter().enumerate() {
        let availability = if candidate.is_available_on(target_date) {
            "available".to_string()
        } else {
            format!("next free {}", candidate.next_fully_available_date)
        };
        println!(
            "  {}. {} <{}> {} | {} open | {} | score {}",
            rank + 1,
            candidate.worker_name,
            candidate.worker_email,
            candidate.specialization,
            candidate.current_workload,
            availability,
            candidate.availability_score
        );
    }
}

fn at_noon(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + Duration::hours(12)
}
