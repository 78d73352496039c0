//! Worker roster import used to build selection snapshots from a CSV export.
//!
//! One row per assignment; a worker's contact columns repeat on each of its rows and the
//! first row for an email wins. Rows with an empty `Work Order` only register the worker.

use std::collections::HashMap;
use std::io::Read;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::error::MaintenanceError;
use super::workers::{normalize_email, Worker, WorkerContact, WorkerSpecialization};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row for {email}: unknown specialization '{value}'")]
    InvalidSpecialization { email: String, value: String },
    #[error("row for {email}: scheduled date '{value}' is not YYYY-MM-DD")]
    InvalidDate { email: String, value: String },
    #[error("row for {email}: '{value}' is not a yes/no value for {column}")]
    InvalidFlag {
        email: String,
        column: &'static str,
        value: String,
    },
    #[error("row for {email}: {source}")]
    Domain {
        email: String,
        #[source]
        source: MaintenanceError,
    },
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "First Name", default)]
    first_name: String,
    #[serde(rename = "Last Name", default)]
    last_name: String,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(
        rename = "Specialization",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    specialization: Option<String>,
    #[serde(rename = "Active", default, deserialize_with = "empty_string_as_none")]
    active: Option<String>,
    #[serde(
        rename = "Work Order",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    work_order: Option<String>,
    #[serde(
        rename = "Scheduled Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    scheduled_date: Option<String>,
    #[serde(rename = "Completed", default, deserialize_with = "empty_string_as_none")]
    completed: Option<String>,
}

/// Parse a roster into worker snapshots, preserving first-seen order.
pub fn load_roster<R: Read>(reader: R) -> Result<Vec<Worker>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut workers: Vec<Worker> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in csv_reader.deserialize::<RosterRow>() {
        let row = record?;
        let email = normalize_email(&row.email);

        let position = match index.get(&email) {
            Some(position) => *position,
            None => {
                let worker = worker_from_row(&row, &email)?;
                workers.push(worker);
                index.insert(email.clone(), workers.len() - 1);
                workers.len() - 1
            }
        };

        if let Some(work_order) = row.work_order.as_deref() {
            apply_assignment(&mut workers[position], &row, &email, work_order)?;
        }
    }

    // Hydration is not a domain action; nothing should be published for it.
    for worker in &mut workers {
        worker.take_events();
    }

    Ok(workers)
}

fn worker_from_row(row: &RosterRow, email: &str) -> Result<Worker, RosterError> {
    let domain = |source| RosterError::Domain {
        email: email.to_string(),
        source,
    };

    let mut worker = Worker::new(WorkerContact {
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        email: email.to_string(),
        phone: row.phone.clone(),
    })
    .map_err(domain)?;

    if let Some(value) = row.specialization.as_deref() {
        let specialization = value.parse::<WorkerSpecialization>().map_err(|_| {
            RosterError::InvalidSpecialization {
                email: email.to_string(),
                value: value.to_string(),
            }
        })?;
        worker.set_specialization(specialization);
    }

    if read_flag(row.active.as_deref(), email, "Active")? == Some(false) {
        worker.deactivate("inactive in roster").map_err(domain)?;
    }

    Ok(worker)
}

fn apply_assignment(
    worker: &mut Worker,
    row: &RosterRow,
    email: &str,
    work_order: &str,
) -> Result<(), RosterError> {
    let domain = |source| RosterError::Domain {
        email: email.to_string(),
        source,
    };
    let raw_date = row.scheduled_date.as_deref().unwrap_or_default();
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| RosterError::InvalidDate {
            email: email.to_string(),
            value: raw_date.to_string(),
        })?;
    let scheduled = Utc.from_utc_datetime(&date);
    let outcome = read_flag(row.completed.as_deref(), email, "Completed")?;

    worker.assign_to_work(work_order, scheduled).map_err(domain)?;

    if let Some(successful) = outcome {
        worker
            .complete_work(work_order, successful, "imported from roster")
            .map_err(domain)?;
    }
    Ok(())
}

/// Blank cells are `None`; anything present must be a recognised yes/no spelling.
fn read_flag(
    value: Option<&str>,
    email: &str,
    column: &'static str,
) -> Result<Option<bool>, RosterError> {
    value
        .map(|raw| {
            parse_flag(raw).ok_or_else(|| RosterError::InvalidFlag {
                email: email.to_string(),
                column,
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "success" | "successful" => Some(true),
        "false" | "no" | "n" | "0" | "failed" | "failure" => Some(false),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
