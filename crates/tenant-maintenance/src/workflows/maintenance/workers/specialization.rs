use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::workflows::maintenance::error::MaintenanceError;

/// Trade category a worker is qualified for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerSpecialization {
    #[default]
    GeneralMaintenance,
    Plumbing,
    Electrical,
    Hvac,
    Carpentry,
    Painting,
    Locksmith,
    ApplianceRepair,
}

impl WorkerSpecialization {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::GeneralMaintenance,
            Self::Plumbing,
            Self::Electrical,
            Self::Hvac,
            Self::Carpentry,
            Self::Painting,
            Self::Locksmith,
            Self::ApplianceRepair,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::GeneralMaintenance => "General Maintenance",
            Self::Plumbing => "Plumbing",
            Self::Electrical => "Electrical",
            Self::Hvac => "HVAC",
            Self::Carpentry => "Carpentry",
            Self::Painting => "Painting",
            Self::Locksmith => "Locksmith",
            Self::ApplianceRepair => "Appliance Repair",
        }
    }

    /// General maintenance covers every trade; a specific trade only covers itself.
    pub fn covers(self, required: Self) -> bool {
        self == required || self == Self::GeneralMaintenance
    }
}

impl fmt::Display for WorkerSpecialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkerSpecialization {
    type Err = MaintenanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "general" | "generalmaintenance" => Ok(Self::GeneralMaintenance),
            "plumbing" | "plumber" => Ok(Self::Plumbing),
            "electrical" | "electrician" => Ok(Self::Electrical),
            "hvac" => Ok(Self::Hvac),
            "carpentry" | "carpenter" => Ok(Self::Carpentry),
            "painting" | "painter" => Ok(Self::Painting),
            "locksmith" => Ok(Self::Locksmith),
            "appliancerepair" | "appliance" => Ok(Self::ApplianceRepair),
            _ => Err(MaintenanceError::invalid(format!(
                "unknown specialization '{}'",
                value.trim()
            ))),
        }
    }
}

/// Ordered keyword table; the first category with a matching keyword wins.
const SPECIALIZATION_KEYWORDS: &[(WorkerSpecialization, &[&str])] = &[
    (
        WorkerSpecialization::Plumbing,
        &[
            "leak", "faucet", "drain", "toilet", "sink", "pipe", "clog", "clogged", "shower",
            "water heater",
        ],
    ),
    (
        WorkerSpecialization::Electrical,
        &[
            "outlet",
            "wiring",
            "sparking",
            "circuit",
            "breaker",
            "electrical",
            "light switch",
            "light fixture",
            "fuse",
        ],
    ),
    (
        WorkerSpecialization::Hvac,
        &[
            "heating",
            "cooling",
            "thermostat",
            "air conditioning",
            "furnace",
            "hvac",
            "ventilation",
        ],
    ),
    (
        WorkerSpecialization::Painting,
        &["paint", "peeling", "primer"],
    ),
    (
        WorkerSpecialization::Carpentry,
        &["cabinet", "door frame", "door hinge", "drawer", "shelf", "floorboard", "trim"],
    ),
    (
        WorkerSpecialization::Locksmith,
        &["lock", "key", "deadbolt"],
    ),
    (
        WorkerSpecialization::ApplianceRepair,
        &[
            "refrigerator",
            "fridge",
            "washer",
            "dryer",
            "oven",
            "stove",
            "microwave",
            "appliance",
        ],
    ),
];

// Word endings a keyword may carry and still match ("leaking", "keys", "fused").
const INFLECTIONS: &[&str] = &["", "s", "es", "d", "ed", "ing", "y"];

/// Map a request's free text to the trade it needs, falling back to general maintenance.
///
/// Keywords match whole words, so "clock" never reads as "lock". Multi-word keywords
/// match consecutive words.
pub fn determine_required_specialization(title: &str, description: &str) -> WorkerSpecialization {
    let text = format!("{title} {description}").to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    SPECIALIZATION_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| contains_keyword(&words, keyword))
        })
        .map(|(specialization, _)| *specialization)
        .unwrap_or_default()
}

fn contains_keyword(words: &[&str], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split_whitespace().collect();
    if parts.is_empty() {
        return false;
    }
    words.windows(parts.len()).any(|window| {
        window
            .iter()
            .zip(&parts)
            .all(|(word, part)| matches_word(word, part))
    })
}

fn matches_word(word: &str, keyword: &str) -> bool {
    word.strip_prefix(keyword)
        .is_some_and(|ending| INFLECTIONS.contains(&ending))
}
