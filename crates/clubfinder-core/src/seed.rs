//! Club import from JSON, CSV and in-memory rows

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::categorizer;
use crate::{Categories, ClubFinder, CoreResult, MeetingSlot, MeetingTime, NewClub};

const DAYS: &[(&str, &str)] = &[
    ("monday", "Monday"),
    ("tuesday", "Tuesday"),
    ("wednesday", "Wednesday"),
    ("thursday", "Thursday"),
    ("friday", "Friday"),
    ("saturday", "Saturday"),
    ("sunday", "Sunday"),
];

// Morning has no slot of its own and is folded into Afternoon.
const TIME_SLOTS: &[(&str, &str)] = &[
    ("afternoon", "Afternoon"),
    ("evening", "Evening"),
    ("night", "Night"),
    ("morning", "Afternoon"),
];

/// One club as it appears in an import file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubRecord {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// e.g. `["Monday Afternoon", "Thursdays at 6pm in the evening"]`
    #[serde(default)]
    pub meeting_times: MeetingTimes,
    /// Comma-separated labels; derived from the text when absent
    #[serde(default)]
    pub category: Option<String>,
}

/// A single meeting string or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MeetingTimes {
    One(String),
    Many(Vec<String>),
}

impl Default for MeetingTimes {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl MeetingTimes {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    meeting_times: String,
    #[serde(default)]
    category: Option<String>,
}

impl From<CsvRow> for ClubRecord {
    fn from(row: CsvRow) -> Self {
        let meeting_times = row
            .meeting_times
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            name: row.name,
            url: row.url,
            description: row.description,
            meeting_times: MeetingTimes::Many(meeting_times),
            category: row.category,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub added: usize,
    /// Rows with a blank or already-known name
    pub skipped: usize,
    /// Meeting strings with no recognizable day or time slot
    pub unparsed_meeting_times: usize,
}

/// Find the first weekday and time-slot word in free text such as
/// `"Thursday Evening"` or `"every monday night"`.
pub fn parse_meeting_time(raw: &str) -> Option<MeetingSlot> {
    let lower = raw.to_lowercase();
    let day = DAYS.iter().find(|(pat, _)| lower.contains(pat))?.1;
    let slot = TIME_SLOTS.iter().find(|(pat, _)| lower.contains(pat))?.1;
    Some(MeetingSlot::new(day, slot))
}

impl ClubFinder {
    /// Import a JSON array of club records in one transaction.
    pub fn seed_from_json(&self, path: impl AsRef<Path>) -> CoreResult<SeedReport> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<ClubRecord> = serde_json::from_str(&content)?;
        let report = self.seed_from_data(records)?;
        log::info!("seeded {} clubs from {}", report.added, path.as_ref().display());
        Ok(report)
    }

    /// Import a CSV file with `name, url, description, meeting_times,
    /// category` columns; meeting times are separated by `;`.
    pub fn seed_from_csv(&self, path: impl AsRef<Path>) -> CoreResult<SeedReport> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        let records = reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(ClubRecord::from))
            .collect::<Result<Vec<_>, _>>()?;
        let report = self.seed_from_data(records)?;
        log::info!("seeded {} clubs from {}", report.added, path.as_ref().display());
        Ok(report)
    }

    pub fn seed_from_data(&self, records: Vec<ClubRecord>) -> CoreResult<SeedReport> {
        let mut report = SeedReport::default();
        let mut clubs = Vec::with_capacity(records.len());

        for record in records {
            let name = record.name.trim().to_string();
            if name.is_empty() {
                log::warn!("skipping club record without a name");
                report.skipped += 1;
                continue;
            }

            let categories = match record.category.as_deref().map(Categories::parse) {
                Some(categories) if !categories.is_empty() => categories,
                _ => Categories::from_labels([categorizer::categorize(&name, &record.description)]),
            };

            let mut meeting_times: Vec<MeetingTime> = Vec::new();
            for raw in record.meeting_times.into_vec() {
                match parse_meeting_time(&raw) {
                    Some(slot) if meeting_times.iter().any(|mt| mt.slot == slot) => {}
                    Some(slot) => meeting_times.push(MeetingTime::new(slot, Some(raw))),
                    None => {
                        log::debug!("could not parse meeting time {raw:?} for {name:?}");
                        report.unparsed_meeting_times += 1;
                    }
                }
            }

            clubs.push(NewClub {
                name,
                url: record.url,
                summary: record.description,
                categories,
                meeting_times,
            });
        }

        for (club, inserted) in clubs.iter().zip(self.add_clubs(&clubs)?) {
            if inserted {
                log::debug!("added club {:?} ({})", club.name, club.categories.joined());
                report.added += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }
}
