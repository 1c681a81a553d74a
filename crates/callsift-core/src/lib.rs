//! Canonical record model shared by the callsift ingestion pipeline.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "callsift-core";

/// Originating data source of a complaint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Ftc,
    Fcc,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ftc => "FTC",
            Source::Fcc => "FCC",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phone number parsed against the US default region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPhone {
    pub country_code: u16,
    pub national_number: String,
}

impl ParsedPhone {
    /// E.164-style rendering: `+`, country code, national number.
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national_number)
    }
}

/// Typed parsed-field handoff from a source adapter into the pipeline.
///
/// The two identifying fields are non-optional by construction; everything
/// else is an `Option` where `None` covers both "source does not carry the
/// field" and "value failed to parse".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub source: Source,
    pub phone: ParsedPhone,
    pub report_date: DateTime<Utc>,
    pub violation_date: Option<DateTime<Utc>>,
    pub report_method: Option<String>,
    pub type_of_call: Option<String>,
    pub subject: Option<String>,
    pub robocall: Option<bool>,
    pub consumer_city: Option<String>,
    pub consumer_state: Option<String>,
    pub consumer_zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source_seq_id: Option<String>,
}

/// One canonical complaint submission, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneReport {
    pub phone_number: String,
    pub source: Source,
    pub report_date: DateTime<Utc>,
    pub violation_date: Option<DateTime<Utc>>,
    pub report_method: Option<String>,
    pub type_of_call: Option<String>,
    pub subject: Option<String>,
    pub robocall: Option<bool>,
    pub consumer_city: Option<String>,
    pub consumer_state: Option<String>,
    pub consumer_zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source_seq_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity row for a phone number, emitted once per first occurrence in a
/// batch. Aggregates (report counts, scores, first-seen times) belong to the
/// storage layer, not this pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub phone_number: String,
    pub country_code: u16,
}

/// Cooperative cancellation flag threaded through a batch run.
///
/// Checked between records only, so a cancelled run always ends on a
/// consistent prefix of its output.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
