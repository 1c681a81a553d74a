//! Batch ingestion pipeline: parallel parse fan-out, a single sequential
//! dedup pass, and canonical emission.

use std::collections::HashSet;

use callsift_adapters::{parse_record, RawRecord, RecordRejection};
use callsift_core::{CancelToken, PhoneNumber, PhoneReport, ReportDraft, Source};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "callsift-ingest";

/// Per-batch dedup state. Created at batch start, owned by the sequential
/// dedup pass, discarded with the batch; never shared across runs.
#[derive(Debug, Default)]
struct DedupState {
    seen_tickets: HashSet<(Source, String)>,
    seen_numbers: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DedupDecision {
    Accept { new_number: bool },
    DuplicateTicket,
    IntegrityAnomaly,
}

impl DedupState {
    /// First occurrence wins. Records without a native ticket id skip the
    /// ticket check entirely; their cross-run uniqueness is the storage
    /// layer's problem.
    fn decide(&mut self, draft: &ReportDraft) -> DedupDecision {
        let e164 = draft.phone.e164();

        if let Some(seq_id) = &draft.source_seq_id {
            let key = (draft.source, seq_id.clone());
            if self.seen_tickets.contains(&key) {
                // A repeated ticket id attached to a number this batch has
                // never seen is inconsistent source data, not a resend.
                if !self.seen_numbers.contains(&e164) {
                    return DedupDecision::IntegrityAnomaly;
                }
                return DedupDecision::DuplicateTicket;
            }
            self.seen_tickets.insert(key);
        }

        let new_number = self.seen_numbers.insert(e164);
        DedupDecision::Accept { new_number }
    }
}

/// Counters and identity for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_records: usize,
    pub accepted_reports: usize,
    pub unique_numbers: usize,
    pub rejected_missing_phone: usize,
    pub rejected_missing_report_date: usize,
    pub duplicate_tickets: usize,
    pub integrity_anomalies: usize,
    pub cancelled: bool,
}

/// The two ordered collections handed to storage, plus the run summary.
/// Reports keep input order; numbers keep first-appearance order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub reports: Vec<PhoneReport>,
    pub numbers: Vec<PhoneNumber>,
    pub summary: BatchSummary,
}

/// Assemble the canonical report from parsed fields. Fields the source did
/// not supply arrive here as `None` and are written out as `None`; the
/// distinction between "source lacks it" and "failed to parse" ends at the
/// adapter boundary.
pub fn normalize(draft: ReportDraft, created_at: DateTime<Utc>) -> PhoneReport {
    PhoneReport {
        phone_number: draft.phone.e164(),
        source: draft.source,
        report_date: draft.report_date,
        violation_date: draft.violation_date,
        report_method: draft.report_method,
        type_of_call: draft.type_of_call,
        subject: draft.subject,
        robocall: draft.robocall,
        consumer_city: draft.consumer_city,
        consumer_state: draft.consumer_state,
        consumer_zip: draft.consumer_zip,
        latitude: draft.latitude,
        longitude: draft.longitude,
        source_seq_id: draft.source_seq_id,
        notes: None,
        created_at,
    }
}

/// Run one ingestion batch: fan the records out to parallel parsing, then
/// fold the results through a sequential dedup pass in stable input order.
///
/// Parsing holds no shared state, so it runs on a worker pool with an
/// order-preserving collect. A task that observes a cancelled token yields
/// `None`, and the sequential pass below stops at the first `None` or at a
/// cancelled check of its own, so the output is always a consistent prefix.
pub fn ingest_batch(records: &[RawRecord], cancel: &CancelToken) -> BatchOutput {
    let started_at = Utc::now();
    let created_at = started_at;

    let parsed: Vec<Option<Result<ReportDraft, RecordRejection>>> = records
        .par_iter()
        .map(|raw| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(parse_record(raw))
        })
        .collect();

    let mut summary = BatchSummary {
        run_id: Uuid::new_v4(),
        started_at,
        finished_at: started_at,
        input_records: records.len(),
        accepted_reports: 0,
        unique_numbers: 0,
        rejected_missing_phone: 0,
        rejected_missing_report_date: 0,
        duplicate_tickets: 0,
        integrity_anomalies: 0,
        cancelled: false,
    };

    let mut state = DedupState::default();
    let mut reports = Vec::new();
    let mut numbers = Vec::new();

    for outcome in parsed {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let Some(outcome) = outcome else {
            summary.cancelled = true;
            break;
        };

        match outcome {
            Err(reason) => {
                debug!(%reason, "dropping candidate record");
                match reason {
                    RecordRejection::MissingPhone => summary.rejected_missing_phone += 1,
                    RecordRejection::MissingReportDate => {
                        summary.rejected_missing_report_date += 1
                    }
                }
            }
            Ok(draft) => match state.decide(&draft) {
                DedupDecision::DuplicateTicket => {
                    info!(
                        source = %draft.source,
                        seq_id = draft.source_seq_id.as_deref().unwrap_or(""),
                        "dropping duplicate ticket"
                    );
                    summary.duplicate_tickets += 1;
                }
                DedupDecision::IntegrityAnomaly => {
                    warn!(
                        source = %draft.source,
                        seq_id = draft.source_seq_id.as_deref().unwrap_or(""),
                        phone_number = %draft.phone.e164(),
                        "duplicate ticket id with never-seen phone number; inconsistent source data"
                    );
                    summary.integrity_anomalies += 1;
                }
                DedupDecision::Accept { new_number } => {
                    if new_number {
                        numbers.push(PhoneNumber {
                            phone_number: draft.phone.e164(),
                            country_code: draft.phone.country_code,
                        });
                    }
                    reports.push(normalize(draft, created_at));
                }
            },
        }
    }

    summary.accepted_reports = reports.len();
    summary.unique_numbers = numbers.len();
    summary.finished_at = Utc::now();

    info!(
        run_id = %summary.run_id,
        input = summary.input_records,
        accepted = summary.accepted_reports,
        numbers = summary.unique_numbers,
        duplicates = summary.duplicate_tickets,
        anomalies = summary.integrity_anomalies,
        cancelled = summary.cancelled,
        "batch complete"
    );

    BatchOutput {
        reports,
        numbers,
        summary,
    }
}
