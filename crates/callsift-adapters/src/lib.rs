//! Source adapters: per-field parsers plus the mappings from the two
//! source-native record shapes onto the canonical draft.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use callsift_core::{ParsedPhone, ReportDraft, Source};
use callsift_storage::HttpClient;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const CRATE_NAME: &str = "callsift-adapters";

/// Record-level rejection reasons. Only the two identifying fields can sink
/// a whole candidate record; every other parse failure degrades to an
/// absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordRejection {
    #[error("missing or unparseable phone number")]
    MissingPhone,
    #[error("missing or unparseable report date")]
    MissingReportDate,
}

/// Trim-and-require-content text parser; empty-after-trim is absent, never
/// an empty string.
pub fn parse_text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a national-format US phone number into its country code and
/// national number. Formatting characters are skipped, a leading `+1` or
/// bare `1` country prefix is accepted, and anything after an extension
/// marker is ignored.
pub fn parse_phone(raw: Option<&str>) -> Option<ParsedPhone> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut digits = String::new();
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if matches!(ch, 'x' | 'X' | '#' | ';') && !digits.is_empty() {
            break;
        }
    }

    let national = match digits.len() {
        10 => digits,
        11 if digits.starts_with('1') => digits[1..].to_string(),
        _ => {
            warn!(raw = trimmed, "unable to parse phone number");
            return None;
        }
    };

    // NANP area codes never start with 0 or 1.
    if national.as_bytes()[0] < b'2' {
        warn!(raw = trimmed, "invalid national number");
        return None;
    }

    Some(ParsedPhone {
        country_code: 1,
        national_number: national,
    })
}

const COMBINED_INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a combined `"YYYY-MM-DD HH:MM:SS"` timestamp, naive, assumed UTC.
pub fn parse_combined_instant(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(trimmed, COMBINED_INSTANT_FORMAT) {
        Ok(naive) => Some(Utc.from_utc_datetime(&naive)),
        Err(err) => {
            warn!(raw = trimmed, %err, "unable to parse timestamp");
            None
        }
    }
}

/// Parse a `"MM/DD/YYYY"` date plus a separate 12-hour time string. Stray
/// periods and commas are stripped and the period marker upper-cased first,
/// so `"10:00 a.m."` reads as `"10:00 AM"`. The result is tagged UTC.
pub fn parse_split_instant(
    date_raw: Option<&str>,
    time_raw: Option<&str>,
) -> Option<DateTime<Utc>> {
    let date_part = date_raw?.trim();
    let time_part = time_raw?.trim();
    if date_part.is_empty() || time_part.is_empty() {
        return None;
    }

    let time_part: String = time_part
        .chars()
        .filter(|c| !matches!(c, '.' | ','))
        .collect::<String>()
        .to_ascii_uppercase();
    let combined = format!("{date_part} {}", time_part.trim());

    for format in ["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %I:%M %p"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&combined, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    warn!(raw = combined.as_str(), "unable to parse date/time pair");
    None
}

/// Parse a `"<lat> <long>"` center-point string. Anything that is not a
/// digit, whitespace, minus, or decimal point is stripped; input that does
/// not reduce to exactly two floats yields a fully absent pair, never a
/// partial one.
pub fn parse_coordinates(raw: Option<&str>) -> (Option<f64>, Option<f64>) {
    let Some(raw) = raw else {
        return (None, None);
    };

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '.'))
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() != 2 {
        if !raw.trim().is_empty() {
            warn!(raw, "unable to parse coordinate pair");
        }
        return (None, None);
    }

    match (tokens[0].parse::<f64>(), tokens[1].parse::<f64>()) {
        (Ok(latitude), Ok(longitude)) => (Some(latitude), Some(longitude)),
        _ => {
            warn!(raw, "non-numeric coordinate pair");
            (None, None)
        }
    }
}

/// 2-letter region code: exactly two upper-case ASCII letters after
/// trimming.
pub fn parse_region_code(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
        Some(trimmed.to_string())
    } else {
        if !trimmed.is_empty() {
            warn!(raw = trimmed, "unrecognized state format");
        }
        None
    }
}

/// Postal code: must begin with a digit or hyphen after trimming.
pub fn parse_postal_code(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    match trimmed.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '-' => Some(trimmed.to_string()),
        Some(_) => {
            warn!(raw = trimmed, "unrecognized zip format");
            None
        }
        None => None,
    }
}

/// One record from the FTC complaint feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FtcRecord {
    #[serde(default)]
    pub attributes: FtcAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FtcAttributes {
    #[serde(rename = "company-phone-number")]
    pub company_phone_number: Option<String>,
    #[serde(rename = "created-date")]
    pub created_date: Option<String>,
    #[serde(rename = "violation-date")]
    pub violation_date: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "recorded-message-or-robocall")]
    pub recorded_message_or_robocall: Option<String>,
    #[serde(rename = "consumer-city")]
    pub consumer_city: Option<String>,
    #[serde(rename = "consumer-state")]
    pub consumer_state: Option<String>,
    #[serde(rename = "consumer-area-code")]
    pub consumer_area_code: Option<String>,
}

/// One page of the paginated feed envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FtcPage {
    #[serde(default)]
    pub data: Vec<FtcRecord>,
    #[serde(default)]
    pub meta: FtcPageMeta,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FtcPageMeta {
    #[serde(rename = "records-this-page", default)]
    pub records_this_page: usize,
}

/// One row of the FCC consumer-complaints export. Column names follow the
/// published file headers verbatim, typo included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FccRow {
    #[serde(rename = "Ticket ID")]
    pub ticket_id: Option<String>,
    #[serde(rename = "Date of Issue")]
    pub date_of_issue: Option<String>,
    #[serde(rename = "Time of Issue")]
    pub time_of_issue: Option<String>,
    #[serde(rename = "Caller ID Number")]
    pub caller_id_number: Option<String>,
    #[serde(rename = "Type of Call or Messge")]
    pub type_of_call: Option<String>,
    #[serde(rename = "Advertiser Business Number")]
    pub advertiser_business_number: Option<String>,
    #[serde(rename = "Method")]
    pub method: Option<String>,
    #[serde(rename = "Issue")]
    pub issue: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Zip")]
    pub zip: Option<String>,
    #[serde(rename = "Location (Center point of the Zip Code)")]
    pub location: Option<String>,
}

/// A source-native raw record, consumed once by its adapter.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Ftc(FtcRecord),
    Fcc(FccRow),
}

impl RawRecord {
    pub fn source(&self) -> Source {
        match self {
            RawRecord::Ftc(_) => Source::Ftc,
            RawRecord::Fcc(_) => Source::Fcc,
        }
    }
}

/// Map one raw record onto the canonical parsed-field shape, or reject it
/// when an identifying field is missing.
pub fn parse_record(raw: &RawRecord) -> Result<ReportDraft, RecordRejection> {
    match raw {
        RawRecord::Ftc(record) => parse_ftc_record(record),
        RawRecord::Fcc(row) => parse_fcc_row(row),
    }
}

/// FTC records carry combined timestamps, a robocall marker, and consumer
/// city/state, but no native ticket identifier; their `source_seq_id` is
/// always absent and cross-run dedup falls to the storage conflict policy.
fn parse_ftc_record(record: &FtcRecord) -> Result<ReportDraft, RecordRejection> {
    let attr = &record.attributes;

    let phone =
        parse_phone(attr.company_phone_number.as_deref()).ok_or(RecordRejection::MissingPhone)?;
    let report_date = parse_combined_instant(attr.created_date.as_deref())
        .ok_or(RecordRejection::MissingReportDate)?;

    Ok(ReportDraft {
        source: Source::Ftc,
        phone,
        report_date,
        violation_date: parse_combined_instant(attr.violation_date.as_deref()),
        report_method: None,
        type_of_call: None,
        subject: parse_text(attr.subject.as_deref()),
        robocall: Some(attr.recorded_message_or_robocall.as_deref() == Some("Y")),
        consumer_city: parse_text(attr.consumer_city.as_deref()),
        consumer_state: parse_region_code(attr.consumer_state.as_deref()),
        consumer_zip: None,
        latitude: None,
        longitude: None,
        source_seq_id: None,
    })
}

/// FCC rows carry a ticket identifier, a split date/time pair, and a
/// center-point coordinate string, but no city and no robocall marker;
/// those canonical fields are always absent here.
fn parse_fcc_row(row: &FccRow) -> Result<ReportDraft, RecordRejection> {
    let phone =
        parse_phone(row.caller_id_number.as_deref()).ok_or(RecordRejection::MissingPhone)?;
    let report_date =
        parse_split_instant(row.date_of_issue.as_deref(), row.time_of_issue.as_deref())
            .ok_or(RecordRejection::MissingReportDate)?;
    let (latitude, longitude) = parse_coordinates(row.location.as_deref());

    Ok(ReportDraft {
        source: Source::Fcc,
        phone,
        report_date,
        violation_date: None,
        report_method: parse_text(row.method.as_deref()),
        type_of_call: parse_text(row.type_of_call.as_deref()),
        subject: parse_text(row.issue.as_deref()),
        robocall: None,
        consumer_city: None,
        consumer_state: parse_region_code(row.state.as_deref()),
        consumer_zip: parse_postal_code(row.zip.as_deref()),
        latitude,
        longitude,
        source_seq_id: parse_text(row.ticket_id.as_deref()),
    })
}

/// Load FCC rows from a delimited export file. An unreadable file is an
/// error; a row that fails to decode stops the read and keeps the partial
/// batch.
pub fn load_fcc_rows(path: impl AsRef<Path>) -> Result<Vec<FccRow>> {
    let path = path.as_ref();
    let reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(read_fcc_rows(reader))
}

pub fn read_fcc_rows<R: Read>(mut reader: csv::Reader<R>) -> Vec<FccRow> {
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                warn!(%err, rows = rows.len(), "stopping file read early; keeping partial batch");
                break;
            }
        }
    }
    rows
}

pub const DEFAULT_FTC_ENDPOINT: &str = "https://api.ftc.gov/v0/dnc-complaints";
const DEFAULT_PAGE_LIMIT: usize = 50;
const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fetch window selector for the FTC feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRange {
    Day,
    Week,
    All,
}

impl FetchRange {
    /// Compute the `[from, to]` window against a caller-supplied clock.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = match self {
            FetchRange::Day => now - chrono::Duration::days(1),
            FetchRange::Week => now - chrono::Duration::weeks(1),
            FetchRange::All => Utc
                .with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        };
        (from, now)
    }
}

/// FTC feed endpoint configuration.
#[derive(Debug, Clone)]
pub struct FtcFeedConfig {
    pub endpoint: String,
    pub api_key: String,
    pub page_limit: usize,
}

impl FtcFeedConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Walk the paginated FTC feed for one time window. Stops on an empty or
/// short page. A transport or decode failure ends the walk and returns the
/// records accumulated so far; there are no retries.
pub async fn fetch_ftc_window(
    http: &HttpClient,
    config: &FtcFeedConfig,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<FtcRecord> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    loop {
        let url = format!(
            "{}?api_key={}&created_date_from={}&created_date_to={}&page[limit]={}&page[offset]={}",
            config.endpoint,
            config.api_key,
            from.format(FEED_TIMESTAMP_FORMAT),
            to.format(FEED_TIMESTAMP_FORMAT),
            config.page_limit,
            offset,
        );

        let page: FtcPage = match http.get_json(&url).await {
            Ok(page) => page,
            Err(err) => {
                warn!(%err, fetched = records.len(), "feed fetch aborted; keeping partial batch");
                break;
            }
        };

        if page.data.is_empty() {
            break;
        }

        let short_page = page.meta.records_this_page < config.page_limit;
        records.extend(page.data);
        if short_page {
            break;
        }
        offset += config.page_limit;
    }

    debug!(records = records.len(), "feed fetch complete");
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn phone_parser_handles_national_formats() {
        for raw in ["2025551234", "(202) 555-1234", "202-555-1234", "+1 202 555 1234", "12025551234"] {
            let phone = parse_phone(Some(raw)).unwrap_or_else(|| panic!("should parse {raw}"));
            assert_eq!(phone.country_code, 1);
            assert_eq!(phone.national_number, "2025551234");
            assert_eq!(phone.e164(), "+12025551234");
        }
    }

    #[test]
    fn phone_parser_ignores_extensions() {
        let phone = parse_phone(Some("202-555-1234 x89")).unwrap();
        assert_eq!(phone.national_number, "2025551234");
    }

    #[test]
    fn phone_parser_rejects_garbage() {
        assert_eq!(parse_phone(None), None);
        assert_eq!(parse_phone(Some("")), None);
        assert_eq!(parse_phone(Some("not-a-phone")), None);
        assert_eq!(parse_phone(Some("555-1234")), None);
        // ten digits, but the area code cannot start with 1
        assert_eq!(parse_phone(Some("1025551234")), None);
    }

    #[test]
    fn combined_instant_parses_and_tags_utc() {
        assert_eq!(
            parse_combined_instant(Some("2024-05-01 10:00:00")),
            Some(utc(2024, 5, 1, 10, 0, 0))
        );
        assert_eq!(parse_combined_instant(Some("05/01/2024")), None);
        assert_eq!(parse_combined_instant(Some("")), None);
        assert_eq!(parse_combined_instant(None), None);
    }

    #[test]
    fn split_instant_matches_combined_encoding() {
        let split = parse_split_instant(Some("05/01/2024"), Some("10:00 AM"));
        assert_eq!(split, Some(utc(2024, 5, 1, 10, 0, 0)));
        assert_eq!(split, parse_combined_instant(Some("2024-05-01 10:00:00")));
    }

    #[test]
    fn split_instant_strips_period_noise_and_case() {
        assert_eq!(
            parse_split_instant(Some("05/01/2024"), Some("10:00 a.m.")),
            Some(utc(2024, 5, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_split_instant(Some("12/31/2023"), Some("11:59:59 p.m.")),
            Some(utc(2023, 12, 31, 23, 59, 59))
        );
    }

    #[test]
    fn split_instant_requires_both_parts() {
        assert_eq!(parse_split_instant(Some("05/01/2024"), None), None);
        assert_eq!(parse_split_instant(None, Some("10:00 AM")), None);
        assert_eq!(parse_split_instant(Some("05/01/2024"), Some("25:00 AM")), None);
    }

    #[test]
    fn coordinates_strip_stray_characters() {
        assert_eq!(
            parse_coordinates(Some("34.05 -118.25 extra!")),
            (Some(34.05), Some(-118.25))
        );
    }

    #[test]
    fn coordinates_never_yield_a_partial_pair() {
        assert_eq!(parse_coordinates(Some("34.05")), (None, None));
        assert_eq!(parse_coordinates(Some("34.05 -118.25 7")), (None, None));
        assert_eq!(parse_coordinates(Some("34.0.5 -118.25")), (None, None));
        assert_eq!(parse_coordinates(Some("")), (None, None));
        assert_eq!(parse_coordinates(None), (None, None));
    }

    #[test]
    fn region_code_requires_two_upper_case_letters() {
        assert_eq!(parse_region_code(Some(" CA ")), Some("CA".to_string()));
        assert_eq!(parse_region_code(Some("ca")), None);
        assert_eq!(parse_region_code(Some("CAL")), None);
        assert_eq!(parse_region_code(Some("C1")), None);
        assert_eq!(parse_region_code(Some("")), None);
    }

    #[test]
    fn postal_code_must_start_with_digit_or_hyphen() {
        assert_eq!(parse_postal_code(Some("90001")), Some("90001".to_string()));
        assert_eq!(parse_postal_code(Some("-1234")), Some("-1234".to_string()));
        assert_eq!(parse_postal_code(Some("ABCDE")), None);
        assert_eq!(parse_postal_code(Some("   ")), None);
    }

    #[test]
    fn text_parser_treats_blank_as_absent() {
        assert_eq!(parse_text(Some("  hello  ")), Some("hello".to_string()));
        assert_eq!(parse_text(Some("   ")), None);
        assert_eq!(parse_text(None), None);
    }

    #[test]
    fn ftc_record_decodes_kebab_case_attributes() {
        let record: FtcRecord = serde_json::from_str(
            r#"{
                "attributes": {
                    "company-phone-number": "2025551234",
                    "created-date": "2024-01-01 00:00:00",
                    "recorded-message-or-robocall": "Y",
                    "consumer-state": "VA"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(record.attributes.company_phone_number.as_deref(), Some("2025551234"));
        assert_eq!(record.attributes.recorded_message_or_robocall.as_deref(), Some("Y"));
        assert_eq!(record.attributes.violation_date, None);
    }

    #[test]
    fn ftc_record_maps_to_draft() {
        let record = FtcRecord {
            attributes: FtcAttributes {
                company_phone_number: Some("2025551234".to_string()),
                created_date: Some("2024-01-01 00:00:00".to_string()),
                recorded_message_or_robocall: Some("Y".to_string()),
                ..Default::default()
            },
        };

        let draft = parse_record(&RawRecord::Ftc(record)).unwrap();
        assert_eq!(draft.source, Source::Ftc);
        assert_eq!(draft.phone.e164(), "+12025551234");
        assert_eq!(draft.report_date, utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(draft.robocall, Some(true));
        assert_eq!(draft.source_seq_id, None);
        assert_eq!(draft.consumer_zip, None);
        assert_eq!(draft.latitude, None);
    }

    #[test]
    fn ftc_record_without_report_date_is_rejected() {
        let record = FtcRecord {
            attributes: FtcAttributes {
                company_phone_number: Some("2025551234".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(
            parse_record(&RawRecord::Ftc(record)),
            Err(RecordRejection::MissingReportDate)
        );
    }

    #[test]
    fn ftc_record_without_phone_is_rejected() {
        let record = FtcRecord {
            attributes: FtcAttributes {
                created_date: Some("2024-01-01 00:00:00".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(
            parse_record(&RawRecord::Ftc(record)),
            Err(RecordRejection::MissingPhone)
        );
    }

    #[test]
    fn fcc_row_maps_to_draft() {
        let row = FccRow {
            ticket_id: Some("100".to_string()),
            caller_id_number: Some("(202) 555-1234".to_string()),
            date_of_issue: Some("05/01/2024".to_string()),
            time_of_issue: Some("10:00 AM".to_string()),
            state: Some("CA".to_string()),
            zip: Some("90001".to_string()),
            location: Some("34.05 -118.25".to_string()),
            ..Default::default()
        };

        let draft = parse_record(&RawRecord::Fcc(row)).unwrap();
        assert_eq!(draft.source, Source::Fcc);
        assert_eq!(draft.phone.e164(), "+12025551234");
        assert_eq!(draft.report_date, utc(2024, 5, 1, 10, 0, 0));
        assert_eq!(draft.consumer_state.as_deref(), Some("CA"));
        assert_eq!(draft.consumer_zip.as_deref(), Some("90001"));
        assert_eq!(draft.source_seq_id.as_deref(), Some("100"));
        assert_eq!(draft.latitude, Some(34.05));
        assert_eq!(draft.longitude, Some(-118.25));
        // fields the source does not carry
        assert_eq!(draft.robocall, None);
        assert_eq!(draft.consumer_city, None);
        assert_eq!(draft.violation_date, None);
    }

    #[test]
    fn fcc_row_with_bad_zip_still_parses() {
        let row = FccRow {
            ticket_id: Some("100".to_string()),
            caller_id_number: Some("2025551234".to_string()),
            date_of_issue: Some("05/01/2024".to_string()),
            time_of_issue: Some("10:00 AM".to_string()),
            zip: Some("ABCDE".to_string()),
            ..Default::default()
        };

        let draft = parse_record(&RawRecord::Fcc(row)).unwrap();
        assert_eq!(draft.consumer_zip, None);
        assert_eq!(draft.phone.e164(), "+12025551234");
    }

    #[test]
    fn parsing_the_same_record_twice_is_identical() {
        let row = FccRow {
            ticket_id: Some("100".to_string()),
            caller_id_number: Some("2025551234".to_string()),
            date_of_issue: Some("05/01/2024".to_string()),
            time_of_issue: Some("10:00 AM".to_string()),
            issue: Some("Robocall about a warranty".to_string()),
            ..Default::default()
        };
        let raw = RawRecord::Fcc(row);

        assert_eq!(parse_record(&raw).unwrap(), parse_record(&raw).unwrap());
    }

    #[test]
    fn csv_rows_decode_by_header_name() {
        let data = "\
Ticket ID,Date of Issue,Time of Issue,Caller ID Number,Type of Call or Messge,Advertiser Business Number,Method,Issue,State,Zip,Location (Center point of the Zip Code)
100,05/01/2024,10:00 AM,(202) 555-1234,Live Voice,,Phone,Telemarketing,CA,90001,34.05 -118.25
";
        let rows = read_fcc_rows(csv::Reader::from_reader(data.as_bytes()));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticket_id.as_deref(), Some("100"));
        assert_eq!(rows[0].type_of_call.as_deref(), Some("Live Voice"));
        assert_eq!(rows[0].advertiser_business_number, None);
    }

    #[test]
    fn csv_read_keeps_partial_batch_on_malformed_row() {
        let data = "\
Ticket ID,Date of Issue,Time of Issue,Caller ID Number,Type of Call or Messge,Advertiser Business Number,Method,Issue,State,Zip,Location (Center point of the Zip Code)
100,05/01/2024,10:00 AM,(202) 555-1234,Live Voice,,Phone,Telemarketing,CA,90001,34.05 -118.25
truncated row
101,05/02/2024,11:00 AM,(202) 555-9999,Live Voice,,Phone,Telemarketing,CA,90001,
";
        let rows = read_fcc_rows(csv::Reader::from_reader(data.as_bytes()));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticket_id.as_deref(), Some("100"));
    }

    #[test]
    fn fetch_range_windows_are_anchored_to_now() {
        let now = utc(2024, 6, 15, 12, 0, 0);
        assert_eq!(FetchRange::Day.window(now), (utc(2024, 6, 14, 12, 0, 0), now));
        assert_eq!(FetchRange::Week.window(now), (utc(2024, 6, 8, 12, 0, 0), now));
        assert_eq!(FetchRange::All.window(now), (utc(2015, 1, 1, 0, 0, 0), now));
    }

    #[test]
    fn ftc_page_decode_tolerates_missing_meta() {
        let page: FtcPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.meta.records_this_page, 0);
    }
}
