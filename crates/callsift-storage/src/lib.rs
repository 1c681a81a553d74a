//! HTTP fetch utilities and the idempotent Postgres upsert store.

use std::time::Duration;

use anyhow::Context;
use callsift_core::{PhoneNumber, PhoneReport};
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "callsift-storage";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    /// Single GET decoded as JSON. No retries: feed callers treat any
    /// failure as end-of-feed and keep what they already accumulated.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: final_url,
            source,
        })
    }
}

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS phone_numbers (
        phone_number TEXT PRIMARY KEY,
        country_code INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS phone_reports (
        phone_number TEXT NOT NULL,
        source TEXT NOT NULL,
        report_date TIMESTAMPTZ NOT NULL,
        violation_date TIMESTAMPTZ,
        report_method TEXT,
        type_of_call TEXT,
        subject TEXT,
        robocall BOOLEAN,
        consumer_city TEXT,
        consumer_state TEXT,
        consumer_zip TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        source_seq_id TEXT,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS phone_reports_source_seq_idx
        ON phone_reports (source, source_seq_id)
        WHERE source_seq_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS phone_reports_row_identity_idx
        ON phone_reports (source, phone_number, report_date)
        WHERE source_seq_id IS NULL",
];

// Postgres caps bind parameters at 65535 per statement; reports bind 16
// columns per row.
const REPORT_CHUNK_ROWS: usize = 500;
const NUMBER_CHUNK_ROWS: usize = 1000;

/// Postgres-backed store for the two canonical collections. All writes are
/// idempotent bulk upserts: existing-key conflicts are no-ops, the cross-run
/// duplicate safety net behind the in-batch dedup pass.
#[derive(Debug, Clone)]
pub struct ComplaintStore {
    pool: PgPool,
}

impl ComplaintStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("connecting to postgres")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("applying schema statement")?;
        }
        Ok(())
    }

    /// Bulk-insert reports, skipping rows whose `(source, source_seq_id)`
    /// already exists. Returns the number of newly inserted rows.
    pub async fn upsert_reports(&self, reports: &[PhoneReport]) -> anyhow::Result<u64> {
        let mut inserted = 0u64;
        for chunk in reports.chunks(REPORT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO phone_reports (phone_number, source, report_date, violation_date, \
                 report_method, type_of_call, subject, robocall, consumer_city, consumer_state, \
                 consumer_zip, latitude, longitude, source_seq_id, notes, created_at) ",
            );
            builder.push_values(chunk, |mut row, report| {
                row.push_bind(report.phone_number.as_str())
                    .push_bind(report.source.as_str())
                    .push_bind(report.report_date)
                    .push_bind(report.violation_date)
                    .push_bind(report.report_method.as_deref())
                    .push_bind(report.type_of_call.as_deref())
                    .push_bind(report.subject.as_deref())
                    .push_bind(report.robocall)
                    .push_bind(report.consumer_city.as_deref())
                    .push_bind(report.consumer_state.as_deref())
                    .push_bind(report.consumer_zip.as_deref())
                    .push_bind(report.latitude)
                    .push_bind(report.longitude)
                    .push_bind(report.source_seq_id.as_deref())
                    .push_bind(report.notes.as_deref())
                    .push_bind(report.created_at);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .context("upserting phone_reports chunk")?;
            debug!(rows = chunk.len(), inserted = result.rows_affected(), "report chunk upserted");
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Bulk-insert phone numbers keyed by `phone_number`. Returns the number
    /// of newly inserted rows.
    pub async fn upsert_numbers(&self, numbers: &[PhoneNumber]) -> anyhow::Result<u64> {
        let mut inserted = 0u64;
        for chunk in numbers.chunks(NUMBER_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO phone_numbers (phone_number, country_code) ",
            );
            builder.push_values(chunk, |mut row, number| {
                row.push_bind(number.phone_number.as_str())
                    .push_bind(i32::from(number.country_code));
            });
            builder.push(" ON CONFLICT (phone_number) DO NOTHING");

            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .context("upserting phone_numbers chunk")?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_http_config_is_sane() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn http_status_error_names_status_and_url() {
        let err = FetchError::HttpStatus {
            status: 503,
            url: "https://example.test/feed".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("503"));
        assert!(rendered.contains("https://example.test/feed"));
    }

    #[test]
    fn report_chunks_stay_under_bind_limit() {
        assert!(REPORT_CHUNK_ROWS * 16 < 65535);
        assert!(NUMBER_CHUNK_ROWS * 2 < 65535);
    }
}
