//! HTTP-backed record store.
//!
//! The collection lives at `{base}/records` as one JSON document. Inline
//! photos are uploaded to `{base}/images/{id}.jpg` before the collection is
//! pushed, so the document only ever carries hosted URLs. A background poll
//! loop watches for edits made by other devices.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::RecordStore;
use crate::models::{record::sort_newest_first, AttendanceRecord};
use crate::utils::data_url;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// How often the poll loop re-fetches the collection.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn records_url(&self) -> String {
        format!("{}/records", self.base_url)
    }

    fn image_url(&self, record_id: &str) -> String {
        format!("{}/images/{}.jpg", self.base_url, record_id)
    }

    /// Re-fetch the collection every [`POLL_INTERVAL`] and publish it on the
    /// returned channel whenever it differs from the last published value.
    /// The loop runs until `cancel` fires; fetch failures are logged and the
    /// previous value stands.
    pub fn spawn_poller(
        &self,
        cancel: CancellationToken,
    ) -> watch::Receiver<Vec<AttendanceRecord>> {
        let (tx, rx) = watch::channel(Vec::new());
        let store = self.clone();

        tokio::spawn(async move {
            log_info!(
                "Remote record polling every {}s against {}",
                POLL_INTERVAL.as_secs(),
                store.base_url
            );
            loop {
                match store.load().await {
                    Ok(records) => {
                        let changed = *tx.borrow() != records;
                        if changed {
                            log_info!("Remote records changed ({} total)", records.len());
                            if tx.send(records).is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => log_warn!("Remote record fetch failed: {err:#}"),
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
            log_info!("Remote record polling stopped");
        });

        rx
    }

    /// Upload the record's inline photo and swap the data URL for the hosted
    /// one. Records that already point at a hosted image pass through as-is.
    async fn with_hosted_image(&self, record: &AttendanceRecord) -> Result<AttendanceRecord> {
        if !record.has_inline_image() {
            return Ok(record.clone());
        }

        let (mime, bytes) = data_url::decode(&record.image_data_url)
            .context("record carries an unreadable photo payload")?;

        let response = self
            .authorized(self.client.post(self.image_url(&record.id)))
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .context("failed to upload check-in photo")?
            .error_for_status()
            .context("remote store rejected photo upload")?;

        let hosted: HostedImage = response
            .json()
            .await
            .context("failed to parse photo upload response")?;

        let mut record = record.clone();
        record.image_data_url = hosted.url;
        Ok(record)
    }
}

#[derive(Deserialize)]
struct HostedImage {
    url: String,
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn load(&self) -> Result<Vec<AttendanceRecord>> {
        let response = self
            .authorized(self.client.get(self.records_url()))
            .send()
            .await
            .context("failed to fetch records from remote store")?;

        // A collection that was never written reads as missing.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let body = response
            .error_for_status()
            .context("remote store rejected record fetch")?
            .text()
            .await
            .context("failed to read remote records response")?;

        parse_collection(&body)
    }

    async fn save(&self, records: &[AttendanceRecord]) -> Result<()> {
        let mut hosted = Vec::with_capacity(records.len());
        for record in records {
            hosted.push(self.with_hosted_image(record).await?);
        }

        self.authorized(self.client.put(self.records_url()))
            .json(&hosted)
            .send()
            .await
            .context("failed to push records to remote store")?
            .error_for_status()
            .context("remote store rejected record push")?;

        Ok(())
    }
}

/// An empty or `null` body means the collection was never written.
fn parse_collection(body: &str) -> Result<Vec<AttendanceRecord>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let mut records: Vec<AttendanceRecord> = match serde_json::from_str(trimmed) {
        Ok(records) => records,
        Err(err) => bail!("failed to parse remote records: {err}"),
    };
    sort_newest_first(&mut records);
    Ok(records)
}
