//! Reverse geocoding: coordinates in, one street address line out.
//!
//! The shipped resolver asks the Gemini generateContent endpoint for a
//! concise single-line address. Anything other than a non-blank answer is a
//! resolution failure; there are no retries, the submission simply fails.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SubmitError;
use crate::models::GeoPoint;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Concise single-line street address for a fix.
    async fn resolve(&self, point: GeoPoint) -> Result<String, SubmitError>;
}

pub struct GeminiResolver {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiResolver {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn generate_address(&self, point: GeoPoint) -> Result<String> {
        // The key rides in the query string; keep the URL out of error text.
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let prompt = address_prompt(point);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("gemini returned status {status}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("gemini response is not valid json")?;
        let address = extract_text(&parsed);
        if address.is_empty() {
            bail!("gemini returned an empty address");
        }
        Ok(address)
    }
}

#[async_trait]
impl AddressResolver for GeminiResolver {
    async fn resolve(&self, point: GeoPoint) -> Result<String, SubmitError> {
        self.generate_address(point).await.map_err(|err| {
            error!("address resolution failed: {err:?}");
            SubmitError::AddressResolution(err)
        })
    }
}

fn address_prompt(point: GeoPoint) -> String {
    format!(
        "Based on the following coordinates (Latitude: {}, Longitude: {}), provide a \
         concise, single-line street address. Only return the address, with no extra \
         explanation or labels. For example: '1600 Amphitheatre Parkway, Mountain View, \
         CA, USA'. If the location is remote, provide the most specific description \
         possible.",
        point.latitude, point.longitude
    )
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_coordinates() {
        let prompt = address_prompt(GeoPoint {
            latitude: 37.422,
            longitude: -122.0841,
        });
        assert!(prompt.contains("Latitude: 37.422"));
        assert!(prompt.contains("Longitude: -122.0841"));
        assert!(prompt.contains("single-line street address"));
        assert!(prompt.contains("'1600 Amphitheatre Parkway, Mountain View, CA, USA'"));
    }

    #[test]
    fn request_body_matches_the_generate_content_shape() {
        let prompt = address_prompt(GeoPoint {
            latitude: 1.5,
            longitude: 2.5,
        });
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Latitude: 1.5"));
    }

    #[test]
    fn extracts_and_trims_the_first_candidate() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "  1600 Amphitheatre Parkway, "},
                        {"text": "Mountain View, CA, USA\n"}
                    ],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 52}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            extract_text(&parsed),
            "1600 Amphitheatre Parkway, Mountain View, CA, USA"
        );
    }

    #[test]
    fn missing_candidates_or_blank_text_read_as_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(&parsed), "");

        let blank: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "   \n"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&blank), "");
    }
}
