//! Dadata address client (suggestions API, cleaner API as fallback).

use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::address::{extract_postal_code, AddressMatch, AddressService};
use crate::error::{AddressError, AddressResult};

const SUGGEST_URL: &str = "https://suggestions.dadata.ru/suggestions/api/4_1/rs/suggest/address";
const CLEAN_URL: &str = "https://cleaner.dadata.ru/api/v1/clean/address";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    #[serde(default)]
    data: AddressData,
}

#[derive(Debug, Default, Deserialize)]
struct AddressData {
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    oktmo: Option<String>,
}

impl From<AddressData> for AddressMatch {
    fn from(data: AddressData) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        AddressMatch {
            postal_code: keep(data.postal_code),
            oktmo: keep(data.oktmo),
        }
    }
}

/// Dadata error body
#[derive(Debug, Deserialize)]
struct DadataError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Dadata client
#[derive(Clone)]
pub struct DadataClient {
    http: reqwest::Client,
    api_key: String,
    secret_key: Option<String>,
    suggest_url: String,
    clean_url: String,
}

impl DadataClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> AddressResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AddressError::MissingApiKey);
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_key,
            secret_key: None,
            suggest_url: SUGGEST_URL.to_string(),
            clean_url: CLEAN_URL.to_string(),
        })
    }

    /// Create a client from `DADATA_API_KEY` (and optional `DADATA_SECRET_KEY`).
    pub fn from_env() -> AddressResult<Self> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("DADATA_API_KEY").map_err(|_| AddressError::MissingApiKey)?;
        let client = Self::new(api_key)?;
        Ok(match env::var("DADATA_SECRET_KEY") {
            Ok(secret) if !secret.trim().is_empty() => client.with_secret(secret),
            _ => client,
        })
    }

    /// Secret key, required by the cleaner endpoint.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = Some(secret.into());
        self
    }

    /// Point the client at other endpoints (proxies, test servers).
    pub fn with_endpoints(mut self, suggest_url: &str, clean_url: &str) -> Self {
        self.suggest_url = suggest_url.to_string();
        self.clean_url = clean_url.to_string();
        self
    }

    /// Best suggestion for an address.
    pub async fn suggest(&self, address: &str) -> AddressResult<Option<AddressMatch>> {
        let body = self
            .post(&self.suggest_url, &json!({ "query": address, "count": 1 }), false)
            .await?;
        parse_suggest_response(&body)
    }

    /// Standardized address. Skipped without a secret key.
    pub async fn clean(&self, address: &str) -> AddressResult<Option<AddressMatch>> {
        if self.secret_key.is_none() {
            return Ok(None);
        }
        let body = self.post(&self.clean_url, &json!([address]), true).await?;
        parse_clean_response(&body)
    }

    async fn post(&self, url: &str, payload: &Value, with_secret: bool) -> AddressResult<String> {
        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Authorization", format!("Token {}", self.api_key))
            .json(payload);

        if with_secret {
            if let Some(secret) = &self.secret_key {
                request = request.header("X-Secret", secret);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<DadataError>(&body)
                .ok()
                .and_then(|e| e.message.or(e.reason))
                .unwrap_or(body);
            return Err(AddressError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

impl AddressService for DadataClient {
    async fn lookup(&self, address: &str) -> AddressResult<Option<AddressMatch>> {
        if let Some(postal_code) = extract_postal_code(address) {
            return Ok(Some(AddressMatch {
                postal_code: Some(postal_code),
                oktmo: None,
            }));
        }

        let suggested = self.suggest(address).await?;
        if suggested.as_ref().is_some_and(|m| m.postal_code.is_some()) {
            return Ok(suggested);
        }

        match self.clean(address).await {
            Ok(Some(cleaned)) if !cleaned.is_empty() => Ok(Some(cleaned)),
            Ok(_) => Ok(suggested),
            Err(e) if suggested.is_some() => {
                tracing::debug!(error = %e, "cleaner failed, keeping suggestion");
                Ok(suggested)
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_suggest_response(body: &str) -> AddressResult<Option<AddressMatch>> {
    let response: SuggestResponse =
        serde_json::from_str(body).map_err(|e| AddressError::InvalidResponse(e.to_string()))?;
    Ok(response
        .suggestions
        .into_iter()
        .next()
        .map(|s| AddressMatch::from(s.data))
        .filter(|m| !m.is_empty()))
}

fn parse_clean_response(body: &str) -> AddressResult<Option<AddressMatch>> {
    let cleaned: Vec<AddressData> =
        serde_json::from_str(body).map_err(|e| AddressError::InvalidResponse(e.to_string()))?;
    Ok(cleaned
        .into_iter()
        .next()
        .map(AddressMatch::from)
        .filter(|m| !m.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key() {
        assert!(matches!(DadataClient::new("  "), Err(AddressError::MissingApiKey)));
    }

    #[test]
    fn test_parse_suggestion() {
        let body = r#"{"suggestions":[{"value":"г Саратов, ул Мира","data":{"postal_code":"410012","oktmo":"63701000"}}]}"#;
        let found = parse_suggest_response(body).unwrap().unwrap();
        assert_eq!(found.postal_code.as_deref(), Some("410012"));
        assert_eq!(found.oktmo.as_deref(), Some("63701000"));
    }

    #[test]
    fn test_parse_empty_suggestions() {
        assert_eq!(parse_suggest_response(r#"{"suggestions":[]}"#).unwrap(), None);
        let blank = r#"{"suggestions":[{"data":{"postal_code":null,"oktmo":""}}]}"#;
        assert_eq!(parse_suggest_response(blank).unwrap(), None);
    }

    #[test]
    fn test_parse_clean_response() {
        let body = r#"[{"source":"саратов мира 1","postal_code":"410012","oktmo":null}]"#;
        let found = parse_clean_response(body).unwrap().unwrap();
        assert_eq!(found.postal_code.as_deref(), Some("410012"));
        assert_eq!(found.oktmo, None);
    }

    #[test]
    fn test_invalid_body() {
        assert!(matches!(
            parse_suggest_response("<html>"),
            Err(AddressError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_embedded_postal_code_skips_network() {
        let client = DadataClient::new("key")
            .unwrap()
            .with_endpoints("http://127.0.0.1:9/none", "http://127.0.0.1:9/none");
        let found = client.lookup("410012, г. Саратов").await.unwrap().unwrap();
        assert_eq!(found.postal_code.as_deref(), Some("410012"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let client = DadataClient::new("key")
            .unwrap()
            .with_endpoints("http://127.0.0.1:9/none", "http://127.0.0.1:9/none");
        assert!(client.lookup("г. Саратов, ул. Мира").await.is_err());
    }
}
