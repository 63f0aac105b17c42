//! Address service contract and the batched lookup pre-pass.
//!
//! The pre-pass runs before the row loop. It collects the unique addresses of
//! rows that have no postal code, asks the [`AddressService`] about them in
//! batches, and freezes the answers into [`AddressHints`] for the enricher.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AddressResult;
use crate::models::RawRecord;
use crate::transform::normalize::{normalize_postal_code, normalize_text};
use crate::transform::StopFlag;

/// Addresses looked up per batch.
pub const BATCH_SIZE: usize = 10;

/// Pause between batches.
pub const BATCH_PAUSE: Duration = Duration::from_millis(100);

/// Addresses this short are not worth a lookup.
const MIN_ADDRESS_LEN: usize = 5;

static EMBEDDED_POSTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6}\b").unwrap());

/// What the address service knows about one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMatch {
    pub postal_code: Option<String>,
    pub oktmo: Option<String>,
}

impl AddressMatch {
    pub fn is_empty(&self) -> bool {
        self.postal_code.is_none() && self.oktmo.is_none()
    }
}

/// Remote address lookup. Implementations must not panic; every failure is an `Err`.
#[allow(async_fn_in_trait)]
pub trait AddressService {
    async fn lookup(&self, address: &str) -> AddressResult<Option<AddressMatch>>;
}

/// First standalone six-digit number in an address.
pub fn extract_postal_code(address: &str) -> Option<String> {
    EMBEDDED_POSTAL
        .find(address)
        .map(|m| m.as_str().to_string())
}

/// Lookup key for an address: whitespace collapsed.
pub fn normalize_address(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Frozen lookup results, keyed by normalized address.
#[derive(Debug, Clone, Default)]
pub struct AddressHints {
    by_address: HashMap<String, AddressMatch>,
}

impl AddressHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str, found: AddressMatch) {
        self.by_address.insert(normalize_address(address), found);
    }

    pub fn get(&self, address: &str) -> Option<&AddressMatch> {
        self.by_address.get(&normalize_address(address))
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// Unique addresses worth sending to the service, in first-seen order.
///
/// Skips rows that already have a postal code and addresses that carry one
/// inline, since the enricher extracts those without a network call.
pub fn addresses_to_resolve<'a>(rows: impl IntoIterator<Item = &'a RawRecord>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut addresses = Vec::new();

    for row in rows {
        let postal = row
            .get("postal_code")
            .map(normalize_postal_code)
            .unwrap_or_default();
        if !postal.trim().is_empty() {
            continue;
        }

        let address = row
            .get("postal_address")
            .map(normalize_text)
            .unwrap_or_default();
        if address.chars().count() <= MIN_ADDRESS_LEN || extract_postal_code(&address).is_some() {
            continue;
        }

        if seen.insert(address.clone()) {
            addresses.push(address);
        }
    }

    addresses
}

/// Look addresses up in batches. Failures are logged and skipped.
pub async fn gather_hints<S: AddressService>(
    service: &S,
    addresses: &[String],
    stop: &StopFlag,
) -> AddressHints {
    let mut hints = AddressHints::new();
    let mut failures = 0usize;

    for (i, batch) in addresses.chunks(BATCH_SIZE).enumerate() {
        if stop.is_stopped() {
            tracing::info!(
                done = i * BATCH_SIZE,
                total = addresses.len(),
                "address lookup stopped"
            );
            break;
        }
        if i > 0 {
            tokio::time::sleep(BATCH_PAUSE).await;
        }

        let results = futures::future::join_all(batch.iter().map(|a| service.lookup(a))).await;

        for (address, result) in batch.iter().zip(results) {
            match result {
                Ok(Some(found)) if !found.is_empty() => hints.insert(address, found),
                Ok(_) => tracing::debug!(address = %address, "address service found nothing"),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(address = %address, error = %e, "address lookup failed");
                }
            }
        }
    }

    tracing::info!(
        requested = addresses.len(),
        found = hints.len(),
        failures,
        "address lookup finished"
    );
    hints
}
