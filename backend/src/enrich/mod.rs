//! Enrichment of normalized records from reference data.
//!
//! The [`Enricher`] fills blank administrative and category fields. It only
//! ever writes to blank fields, and each write is recorded as an enrichment
//! diagnostic. Network lookups never happen here: they run earlier, in the
//! [`address`] pre-pass, and arrive as frozen [`AddressHints`].

pub mod address;
pub mod dadata;

pub use address::{
    addresses_to_resolve, extract_postal_code, gather_hints, AddressHints, AddressMatch,
    AddressService,
};
pub use dadata::DadataClient;

use crate::models::NormalizedRecord;
use crate::reference::{normalize_code, AdminDirectory, CategoryDirectory};
use crate::transform::Diagnostics;

/// Borrowed view over the reference snapshots for one run.
#[derive(Debug, Clone, Copy)]
pub struct Enricher<'a> {
    admin: &'a AdminDirectory,
    category: &'a CategoryDirectory,
    hints: &'a AddressHints,
}

/// Set a blank field and log it. Returns false when the field already had a value.
fn fill(
    record: &mut NormalizedRecord,
    row: usize,
    field: &str,
    value: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    if !record.is_blank(field) || value.trim().is_empty() {
        return false;
    }
    let old = record.get(field).to_string();
    record.set(field, value);
    diagnostics.enrichment(row, field, &old, value);
    tracing::debug!(row, field, value, "enriched");
    true
}

impl<'a> Enricher<'a> {
    pub fn new(
        admin: &'a AdminDirectory,
        category: &'a CategoryDirectory,
        hints: &'a AddressHints,
    ) -> Self {
        Self {
            admin,
            category,
            hints,
        }
    }

    /// Run both enrichments on a record.
    pub fn enrich(&self, record: &mut NormalizedRecord, row: usize, diagnostics: &mut Diagnostics) {
        self.enrich_administrative(record, row, diagnostics);
        self.enrich_category(record, row, diagnostics);
    }

    /// Fill `postal_code`, `municipality_code` and `municipality_name`.
    ///
    /// Returns the final `(code, name)` pair when a code is known.
    pub fn enrich_administrative(
        &self,
        record: &mut NormalizedRecord,
        row: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<(String, String)> {
        if self.admin.is_empty() && self.hints.is_empty() {
            return None;
        }

        let address = record.get("postal_address").to_string();
        let hint = self.hints.get(&address).cloned();

        if record.is_blank("postal_code") {
            let postal = extract_postal_code(&address)
                .or_else(|| hint.as_ref().and_then(|h| h.postal_code.clone()));
            if let Some(postal) = postal {
                fill(record, row, "postal_code", &postal, diagnostics);
            }
        }

        if record.is_blank("municipality_code") {
            let code = self
                .admin
                .find_code_by_postal(record.get("postal_code"))
                .map(str::to_string)
                .or_else(|| {
                    hint.as_ref()
                        .and_then(|h| h.oktmo.as_deref())
                        .map(normalize_code)
                        .filter(|c| !c.is_empty())
                });
            match code {
                Some(code) => {
                    fill(record, row, "municipality_code", &code, diagnostics);
                }
                None => tracing::debug!(row, "no municipality for postal code"),
            }
        }

        let code = record.get("municipality_code").to_string();
        if code.is_empty() {
            return None;
        }

        if record.is_blank("municipality_name") {
            if let Some(name) = self.admin.get_name_by_code(&code) {
                fill(record, row, "municipality_name", name, diagnostics);
            }
        }

        Some((code, record.get("municipality_name").to_string()))
    }

    /// Fill `nationality_code` from the name or `nationality_name` from the code.
    pub fn enrich_category(
        &self,
        record: &mut NormalizedRecord,
        row: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<(String, String)> {
        if !self.category.is_loaded() {
            return None;
        }

        let code = record.get("nationality_code").to_string();
        let name = record.get("nationality_name").to_string();

        if !code.is_empty() {
            if name.is_empty() {
                if let Some(found) = self.category.name_by_code(&code) {
                    fill(record, row, "nationality_name", found, diagnostics);
                }
            }
        } else if !name.is_empty() {
            if let Some(found) = self.category.code_by_name(&name) {
                fill(record, row, "nationality_code", found, diagnostics);
            }
        }

        let code = record.get("nationality_code");
        (!code.is_empty()).then(|| (code.to_string(), record.get("nationality_name").to_string()))
    }
}
