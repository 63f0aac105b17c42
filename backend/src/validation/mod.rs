//! Validation.
//!
//! Two layers, neither of which changes data or stops a run:
//!
//! - [`rules`] - per-field format rules ([`Rule`], [`RuleSet`]) run on every
//!   normalized record; failures land in the diagnostics.
//! - [`schema`] - JSON Schema (draft 7) check of projected person records
//!   against the embedded `schemas/hunter.json`; failures become warnings.
//!
//! # Example
//!
//! ```rust,ignore
//! use hunterload::validation::{Rule, RuleSet};
//!
//! let rules = RuleSet::registry();
//! assert!(rules.validate("phone", "+79161234567").is_ok());
//! assert!(Rule::NationalId.check("12345678901").is_err());
//! ```

pub mod rules;
pub mod schema;

pub use rules::{FieldRules, Rule, RuleSet};
pub use schema::{hunter_schema, is_valid, validate, validate_person};
