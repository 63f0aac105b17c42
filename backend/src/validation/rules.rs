//! Field validation rules.
//!
//! Rules only check structure and format. They never change a value and
//! never stop a run: failures become diagnostics.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::NormalizedRecord;
use crate::reference::regions::is_region_code;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static SNILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{3} \d{2}$").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+7\d{10}$").unwrap());
static TICKET_SERIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-zА-Яа-яЁё0-9]{1,4}$").unwrap());

/// A format rule with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// `YYYY-MM-DD` naming a real calendar day
    Date,

    /// Date within a year range, optionally not after today
    DomainDate {
        min_year: i32,
        max_year: i32,
        #[serde(default)]
        allow_future: bool,
    },

    /// Length bounds in characters
    Text {
        #[serde(default)]
        min_len: usize,
        #[serde(default)]
        max_len: Option<usize>,
    },

    /// Digits only, with length bounds
    Digits {
        #[serde(default)]
        exact: Option<usize>,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },

    /// Two-digit key of the region table
    Region,

    /// SNILS in `XXX-XXX-XXX XX` form
    NationalId,

    /// Up to 4 Latin/Cyrillic letters or digits
    TicketSeries,

    /// Up to 4 digits
    PassportSeries,

    /// Up to 6 digits
    DocumentNumber,

    /// `+7` and ten digits
    Phone,

    /// `"true"`, `"false"` or empty
    Flag,
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn parse_iso(value: &str) -> Result<NaiveDate, String> {
    if !ISO_DATE.is_match(value) {
        return Err(format!("expected YYYY-MM-DD, got '{}'", value));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a calendar date", value))
}

impl Rule {
    /// Check a non-blank value.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            Rule::Date => parse_iso(value).map(|_| ()),

            Rule::DomainDate {
                min_year,
                max_year,
                allow_future,
            } => {
                let date = parse_iso(value)?;
                if date.year() < *min_year || date.year() > *max_year {
                    return Err(format!(
                        "year {} outside {}..={}",
                        date.year(),
                        min_year,
                        max_year
                    ));
                }
                if !allow_future && date > Local::now().date_naive() {
                    return Err(format!("date {} is in the future", value));
                }
                Ok(())
            }

            Rule::Text { min_len, max_len } => {
                let len = value.chars().count();
                if len < *min_len {
                    return Err(format!("too short: {} < {} characters", len, min_len));
                }
                match max_len {
                    Some(max) if len > *max => {
                        Err(format!("too long: {} > {} characters", len, max))
                    }
                    _ => Ok(()),
                }
            }

            Rule::Digits { exact, min, max } => {
                if !is_digits(value) {
                    return Err(format!("'{}' must contain digits only", value));
                }
                let len = value.len();
                if let Some(n) = exact {
                    if len != *n {
                        return Err(format!("expected {} digits, got {}", n, len));
                    }
                }
                if let Some(n) = min {
                    if len < *n {
                        return Err(format!("expected at least {} digits, got {}", n, len));
                    }
                }
                if let Some(n) = max {
                    if len > *n {
                        return Err(format!("expected at most {} digits, got {}", n, len));
                    }
                }
                Ok(())
            }

            Rule::Region => {
                if value.len() == 2 && is_digits(value) && is_region_code(value) {
                    Ok(())
                } else {
                    Err(format!("unknown region code '{}'", value))
                }
            }

            Rule::NationalId => {
                let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
                if SNILS.is_match(value) && digits == 11 {
                    Ok(())
                } else {
                    Err(format!("SNILS must look like XXX-XXX-XXX XX, got '{}'", value))
                }
            }

            Rule::TicketSeries => {
                if TICKET_SERIES.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("ticket series must be up to 4 letters or digits, got '{}'", value))
                }
            }

            Rule::PassportSeries => {
                if is_digits(value) && value.len() <= 4 {
                    Ok(())
                } else {
                    Err(format!("passport series must be up to 4 digits, got '{}'", value))
                }
            }

            Rule::DocumentNumber => {
                if is_digits(value) && value.len() <= 6 {
                    Ok(())
                } else {
                    Err(format!("number must be up to 6 digits, got '{}'", value))
                }
            }

            Rule::Phone => {
                if PHONE.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("phone must look like +7XXXXXXXXXX, got '{}'", value))
                }
            }

            Rule::Flag => match value {
                "true" | "false" | "" => Ok(()),
                other => Err(format!("flag must be true or false, got '{}'", other)),
            },
        }
    }
}

/// A rule plus whether the field may be left blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    pub rule: Rule,
    #[serde(default = "default_allow_empty")]
    pub allow_empty: bool,
}

fn default_allow_empty() -> bool {
    true
}

impl FieldRules {
    pub fn optional(rule: Rule) -> Self {
        Self {
            rule,
            allow_empty: true,
        }
    }

    pub fn required(rule: Rule) -> Self {
        Self {
            rule,
            allow_empty: false,
        }
    }

    pub fn check(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            if self.allow_empty {
                Ok(())
            } else {
                Err("required field is empty".to_string())
            }
        } else {
            self.rule.check(value)
        }
    }
}

/// Column name to rules, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: BTreeMap<String, FieldRules>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, rules: FieldRules) -> Self {
        self.rules.insert(field.to_string(), rules);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldRules> {
        self.rules.get(field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate one field. Fields without rules always pass.
    pub fn validate(&self, field: &str, value: &str) -> Result<(), String> {
        match self.rules.get(field) {
            Some(rules) => rules.check(value),
            None => Ok(()),
        }
    }

    /// Validate every field of a record: `(field, value, message)` per failure.
    pub fn validate_record(&self, record: &NormalizedRecord) -> Vec<(String, String, String)> {
        record
            .iter()
            .filter_map(|(field, value)| {
                self.validate(field, value)
                    .err()
                    .map(|msg| (field.to_string(), value.to_string(), msg))
            })
            .collect()
    }

    /// Rules for the hunter/ticket registry layout.
    pub fn registry() -> Self {
        let this_year = Local::now().year();
        let issue_date = Rule::DomainDate {
            min_year: 1950,
            max_year: this_year,
            allow_future: false,
        };
        let name = |max| Rule::Text {
            min_len: 1,
            max_len: Some(max),
        };

        Self::new()
            .with("date_entry", FieldRules::optional(issue_date.clone()))
            .with(
                "municipality_code",
                FieldRules::optional(Rule::Digits {
                    exact: None,
                    min: Some(8),
                    max: Some(11),
                }),
            )
            .with("municipality_name", FieldRules::optional(name(255)))
            .with("surname", FieldRules::required(name(100)))
            .with("hunter_name", FieldRules::required(name(100)))
            .with("patronymic", FieldRules::optional(name(100)))
            .with(
                "birth_date",
                FieldRules::required(Rule::DomainDate {
                    min_year: 1900,
                    max_year: this_year,
                    allow_future: false,
                }),
            )
            .with("birth_place", FieldRules::optional(name(255)))
            .with("postal_address", FieldRules::optional(name(500)))
            .with(
                "postal_code",
                FieldRules::optional(Rule::Digits {
                    exact: Some(6),
                    min: None,
                    max: None,
                }),
            )
            .with("phone", FieldRules::optional(Rule::Phone))
            .with("snils_code", FieldRules::optional(Rule::NationalId))
            .with("series_ticket", FieldRules::required(Rule::TicketSeries))
            .with("number_ticket", FieldRules::required(Rule::DocumentNumber))
            .with("date_issue_ticket", FieldRules::required(issue_date.clone()))
            .with("series_passport", FieldRules::optional(Rule::PassportSeries))
            .with("number_passport", FieldRules::optional(Rule::DocumentNumber))
            .with("is_belonged_to_indigenous_people", FieldRules::optional(Rule::Flag))
            .with("cancellation_date", FieldRules::optional(issue_date))
            .with(
                "cancellation_reason_code",
                FieldRules::optional(Rule::Digits {
                    exact: Some(1),
                    min: None,
                    max: None,
                }),
            )
            .with(
                "nationality_code",
                FieldRules::optional(Rule::Digits {
                    exact: None,
                    min: Some(1),
                    max: Some(3),
                }),
            )
            .with("nationality_name", FieldRules::optional(name(255)))
    }
}
