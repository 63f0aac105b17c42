//! Projection of normalized records into the two output shapes.
//!
//! Every leaf is a string. Absent fields project to `""`; nothing is ever
//! emitted as a JSON number, boolean or null.

use crate::models::{CodeName, HunterId, NameRef, NormalizedRecord, PersonRecord, TicketRecord};

/// Cancellation reasons by code.
pub const CANCELLATION_REASONS: &[(&str, &str)] = &[
    ("1", "Подача заявления об аннулировании охотничьего билета"),
    ("2", "Выявление обстоятельств, препятствующих получению охотничьего билета"),
    ("3", "Выдача охотничьего билета с нарушением установленного порядка"),
    ("4", "Смерть охотника"),
    ("5", "Решение суда о лишении права осуществлять охоту"),
];

/// Reason name for a code, if the code is known.
pub fn cancellation_reason(code: &str) -> Option<&'static str> {
    CANCELLATION_REASONS
        .iter()
        .find(|(c, _)| *c == code.trim())
        .map(|(_, name)| *name)
}

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn field(record: &NormalizedRecord, name: &str) -> String {
    record.get(name).to_string()
}

/// Person-oriented record for `hunters.json`.
pub fn project_person(record: &NormalizedRecord) -> PersonRecord {
    PersonRecord {
        date_entry: field(record, "date_entry"),
        municipality: CodeName {
            code: field(record, "municipality_code"),
            name: field(record, "municipality_name"),
        },
        surname: field(record, "surname"),
        hunter_name: field(record, "hunter_name"),
        patronymic: field(record, "patronymic"),
        birth_date: field(record, "birth_date"),
        birth_place: field(record, "birth_place"),
        postal_address: field(record, "postal_address"),
        postal_code: field(record, "postal_code"),
        phone: field(record, "phone"),
        snils_code: field(record, "snils_code"),
        series_ticket: compact(record.get("series_ticket")),
        number_ticket: compact(record.get("number_ticket")),
        date_issue_ticket: field(record, "date_issue_ticket"),
        nationality: CodeName {
            code: field(record, "nationality_code"),
            name: field(record, "nationality_name"),
        },
    }
}

/// Permit-oriented record for `huntingtickets.json`.
pub fn project_ticket(record: &NormalizedRecord) -> TicketRecord {
    let reason = if record.is_blank("cancellation_reason_name") {
        cancellation_reason(record.get("cancellation_reason_code"))
            .unwrap_or_default()
            .to_string()
    } else {
        field(record, "cancellation_reason_name")
    };

    TicketRecord {
        date_entry: field(record, "date_entry"),
        series: compact(record.get("series_ticket")),
        number: compact(record.get("number_ticket")),
        date_issue: field(record, "date_issue_ticket"),
        hunter_id: HunterId {
            series_passport: compact(record.get("series_passport")),
            number_passport: compact(record.get("number_passport")),
        },
        is_belonged_to_indigenous_people: field(record, "is_belonged_to_indigenous_people"),
        cancellation_date: field(record, "cancellation_date"),
        cancellation_reason: NameRef { name: reason },
    }
}
