//! Field mapping between the application shape and the remote schema.
//!
//! The application uses camelCase names (`effortMonths`, `createdAt`), the
//! remote table uses snake_case columns (`effort_months`, `created_at`). The
//! mapping below is the complete set of persisted fields: remote columns not
//! listed are dropped on read, application fields not listed are never sent.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::{Card, CardPatch, NewCard};
use crate::error::RemoteError;
use crate::remote::Row;

/// Every persisted card field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardField {
    Id,
    Title,
    Urgency,
    Important,
    Effort,
    Owner,
    CreatedAt,
    Reach,
    Impact,
    Confidence,
    EffortMonths,
}

impl CardField {
    pub const ALL: [CardField; 11] = [
        CardField::Id,
        CardField::Title,
        CardField::Urgency,
        CardField::Important,
        CardField::Effort,
        CardField::Owner,
        CardField::CreatedAt,
        CardField::Reach,
        CardField::Impact,
        CardField::Confidence,
        CardField::EffortMonths,
    ];

    /// Name in the application shape.
    pub fn app_name(self) -> &'static str {
        match self {
            CardField::Id => "id",
            CardField::Title => "title",
            CardField::Urgency => "urgency",
            CardField::Important => "important",
            CardField::Effort => "effort",
            CardField::Owner => "owner",
            CardField::CreatedAt => "createdAt",
            CardField::Reach => "reach",
            CardField::Impact => "impact",
            CardField::Confidence => "confidence",
            CardField::EffortMonths => "effortMonths",
        }
    }

    /// Column name in the remote table.
    pub fn remote_column(self) -> &'static str {
        match self {
            CardField::CreatedAt => "created_at",
            CardField::EffortMonths => "effort_months",
            other => other.app_name(),
        }
    }

    pub fn from_app_name(name: &str) -> Option<CardField> {
        CardField::ALL.into_iter().find(|f| f.app_name() == name)
    }

    pub fn from_remote_column(column: &str) -> Option<CardField> {
        CardField::ALL.into_iter().find(|f| f.remote_column() == column)
    }

    /// Server-assigned fields that a client write must never carry.
    pub fn is_server_assigned(self) -> bool {
        matches!(self, CardField::Id | CardField::CreatedAt)
    }

    /// Value read in place of a missing or null column.
    ///
    /// Rows written before the RICE schema have no RICE columns, and older
    /// rows left the slider and owner columns empty. RICE fields read as zero,
    /// sliders as the lowest rating. `id` and `created_at` have no fallback.
    fn null_default(self) -> Option<Value> {
        match self {
            CardField::Id | CardField::CreatedAt => None,
            CardField::Title | CardField::Owner => Some(Value::from("")),
            CardField::Urgency | CardField::Important | CardField::Effort => {
                Some(Value::from(1))
            }
            CardField::Reach
            | CardField::Impact
            | CardField::Confidence
            | CardField::EffortMonths => Some(Value::from(0)),
        }
    }
}

/// Rename application keys to remote columns, dropping unmapped and
/// server-assigned keys.
fn to_remote(app: Map<String, Value>) -> Row {
    app.into_iter()
        .filter_map(|(key, value)| {
            let field = CardField::from_app_name(&key)?;
            if field.is_server_assigned() {
                return None;
            }
            Some((field.remote_column().to_string(), value))
        })
        .collect()
}

/// Rename remote columns to application keys, dropping unmapped columns.
fn from_remote(row: Row) -> Map<String, Value> {
    let mut app: Map<String, Value> = row
        .into_iter()
        .filter_map(|(column, value)| {
            let field = CardField::from_remote_column(&column)?;
            Some((field.app_name().to_string(), value))
        })
        .collect();

    for field in CardField::ALL {
        let Some(default) = field.null_default() else {
            continue;
        };
        let slot = app
            .entry(field.app_name().to_string())
            .or_insert(Value::Null);
        if slot.is_null() {
            *slot = default;
        }
    }
    app
}

fn serialize_object<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>, RemoteError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::InvalidResponse(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Insert payload in remote column names.
pub fn new_card_to_row(card: &NewCard) -> Result<Row, RemoteError> {
    Ok(to_remote(serialize_object(card)?))
}

/// Update payload in remote column names; only fields present in the patch.
pub fn patch_to_row(patch: &CardPatch) -> Result<Row, RemoteError> {
    Ok(to_remote(serialize_object(patch)?))
}

/// Parse a remote row into a [`Card`].
pub fn card_from_row(row: Row) -> Result<Card, RemoteError> {
    let app = from_remote(row);
    Ok(serde_json::from_value(Value::Object(app))?)
}

/// Accepts RFC 3339 as well as timezone-less timestamps, which are taken to
/// be UTC (`timestamp without time zone` columns serialize that way).
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp: {raw}"))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres renders offsets as "+00" which RFC 3339 rejects.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Effort;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn mapping_is_bijective() {
        for field in CardField::ALL {
            assert_eq!(CardField::from_app_name(field.app_name()), Some(field));
            assert_eq!(CardField::from_remote_column(field.remote_column()), Some(field));
        }
        assert_eq!(CardField::EffortMonths.remote_column(), "effort_months");
        assert_eq!(CardField::CreatedAt.remote_column(), "created_at");
    }

    #[test]
    fn new_card_uses_remote_column_names() {
        let payload = new_card_to_row(&NewCard::new("Write docs")).unwrap();
        assert!(payload.contains_key("effort_months"));
        assert!(!payload.contains_key("effortMonths"));
        assert!(!payload.contains_key("id"));
        assert!(!payload.contains_key("created_at"));
        assert_eq!(payload["title"], json!("Write docs"));
    }

    #[test]
    fn patch_sends_only_present_fields() {
        let patch = CardPatch {
            effort_months: Some(2.5),
            owner: Some("carol".into()),
            ..CardPatch::default()
        };
        let payload = patch_to_row(&patch).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["effort_months"], json!(2.5));
        assert_eq!(payload["owner"], json!("carol"));
    }

    #[test]
    fn card_from_row_ignores_unknown_columns() {
        let card = card_from_row(row(json!({
            "id": "c-1",
            "title": "Launch",
            "urgency": 8,
            "important": 9,
            "effort": 3,
            "owner": "dana",
            "created_at": "2024-03-01T09:30:00.123456+00:00",
            "reach": 500,
            "impact": 2,
            "confidence": 80,
            "effort_months": 4,
            "tenant_id": "ignored"
        })))
        .unwrap();
        assert_eq!(card.id, "c-1");
        assert_eq!(card.effort, Effort::Rating(3.0));
        assert_eq!(card.effort_months, 4.0);
        assert_eq!(card.rice_score(), 200.0);
    }

    #[test]
    fn legacy_rows_without_rice_columns_read_as_zero() {
        let card = card_from_row(row(json!({
            "id": "old",
            "title": "Legacy",
            "urgency": 3,
            "important": 4,
            "effort": "medium",
            "owner": "erin",
            "created_at": "2023-01-01 08:00:00",
            "impact": null
        })))
        .unwrap();
        assert_eq!(card.effort, Effort::Category("medium".into()));
        assert_eq!(card.reach, 0);
        assert_eq!(card.impact, 0.0);
        assert_eq!(card.rice_score(), 0.0);
    }

    #[test]
    fn legacy_rows_with_null_sliders_and_fractional_effort_decode() {
        let card = card_from_row(row(json!({
            "id": "legacy",
            "title": "Old import",
            "urgency": null,
            "important": null,
            "effort": 7.5,
            "owner": null,
            "created_at": "2022-11-05 12:00:00"
        })))
        .unwrap();
        assert_eq!(card.urgency, 1);
        assert_eq!(card.important, 1);
        assert_eq!(card.effort, Effort::Rating(7.5));
        assert_eq!(card.owner, "");

        let card = card_from_row(row(json!({
            "id": "bare",
            "created_at": "2022-11-05 12:00:00",
            "effort": null
        })))
        .unwrap();
        assert_eq!(card.title, "");
        assert_eq!(card.effort, Effort::Rating(1.0));
    }

    #[test]
    fn rows_without_id_or_timestamp_are_rejected() {
        assert!(card_from_row(row(json!({ "id": "x", "created_at": null }))).is_err());
        assert!(card_from_row(row(json!({ "created_at": "2024-03-01T09:30:00Z" }))).is_err());
        assert!(card_from_row(row(json!({ "id": "x", "created_at": "last week" }))).is_err());
    }

    #[test]
    fn parse_timestamp_accepts_postgres_formats() {
        let expected: DateTime<Utc> = "2024-03-01T09:30:00Z".parse().unwrap();
        assert_eq!(parse_timestamp("2024-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:30:00+00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
