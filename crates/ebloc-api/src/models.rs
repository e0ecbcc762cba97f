// Typed payloads for the three AJAX endpoints.
//
// The portal answers with PHP-encoded maps keyed by string indices
// (`"1"`, `"2"`, …) whose values are flat objects of string-ish fields.
// Field values arrive as strings or numbers depending on the column, so
// every field is read leniently into an `Option<String>`.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, body_preview};

/// Records keyed by the portal's string index, in response order.
pub type RecordMap<T> = IndexMap<String, T>;

/// Apartment summary row (`AjaxGetHomeApInfo.php`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub cod_client: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ap: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nr_pers_afisat: Option<String>,
    /// Outstanding balance in bani (1/100 RON).
    #[serde(default, deserialize_with = "lenient_string")]
    pub datorie: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ultima_zi_plata: Option<String>,
    /// `"1"` once this month's meter readings were submitted.
    #[serde(default, deserialize_with = "lenient_string")]
    pub contoare_citite: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub citire_contoare_start: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub citire_contoare_end: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub luna_veche: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub luna_afisata: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nivel_restanta: Option<String>,
}

/// Meter reading row (`AjaxGetIndexContoare.php`).
///
/// Readings are decimal strings in thousandths of a cubic metre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub index_vechi: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub index_nou: Option<String>,
}

/// Payment receipt row (`AjaxGetPlatiChitanteToti.php`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub numar: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data: Option<String>,
    /// Amount paid in bani (1/100 RON).
    #[serde(default, deserialize_with = "lenient_string")]
    pub suma: Option<String>,
}

/// Accept strings, numbers and booleans as text; treat `null` and
/// nested structures as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Decode an endpoint body into a record map.
///
/// Objects keep their keys; arrays are keyed by position from `"0"`, the
/// indices PHP had before serialising a sequential array as a JSON list. `null` decodes to an empty
/// map. Entries that are not objects, or that fail to decode, are skipped.
pub fn parse_records<T: DeserializeOwned>(body: &str) -> Result<RecordMap<T>, Error> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", body_preview(body)),
        body: body.to_owned(),
    })?;

    let entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(Error::Deserialization {
                message: format!("expected a JSON object, got {other}"),
                body: body.to_owned(),
            });
        }
    };

    let mut records = RecordMap::with_capacity(entries.len());
    for (key, entry) in entries {
        if !entry.is_object() {
            warn!(key = %key, "skipping non-object record");
            continue;
        }
        match serde_json::from_value::<T>(entry) {
            Ok(record) => {
                records.insert(key, record);
            }
            Err(e) => warn!(key = %key, error = %e, "skipping undecodable record"),
        }
    }
    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn home_record_accepts_numbers_and_strings() {
        let body = r#"{"1": {"cod_client": "A-17", "ap": 12, "datorie": 12345, "luna_veche": null}}"#;
        let records: RecordMap<HomeRecord> = parse_records(body).unwrap();
        let home = &records["1"];
        assert_eq!(home.cod_client.as_deref(), Some("A-17"));
        assert_eq!(home.ap.as_deref(), Some("12"));
        assert_eq!(home.datorie.as_deref(), Some("12345"));
        assert_eq!(home.luna_veche, None);
        assert_eq!(home.nivel_restanta, None);
    }

    #[test]
    fn arrays_are_keyed_by_position() {
        let body = r#"[{"numar": "101"}, {"numar": "102"}]"#;
        let records: RecordMap<ReceiptRecord> = parse_records(body).unwrap();
        let keys: Vec<&str> = records.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["0", "1"]);
        assert_eq!(records["1"].numar.as_deref(), Some("102"));
    }

    #[test]
    fn response_order_is_preserved() {
        let body = r#"{"10": {"numar": "a"}, "2": {"numar": "b"}, "1": {"numar": "c"}}"#;
        let records: RecordMap<ReceiptRecord> = parse_records(body).unwrap();
        let keys: Vec<&str> = records.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["10", "2", "1"]);
    }

    #[test]
    fn null_and_empty_list_decode_to_empty_map() {
        assert!(parse_records::<MeterRecord>("null").unwrap().is_empty());
        assert!(parse_records::<MeterRecord>("[]").unwrap().is_empty());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let body = r#"{"1": "oops", "2": {"index_vechi": "1234567"}}"#;
        let records: RecordMap<MeterRecord> = parse_records(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["2"].index_vechi.as_deref(), Some("1234567"));
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let result = parse_records::<HomeRecord>("<html>oops</html>");
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }

    #[test]
    fn scalar_body_is_rejected() {
        let result = parse_records::<HomeRecord>("42");
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }
}
