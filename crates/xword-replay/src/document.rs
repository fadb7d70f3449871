//! Typed document codec for persisting recordings.
//!
//! Document stores that only understand primitives, arrays and nested maps
//! take a recording as a map of typed values:
//!
//! ```json
//! {"fields": {"gridSize": {"doubleValue": 5}, "puzzleTitle": {"stringValue": "Mini"}}}
//! ```
//!
//! Every number is written as a double. On the way back, integral doubles
//! become integers again so fields like `gridSize` decode.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use crate::error::{Error, Result};
use crate::recording::Recording;

/// Format tag stored with every document. Carried, never checked.
pub const FORMAT_VERSION: &str = "1.0";

const VERSION_FIELD: &str = "version";
const UPLOADED_AT_FIELD: &str = "uploadedAt";

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    StringValue(String),
    DoubleValue(f64),
    /// Integers arrive as decimal strings
    IntegerValue(String),
    BooleanValue(bool),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    /// Convert plain JSON into a typed value.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(*b),
            Json::Number(n) => Value::DoubleValue(n.as_f64().unwrap_or_default()),
            Json::String(s) => Value::StringValue(s.clone()),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: items.iter().map(Value::from_json).collect(),
            }),
            Json::Object(map) => Value::MapValue(MapValue { fields: fields_from_json(map) }),
        }
    }

    /// Convert back to plain JSON.
    pub fn to_json(&self) -> Result<Json> {
        Ok(match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(*b),
            Value::StringValue(s) => Json::String(s.clone()),
            Value::DoubleValue(d) => double_to_json(*d)?,
            Value::IntegerValue(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| Error::InvalidDocument(format!("bad integerValue {s:?}")))?;
                Json::Number(n.into())
            }
            Value::ArrayValue(array) => Json::Array(
                array
                    .values
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::MapValue(map) => Json::Object(fields_to_json(&map.fields)?),
        })
    }
}

fn fields_from_json(map: &Map<String, Json>) -> BTreeMap<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()
}

fn fields_to_json(fields: &BTreeMap<String, Value>) -> Result<Map<String, Json>> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
        .collect()
}

/// Integral doubles come back as integers.
fn double_to_json(d: f64) -> Result<Json> {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if d.fract() == 0.0 && d.abs() <= EXACT {
        return Ok(Json::Number((d as i64).into()));
    }
    Number::from_f64(d)
        .map(Json::Number)
        .ok_or_else(|| Error::InvalidDocument(format!("non-finite doubleValue {d}")))
}

/// A stored recording: top-level map of typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    /// The `version` tag, if present.
    pub fn version(&self) -> Option<&str> {
        match self.fields.get(VERSION_FIELD) {
            Some(Value::StringValue(v)) => Some(v),
            _ => None,
        }
    }

    pub fn uploaded_at(&self) -> Option<&str> {
        match self.fields.get(UPLOADED_AT_FIELD) {
            Some(Value::StringValue(v)) => Some(v),
            _ => None,
        }
    }

    /// Add or replace a field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Encode a recording, stamped with the format version and upload time.
pub fn encode(recording: &Recording) -> Result<Document> {
    let Json::Object(map) = serde_json::to_value(recording)? else {
        return Err(Error::InvalidDocument("recording did not serialize to a map".into()));
    };
    let document = Document { fields: fields_from_json(&map) }
        .with_field(VERSION_FIELD, Value::StringValue(FORMAT_VERSION.into()))
        .with_field(UPLOADED_AT_FIELD, Value::StringValue(Utc::now().to_rfc3339()));
    Ok(document)
}

/// Decode a stored document. The version and upload tags are ignored.
pub fn decode(document: &Document) -> Result<Recording> {
    let mut map = fields_to_json(&document.fields)?;
    map.remove(VERSION_FIELD);
    map.remove(UPLOADED_AT_FIELD);
    serde_json::from_value(Json::Object(map)).map_err(|e| Error::InvalidDocument(e.to_string()))
}

/// Parse a recording file: either plain recording JSON or a typed document.
pub fn parse_recording(text: &str) -> Result<Recording> {
    let json: Json = serde_json::from_str(text)?;
    let is_document = json
        .as_object()
        .is_some_and(|obj| obj.contains_key("fields") && !obj.contains_key("gridSize"));
    if is_document {
        let document: Document = serde_json::from_value(json)?;
        tracing::debug!(version = ?document.version(), "decoding typed document");
        decode(&document)
    } else {
        Ok(serde_json::from_value(json)?)
    }
}

/// Fresh replay identifier: `<base36 millis>-<8 random base36 chars>`.
pub fn generate_replay_id() -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| DIGITS[rng.gen_range(0..DIGITS.len())] as char)
        .collect();
    format!("{}-{}", to_base36(millis), suffix)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::tests::scenario_recording;
    use crate::recording::Clue;
    use serde_json::json;
    use xword_grid::CellCoord;

    fn rich_recording() -> Recording {
        let mut recording = scenario_recording();
        recording.black_squares.insert(CellCoord::new(4, 4));
        recording.cell_numbers.insert(CellCoord::new(0, 0), 1);
        recording.puzzle_title = "The Mini".into();
        recording.puzzle_date = "2024-03-01".into();
        recording.clues.across.push(Clue { number: 1, text: "Feline".into() });
        recording.clues.down.push(Clue { number: 1, text: "Taxi".into() });
        recording.actions[1].ms = 512.25;
        recording
    }

    #[test]
    fn round_trip_preserves_everything() {
        let recording = rich_recording();
        let document = encode(&recording).unwrap();
        assert_eq!(document.version(), Some(FORMAT_VERSION));
        assert!(document.uploaded_at().is_some());
        assert_eq!(decode(&document).unwrap(), recording);

        let text = document.to_json().unwrap();
        assert_eq!(parse_recording(&text).unwrap(), recording);
    }

    #[test]
    fn numbers_are_doubles() {
        let document = encode(&rich_recording()).unwrap();
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["fields"]["gridSize"], json!({"doubleValue": 5.0}));
        assert_eq!(
            json["fields"]["blackSquares"],
            json!({"arrayValue": {"values": [
                {"arrayValue": {"values": [{"doubleValue": 4.0}, {"doubleValue": 4.0}]}}
            ]}})
        );
        assert_eq!(json["fields"]["version"], json!({"stringValue": "1.0"}));
    }

    #[test]
    fn decodes_sparse_store_output() {
        // Stores omit empty `values` and send integers as strings
        let text = json!({
            "fields": {
                "gridSize": {"integerValue": "5"},
                "blackSquares": {"arrayValue": {}},
                "actions": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {
                        "ms": {"doubleValue": 250},
                        "type": {"stringValue": "letter"},
                        "row": {"doubleValue": 1},
                        "col": {"doubleValue": 2},
                        "letter": {"stringValue": "Q"}
                    }}}
                ]}},
                "startTime": {"stringValue": "2024-03-01T12:00:00Z"},
                "totalTime": {"doubleValue": 900.5},
                "version": {"stringValue": "0.9"}
            }
        })
        .to_string();

        let recording = parse_recording(&text).unwrap();
        assert_eq!(recording.grid_size, 5);
        assert!(recording.black_squares.is_empty());
        assert_eq!(recording.actions.len(), 1);
        assert_eq!(recording.actions[0].ms, 250.0);
        assert_eq!(recording.total_time, 900.5);
    }

    #[test]
    fn plain_json_still_parses() {
        let recording = rich_recording();
        let text = recording.to_json().unwrap();
        assert_eq!(parse_recording(&text).unwrap(), recording);
    }

    #[test]
    fn bad_documents_are_rejected() {
        let missing_actions = Document::default()
            .with_field("gridSize", Value::DoubleValue(5.0))
            .with_field("startTime", Value::StringValue("2024-03-01T12:00:00Z".into()));
        assert!(matches!(decode(&missing_actions), Err(Error::InvalidDocument(_))));

        let bad_integer =
            Document::default().with_field("gridSize", Value::IntegerValue("five".into()));
        assert!(matches!(decode(&bad_integer), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn replay_ids() {
        let id = generate_replay_id();
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert!(u64::from_str_radix(stamp, 36).unwrap() > 0);
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
        assert_ne!(generate_replay_id(), generate_replay_id());
    }

    #[test]
    fn base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
