use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// An embedded picture: MIME type plus raw image bytes.
///
/// At serialization boundaries pictures travel as base64 data URIs
/// (`data:image/png;base64,...`). Equality is always on the decoded bytes,
/// never on the encoded string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid picture data URI: {0}")]
pub struct PictureUriError(String);

impl Picture {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, PictureUriError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| PictureUriError(format!("missing data: prefix in {uri:?}")))?;
        let (mime_type, encoded) = rest
            .split_once(";base64,")
            .ok_or_else(|| PictureUriError(format!("missing ;base64, separator in {uri:?}")))?;
        let data = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| PictureUriError(e.to_string()))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

impl Serialize for Picture {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for Picture {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Picture::from_data_uri(&s).map_err(serde::de::Error::custom)
    }
}

/// A single tag field value.
///
/// Variant order matters for `untagged` deserialization: JSON numbers must
/// try `Number` before `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Pictures(Vec<Picture>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// String rendering of a scalar value. `None` for pictures, which have
    /// no meaningful text form.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Pictures(_) => None,
        }
    }
}

/// Format a numeric field value without a trailing `.0` for whole numbers.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// The declared value kind of an editable field. Selects the comparator
/// used during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Pictures,
}

impl FieldKind {
    /// Whether two values count as equal for this field kind.
    ///
    /// Picture fields compare byte-exact on the decoded payloads. Scalar
    /// kinds never consider structured values equal, so picture sets under
    /// a scalar kind always reconcile to keep.
    pub fn values_equal(self, a: &FieldValue, b: &FieldValue) -> bool {
        match self {
            Self::Pictures => match (a, b) {
                (FieldValue::Pictures(x), FieldValue::Pictures(y)) => x == y,
                _ => false,
            },
            Self::Text | Self::Number => match (a, b) {
                (FieldValue::Pictures(_), _) | (_, FieldValue::Pictures(_)) => false,
                _ => a == b,
            },
        }
    }
}

/// An editable field: key into the record, display label, declared kind.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }
}

/// The editable tag fields, in display order.
pub fn editable_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("title", "Title", FieldKind::Text),
        FieldDescriptor::new("artist", "Artist", FieldKind::Text),
        FieldDescriptor::new("album", "Album", FieldKind::Text),
        FieldDescriptor::new("albumartist", "Album Artist", FieldKind::Text),
        FieldDescriptor::new("genre", "Genre", FieldKind::Text),
        FieldDescriptor::new("year", "Year", FieldKind::Number),
        FieldDescriptor::new("tracknumber", "Track Number", FieldKind::Text),
        FieldDescriptor::new("discnumber", "Disc Number", FieldKind::Text),
        FieldDescriptor::new("compilation", "Compilation", FieldKind::Text),
        FieldDescriptor::new("pictures", "Pictures", FieldKind::Pictures),
    ]
}

/// One loaded audio file: a mapping from field key to value.
///
/// `path` identifies a record within the working list; `filename` is the
/// match key when updating the list after a submission. Records are never
/// mutated by the editing core; transforming operations produce new records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRecord(HashMap<String, FieldValue>);

impl TagRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn path(&self) -> Option<&str> {
        self.text_field("path")
    }

    pub fn filename(&self) -> Option<&str> {
        self.text_field("filename")
    }

    /// New record with this record's keys, taking values from `other` where
    /// present. Keys absent from `other` keep their current value; keys only
    /// in `other` are not introduced.
    pub fn updated_from(&self, other: &TagRecord) -> TagRecord {
        TagRecord(
            self.0
                .iter()
                .map(|(key, value)| {
                    let value = other.get(key).unwrap_or(value).clone();
                    (key.clone(), value)
                })
                .collect(),
        )
    }
}
