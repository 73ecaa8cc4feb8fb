//! The tag-editing form core: reconcile many records into one editable form,
//! then apply the edited form back onto every record.
//!
//! Pure functions over record slices. No I/O, no UI dependency.

use regex::{Regex, RegexBuilder};

use crate::types::{FieldDescriptor, FieldValue, TagRecord, format_number};

/// Sentinel text meaning "leave each record's original value in place".
pub const KEEP: &str = "<keep>";

/// A compiled `</pattern/flags>` transform expression.
///
/// Flags: `g` joins every match (otherwise only the first match is taken),
/// `i`/`m`/`s` map to the corresponding pattern options. Any other flag
/// character, or a pattern that fails to compile, makes the raw text parse
/// as a literal instead.
#[derive(Debug, Clone)]
pub struct TransformExpr {
    pattern: String,
    flags: String,
    regex: Regex,
    global: bool,
}

impl TransformExpr {
    pub fn parse(raw: &str) -> Option<Self> {
        let inner = raw.strip_prefix("</")?.strip_suffix('>')?;
        let slash = inner.rfind('/')?;
        let (pattern, flags) = (&inner[..slash], &inner[slash + 1..]);

        let mut builder = RegexBuilder::new(pattern);
        let mut global = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                _ => return None,
            }
        }

        let regex = builder.build().ok()?;
        Some(Self {
            pattern: pattern.to_string(),
            flags: flags.to_string(),
            regex,
            global,
        })
    }

    /// Run the expression against `input`. Returns the matched substrings
    /// joined with no separator, or `None` when nothing matched.
    pub fn evaluate(&self, input: &str) -> Option<String> {
        if self.global {
            let matches: Vec<&str> = self.regex.find_iter(input).map(|m| m.as_str()).collect();
            if matches.is_empty() {
                return None;
            }
            Some(matches.concat())
        } else {
            self.regex.find(input).map(|m| m.as_str().to_string())
        }
    }
}

impl PartialEq for TransformExpr {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags
    }
}

impl std::fmt::Display for TransformExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "</{}/{}>", self.pattern, self.flags)
    }
}

/// One form field's state, decided at parse time from the raw input text.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Leave every record's original value untouched.
    Keep,
    /// A concrete value: the reconciled shared value, or a user-typed
    /// literal (always `Text` in that case, including the empty string).
    Shared(FieldValue),
    /// A compiled regex transform, applied per record on submit.
    Transform(TransformExpr),
}

impl FormValue {
    /// Parse raw form input. `"<keep>"` is the keep sentinel and
    /// `</pattern/flags>` a transform; everything else is a literal,
    /// including malformed or non-compiling transform syntax.
    pub fn parse(raw: &str) -> Self {
        if raw == KEEP {
            return Self::Keep;
        }
        if let Some(expr) = TransformExpr::parse(raw) {
            return Self::Transform(expr);
        }
        Self::Shared(FieldValue::text(raw))
    }

    /// The text shown in the form field for this state.
    pub fn display_text(&self) -> String {
        match self {
            Self::Keep => KEEP.to_string(),
            Self::Shared(value) => value.display_text().unwrap_or_else(|| KEEP.to_string()),
            Self::Transform(expr) => expr.to_string(),
        }
    }
}

/// The editable form: one `FormValue` per descriptor key, in descriptor
/// order. Derived once from the input records, mutated only by user edits,
/// read at submit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    values: Vec<(String, FormValue)>,
}

impl FormState {
    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Record a user edit. The raw text is re-parsed into the tagged union;
    /// keys outside the descriptor set are ignored.
    pub fn set_input(&mut self, key: &str, raw: &str) {
        if let Some(entry) = self.values.iter_mut().find(|(k, _)| k == key) {
            entry.1 = FormValue::parse(raw);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Reconcile the records into an initial form state.
///
/// A field starts at the shared value when every record agrees on it under
/// the descriptor kind's comparator, and at keep otherwise. An empty record
/// list or a record lacking the key also yields keep.
pub fn reconcile(records: &[TagRecord], fields: &[FieldDescriptor]) -> FormState {
    let values = fields
        .iter()
        .map(|field| (field.key.clone(), reconcile_field(records, field)))
        .collect();
    FormState { values }
}

fn reconcile_field(records: &[TagRecord], field: &FieldDescriptor) -> FormValue {
    if records.is_empty() {
        return FormValue::Keep;
    }

    let mut shared: Option<&FieldValue> = None;
    for record in records {
        let Some(value) = record.get(&field.key) else {
            return FormValue::Keep;
        };
        match shared {
            None => shared = Some(value),
            Some(first) => {
                if !field.kind.values_equal(first, value) {
                    return FormValue::Keep;
                }
            }
        }
    }

    match shared {
        Some(value) => FormValue::Shared(value.clone()),
        None => FormValue::Keep,
    }
}

/// Apply the submitted form to the records, producing new records.
///
/// Keep fields and keys outside the descriptor set pass through unchanged.
/// Literals broadcast to every record; transforms evaluate per record
/// against the string form of its current value and fall back to the
/// original on zero matches. Numeric coercion derives from each record's
/// own original value type.
pub fn apply(
    records: &[TagRecord],
    form: &FormState,
    fields: &[FieldDescriptor],
) -> Vec<TagRecord> {
    let mut out: Vec<TagRecord> = records.to_vec();

    for field in fields {
        match form.get(&field.key) {
            None | Some(FormValue::Keep) => {}
            Some(FormValue::Transform(expr)) => {
                for record in &mut out {
                    apply_transform(record, &field.key, expr);
                }
            }
            // A structured shared value means the form field was never
            // edited; records keep their own picture sets.
            Some(FormValue::Shared(FieldValue::Pictures(_))) => {}
            Some(FormValue::Shared(value)) => {
                for record in &mut out {
                    apply_literal(record, &field.key, value);
                }
            }
        }
    }

    out
}

fn apply_transform(record: &mut TagRecord, key: &str, expr: &TransformExpr) {
    let Some(original) = record.get(key) else {
        return;
    };
    let (input, was_number) = match original {
        FieldValue::Text(s) => (s.clone(), false),
        FieldValue::Number(n) => (format_number(*n), true),
        FieldValue::Pictures(_) => return,
    };
    let Some(joined) = expr.evaluate(&input) else {
        return;
    };
    record.insert(key, coerce(joined, was_number));
}

fn apply_literal(record: &mut TagRecord, key: &str, value: &FieldValue) {
    let was_number = record.get(key).is_some_and(FieldValue::is_number);
    let new_value = match value {
        FieldValue::Text(s) if was_number => coerce(s.clone(), true),
        _ => value.clone(),
    };
    record.insert(key, new_value);
}

/// Convert a produced string back to a number when the record's original
/// value was numeric and the string parses; otherwise keep it textual.
fn coerce(text: String, numeric_original: bool) -> FieldValue {
    if numeric_original && let Ok(n) = text.trim().parse::<f64>() {
        return FieldValue::Number(n);
    }
    FieldValue::Text(text)
}
