//! Working tag-list operations: merging newly parsed records, removing
//! entries, folding an edit session's output back in.
//!
//! All pure functions returning new vectors; the caller owns the list.

use tracing::debug;

use crate::types::TagRecord;

/// Merge `incoming` into `current`, appending only records whose `path` is
/// not already present. Both lists keep their order.
pub fn add(current: &[TagRecord], incoming: &[TagRecord]) -> Vec<TagRecord> {
    let mut out = current.to_vec();
    for record in incoming {
        let duplicate = match record.path() {
            Some(path) => out.iter().any(|r| r.path() == Some(path)),
            None => false,
        };
        if duplicate {
            debug!(path = record.path(), "skipping duplicate record");
        } else {
            out.push(record.clone());
        }
    }
    out
}

/// Drop every record whose `path` matches one of `paths`.
pub fn remove(current: &[TagRecord], paths: &[String]) -> Vec<TagRecord> {
    current
        .iter()
        .filter(|r| !r.path().is_some_and(|p| paths.iter().any(|t| t == p)))
        .cloned()
        .collect()
}

/// Fold edited records back into the list, matching on `filename`. A
/// matched record takes the edited values for its own keys; edited records
/// with no match are ignored.
pub fn update(current: &[TagRecord], edited: &[TagRecord]) -> Vec<TagRecord> {
    current
        .iter()
        .map(|record| {
            let hit = record.filename().and_then(|name| {
                edited.iter().find(|e| e.filename() == Some(name))
            });
            match hit {
                Some(e) => record.updated_from(e),
                None => record.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn make_record(path: &str, filename: &str, artist: &str) -> TagRecord {
        TagRecord::new()
            .with("path", FieldValue::text(path))
            .with("filename", FieldValue::text(filename))
            .with("artist", FieldValue::text(artist))
    }

    #[test]
    fn test_add_appends_new_records_in_order() {
        let current = vec![make_record("/a.mp3", "a.mp3", "A")];
        let incoming = vec![
            make_record("/b.mp3", "b.mp3", "B"),
            make_record("/c.mp3", "c.mp3", "C"),
        ];
        let merged = add(&current, &incoming);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].path(), Some("/b.mp3"));
        assert_eq!(merged[2].path(), Some("/c.mp3"));
    }

    #[test]
    fn test_add_deduplicates_on_path() {
        let current = vec![make_record("/a.mp3", "a.mp3", "A")];
        let incoming = vec![
            make_record("/a.mp3", "a.mp3", "A again"),
            make_record("/b.mp3", "b.mp3", "B"),
        ];
        let merged = add(&current, &incoming);
        assert_eq!(merged.len(), 2);
        // The existing record wins over the duplicate.
        assert_eq!(merged[0].get("artist"), Some(&FieldValue::text("A")));
    }

    #[test]
    fn test_add_does_not_mutate_inputs() {
        let current = vec![make_record("/a.mp3", "a.mp3", "A")];
        let incoming = vec![make_record("/b.mp3", "b.mp3", "B")];
        let _ = add(&current, &incoming);
        assert_eq!(current.len(), 1);
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn test_remove_by_path() {
        let current = vec![
            make_record("/a.mp3", "a.mp3", "A"),
            make_record("/b.mp3", "b.mp3", "B"),
        ];
        let remaining = remove(&current, &["/a.mp3".to_string()]);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path(), Some("/b.mp3"));
    }

    #[test]
    fn test_remove_unknown_path_is_noop() {
        let current = vec![make_record("/a.mp3", "a.mp3", "A")];
        let remaining = remove(&current, &["/zz.mp3".to_string()]);
        assert_eq!(remaining, current);
    }

    #[test]
    fn test_update_replaces_matching_filename() {
        let current = vec![
            make_record("/a.mp3", "a.mp3", "Old A"),
            make_record("/b.mp3", "b.mp3", "Old B"),
        ];
        let edited = vec![make_record("/a.mp3", "a.mp3", "New A")];
        let updated = update(&current, &edited);
        assert_eq!(updated[0].get("artist"), Some(&FieldValue::text("New A")));
        assert_eq!(updated[1].get("artist"), Some(&FieldValue::text("Old B")));
    }

    #[test]
    fn test_update_ignores_unmatched_edits() {
        let current = vec![make_record("/a.mp3", "a.mp3", "A")];
        let edited = vec![make_record("/zz.mp3", "zz.mp3", "Z")];
        assert_eq!(update(&current, &edited), current);
    }

    #[test]
    fn test_update_keeps_list_order() {
        let current = vec![
            make_record("/a.mp3", "a.mp3", "A"),
            make_record("/b.mp3", "b.mp3", "B"),
            make_record("/c.mp3", "c.mp3", "C"),
        ];
        let edited = vec![
            make_record("/c.mp3", "c.mp3", "C2"),
            make_record("/a.mp3", "a.mp3", "A2"),
        ];
        let updated = update(&current, &edited);
        assert_eq!(updated[0].get("artist"), Some(&FieldValue::text("A2")));
        assert_eq!(updated[1].get("artist"), Some(&FieldValue::text("B")));
        assert_eq!(updated[2].get("artist"), Some(&FieldValue::text("C2")));
    }
}
