//! Tag reading/writing via `lofty`.
//!
//! Synchronous, pure-I/O collaborator: parses audio files into `TagRecord`s
//! and writes edited records back. The editing core never touches this
//! module; the CLI wires the two together.

use std::path::{Path, PathBuf};

use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::file::{FileType, TaggedFileExt};
use lofty::picture::{MimeType, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use tracing::{debug, info};

use crate::types::{FieldValue, Picture, TagRecord, format_number};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// File extension not in the allow-list. Checked before any parsing.
    #[error("Invalid file type: {0}")]
    Unsupported(String),
    /// A parse produced no records at all.
    #[error("No tags successfully parsed from files.")]
    NoRecords,
    /// lofty open/read failures.
    #[error("{path}: {message}")]
    Parse { path: String, message: String },
    /// lofty write failures, or a record that cannot be written.
    #[error("{path}: {message}")]
    Write { path: String, message: String },
}

/// Extensions accepted for parsing. Anything else is rejected before the
/// parser runs.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] =
    &["aac", "aiff", "flac", "m4a", "mp3", "ogg", "opus", "wav"];

/// Editable text-valued fields, in record order. `year` is numeric and
/// handled separately; `pictures` carries binary payloads.
const TEXT_FIELDS: &[&str] = &[
    "album",
    "albumartist",
    "artist",
    "compilation",
    "discnumber",
    "genre",
    "title",
    "tracknumber",
];

/// Fields written back to files.
const WRITABLE_FIELDS: &[&str] = &[
    "album",
    "albumartist",
    "artist",
    "compilation",
    "discnumber",
    "genre",
    "title",
    "tracknumber",
    "year",
];

/// Map a field key to the primary `ItemKey` used for generic `Tag`
/// reads/writes. `year` has a secondary fallback — see `get_field_from_tag`.
pub fn field_to_item_key(field: &str) -> Option<ItemKey> {
    match field {
        "album" => Some(ItemKey::AlbumTitle),
        "albumartist" => Some(ItemKey::AlbumArtist),
        "artist" => Some(ItemKey::TrackArtist),
        "compilation" => Some(ItemKey::FlagCompilation),
        "discnumber" => Some(ItemKey::DiscNumber),
        "genre" => Some(ItemKey::Genre),
        "title" => Some(ItemKey::TrackTitle),
        "tracknumber" => Some(ItemKey::TrackNumber),
        "year" => Some(ItemKey::RecordingDate),
        _ => None,
    }
}

fn parse_options() -> ParseOptions {
    ParseOptions::new()
        .read_cover_art(true)
        .parsing_mode(ParsingMode::BestAttempt)
}

/// Friendly format name from `FileType`.
fn file_type_name(ft: FileType) -> &'static str {
    match ft {
        FileType::Aac => "aac",
        FileType::Aiff => "aiff",
        FileType::Flac => "flac",
        FileType::Mpeg => "mp3",
        FileType::Mp4 => "m4a",
        FileType::Opus => "opus",
        FileType::Vorbis => "vorbis",
        FileType::Wav => "wav",
        _ => "unknown",
    }
}

/// MIME string for an embedded picture.
fn mime_name(mime: Option<&MimeType>) -> String {
    match mime {
        Some(MimeType::Jpeg) => "image/jpeg".to_string(),
        Some(MimeType::Png) => "image/png".to_string(),
        Some(MimeType::Tiff) => "image/tiff".to_string(),
        Some(MimeType::Bmp) => "image/bmp".to_string(),
        Some(MimeType::Gif) => "image/gif".to_string(),
        Some(MimeType::Unknown(s)) => s.clone(),
        _ => "application/octet-stream".to_string(),
    }
}

fn mime_from_name(name: &str) -> MimeType {
    match name {
        "image/jpeg" => MimeType::Jpeg,
        "image/png" => MimeType::Png,
        "image/tiff" => MimeType::Tiff,
        "image/bmp" => MimeType::Bmp,
        "image/gif" => MimeType::Gif,
        other => MimeType::Unknown(other.to_string()),
    }
}

/// `m:ss` rendering of a track length in seconds.
fn time_string(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Leading decimal digits of a string, as a number. `"3/12"` → 3.
fn parse_leading_number(value: &str) -> f64 {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0.0)
}

/// Read a field value from a generic `Tag`, with the `year` secondary key
/// fallback.
fn get_field_from_tag(tag: &Tag, field: &str) -> Option<String> {
    let primary = field_to_item_key(field)?;
    if let Some(val) = tag.get_string(&primary) {
        return Some(val.to_string());
    }
    match field {
        "year" => tag.get_string(&ItemKey::Year).map(|s| s.to_string()),
        _ => None,
    }
}

fn read_pictures(tag: &Tag) -> Vec<Picture> {
    tag.pictures()
        .iter()
        .map(|p| Picture::new(mime_name(p.mime_type()), p.data().to_vec()))
        .collect()
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Parse one audio file into a record: editable tag fields, embedded
/// pictures, and read-only stream properties.
pub fn read_file(path: &Path) -> Result<TagRecord, TagError> {
    let path_str = path.display().to_string();
    let parse_err = |message: String| TagError::Parse {
        path: path_str.clone(),
        message,
    };

    let tagged_file = Probe::open(path)
        .map_err(|e| parse_err(format!("Failed to open: {e}")))?
        .options(parse_options())
        .read()
        .map_err(|e| parse_err(format!("Failed to read: {e}")))?;

    let properties = tagged_file.properties();
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let mut record = TagRecord::new();
    record.insert("path", FieldValue::text(path_str.clone()));
    record.insert(
        "filename",
        FieldValue::text(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default(),
        ),
    );

    for &field in TEXT_FIELDS {
        let value = tag
            .and_then(|t| get_field_from_tag(t, field))
            .unwrap_or_default();
        record.insert(field, FieldValue::Text(value));
    }

    let year_raw = tag.and_then(|t| get_field_from_tag(t, "year"));
    record.insert(
        "year",
        FieldValue::Number(parse_leading_number(year_raw.as_deref().unwrap_or(""))),
    );
    let track_raw = tag.and_then(|t| get_field_from_tag(t, "tracknumber"));
    record.insert(
        "track",
        FieldValue::Number(parse_leading_number(track_raw.as_deref().unwrap_or(""))),
    );

    record.insert(
        "pictures",
        FieldValue::Pictures(tag.map(read_pictures).unwrap_or_default()),
    );

    let seconds = properties.duration().as_secs();
    record.insert("length", FieldValue::Number(seconds as f64));
    record.insert("time", FieldValue::text(time_string(seconds)));
    record.insert(
        "bitrate",
        FieldValue::Number(f64::from(properties.audio_bitrate().unwrap_or(0))),
    );
    record.insert(
        "samplerate",
        FieldValue::Number(f64::from(properties.sample_rate().unwrap_or(0))),
    );
    record.insert(
        "channels",
        FieldValue::Number(f64::from(properties.channels().unwrap_or(0))),
    );
    record.insert(
        "codec",
        FieldValue::text(file_type_name(tagged_file.file_type())),
    );

    debug!(path = %path_str, "parsed file");
    Ok(record)
}

/// Parse a set of files into records.
///
/// All-or-nothing per operation: every path must pass the extension
/// allow-list before any file is opened, any parse failure fails the whole
/// call, and zero records is an error.
pub fn read_files(paths: &[PathBuf]) -> Result<Vec<TagRecord>, TagError> {
    for path in paths {
        if !is_supported(path) {
            return Err(TagError::Unsupported(path.display().to_string()));
        }
    }

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        records.push(read_file(path)?);
    }
    if records.is_empty() {
        return Err(TagError::NoRecords);
    }

    info!(count = records.len(), "parsed audio files");
    Ok(records)
}

/// Value text to write for a field. `None` means "leave this frame alone",
/// empty text means "delete the frame". A zero year counts as absent.
fn field_write_text(field: &str, value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Number(n) if field == "year" && *n == 0.0 => Some(String::new()),
        FieldValue::Number(n) => Some(format_number(*n)),
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Pictures(_) => None,
    }
}

/// Write one record's editable fields back to its file, read-modify-write.
/// Untouched frames are preserved; unchanged values are skipped.
fn write_record(record: &TagRecord) -> Result<(), TagError> {
    let Some(path_str) = record.path() else {
        return Err(TagError::Write {
            path: "<no path>".to_string(),
            message: "record has no path field".to_string(),
        });
    };
    let path_str = path_str.to_string();
    let path = Path::new(&path_str);
    let write_err = |message: String| TagError::Write {
        path: path_str.clone(),
        message,
    };

    let mut tagged_file = Probe::open(path)
        .map_err(|e| write_err(format!("Failed to open: {e}")))?
        .options(parse_options())
        .read()
        .map_err(|e| write_err(format!("Failed to read: {e}")))?;

    let tag_type = tagged_file.file_type().primary_tag_type();
    if !tagged_file.contains_tag_type(tag_type) {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| write_err(format!("File does not support {tag_type:?} tags")))?;

    let mut any_changes = false;

    for &field in WRITABLE_FIELDS {
        let Some(value) = record.get(field) else {
            continue;
        };
        let Some(text) = field_write_text(field, value) else {
            continue;
        };
        let Some(primary_key) = field_to_item_key(field) else {
            continue;
        };
        let current = get_field_from_tag(tag, field);

        if text.is_empty() {
            if current.is_none() {
                continue;
            }
            tag.remove_key(&primary_key);
            if field == "year" {
                tag.remove_key(&ItemKey::Year);
            }
            any_changes = true;
        } else {
            if current.as_deref() == Some(text.as_str()) {
                continue;
            }
            tag.insert_text(primary_key, text);
            any_changes = true;
        }
    }

    if let Some(FieldValue::Pictures(pictures)) = record.get("pictures")
        && pictures_differ(tag, pictures)
    {
        while !tag.pictures().is_empty() {
            tag.remove_picture(0);
        }
        for (i, pic) in pictures.iter().enumerate() {
            let pic_type = if i == 0 {
                PictureType::CoverFront
            } else {
                PictureType::Other
            };
            tag.push_picture(lofty::picture::Picture::new_unchecked(
                pic_type,
                Some(mime_from_name(&pic.mime_type)),
                None,
                pic.data.clone(),
            ));
        }
        any_changes = true;
    }

    if any_changes {
        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| write_err(format!("Failed to write tag: {e}")))?;
        debug!(path = %path_str, "wrote tags");
    }

    Ok(())
}

fn pictures_differ(tag: &Tag, pictures: &[Picture]) -> bool {
    let current = tag.pictures();
    if current.len() != pictures.len() {
        return true;
    }
    current
        .iter()
        .zip(pictures)
        .any(|(a, b)| a.data() != b.data.as_slice() || mime_name(a.mime_type()) != b.mime_type)
}

/// Write every record back to its file. The first failure aborts the
/// operation with file context.
pub fn write_records(records: &[TagRecord]) -> Result<(), TagError> {
    for record in records {
        write_record(record)?;
    }
    info!(count = records.len(), "wrote audio files");
    Ok(())
}
