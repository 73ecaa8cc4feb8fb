use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use crate::editor;
use crate::list::{Selection, SortState};
use crate::session;
use crate::store;
use crate::tags;
use crate::types::{FieldValue, TagRecord, editable_fields};

#[derive(Parser)]
#[command(name = "tagdeck", about = "Batch audio tag editor")]
enum Cli {
    /// Parse audio files and merge them into the stored tag list
    Add(AddArgs),
    /// Print the stored tag list
    List(ListArgs),
    /// Remove entries from the stored tag list
    Remove(RemoveArgs),
    /// Read tags straight from files, bypassing the store
    Read(ReadArgs),
    /// Batch-edit tags across selected entries of the tag list
    Edit(EditArgs),
}

#[derive(clap::Args)]
struct AddArgs {
    /// Audio files to parse
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Sort by this column
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending instead of ascending
    #[arg(long)]
    descending: bool,
}

#[derive(clap::Args)]
struct RemoveArgs {
    /// Paths of entries to remove
    #[arg(required = true)]
    paths: Vec<String>,
}

#[derive(clap::Args)]
struct ReadArgs {
    /// Audio files to read
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Paths of entries to edit; all entries when omitted
    paths: Vec<String>,
    /// Field edit, FIELD=VALUE. VALUE may be a literal, "<keep>", or a
    /// "</pattern/flags>" regex transform. Repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    set: Vec<String>,
    /// Preview the changes without writing files or the store
    #[arg(long)]
    dry_run: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli {
        Cli::Add(args) => add(args),
        Cli::List(args) => list(args),
        Cli::Remove(args) => remove(args),
        Cli::Read(args) => read(args),
        Cli::Edit(args) => edit(args),
    }
}

fn add(args: AddArgs) -> Result<(), Box<dyn Error>> {
    let records = tags::read_files(&args.paths)?;
    let mut conn = store::open(&store::default_path())?;
    let current = store::load_tag_list(&conn)?;
    let merged = session::add(&current, &records);
    let added = merged.len() - current.len();
    store::save_tag_list(&mut conn, &merged)?;
    eprintln!(
        "{added} added, {} duplicate(s), {} in list",
        records.len() - added,
        merged.len()
    );
    Ok(())
}

fn list(args: ListArgs) -> Result<(), Box<dyn Error>> {
    let conn = store::open(&store::default_path())?;
    let records = store::load_tag_list(&conn)?;
    let sort = SortState::with(args.sort, args.descending);
    for record in sort.arrange(&records) {
        println!(
            "{}\t{} - {}\t[{}]",
            record.path().unwrap_or("<no path>"),
            display_value(record.get("artist")),
            display_value(record.get("title")),
            display_value(record.get("time")),
        );
    }
    Ok(())
}

fn remove(args: RemoveArgs) -> Result<(), Box<dyn Error>> {
    let mut conn = store::open(&store::default_path())?;
    let current = store::load_tag_list(&conn)?;
    let remaining = session::remove(&current, &args.paths);
    let removed = current.len() - remaining.len();
    store::save_tag_list(&mut conn, &remaining)?;
    eprintln!("{removed} removed, {} in list", remaining.len());
    Ok(())
}

fn read(args: ReadArgs) -> Result<(), Box<dyn Error>> {
    let records = tags::read_files(&args.paths)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn edit(args: EditArgs) -> Result<(), Box<dyn Error>> {
    let fields = editable_fields();
    let mut conn = store::open(&store::default_path())?;
    let stored = store::load_tag_list(&conn)?;
    if stored.is_empty() {
        return Err("Tag list is empty. Run `tagdeck add` first.".into());
    }

    let mut selection = Selection::new("path");
    if args.paths.is_empty() {
        selection.toggle_all(&stored);
    } else {
        for path in &args.paths {
            if !stored.iter().any(|r| r.path() == Some(path.as_str())) {
                return Err(format!("{path} is not in the tag list. Run `tagdeck add` first.").into());
            }
            selection.toggle(path);
        }
    }
    let selected: Vec<TagRecord> = selection
        .materialize(&stored)
        .into_iter()
        .cloned()
        .collect();

    let mut form = editor::reconcile(&selected, &fields);
    if args.set.is_empty() {
        for field in &fields {
            let value = form
                .get(&field.key)
                .map(editor::FormValue::display_text)
                .unwrap_or_default();
            println!("{}: {}", field.label, value);
        }
        return Ok(());
    }
    for entry in &args.set {
        let (key, raw) = split_set(entry)?;
        if !fields.iter().any(|f| f.key == key) {
            return Err(format!("Unknown field \"{key}\"").into());
        }
        form.set_input(key, raw);
    }

    let updated = editor::apply(&selected, &form, &fields);
    let changes = preview(&selected, &updated);
    if changes == 0 {
        eprintln!("No changes.");
        return Ok(());
    }
    if args.dry_run {
        eprintln!("Dry run: {changes} change(s), nothing written.");
        return Ok(());
    }

    tags::write_records(&updated)?;
    let merged = session::update(&stored, &updated);
    store::save_tag_list(&mut conn, &merged)?;
    eprintln!("Updated {} file(s).", updated.len());
    Ok(())
}

fn split_set(entry: &str) -> Result<(&str, &str), Box<dyn Error>> {
    entry
        .split_once('=')
        .ok_or_else(|| format!("Invalid --set \"{entry}\": expected FIELD=VALUE").into())
}

/// Print the per-file old → new diff, returning the change count.
fn preview(before: &[TagRecord], after: &[TagRecord]) -> usize {
    let mut changes = 0;
    for (old, new) in before.iter().zip(after) {
        for (key, new_value) in new.iter() {
            if old.get(key) != Some(new_value) {
                println!(
                    "{}: {}: {} -> {}",
                    old.path().unwrap_or("<no path>"),
                    key,
                    display_value(old.get(key)),
                    display_value(Some(new_value)),
                );
                changes += 1;
            }
        }
    }
    changes
}

fn display_value(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Pictures(pics)) => format!("<{} picture(s)>", pics.len()),
        Some(v) => v.display_text().unwrap_or_default(),
        None => "<none>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_set() {
        assert_eq!(split_set("artist=New Artist").unwrap(), ("artist", "New Artist"));
        assert_eq!(split_set("artist=</Test/g>").unwrap(), ("artist", "</Test/g>"));
        assert_eq!(split_set("title=").unwrap(), ("title", ""));
        assert!(split_set("artist").is_err());
    }

    #[test]
    fn test_cli_parses_edit_invocation() {
        let parsed = Cli::try_parse_from([
            "tagdeck",
            "edit",
            "/music/a.mp3",
            "--set",
            "artist=</Test/g>",
            "--dry-run",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_cli_requires_paths_for_add() {
        assert!(Cli::try_parse_from(["tagdeck", "add"]).is_err());
    }

    #[test]
    fn test_preview_counts_changed_fields() {
        let before = vec![
            TagRecord::new()
                .with("path", FieldValue::text("/a.mp3"))
                .with("artist", FieldValue::text("Old")),
        ];
        let after = vec![
            TagRecord::new()
                .with("path", FieldValue::text("/a.mp3"))
                .with("artist", FieldValue::text("New")),
        ];
        assert_eq!(preview(&before, &after), 1);
        assert_eq!(preview(&before, &before), 0);
    }
}
