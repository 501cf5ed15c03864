//! Export document shapes for adapters.
//!
//! The id-keyed backup file is written by `NoteStore::export`; this module
//! covers the download formats (JSON envelope and Markdown).

use crate::model::note::{Note, NoteRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Version tag written into every JSON envelope.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Download format requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    /// Parses `json` / `markdown` (case-insensitive); `None` when unsupported.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// JSON download wrapping a list of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEnvelope {
    pub export_date: DateTime<Utc>,
    pub version: &'static str,
    pub notes: Vec<NoteRecord>,
}

impl ExportEnvelope {
    pub fn new<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        Self {
            export_date: Utc::now(),
            version: EXPORT_FORMAT_VERSION,
            notes: notes.into_iter().map(|note| note.to_record(true)).collect(),
        }
    }
}

/// Renders all notes as one Markdown document separated by rules.
pub fn render_markdown<'a>(notes: impl IntoIterator<Item = &'a Note>) -> String {
    let mut out = String::from("# Notepy Online Export\n\n");
    for note in notes {
        let _ = write!(out, "## {}\n\n", note.title());
        write_note_header(&mut out, note);
        out.push_str(note.content());
        out.push_str("\n\n---\n\n");
    }
    out
}

/// Renders one note as a standalone Markdown document.
pub fn render_note_markdown(note: &Note) -> String {
    let mut out = format!("# {}\n\n", note.title());
    write_note_header(&mut out, note);
    out.push_str(note.content());
    out
}

/// File name offered for a single-note Markdown download.
pub fn markdown_file_name(note: &Note) -> String {
    let stem: String = note
        .title()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        format!("{}.md", note.id())
    } else {
        format!("{stem}.md")
    }
}

fn write_note_header(out: &mut String, note: &Note) {
    let _ = writeln!(
        out,
        "**Created:** {}",
        note.created_at().format(TIMESTAMP_DISPLAY_FORMAT)
    );
    let _ = writeln!(
        out,
        "**Updated:** {}",
        note.updated_at().format(TIMESTAMP_DISPLAY_FORMAT)
    );
    if !note.tags().is_empty() {
        let _ = writeln!(out, "**Tags:** {}", note.tags().join(", "));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::{markdown_file_name, render_markdown, render_note_markdown, ExportEnvelope, ExportFormat};
    use crate::model::note::Note;

    #[test]
    fn export_format_parses_known_values_only() {
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("markdown"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }

    #[test]
    fn note_markdown_includes_title_tags_and_body() {
        let note = Note::new("Plan", "- step one", vec!["work".to_string(), "q3".to_string()]);
        let rendered = render_note_markdown(&note);
        assert!(rendered.starts_with("# Plan\n\n"));
        assert!(rendered.contains("**Tags:** work, q3"));
        assert!(rendered.ends_with("- step one"));
    }

    #[test]
    fn collection_markdown_separates_notes() {
        let first = Note::new("One", "a", Vec::new());
        let second = Note::new("Two", "b", Vec::new());
        let rendered = render_markdown([&first, &second]);
        assert!(rendered.contains("## One"));
        assert!(rendered.contains("## Two"));
        assert_eq!(rendered.matches("---").count(), 2);
        assert!(!rendered.contains("**Tags:**"));
    }

    #[test]
    fn envelope_embeds_content() {
        let note = Note::new("One", "body", Vec::new());
        let envelope = ExportEnvelope::new([&note]);
        assert_eq!(envelope.version, "1.0");
        assert_eq!(envelope.notes[0].content.as_deref(), Some("body"));
    }

    #[test]
    fn markdown_file_name_sanitizes_title() {
        let note = Note::new("My plan/v2", "", Vec::new());
        assert_eq!(markdown_file_name(&note), "My_plan_v2.md");

        let untitled = Note::new("///", "", Vec::new());
        assert_eq!(markdown_file_name(&untitled), format!("{}.md", untitled.id()));
    }
}
