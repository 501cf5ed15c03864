//! Note domain model.
//!
//! # Responsibility
//! - Define the note record persisted by the store and returned to adapters.
//! - Provide mutation helpers that keep `updated_at` consistent.
//! - Decode serialized notes with explicit, typed failure reasons.
//!
//! # Invariants
//! - `id` is assigned once (generated or restored) and never changes.
//! - `tags` never contains the same string twice; matching is case-sensitive.
//! - `updated_at` only moves forward and never precedes `created_at`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a note.
///
/// Kept as an opaque string: generated notes use UUID v4 text, imported notes
/// keep whatever id they were exported with.
pub type NoteId = String;

/// Decode failure for one serialized note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A required field is absent or `null`.
    MissingField(&'static str),
    /// Note id is present but blank.
    EmptyId,
    /// A timestamp field could not be parsed.
    InvalidTimestamp { field: &'static str, value: String },
    /// `updated_at` is earlier than `created_at`.
    TimestampOrder,
    /// The value is not a JSON object of the expected shape.
    InvalidShape(String),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::EmptyId => write!(f, "note id cannot be empty"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid timestamp `{value}` in `{field}`")
            }
            Self::TimestampOrder => write!(f, "updated_at precedes created_at"),
            Self::InvalidShape(message) => write!(f, "invalid note shape: {message}"),
        }
    }
}

impl Error for FormatError {}

/// Serialized shape of a note.
///
/// Every field is optional at the type level so that decoding can report
/// exactly which required field is missing instead of a generic serde error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Omitted from metadata when bodies live in per-note content files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Partial update applied by [`Note::update`].
///
/// `None` leaves the corresponding field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    /// Returns whether no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

/// A single note: identity, title, body, tags and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    #[serde(rename = "note_id")]
    id: NoteId,
    title: String,
    content: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Note {
    /// Creates a note with a generated id and both timestamps set to now.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            tags: dedup_tags(tags),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a note whose identity already exists (load/import paths).
    ///
    /// Fails with [`FormatError::TimestampOrder`] when `updated_at` precedes
    /// `created_at`, and with [`FormatError::EmptyId`] for a blank id.
    pub fn with_identity(
        id: impl Into<NoteId>,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, FormatError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FormatError::EmptyId);
        }
        if updated_at < created_at {
            return Err(FormatError::TimestampOrder);
        }
        Ok(Self {
            id,
            title: title.into(),
            content: content.into(),
            tags: dedup_tags(tags),
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether `tag` is attached (exact, case-sensitive match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }

    /// Applies every provided field and bumps `updated_at`.
    pub fn update(&mut self, changes: NoteUpdate) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(tags) = changes.tags {
            self.tags = dedup_tags(tags);
        }
        self.touch();
    }

    /// Appends `tag` if absent. Returns `true` when the tag set changed.
    ///
    /// An already-present tag leaves the note untouched, timestamp included.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.touch();
        true
    }

    /// Removes `tag` if present. Returns `true` when the tag set changed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(position) = self.tags.iter().position(|existing| existing == tag) else {
            return false;
        };
        self.tags.remove(position);
        self.touch();
        true
    }

    /// Case-insensitive substring match against title, content and each tag.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.content.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }

    /// Serializes into the flat record shape.
    ///
    /// `include_content = false` produces the metadata-only form used when
    /// bodies are stored in separate content files.
    pub fn to_record(&self, include_content: bool) -> NoteRecord {
        NoteRecord {
            note_id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            content: include_content.then(|| self.content.clone()),
            tags: self.tags.clone(),
            created_at: Some(format_timestamp(self.created_at)),
            updated_at: Some(format_timestamp(self.updated_at)),
        }
    }

    /// Decodes a note from its record form.
    ///
    /// `content_override` wins over the embedded `content` field when set;
    /// this is how separately stored bodies are re-attached on load.
    pub fn from_record(
        record: NoteRecord,
        content_override: Option<String>,
    ) -> Result<Self, FormatError> {
        let id = record.note_id.ok_or(FormatError::MissingField("note_id"))?;
        let title = record.title.ok_or(FormatError::MissingField("title"))?;
        let created_raw = record
            .created_at
            .ok_or(FormatError::MissingField("created_at"))?;
        let updated_raw = record
            .updated_at
            .ok_or(FormatError::MissingField("updated_at"))?;
        let created_at = parse_timestamp("created_at", &created_raw)?;
        let updated_at = parse_timestamp("updated_at", &updated_raw)?;
        let content = content_override.or(record.content).unwrap_or_default();

        Self::with_identity(id, title, content, record.tags, created_at, updated_at)
    }

    /// Decodes a note from an arbitrary JSON value.
    pub fn from_json(
        value: serde_json::Value,
        content_override: Option<String>,
    ) -> Result<Self, FormatError> {
        let record: NoteRecord = serde_json::from_value(value)
            .map_err(|err| FormatError::InvalidShape(err.to_string()))?;
        Self::from_record(record, content_override)
    }

    fn touch(&mut self) {
        // Wall clock can step backwards; never let updated_at regress.
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Removes duplicate tags, keeping the first occurrence order.
pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

/// Renders a timestamp in RFC 3339 with full sub-second precision.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

/// Parses RFC 3339, falling back to naive ISO-8601 interpreted as UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, FormatError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(naive.and_utc());
        }
    }
    Err(FormatError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{dedup_tags, parse_timestamp, FormatError, Note, NoteRecord, NoteUpdate};
    use chrono::{Duration, TimeZone, Utc};

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn new_note_has_equal_timestamps_and_deduplicated_tags() {
        let note = Note::new("A", "", tags(&["t1", "t2", "t1"]));
        assert_eq!(note.created_at(), note.updated_at());
        assert_eq!(note.tags(), tags(&["t1", "t2"]).as_slice());
        assert!(note.content().is_empty());
        assert!(!note.id().is_empty());
    }

    #[test]
    fn add_tag_is_idempotent_and_only_first_call_bumps_timestamp() {
        let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut note =
            Note::with_identity("n1", "A", "", Vec::new(), past, past).expect("valid identity");

        assert!(note.add_tag("work"));
        let after_first = note.updated_at();
        assert!(after_first > past);

        assert!(!note.add_tag("work"));
        assert_eq!(note.updated_at(), after_first);
        assert_eq!(note.tags(), tags(&["work"]).as_slice());
    }

    #[test]
    fn remove_absent_tag_is_a_noop() {
        let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut note = Note::with_identity("n1", "A", "", tags(&["keep"]), past, past)
            .expect("valid identity");

        assert!(!note.remove_tag("missing"));
        assert_eq!(note.updated_at(), past);
        assert_eq!(note.tags(), tags(&["keep"]).as_slice());

        assert!(note.remove_tag("keep"));
        assert!(note.tags().is_empty());
        assert!(note.updated_at() > past);
    }

    #[test]
    fn tag_membership_is_case_sensitive() {
        let mut note = Note::new("A", "", tags(&["Work"]));
        assert!(note.add_tag("work"));
        assert_eq!(note.tags(), tags(&["Work", "work"]).as_slice());
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let mut note = Note::new("A", "x", tags(&["t1"]));
        note.update(NoteUpdate {
            title: Some("B".to_string()),
            ..NoteUpdate::default()
        });
        assert_eq!(note.title(), "B");
        assert_eq!(note.content(), "x");
        assert_eq!(note.tags(), tags(&["t1"]).as_slice());
        assert!(note.updated_at() >= note.created_at());
    }

    #[test]
    fn matches_query_checks_title_content_and_tags_case_insensitively() {
        let note = Note::new("Groceries", "Buy MILK", tags(&["Errands"]));
        assert!(note.matches_query("grocer"));
        assert!(note.matches_query("milk"));
        assert!(note.matches_query("ERRAND"));
        assert!(!note.matches_query("bank"));
    }

    #[test]
    fn record_roundtrip_preserves_every_field() {
        let note = Note::new("Title", "body", tags(&["a", "b"]));
        let restored =
            Note::from_record(note.to_record(true), None).expect("record should decode");
        assert_eq!(restored, note);
    }

    #[test]
    fn metadata_record_omits_content_and_accepts_override() {
        let note = Note::new("Title", "body", Vec::new());
        let record = note.to_record(false);
        assert!(record.content.is_none());

        let restored = Note::from_record(record, Some("body".to_string()))
            .expect("record should decode");
        assert_eq!(restored.content(), "body");
    }

    #[test]
    fn from_json_reports_missing_required_fields() {
        let value = serde_json::json!({
            "note_id": "n1",
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00"
        });
        let err = Note::from_json(value, None).expect_err("title is required");
        assert_eq!(err, FormatError::MissingField("title"));
    }

    #[test]
    fn from_json_rejects_non_object_values() {
        let err = Note::from_json(serde_json::json!("oops"), None).expect_err("not an object");
        assert!(matches!(err, FormatError::InvalidShape(_)));
    }

    #[test]
    fn from_record_rejects_reversed_timestamps() {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let record = NoteRecord {
            note_id: Some("n1".to_string()),
            title: Some("A".to_string()),
            created_at: Some(created.to_rfc3339()),
            updated_at: Some((created - Duration::days(1)).to_rfc3339()),
            ..NoteRecord::default()
        };
        assert_eq!(
            Note::from_record(record, None).expect_err("order must hold"),
            FormatError::TimestampOrder
        );
    }

    #[test]
    fn parse_timestamp_accepts_offset_and_naive_iso_forms() {
        let with_offset = parse_timestamp("created_at", "2024-03-01T10:20:30.123456+00:00")
            .expect("rfc3339 should parse");
        let naive = parse_timestamp("created_at", "2024-03-01T10:20:30.123456")
            .expect("naive iso should parse");
        assert_eq!(with_offset, naive);

        let err = parse_timestamp("created_at", "yesterday").expect_err("garbage rejected");
        assert!(matches!(err, FormatError::InvalidTimestamp { .. }));
    }

    #[test]
    fn dedup_tags_keeps_first_occurrence_order() {
        assert_eq!(
            dedup_tags(tags(&["b", "a", "b", "c", "a"])),
            tags(&["b", "a", "c"])
        );
    }
}
