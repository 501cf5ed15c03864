//! File-backed note store.
//!
//! # Responsibility
//! - Own the authoritative in-memory note collection.
//! - Write every mutation through to `notes.json` (+ per-note content files).
//! - Implement list/search/tag aggregation and JSON import/export.
//!
//! # Invariants
//! - Memory and disk agree after every public call: a failed persist rolls
//!   back the in-memory change and any body files it rewrote before the
//!   error is returned.
//! - Listing order is `updated_at DESC`, ties by insertion order.
//! - Loading never fails; unreadable input degrades to fewer (or zero) notes.
//!
//! # Concurrency
//! Mutators take `&mut self`. Shared callers must serialize access (the HTTP
//! adapter holds the store behind one mutex), so each read-modify-persist
//! runs end to end without interleaving.

use crate::config::{ContentLayout, ResourcePaths};
use crate::model::note::{FormatError, Note, NoteId, NoteRecord, NoteUpdate};
use crate::store::error::{EntryError, StoreError, StoreResult};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

const METADATA_FILE_NAME: &str = "notes.json";
const CONTENT_FILE_EXTENSION: &str = "md";
const DEFAULT_DRAFT_TITLE: &str = "Imported Note";

/// Optional filters for [`NoteStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Keep notes carrying at least one of these tags. Empty means no filter.
    pub tags: Vec<String>,
    /// Case-insensitive substring over title, content and tags.
    pub query: Option<String>,
}

impl NoteFilter {
    pub fn with_tags(tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
            query: None,
        }
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            tags: Vec::new(),
            query: Some(query.into()),
        }
    }

    fn accepts(&self, note: &Note) -> bool {
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|tag| note.has_tag(tag));
        let query_ok = match self.query.as_deref() {
            Some(query) if !query.is_empty() => note.matches_query(query),
            _ => true,
        };
        tag_ok && query_ok
    }
}

/// Loose note input used when importing notes as new entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Outcome of [`NoteStore::import_drafts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// In-memory state captured before a mutation.
struct Snapshot {
    notes: HashMap<NoteId, Note>,
    order: Vec<NoteId>,
}

/// Owner of the note collection and its on-disk representation.
#[derive(Debug)]
pub struct NoteStore {
    notes: HashMap<NoteId, Note>,
    /// Insertion order of ids; drives persistence order and sort tie-breaks.
    order: Vec<NoteId>,
    notes_dir: PathBuf,
    layout: ContentLayout,
}

impl NoteStore {
    /// Opens the store rooted at `notes_dir`, loading whatever is on disk.
    pub fn open(notes_dir: impl Into<PathBuf>, layout: ContentLayout) -> Self {
        let mut store = Self {
            notes: HashMap::new(),
            order: Vec::new(),
            notes_dir: notes_dir.into(),
            layout,
        };
        store.load();
        store
    }

    /// Opens the store in the notes directory of `paths`.
    pub fn open_in(paths: &ResourcePaths, layout: ContentLayout) -> Self {
        Self::open(paths.notes_dir.clone(), layout)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.notes_dir.join(METADATA_FILE_NAME)
    }

    pub fn layout(&self) -> ContentLayout {
        self.layout
    }

    /// Creates, inserts and persists a new note.
    ///
    /// Titles are not validated here; adapters own input rules.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
    ) -> StoreResult<Note> {
        let note = Note::new(title, content, tags);
        let id = note.id().to_string();
        let snapshot = self.snapshot();
        self.insert_or_replace(note.clone());
        self.persist_or_restore(snapshot)?;

        info!("event=note_create module=store status=ok note_id={id}");
        Ok(note)
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    /// Applies a partial update. `Ok(None)` means the note does not exist.
    pub fn update(&mut self, id: &str, changes: NoteUpdate) -> StoreResult<Option<Note>> {
        self.mutate(id, "note_update", |note| {
            note.update(changes);
            true
        })
    }

    /// Adds one tag. Persists only when the tag set changed.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> StoreResult<Option<Note>> {
        self.mutate(id, "note_add_tag", |note| note.add_tag(tag))
    }

    /// Removes one tag. Persists only when the tag set changed.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> StoreResult<Option<Note>> {
        self.mutate(id, "note_remove_tag", |note| note.remove_tag(tag))
    }

    /// Deletes a note and its content file. Returns `false` if absent.
    ///
    /// A content file that cannot be removed is logged and left behind; the
    /// metadata file is the source of truth for existence.
    pub fn delete(&mut self, id: &str) -> StoreResult<bool> {
        if !self.notes.contains_key(id) {
            return Ok(false);
        }
        let snapshot = self.snapshot();
        self.notes.remove(id);
        self.order.retain(|existing| existing != id);
        self.persist_or_restore(snapshot)?;

        if let Some(content_file) = self.content_file(id) {
            if content_file.exists() {
                if let Err(err) = std::fs::remove_file(&content_file) {
                    warn!(
                        "event=content_delete module=store status=error note_id={id} path={} error={err}",
                        content_file.display()
                    );
                }
            }
        }

        info!("event=note_delete module=store status=ok note_id={id}");
        Ok(true)
    }

    /// Returns notes matching `filter`, newest `updated_at` first.
    pub fn list(&self, filter: &NoteFilter) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .ordered()
            .filter(|note| filter.accepts(note))
            .collect();
        // sort_by is stable, so equal timestamps keep insertion order.
        notes.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        notes
    }

    /// Deduplicated, lexicographically sorted union of all tags.
    pub fn all_tags(&self) -> Vec<String> {
        self.notes
            .values()
            .flat_map(|note| note.tags().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.notes.len()
    }

    /// Writes every note, content included, as an id-keyed JSON mapping.
    pub fn export(&self, path: &Path) -> StoreResult<()> {
        let mut data = Map::new();
        for note in self.ordered() {
            data.insert(
                note.id().to_string(),
                serde_json::to_value(note.to_record(true))?,
            );
        }
        let encoded = serde_json::to_string_pretty(&Value::Object(data))?;
        std::fs::write(path, encoded).map_err(|err| StoreError::storage(path, err))?;
        info!(
            "event=notes_export module=store status=ok count={} path={}",
            self.count(),
            path.display()
        );
        Ok(())
    }

    /// Imports an id-keyed JSON mapping, overwriting notes with equal ids.
    ///
    /// Malformed entries are skipped with a warning. Returns the number of
    /// notes imported; the store is persisted once if that number is > 0.
    pub fn import(&mut self, path: &Path) -> StoreResult<usize> {
        if !path.exists() {
            return Err(StoreError::ImportFileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|err| StoreError::storage(path, err))?;
        let document: Value = serde_json::from_str(&raw).map_err(|err| StoreError::Format {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let Value::Object(entries) = document else {
            return Err(StoreError::Format {
                path: path.to_path_buf(),
                message: "expected a JSON object keyed by note id".to_string(),
            });
        };

        let (notes, skipped) = decode_entries(entries, |_| None);
        for entry in &skipped {
            warn!("event=note_import module=store status=skip {entry}");
        }
        if notes.is_empty() {
            return Ok(0);
        }

        let snapshot = self.snapshot();
        let imported = notes.len();
        for note in notes {
            self.insert_or_replace(note);
        }
        self.persist_or_restore(snapshot)?;

        info!(
            "event=notes_import module=store status=ok imported={imported} skipped={}",
            skipped.len()
        );
        Ok(imported)
    }

    /// Creates fresh notes from loosely shaped drafts, persisting once.
    ///
    /// Items that are not draft objects are reported in `errors`.
    pub fn import_drafts(&mut self, items: Vec<Value>) -> StoreResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut created = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<NoteDraft>(item) {
                Ok(draft) => created.push(Note::new(
                    draft
                        .title
                        .unwrap_or_else(|| DEFAULT_DRAFT_TITLE.to_string()),
                    draft.content.unwrap_or_default(),
                    draft.tags.unwrap_or_default(),
                )),
                Err(err) => report
                    .errors
                    .push(format!("failed to import item {index}: {err}")),
            }
        }
        if created.is_empty() {
            return Ok(report);
        }

        let snapshot = self.snapshot();
        report.imported = created.len();
        for note in created {
            self.insert_or_replace(note);
        }
        self.persist_or_restore(snapshot)?;
        Ok(report)
    }

    /// Runs `change` on one note and persists if it reports a change.
    fn mutate(
        &mut self,
        id: &str,
        event: &'static str,
        change: impl FnOnce(&mut Note) -> bool,
    ) -> StoreResult<Option<Note>> {
        let Some(current) = self.notes.get(id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        if !change(&mut updated) {
            return Ok(Some(updated));
        }

        let snapshot = self.snapshot();
        self.notes.insert(id.to_string(), updated.clone());
        self.persist_or_restore(snapshot)?;
        info!("event={event} module=store status=ok note_id={id}");
        Ok(Some(updated))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            notes: self.notes.clone(),
            order: self.order.clone(),
        }
    }

    /// Persists the current state, or reinstates `snapshot` in memory and on
    /// disk when persisting fails.
    ///
    /// `persist` writes body files before the metadata file, so a failure
    /// can leave bodies of the rejected state behind. Every note id that the
    /// failed attempt touched gets its body file rewritten from the snapshot,
    /// or removed when the snapshot does not know it.
    fn persist_or_restore(&mut self, snapshot: Snapshot) -> StoreResult<()> {
        let Err(err) = self.persist() else {
            return Ok(());
        };
        let attempted = std::mem::replace(&mut self.order, snapshot.order);
        self.notes = snapshot.notes;
        for id in &attempted {
            self.restore_content_file(id);
        }
        warn!(
            "event=notes_persist module=store status=error action=rollback notes={} error={err}",
            attempted.len()
        );
        Err(err)
    }

    fn restore_content_file(&self, id: &str) {
        let Some(path) = self.content_file(id) else {
            return;
        };
        let result = match self.notes.get(id) {
            Some(note) => {
                let embed = self.layout == ContentLayout::Embedded;
                self.sync_content_file(note, Some(&path), embed)
            }
            None if path.exists() => {
                std::fs::remove_file(&path).map_err(|err| StoreError::storage(&path, err))
            }
            None => Ok(()),
        };
        if let Err(err) = result {
            warn!("event=content_restore module=store status=error note_id={id} error={err}");
        }
    }

    fn insert_or_replace(&mut self, note: Note) {
        let id = note.id().to_string();
        if self.notes.insert(id.clone(), note).is_none() {
            self.order.push(id);
        }
    }

    fn ordered(&self) -> impl Iterator<Item = &Note> {
        self.order.iter().filter_map(|id| self.notes.get(id))
    }

    /// Per-note body file, or `None` when the id is not a safe file name.
    fn content_file(&self, id: &str) -> Option<PathBuf> {
        is_safe_file_stem(id).then(|| {
            self.notes_dir
                .join(format!("{id}.{CONTENT_FILE_EXTENSION}"))
        })
    }

    fn load(&mut self) {
        let started_at = Instant::now();
        let metadata_file = self.metadata_file();
        if !metadata_file.exists() {
            debug!(
                "event=notes_load module=store status=skip reason=no_metadata path={}",
                metadata_file.display()
            );
            return;
        }

        let entries = match read_metadata(&metadata_file) {
            Ok(entries) => entries,
            Err(message) => {
                warn!(
                    "event=notes_load module=store status=error path={} error={message}",
                    metadata_file.display()
                );
                self.quarantine(&metadata_file);
                return;
            }
        };

        let (notes, skipped) = decode_entries(entries, |id| self.read_content(id));
        for entry in &skipped {
            warn!("event=notes_load module=store status=skip {entry}");
        }
        for note in notes {
            self.insert_or_replace(note);
        }

        info!(
            "event=notes_load module=store status=ok count={} skipped={} duration_ms={}",
            self.count(),
            skipped.len(),
            started_at.elapsed().as_millis()
        );
    }

    fn read_content(&self, id: &str) -> Option<String> {
        let path = self.content_file(id)?;
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                warn!(
                    "event=content_load module=store status=error note_id={id} path={} error={err}",
                    path.display()
                );
                None
            }
        }
    }

    /// Moves an unreadable metadata file aside so the next persist does not
    /// overwrite it. Earlier backups are never replaced.
    fn quarantine(&self, metadata_file: &Path) {
        let backup = quarantine_path(metadata_file);
        match std::fs::rename(metadata_file, &backup) {
            Ok(()) => warn!(
                "event=notes_quarantine module=store status=ok backup={}",
                backup.display()
            ),
            Err(err) => warn!(
                "event=notes_quarantine module=store status=error path={} error={err}",
                metadata_file.display()
            ),
        }
    }

    /// Full overwrite of metadata and (layout permitting) content files.
    fn persist(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.notes_dir)
            .map_err(|err| StoreError::storage(&self.notes_dir, err))?;

        let mut data = Map::new();
        for note in self.ordered() {
            let content_file = self.content_file(note.id());
            let embed = self.layout == ContentLayout::Embedded || content_file.is_none();
            self.sync_content_file(note, content_file.as_deref(), embed)?;
            data.insert(
                note.id().to_string(),
                serde_json::to_value(note.to_record(embed))?,
            );
        }

        let encoded = serde_json::to_string_pretty(&Value::Object(data))?;
        let metadata_file = self.metadata_file();
        let staging = metadata_file.with_extension("json.tmp");
        std::fs::write(&staging, encoded).map_err(|err| StoreError::storage(&staging, err))?;
        std::fs::rename(&staging, &metadata_file)
            .map_err(|err| StoreError::storage(&metadata_file, err))?;

        debug!(
            "event=notes_persist module=store status=ok count={} layout={:?}",
            self.count(),
            self.layout
        );
        Ok(())
    }

    fn sync_content_file(
        &self,
        note: &Note,
        content_file: Option<&Path>,
        embedded: bool,
    ) -> StoreResult<()> {
        let Some(path) = content_file else {
            return Ok(());
        };
        if embedded {
            // A stale body file would shadow the embedded content on load.
            if path.exists() {
                std::fs::remove_file(path).map_err(|err| StoreError::storage(path, err))?;
            }
            return Ok(());
        }
        std::fs::write(path, note.content()).map_err(|err| StoreError::storage(path, err))
    }
}

/// First free name among `notes.json.bak`, `notes.json.bak.1`, ...
fn quarantine_path(metadata_file: &Path) -> PathBuf {
    let first = metadata_file.with_extension("json.bak");
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|index| metadata_file.with_extension(format!("json.bak.{index}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

fn read_metadata(path: &Path) -> Result<Map<String, Value>, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    match serde_json::from_str::<Value>(&raw).map_err(|err| err.to_string())? {
        Value::Object(entries) => Ok(entries),
        _ => Err("expected a JSON object keyed by note id".to_string()),
    }
}

/// Decodes id-keyed entries, splitting successes from per-entry failures.
fn decode_entries(
    entries: Map<String, Value>,
    mut content_for: impl FnMut(&str) -> Option<String>,
) -> (Vec<Note>, Vec<EntryError>) {
    let mut notes = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for (key, value) in entries {
        let decoded = serde_json::from_value::<NoteRecord>(value)
            .map_err(|err| FormatError::InvalidShape(err.to_string()))
            .and_then(|record| {
                let content = record
                    .note_id
                    .as_deref()
                    .and_then(|id| content_for(id));
                Note::from_record(record, content)
            });
        match decoded {
            Ok(note) => notes.push(note),
            Err(error) => skipped.push(EntryError { key, error }),
        }
    }
    (notes, skipped)
}

fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::{is_safe_file_stem, NoteFilter};
    use crate::model::note::Note;

    #[test]
    fn safe_file_stem_rejects_path_like_ids() {
        assert!(is_safe_file_stem("3f2b9c1e-aaaa-4bbb-8ccc-123456789abc"));
        assert!(is_safe_file_stem("note_1"));
        assert!(!is_safe_file_stem(""));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem("../escape"));
        assert!(!is_safe_file_stem("a/b"));
    }

    #[test]
    fn filter_requires_tag_and_query_when_both_set() {
        let note = Note::new("Standup", "daily sync", vec!["work".to_string()]);
        let both = NoteFilter {
            tags: vec!["work".to_string()],
            query: Some("sync".to_string()),
        };
        assert!(both.accepts(&note));

        let wrong_query = NoteFilter {
            tags: vec!["work".to_string()],
            query: Some("lunch".to_string()),
        };
        assert!(!wrong_query.accepts(&note));
        assert!(NoteFilter::default().accepts(&note));
    }
}
