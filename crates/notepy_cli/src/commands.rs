//! Command execution against the resource directory.
//!
//! # Responsibility
//! - Resolve resources, load config and start logging for each run.
//! - Translate parsed commands into `NoteStore` calls and printable output.
//!
//! # Invariants
//! - `bootstrap check` never creates anything on disk.
//! - User input limits come from the `[notes]` config section.

use crate::args::{Command, Invocation, JsonOutput};
use log::info;
use notepy_core::markdown::preview;
use notepy_core::{
    init_logging, AppConfig, ConfigError, Note, NoteFilter, NoteStore, NoteUpdate, ResourcePaths,
    StoreError,
};
use notepy_server::ServerError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const PREVIEW_CHARS: usize = 100;
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Store(StoreError),
    NoteNotFound(String),
    Invalid(String),
    Io { path: PathBuf, source: std::io::Error },
    Encode(serde_json::Error),
    Output(std::io::Error),
    Runtime(std::io::Error),
    Server(ServerError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note with id `{id}` not found"),
            Self::Invalid(message) => write!(f, "{message}"),
            Self::Io { path, source } => write!(f, "failed to write `{}`: {source}", path.display()),
            Self::Encode(err) => write!(f, "failed to encode JSON: {err}"),
            Self::Output(err) => write!(f, "failed to write output: {err}"),
            Self::Runtime(err) => write!(f, "failed to start async runtime: {err}"),
            Self::Server(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::Output(err) | Self::Runtime(err) => Some(err),
            Self::Server(err) => Some(err),
            Self::NoteNotFound(_) | Self::Invalid(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<ServerError> for CliError {
    fn from(value: ServerError) -> Self {
        Self::Server(value)
    }
}

type CliResult<T> = Result<T, CliError>;

/// Loaded resources for commands that touch notes.
struct Session {
    paths: ResourcePaths,
    config: AppConfig,
}

impl Session {
    fn open(data_dir: Option<PathBuf>) -> CliResult<Self> {
        let paths = ResourcePaths::resolve(data_dir)?;
        paths.create_resource_structure()?;
        let config = AppConfig::load_or_init(&paths)?;
        if let Err(err) = init_logging(&config.logging, &paths.logs_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
        Ok(Self { paths, config })
    }

    fn store(&self) -> NoteStore {
        NoteStore::open_in(&self.paths, self.config.notes.content_layout)
    }

    fn check_title(&self, title: &str) -> CliResult<()> {
        if title.trim().is_empty() {
            return Err(CliError::Invalid("title cannot be empty".to_string()));
        }
        let max = self.config.notes.max_title_length;
        if title.chars().count() > max {
            return Err(CliError::Invalid(format!("title exceeds {max} characters")));
        }
        Ok(())
    }

    fn check_content(&self, content: &str) -> CliResult<()> {
        let max = self.config.notes.max_content_length;
        if content.chars().count() > max {
            return Err(CliError::Invalid(format!("content exceeds {max} characters")));
        }
        Ok(())
    }
}

/// Runs one parsed invocation, writing human output to `out`.
///
/// `input` supplies the answer to the delete confirmation prompt.
pub fn run(invocation: Invocation, input: &mut dyn BufRead, out: &mut dyn Write) -> CliResult<()> {
    let Invocation { data_dir, command } = invocation;
    match command {
        Command::Help => print(out, crate::args::USAGE.trim_end()),
        Command::Version => print(
            out,
            &format!(
                "notepy {} (core {})",
                env!("CARGO_PKG_VERSION"),
                notepy_core::core_version()
            ),
        ),
        Command::BootstrapCheck => bootstrap_check(data_dir, out),
        Command::BootstrapInit => {
            let session = Session::open(data_dir)?;
            info!(
                "event=bootstrap_init module=cli status=ok root={}",
                session.paths.root.display()
            );
            print(
                out,
                &format!(
                    "Initialized Notepy resources at {}",
                    session.paths.root.display()
                ),
            )
        }
        Command::Serve { host, port } => {
            let mut session = Session::open(data_dir)?;
            if let Some(host) = host {
                session.config.server.host = host;
            }
            if let Some(port) = port {
                session.config.server.port = port;
            }
            print(
                out,
                &format!(
                    "Starting Notepy server on http://{}:{}",
                    session.config.server.host, session.config.server.port
                ),
            )?;
            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            runtime.block_on(notepy_server::run(&session.paths, &session.config))?;
            Ok(())
        }
        command => {
            let session = Session::open(data_dir)?;
            run_note_command(&session, command, input, out)
        }
    }
}

fn run_note_command(
    session: &Session,
    command: Command,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> CliResult<()> {
    let mut store = session.store();
    match command {
        Command::NotesCreate {
            title,
            content,
            tags,
        } => {
            session.check_title(&title)?;
            let content = content.unwrap_or_default();
            session.check_content(&content)?;
            let note = store.create(title.trim(), content, tags)?;
            print(out, "Note created.")?;
            print_summary(out, &note)
        }
        Command::NotesList {
            tags,
            search,
            output,
        } => {
            let filter = NoteFilter {
                tags,
                query: search,
            };
            let notes = store.list(&filter);
            if let Some(path) = output.path.as_deref() {
                write_json(path, &notes, output.pretty)?;
                return print(out, &format!("Notes exported to {}", path.display()));
            }
            if notes.is_empty() {
                return print(out, "No notes found.");
            }
            print(out, &format!("Found {} note(s):", notes.len()))?;
            for note in notes {
                print(out, "")?;
                print_summary(out, note)?;
                print(
                    out,
                    &format!(
                        "  Updated: {}",
                        note.updated_at().format(DISPLAY_TIME_FORMAT)
                    ),
                )?;
                if !note.content().is_empty() {
                    print(
                        out,
                        &format!("  Preview: {}", preview(note.content(), PREVIEW_CHARS)),
                    )?;
                }
            }
            Ok(())
        }
        Command::NotesShow { id, output } => {
            let note = store.get(&id).ok_or(CliError::NoteNotFound(id.clone()))?;
            show_note(out, note, &output)
        }
        Command::NotesEdit {
            id,
            title,
            content,
            tags,
        } => {
            if let Some(title) = title.as_deref() {
                session.check_title(title)?;
            }
            if let Some(content) = content.as_deref() {
                session.check_content(content)?;
            }
            let changes = NoteUpdate {
                title: title.map(|title| title.trim().to_string()),
                content,
                tags,
            };
            let note = store
                .update(&id, changes)?
                .ok_or(CliError::NoteNotFound(id))?;
            print(out, "Note updated.")?;
            print_summary(out, &note)
        }
        Command::NotesDelete { id, force } => {
            let title = store
                .get(&id)
                .map(|note| note.title().to_string())
                .ok_or_else(|| CliError::NoteNotFound(id.clone()))?;
            if !force && !confirm(input, out, &format!("Delete note '{title}'?"))? {
                return print(out, "Deletion cancelled.");
            }
            if !store.delete(&id)? {
                return Err(CliError::NoteNotFound(id));
            }
            print(out, &format!("Note '{title}' deleted."))
        }
        Command::NotesSearch { query, output } => {
            let notes = store.list(&NoteFilter::with_query(query.clone()));
            if let Some(path) = output.path.as_deref() {
                write_json(path, &notes, output.pretty)?;
                return print(out, &format!("Search results exported to {}", path.display()));
            }
            if notes.is_empty() {
                return print(out, &format!("No notes found matching '{query}'."));
            }
            print(
                out,
                &format!("Found {} note(s) matching '{query}':", notes.len()),
            )?;
            for note in notes {
                print(out, "")?;
                print_summary(out, note)?;
            }
            Ok(())
        }
        Command::NotesExport { file } => {
            store.export(&file)?;
            print(out, &format!("Exported {} note(s) to {}", store.count(), file.display()))
        }
        Command::NotesImport { file } => {
            let imported = store.import(&file)?;
            print(
                out,
                &format!("Imported {imported} note(s) from {}", file.display()),
            )
        }
        Command::TagsList => {
            let tags = store.all_tags();
            if tags.is_empty() {
                return print(out, "No tags found.");
            }
            print(out, &format!("Found {} tag(s):", tags.len()))?;
            for tag in tags {
                print(out, &format!("  - {tag}"))?;
            }
            Ok(())
        }
        Command::TagsAdd { id, tag } => {
            let note = store
                .add_tag(&id, &tag)?
                .ok_or(CliError::NoteNotFound(id))?;
            print(out, &format!("Tag '{tag}' added to note '{}'", note.title()))
        }
        Command::TagsRemove { id, tag } => {
            let note = store
                .remove_tag(&id, &tag)?
                .ok_or(CliError::NoteNotFound(id))?;
            print(
                out,
                &format!("Tag '{tag}' removed from note '{}'", note.title()),
            )
        }
        Command::Help
        | Command::Version
        | Command::BootstrapInit
        | Command::BootstrapCheck
        | Command::Serve { .. } => Ok(()),
    }
}

fn bootstrap_check(data_dir: Option<PathBuf>, out: &mut dyn Write) -> CliResult<()> {
    let paths = ResourcePaths::resolve(data_dir)?;
    let status = paths.check_resource_structure();
    print(out, &format!("Resource directory: {}", status.root.display()))?;
    for (label, ok) in [
        ("Root", status.root_exists),
        ("Notes directory", status.notes_dir_exists),
        ("Logs directory", status.logs_dir_exists),
        ("Config file", status.config_file_exists),
        ("Notes metadata", status.metadata_file_exists),
    ] {
        print(out, &format!("  {label}: {}", if ok { "ok" } else { "missing" }))?;
    }
    if status.config_file_exists {
        match AppConfig::load(&paths.config_file) {
            Ok(config) => print(
                out,
                &format!(
                    "  Server: {}:{} (layout {:?})",
                    config.server.host, config.server.port, config.notes.content_layout
                ),
            )?,
            Err(err) => print(out, &format!("  Config error: {err}"))?,
        }
    }
    if !status.is_complete() {
        print(out, "Run `notepy bootstrap init` to create missing resources.")?;
    }
    Ok(())
}

fn show_note(out: &mut dyn Write, note: &Note, output: &JsonOutput) -> CliResult<()> {
    if let Some(path) = output.path.as_deref() {
        write_json(path, note, output.pretty)?;
        return print(out, &format!("Note exported to {}", path.display()));
    }
    print_summary(out, note)?;
    print(
        out,
        &format!("  Created: {}", note.created_at().format(DISPLAY_TIME_FORMAT)),
    )?;
    print(
        out,
        &format!("  Updated: {}", note.updated_at().format(DISPLAY_TIME_FORMAT)),
    )?;
    print(out, "  Content:")?;
    for line in note.content().lines() {
        print(out, &format!("    {line}"))?;
    }
    Ok(())
}

fn print_summary(out: &mut dyn Write, note: &Note) -> CliResult<()> {
    let tags = if note.tags().is_empty() {
        "None".to_string()
    } else {
        note.tags().join(", ")
    };
    print(out, &format!("  ID: {}", note.id()))?;
    print(out, &format!("  Title: {}", note.title()))?;
    print(out, &format!("  Tags: {tags}"))
}

fn confirm(input: &mut dyn BufRead, out: &mut dyn Write, prompt: &str) -> CliResult<bool> {
    write!(out, "{prompt} [y/N]: ").map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(CliError::Output)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> CliResult<()> {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, encoded).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn print(out: &mut dyn Write, line: &str) -> CliResult<()> {
    writeln!(out, "{line}").map_err(CliError::Output)
}

#[cfg(test)]
mod tests {
    use super::{confirm, write_json};
    use std::io::Cursor;

    #[test]
    fn confirm_accepts_only_yes_answers() {
        let mut sink = Vec::new();
        assert!(confirm(&mut Cursor::new("y\n"), &mut sink, "Delete?").unwrap());
        assert!(confirm(&mut Cursor::new("YES\n"), &mut sink, "Delete?").unwrap());
        assert!(!confirm(&mut Cursor::new("n\n"), &mut sink, "Delete?").unwrap());
        assert!(!confirm(&mut Cursor::new(""), &mut sink, "Delete?").unwrap());
        assert!(String::from_utf8(sink).unwrap().contains("[y/N]"));
    }

    #[test]
    fn write_json_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_json(&path, &vec!["a", "b"], true).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        assert_eq!(
            serde_json::from_str::<Vec<String>>(&written).unwrap(),
            vec!["a", "b"]
        );
    }
}
