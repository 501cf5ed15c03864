//! Resource locations and application configuration.
//!
//! # Responsibility
//! - Resolve the data root and derive every resource path from it.
//! - Load/save `config.toml`, falling back to defaults for absent keys.
//!
//! # Invariants
//! - Paths are carried by an explicitly constructed `ResourcePaths` value;
//!   nothing in core reads a process-wide location on its own.
//! - A missing config file is created with defaults on first load.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── config.toml
//! ├── notes/
//! │   ├── notes.json     # metadata keyed by note id
//! │   └── <note_id>.md   # body, when content_layout = "files"
//! └── logs/
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Directory name used under the platform data dir.
pub const APP_DIR_NAME: &str = "notepy-online";
/// Environment variable overriding the data root.
pub const HOME_ENV_VAR: &str = "NOTEPY_HOME";

const CONFIG_FILE_NAME: &str = "config.toml";
const NOTES_DIR_NAME: &str = "notes";
const LOGS_DIR_NAME: &str = "logs";
const METADATA_FILE_NAME: &str = "notes.json";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Encode(toml::ser::Error),
    /// No explicit root, no env override and no platform data dir.
    NoDataDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "config io error at `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode configuration: {err}"),
            Self::NoDataDir => write!(
                f,
                "cannot determine data directory; pass --data-dir or set {HOME_ENV_VAR}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::NoDataDir => None,
        }
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Encode(value)
    }
}

/// All on-disk locations derived from one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub notes_dir: PathBuf,
    pub logs_dir: PathBuf,
}

/// Existence report produced by [`ResourcePaths::check_resource_structure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub root: PathBuf,
    pub root_exists: bool,
    pub notes_dir_exists: bool,
    pub logs_dir_exists: bool,
    pub config_file_exists: bool,
    pub metadata_file_exists: bool,
}

impl ResourceStatus {
    /// Returns whether every directory and the config file exist.
    pub fn is_complete(&self) -> bool {
        self.root_exists && self.notes_dir_exists && self.logs_dir_exists && self.config_file_exists
    }
}

impl ResourcePaths {
    /// Derives every resource path from `root`.
    ///
    /// A relative root is anchored at the current directory; log setup only
    /// accepts absolute directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            config_file: root.join(CONFIG_FILE_NAME),
            notes_dir: root.join(NOTES_DIR_NAME),
            logs_dir: root.join(LOGS_DIR_NAME),
            root,
        }
    }

    /// Resolves the root from `explicit`, then `NOTEPY_HOME`, then the
    /// platform data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> ConfigResult<Self> {
        Self::resolve_with(explicit, std::env::var_os(HOME_ENV_VAR), dirs::data_dir())
    }

    /// Resolution with every input supplied by the caller.
    pub fn resolve_with(
        explicit: Option<PathBuf>,
        env_root: Option<OsString>,
        platform_data_dir: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }
        if let Some(root) = env_root.filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(root)));
        }
        platform_data_dir
            .map(|base| Self::new(base.join(APP_DIR_NAME)))
            .ok_or(ConfigError::NoDataDir)
    }

    /// Aggregate metadata file inside the notes directory.
    pub fn metadata_file(&self) -> PathBuf {
        self.notes_dir.join(METADATA_FILE_NAME)
    }

    /// Creates root, notes and logs directories (idempotent).
    pub fn create_resource_structure(&self) -> ConfigResult<()> {
        for dir in [&self.root, &self.notes_dir, &self.logs_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn check_resource_structure(&self) -> ResourceStatus {
        ResourceStatus {
            root: self.root.clone(),
            root_exists: self.root.is_dir(),
            notes_dir_exists: self.notes_dir.is_dir(),
            logs_dir_exists: self.logs_dir.is_dir(),
            config_file_exists: self.config_file.is_file(),
            metadata_file_exists: self.metadata_file().is_file(),
        }
    }
}

/// Where note bodies are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLayout {
    /// One `<note_id>.md` file per note; metadata omits `content`.
    #[default]
    Files,
    /// Bodies are stored inline in the metadata file.
    Embedded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8443,
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub content_layout: ContentLayout,
    /// Enforced by adapters when accepting user input.
    pub max_title_length: usize,
    pub max_content_length: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            content_layout: ContentLayout::Files,
            max_title_length: 200,
            max_content_length: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    pub max_file_size: u64,
    pub backup_count: usize,
    /// Duplicate warnings and errors to stderr.
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            max_file_size: 10 * 1024 * 1024,
            backup_count: 5,
            log_to_console: true,
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub notes: NotesConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads and parses a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `paths.config_file`, writing defaults first when it is absent.
    pub fn load_or_init(paths: &ResourcePaths) -> ConfigResult<Self> {
        if paths.config_file.is_file() {
            return Self::load(&paths.config_file);
        }
        let config = Self::default();
        config.save(&paths.config_file)?;
        log::info!(
            "event=config_init module=config status=ok path={}",
            paths.config_file.display()
        );
        Ok(config)
    }

    /// Writes this configuration as TOML, creating the parent directory.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let encoded = toml::to_string_pretty(self)?;
        std::fs::write(path, encoded).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ContentLayout, ResourcePaths, APP_DIR_NAME};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn relative_root_becomes_absolute() {
        let paths = ResourcePaths::new("relative-notepy-root");
        assert!(paths.root.is_absolute());
        assert!(paths.logs_dir.is_absolute());
        assert!(paths.root.ends_with("relative-notepy-root"));
        assert_eq!(
            paths.root,
            std::env::current_dir().unwrap().join("relative-notepy-root")
        );
    }

    #[test]
    fn resolve_prefers_explicit_then_env_then_platform() {
        let explicit = ResourcePaths::resolve_with(
            Some(PathBuf::from("/explicit")),
            Some(OsString::from("/env")),
            Some(PathBuf::from("/data")),
        )
        .expect("explicit root resolves");
        assert_eq!(explicit.root, PathBuf::from("/explicit"));

        let env = ResourcePaths::resolve_with(
            None,
            Some(OsString::from("/env")),
            Some(PathBuf::from("/data")),
        )
        .expect("env root resolves");
        assert_eq!(env.root, PathBuf::from("/env"));

        let platform =
            ResourcePaths::resolve_with(None, Some(OsString::new()), Some(PathBuf::from("/data")))
                .expect("platform root resolves");
        assert_eq!(platform.root, PathBuf::from("/data").join(APP_DIR_NAME));
    }

    #[test]
    fn resolve_without_any_source_fails() {
        let err = ResourcePaths::resolve_with(None, None, None).expect_err("nothing to resolve");
        assert!(matches!(err, ConfigError::NoDataDir));
    }

    #[test]
    fn derived_paths_live_under_root() {
        let paths = ResourcePaths::new("/base");
        assert_eq!(paths.config_file, PathBuf::from("/base/config.toml"));
        assert_eq!(paths.metadata_file(), PathBuf::from("/base/notes/notes.json"));
        assert_eq!(paths.logs_dir, PathBuf::from("/base/logs"));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            "[server]\nport = 9000\n\n[notes]\ncontent_layout = \"embedded\"\n",
        )
        .expect("partial config parses");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.notes.content_layout, ContentLayout::Embedded);
        assert_eq!(config.logging.level, "info");
    }
}
