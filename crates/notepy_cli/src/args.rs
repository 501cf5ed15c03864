//! Command-line grammar.
//!
//! # Invariants
//! - Parsing is pure: no filesystem or environment access.
//! - Every token is consumed; leftovers are reported as errors.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: notepy [--data-dir DIR] <command>

commands:
  bootstrap init | check
  notes create -t TITLE [-c CONTENT] [-g TAG]...
  notes list [-g TAG]... [-s QUERY] [-o FILE] [-p]
  notes show ID [-o FILE] [-p]
  notes edit ID [-t TITLE] [-c CONTENT] [-g TAG]...
  notes delete ID [-f]
  notes search QUERY [-o FILE] [-p]
  notes export FILE
  notes import FILE
  tags list | add ID TAG | remove ID TAG
  serve [--host HOST] [--port PORT]
  version
";

/// Where JSON output goes when `-o` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonOutput {
    pub path: Option<PathBuf>,
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    BootstrapInit,
    BootstrapCheck,
    NotesCreate {
        title: String,
        content: Option<String>,
        tags: Vec<String>,
    },
    NotesList {
        tags: Vec<String>,
        search: Option<String>,
        output: JsonOutput,
    },
    NotesShow {
        id: String,
        output: JsonOutput,
    },
    NotesEdit {
        id: String,
        title: Option<String>,
        content: Option<String>,
        /// `None` keeps the current tags; any `-g` replaces them.
        tags: Option<Vec<String>>,
    },
    NotesDelete {
        id: String,
        force: bool,
    },
    NotesSearch {
        query: String,
        output: JsonOutput,
    },
    NotesExport {
        file: PathBuf,
    },
    NotesImport {
        file: PathBuf,
    },
    TagsList,
    TagsAdd {
        id: String,
        tag: String,
    },
    TagsRemove {
        id: String,
        tag: String,
    },
    Serve {
        host: Option<String>,
        port: Option<u16>,
    },
    Version,
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub data_dir: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    UnknownCommand(String),
    MissingCommand(&'static str),
    MissingArgument(&'static str),
    MissingValue(String),
    InvalidValue { flag: String, value: String },
    Unexpected(String),
}

impl Display for ArgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "unknown command `{name}`"),
            Self::MissingCommand(group) => write!(f, "`{group}` requires a subcommand"),
            Self::MissingArgument(name) => write!(f, "missing required argument {name}"),
            Self::MissingValue(flag) => write!(f, "option `{flag}` requires a value"),
            Self::InvalidValue { flag, value } => {
                write!(f, "invalid value `{value}` for `{flag}`")
            }
            Self::Unexpected(token) => write!(f, "unexpected argument `{token}`"),
        }
    }
}

impl std::error::Error for ArgError {}

struct Tokens {
    inner: std::iter::Peekable<std::vec::IntoIter<String>>,
}

impl Tokens {
    fn new(args: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner: args.into_iter().collect::<Vec<_>>().into_iter().peekable(),
        }
    }

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn peek(&mut self) -> Option<&str> {
        self.inner.peek().map(String::as_str)
    }

    fn value(&mut self, flag: &str) -> Result<String, ArgError> {
        self.next()
            .ok_or_else(|| ArgError::MissingValue(flag.to_string()))
    }

    fn positional(&mut self, name: &'static str) -> Result<String, ArgError> {
        match self.next() {
            Some(token) if !is_flag(&token) => Ok(token),
            Some(token) => Err(ArgError::Unexpected(token)),
            None => Err(ArgError::MissingArgument(name)),
        }
    }

    fn subcommand(&mut self, group: &'static str) -> Result<String, ArgError> {
        self.next().ok_or(ArgError::MissingCommand(group))
    }

    fn finish(mut self) -> Result<(), ArgError> {
        match self.next() {
            Some(token) => Err(ArgError::Unexpected(token)),
            None => Ok(()),
        }
    }
}

fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// Parses arguments without the program name.
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Invocation, ArgError> {
    let mut tokens = Tokens::new(args);
    let mut data_dir = None;
    while tokens.peek() == Some("--data-dir") {
        let flag = tokens.next().unwrap_or_default();
        data_dir = Some(PathBuf::from(tokens.value(&flag)?));
    }

    let Some(group) = tokens.next() else {
        return Ok(Invocation {
            data_dir,
            command: Command::Help,
        });
    };
    let command = match group.as_str() {
        "bootstrap" => parse_bootstrap(&mut tokens)?,
        "notes" => parse_notes(&mut tokens)?,
        "tags" => parse_tags(&mut tokens)?,
        "serve" => parse_serve(&mut tokens)?,
        "version" | "--version" | "-V" => Command::Version,
        "help" | "--help" | "-h" => Command::Help,
        _ => return Err(ArgError::UnknownCommand(group)),
    };
    tokens.finish()?;
    Ok(Invocation { data_dir, command })
}

fn parse_bootstrap(tokens: &mut Tokens) -> Result<Command, ArgError> {
    let sub = tokens.subcommand("bootstrap")?;
    match sub.as_str() {
        "init" => Ok(Command::BootstrapInit),
        "check" => Ok(Command::BootstrapCheck),
        _ => Err(ArgError::UnknownCommand(format!("bootstrap {sub}"))),
    }
}

fn parse_notes(tokens: &mut Tokens) -> Result<Command, ArgError> {
    let sub = tokens.subcommand("notes")?;
    match sub.as_str() {
        "create" => {
            let mut title = None;
            let mut content = None;
            let mut tags = Vec::new();
            while let Some(token) = tokens.next() {
                match token.as_str() {
                    "-t" | "--title" => title = Some(tokens.value(&token)?),
                    "-c" | "--content" => content = Some(tokens.value(&token)?),
                    "-g" | "--tags" => tags.push(tokens.value(&token)?),
                    _ => return Err(ArgError::Unexpected(token)),
                }
            }
            Ok(Command::NotesCreate {
                title: title.ok_or(ArgError::MissingArgument("--title"))?,
                content,
                tags,
            })
        }
        "list" => {
            let mut tags = Vec::new();
            let mut search = None;
            let mut output = JsonOutput::default();
            while let Some(token) = tokens.next() {
                match token.as_str() {
                    "-g" | "--tags" => tags.push(tokens.value(&token)?),
                    "-s" | "--search" => search = Some(tokens.value(&token)?),
                    _ => parse_output_flag(tokens, token, &mut output)?,
                }
            }
            Ok(Command::NotesList {
                tags,
                search,
                output,
            })
        }
        "show" => {
            let id = tokens.positional("ID")?;
            let mut output = JsonOutput::default();
            while let Some(token) = tokens.next() {
                parse_output_flag(tokens, token, &mut output)?;
            }
            Ok(Command::NotesShow { id, output })
        }
        "edit" => {
            let id = tokens.positional("ID")?;
            let mut title = None;
            let mut content = None;
            let mut tags: Option<Vec<String>> = None;
            while let Some(token) = tokens.next() {
                match token.as_str() {
                    "-t" | "--title" => title = Some(tokens.value(&token)?),
                    "-c" | "--content" => content = Some(tokens.value(&token)?),
                    "-g" | "--tags" => tags.get_or_insert_with(Vec::new).push(tokens.value(&token)?),
                    _ => return Err(ArgError::Unexpected(token)),
                }
            }
            Ok(Command::NotesEdit {
                id,
                title,
                content,
                tags,
            })
        }
        "delete" => {
            let id = tokens.positional("ID")?;
            let mut force = false;
            while let Some(token) = tokens.next() {
                match token.as_str() {
                    "-f" | "--force" => force = true,
                    _ => return Err(ArgError::Unexpected(token)),
                }
            }
            Ok(Command::NotesDelete { id, force })
        }
        "search" => {
            let query = tokens.positional("QUERY")?;
            let mut output = JsonOutput::default();
            while let Some(token) = tokens.next() {
                parse_output_flag(tokens, token, &mut output)?;
            }
            Ok(Command::NotesSearch { query, output })
        }
        "export" => Ok(Command::NotesExport {
            file: PathBuf::from(tokens.positional("FILE")?),
        }),
        "import" => Ok(Command::NotesImport {
            file: PathBuf::from(tokens.positional("FILE")?),
        }),
        _ => Err(ArgError::UnknownCommand(format!("notes {sub}"))),
    }
}

fn parse_output_flag(
    tokens: &mut Tokens,
    token: String,
    output: &mut JsonOutput,
) -> Result<(), ArgError> {
    match token.as_str() {
        "-o" | "--output" => output.path = Some(PathBuf::from(tokens.value(&token)?)),
        "-p" | "--pretty" => output.pretty = true,
        _ => return Err(ArgError::Unexpected(token)),
    }
    Ok(())
}

fn parse_tags(tokens: &mut Tokens) -> Result<Command, ArgError> {
    let sub = tokens.subcommand("tags")?;
    match sub.as_str() {
        "list" => Ok(Command::TagsList),
        "add" => Ok(Command::TagsAdd {
            id: tokens.positional("ID")?,
            tag: tokens.positional("TAG")?,
        }),
        "remove" => Ok(Command::TagsRemove {
            id: tokens.positional("ID")?,
            tag: tokens.positional("TAG")?,
        }),
        _ => Err(ArgError::UnknownCommand(format!("tags {sub}"))),
    }
}

fn parse_serve(tokens: &mut Tokens) -> Result<Command, ArgError> {
    let mut host = None;
    let mut port = None;
    while let Some(token) = tokens.next() {
        match token.as_str() {
            "--host" => host = Some(tokens.value(&token)?),
            "--port" => {
                let value = tokens.value(&token)?;
                let parsed = value.parse::<u16>().map_err(|_| ArgError::InvalidValue {
                    flag: token.clone(),
                    value: value.clone(),
                })?;
                port = Some(parsed);
            }
            _ => return Err(ArgError::Unexpected(token)),
        }
    }
    Ok(Command::Serve { host, port })
}
