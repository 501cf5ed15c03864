use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn notepy(data_dir: &Path, args: &[&str]) -> Output {
    notepy_with_input(data_dir, args, "")
}

fn notepy_with_input(data_dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_notepy"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("NOTEPY_HOME")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn notepy");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("notepy output")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn created_id(output: &Output) -> String {
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    stdout(output)
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID: ").map(str::to_string))
        .expect("created note id")
}

#[test]
fn bootstrap_init_then_check_reports_complete_structure() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("home");

    let check = notepy(&root, &["bootstrap", "check"]);
    assert!(check.status.success());
    assert!(stdout(&check).contains("missing"));
    assert!(!root.exists());

    let init = notepy(&root, &["bootstrap", "init"]);
    assert!(init.status.success());
    assert!(root.join("config.toml").is_file());
    assert!(root.join("notes").is_dir());

    let check = notepy(&root, &["bootstrap", "check"]);
    assert!(stdout(&check).contains("Config file: ok"));
}

#[test]
fn create_list_show_and_edit_flow() {
    let dir = tempfile::tempdir().unwrap();
    let id = created_id(&notepy(
        dir.path(),
        &["notes", "create", "-t", "Plan", "-c", "ship it", "-g", "work"],
    ));

    let list = notepy(dir.path(), &["notes", "list", "-g", "work"]);
    assert!(stdout(&list).contains("Found 1 note(s)"));
    assert!(stdout(&list).contains("Preview: ship it"));

    let edit = notepy(dir.path(), &["notes", "edit", &id, "-t", "Plan v2"]);
    assert!(edit.status.success());

    let show = notepy(dir.path(), &["notes", "show", &id]);
    let text = stdout(&show);
    assert!(text.contains("Title: Plan v2"));
    assert!(text.contains("Tags: work"));
    assert!(text.contains("ship it"));
}

#[test]
fn list_and_show_write_json_files() {
    let dir = tempfile::tempdir().unwrap();
    let id = created_id(&notepy(dir.path(), &["notes", "create", "-t", "Json"]));
    let out_dir = tempfile::tempdir().unwrap();
    let list_file = out_dir.path().join("nested/list.json");
    let show_file = out_dir.path().join("one.json");

    let list = notepy(
        dir.path(),
        &["notes", "list", "-o", list_file.to_str().unwrap(), "-p"],
    );
    assert!(list.status.success());
    let listed: Value = serde_json::from_str(&std::fs::read_to_string(&list_file).unwrap()).unwrap();
    assert_eq!(listed[0]["note_id"], id.as_str());

    let show = notepy(
        dir.path(),
        &["notes", "show", &id, "-o", show_file.to_str().unwrap()],
    );
    assert!(show.status.success());
    let shown: Value = serde_json::from_str(&std::fs::read_to_string(&show_file).unwrap()).unwrap();
    assert_eq!(shown["title"], "Json");
}

#[test]
fn delete_asks_for_confirmation_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let id = created_id(&notepy(dir.path(), &["notes", "create", "-t", "Doomed"]));

    let declined = notepy_with_input(dir.path(), &["notes", "delete", &id], "n\n");
    assert!(declined.status.success());
    assert!(stdout(&declined).contains("Deletion cancelled."));
    assert!(notepy(dir.path(), &["notes", "show", &id]).status.success());

    let forced = notepy(dir.path(), &["notes", "delete", &id, "-f"]);
    assert!(forced.status.success());
    assert!(!notepy(dir.path(), &["notes", "show", &id]).status.success());
}

#[test]
fn tags_commands_add_remove_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let id = created_id(&notepy(dir.path(), &["notes", "create", "-t", "T", "-g", "b"]));

    assert!(notepy(dir.path(), &["tags", "add", &id, "a"]).status.success());
    let listed = stdout(&notepy(dir.path(), &["tags", "list"]));
    assert!(listed.contains("Found 2 tag(s)"));
    assert!(listed.find("- a").unwrap() < listed.find("- b").unwrap());

    assert!(notepy(dir.path(), &["tags", "remove", &id, "b"]).status.success());
    let listed = stdout(&notepy(dir.path(), &["tags", "list"]));
    assert!(!listed.contains("- b"));

    let missing = notepy(dir.path(), &["tags", "add", "nope", "x"]);
    assert_eq!(missing.status.code(), Some(1));
}

#[test]
fn search_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    created_id(&notepy(dir.path(), &["notes", "create", "-t", "Alpha", "-c", "Rust notes"]));
    created_id(&notepy(dir.path(), &["notes", "create", "-t", "Beta", "-c", "other"]));

    let found = stdout(&notepy(dir.path(), &["notes", "search", "RUST"]));
    assert!(found.contains("Found 1 note(s) matching 'RUST'"));
    assert!(found.contains("Title: Alpha"));

    let none = stdout(&notepy(dir.path(), &["notes", "search", "gamma"]));
    assert!(none.contains("No notes found matching 'gamma'."));
}

#[test]
fn export_then_import_into_a_fresh_directory() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let id = created_id(&notepy(source.path(), &["notes", "create", "-t", "Moved", "-c", "body"]));
    let backup = source.path().join("backup.json");

    assert!(notepy(source.path(), &["notes", "export", backup.to_str().unwrap()]).status.success());
    let import = notepy(target.path(), &["notes", "import", backup.to_str().unwrap()]);
    assert!(import.status.success());
    assert!(stdout(&import).contains("Imported 1 note(s)"));

    let show = stdout(&notepy(target.path(), &["notes", "show", &id]));
    assert!(show.contains("Title: Moved"));
}

#[test]
fn usage_errors_and_failures_exit_with_status_one() {
    let dir = tempfile::tempdir().unwrap();

    let unknown = notepy(dir.path(), &["frobnicate"]);
    assert_eq!(unknown.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&unknown.stderr).starts_with("error: unknown command"));

    let blank = notepy(dir.path(), &["notes", "create", "-t", "   "]);
    assert_eq!(blank.status.code(), Some(1));

    let missing_file = notepy(dir.path(), &["notes", "import", "/definitely/missing.json"]);
    assert_eq!(missing_file.status.code(), Some(1));

    let version = notepy(dir.path(), &["version"]);
    assert!(stdout(&version).starts_with("notepy "));
}

#[test]
fn relative_data_dir_is_anchored_at_working_directory() {
    let cwd = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_notepy"))
        .current_dir(cwd.path())
        .args(["--data-dir", "rel", "notes", "create", "-t", "Hi"])
        .env_remove("NOTEPY_HOME")
        .stdin(Stdio::null())
        .output()
        .expect("notepy output");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("logging disabled"), "{stderr}");
    assert!(cwd.path().join("rel/notes/notes.json").is_file());
    assert!(cwd.path().join("rel/logs").is_dir());
}
