use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;

fn repodesk_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_repodesk"))
}

fn repodesk(dir: &Path, args: &[&str]) -> Output {
    Command::new(repodesk_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("REPODESK_LOG")
        .output()
        .unwrap()
}

fn repodesk_with_stdin(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(repodesk_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("REPODESK_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn setup_workspace(dir: &Path) {
    std::fs::create_dir_all(dir.join("config")).unwrap();
    std::fs::write(dir.join("config/app.json"), "{\"debug\":true,\"port\":8080}").unwrap();
    std::fs::write(dir.join("config/notes.txt"), "remember the milk\n").unwrap();
    std::fs::write(dir.join("package.json"), "{\n  \"name\": \"demo\"\n}").unwrap();
}

#[test]
fn ls_lists_directories_before_children() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["ls"]);
    assert!(
        output.status.success(),
        "Expected exit 0, got {:?}\nstderr: {}",
        output.status.code(),
        stderr(&output)
    );
    let stdout = stdout(&output);
    let paths: Vec<&str> = stdout
        .lines()
        .map(|line| line.split_whitespace().last().unwrap())
        .collect();
    assert_eq!(
        paths,
        ["config/", "config/app.json", "config/notes.txt", "package.json"]
    );
}

#[test]
fn ls_json_editable_reports_entries() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["ls", "--json", "--editable"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = listing["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["path"], "config/app.json");
    assert_eq!(entries[0]["name"], "app.json");
    assert_eq!(entries[0]["type"], "file");
    assert_eq!(entries[0]["size"], 26);
    assert_eq!(entries[1]["path"], "package.json");
}

#[test]
fn ls_outside_workspace_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["ls", "../.."]);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("outside the workspace"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn cat_prints_exact_content() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["cat", "config/notes.txt"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "remember the milk\n");
}

#[test]
fn cat_rejects_traversal_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["cat", "../../etc/passwd"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("outside the workspace"));

    let output = repodesk(dir.path(), &["cat", "config"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is a directory"));
}

#[test]
fn write_stores_stdin_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let body = "{ \"not\": \"formatted\" ,\"x\":[1,2] }\n";
    let output = repodesk_with_stdin(dir.path(), &["write", "config/app.json"], body);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("config/app.json")).unwrap(),
        body
    );

    let entries: Vec<_> = std::fs::read_dir(dir.path().join("config"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 2, "no staging files left behind");
}

#[test]
fn write_require_json_refuses_invalid_content() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk_with_stdin(
        dir.path(),
        &["write", "--require-json", "package.json"],
        "{\"a\":1,}",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("trailing comma"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("package.json")).unwrap(),
        "{\n  \"name\": \"demo\"\n}"
    );
}

#[test]
fn check_valid_files_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["check"]);
    assert!(
        output.status.success(),
        "Expected exit 0, got {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        stdout(&output),
        stderr(&output),
    );
}

#[test]
fn check_invalid_file_renders_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());
    std::fs::write(dir.path().join("broken.json"), "{\n  \"a\": 1,\n}\n").unwrap();

    let output = repodesk(dir.path(), &["check", "broken.json", "package.json"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("J001"), "Expected J001 in output:\n{stdout}");
    assert!(
        stdout.contains("trailing comma"),
        "Expected 'trailing comma' in output:\n{stdout}"
    );
    assert!(stdout.contains("broken.json"));
    assert!(stderr(&output).contains("Found invalid JSON in 1 file of 2 files checked."));
}

#[test]
fn check_json_reports_positions() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());
    std::fs::write(dir.path().join("broken.json"), "{\"a\":1,}").unwrap();

    let output = repodesk(dir.path(), &["check", "--json", "broken.json"]);
    assert_eq!(output.status.code(), Some(1));
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        reports,
        serde_json::json!([{
            "path": "broken.json",
            "ok": false,
            "errorMessage": "trailing comma",
            "errorPosition": 6,
            "errorLine": 1,
            "errorColumn": 7
        }])
    );
}

#[test]
fn fmt_rewrites_files_in_place() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["fmt", "config/app.json", "package.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("config/app.json")).unwrap(),
        "{\n  \"debug\": true,\n  \"port\": 8080\n}"
    );
    assert!(stderr(&output).contains("1 file reformatted, 1 file left unchanged."));
}

#[test]
fn fmt_check_leaves_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());

    let output = repodesk(dir.path(), &["fmt", "--check"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("warning[J002]: would reformat"), "stdout: {stdout}");
    assert!(stdout.contains("config/app.json"));
    assert!(stdout.contains("run `repodesk fmt config/app.json`"));
    assert!(!stdout.contains("package.json"), "already formatted");
    assert!(stderr(&output).contains("1 file would be reformatted, 1 file already formatted."));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("config/app.json")).unwrap(),
        "{\"debug\":true,\"port\":8080}"
    );
}

#[test]
fn fmt_skips_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.json"), "[1 2]").unwrap();

    let output = repodesk(dir.path(), &["fmt", "bad.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("J001"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("bad.json")).unwrap(),
        "[1 2]"
    );
}

#[test]
fn check_reports_unreadable_file_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());
    std::fs::write(dir.path().join("latin1.json"), b"{\"caf\xe9\": 1}").unwrap();
    std::fs::write(dir.path().join("broken.json"), "[1,]").unwrap();

    let output = repodesk(dir.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("latin1.json"), "stderr: {stderr}");
    assert!(stderr.contains("Found invalid JSON in 1 file of 4 files checked."));
    assert!(stderr.contains("Could not read 1 file."));
    assert!(stdout(&output).contains("broken.json"));

    let output = repodesk(dir.path(), &["check", "--json", "latin1.json", "package.json"]);
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["path"], "latin1.json");
    assert_eq!(reports[0]["ok"], false);
    assert!(reports[0]["readError"].is_string());
    assert_eq!(reports[1]["ok"], true);
}

#[test]
fn fmt_skips_unreadable_file_and_formats_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    setup_workspace(dir.path());
    std::fs::write(dir.path().join("latin1.json"), b"{\"caf\xe9\": 1}").unwrap();

    let output = repodesk(dir.path(), &["fmt"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("config/app.json")).unwrap(),
        "{\n  \"debug\": true,\n  \"port\": 8080\n}"
    );
    assert!(stderr(&output).contains("Could not read 1 file."));
}

#[test]
fn root_flag_and_workspace_config() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path().join("repo");
    std::fs::create_dir_all(workspace.join(".github")).unwrap();
    std::fs::write(workspace.join(".github/settings.json"), "{}").unwrap();
    std::fs::write(workspace.join("visible.json"), "{}").unwrap();

    let output = repodesk(dir.path(), &["--root", "repo", "ls", "--editable"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains(".github/settings.json"));

    std::fs::write(workspace.join(".repodesk.toml"), "[walk]\nhidden = false\n").unwrap();
    let output = repodesk(dir.path(), &["--root", "repo", "ls"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!stdout(&output).contains(".github"));
    assert!(stdout(&output).contains("visible.json"));
}

#[test]
fn ignore_file_outside_root_does_not_hide_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".ignore"), "config.json\n").unwrap();
    let workspace = dir.path().join("repo");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("config.json"), "{}").unwrap();
    std::fs::write(workspace.join("other.json"), "{}").unwrap();

    let output = repodesk(&workspace, &["ls"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("config.json"), "stdout: {stdout}");
    assert!(stdout.contains("other.json"));
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = repodesk(dir.path(), &["--root", "nope", "ls"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("workspace root"));
}
