use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary isolated from the developer's key, .env and config files
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tubescribe").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GOOGLE_API_KEY")
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn missing_credential_exits_before_any_work() {
    let dir = tempfile::tempdir().unwrap();

    isolated(&dir)
        .arg("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GOOGLE_API_KEY"))
        .stdout(predicate::str::contains("Step 1").not());

    // Nothing was downloaded or written
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn credential_is_read_from_dotenv_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "GOOGLE_API_KEY=from-dotenv\n").unwrap();

    // Gets past the credential check and stops at the empty URL prompt
    isolated(&dir)
        .write_stdin("\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Enter YouTube URL"))
        .stderr(predicate::str::contains("No URL provided"));
}

#[test]
fn empty_url_prompt_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    isolated(&dir)
        .env("GOOGLE_API_KEY", "dummy")
        .write_stdin("   \n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No URL provided"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "app: [unclosed\n").unwrap();

    isolated(&dir)
        .env("GOOGLE_API_KEY", "dummy")
        .arg("https://youtu.be/abc")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn help_lists_the_url_argument() {
    let dir = tempfile::tempdir().unwrap();

    isolated(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[URL]"));
}
