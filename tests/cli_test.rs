//! Integration tests for the html2plain CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_html2plain"))
}

#[test]
fn test_basic_stdin() {
    cli()
        .write_stdin("<ul><li>A</li><li>B</li></ul>")
        .assert()
        .success()
        .stdout("\n  * A\n  * B\n");
}

#[test]
fn test_link_footnotes() {
    cli()
        .write_stdin("<a href=\"http://x.com\">text</a>")
        .assert()
        .success()
        .stdout("text[1]\n\n[1]: http://x.com\n");
}

#[test]
fn test_file_input() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("input.html");
    fs::write(&input_path, "<p>Test content</p>").unwrap();

    cli()
        .arg(input_path.to_str().unwrap())
        .assert()
        .success()
        .stdout("\nTest content\n");
}

#[test]
fn test_dash_reads_stdin() {
    cli()
        .arg("-")
        .write_stdin("Dash test")
        .assert()
        .success()
        .stdout("Dash test\n");
}

#[test]
fn test_file_output() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("output.txt");

    cli()
        .arg("-o")
        .arg(output_path.to_str().unwrap())
        .write_stdin("Output<br>test")
        .assert()
        .success()
        .stdout("");

    let output = fs::read_to_string(&output_path).unwrap();
    assert_eq!(output, "Output\ntest\n");
}

#[test]
fn test_empty_input_prints_nothing() {
    cli().write_stdin("").assert().success().stdout("");
}

#[test]
fn test_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("options.json");
    fs::write(&config_path, r#"{"stroke_text": "====\n"}"#).unwrap();

    cli()
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .write_stdin("<tr><td>cell</td></tr>")
        .assert()
        .success()
        .stdout("====\ncell\n====\n");
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("options.json");
    fs::write(&config_path, r#"{"unknown": true}"#).unwrap();

    cli()
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .write_stdin("<p>x</p>")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_content_type_charset() {
    cli()
        .arg("--content-type")
        .arg("text/html; charset=ISO-8859-1")
        .write_stdin(&b"<p>Caf\xE9</p>"[..])
        .assert()
        .success()
        .stdout("\nCaf\u{e9}\n");
}

#[test]
fn test_invalid_utf8_fails() {
    cli()
        .write_stdin(&b"<p>\xFF\xFE</p>"[..])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn test_missing_input_file_fails() {
    cli()
        .arg("/nonexistent/input.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
