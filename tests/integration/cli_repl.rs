#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn setup(name: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let db_path = dir.path().join(format!("{name}.db"));
    // Points at a file that does not exist so no user config leaks in.
    let config_path = dir.path().join("config.toml");
    (dir, db_path, config_path)
}

fn run_script(db_path: &Path, config_path: &Path, script: &str) -> String {
    let output = cargo_bin_cmd!("rowbase")
        .arg(db_path)
        .arg("--config")
        .arg(config_path)
        .write_stdin(script)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf8 stdout")
}

fn responses(stdout: &str) -> Vec<&str> {
    stdout
        .split("db > ")
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

#[test]
fn inserts_and_retrieves_a_row() {
    let (_dir, db, config) = setup("basic");
    let out = run_script(
        &db,
        &config,
        "insert 1 user1 person1@example.com\nselect\n.exit\n",
    );
    assert_eq!(
        responses(&out),
        vec!["Executed.\n", "(1, user1, person1@example.com)\nExecuted.\n"]
    );
}

#[test]
fn keeps_data_after_closing_connection() {
    let (_dir, db, config) = setup("persist");
    run_script(&db, &config, "insert 1 user1 person1@example.com\n.exit\n");
    let out = run_script(&db, &config, "select\n.exit\n");
    assert_eq!(
        responses(&out),
        vec!["(1, user1, person1@example.com)\nExecuted.\n"]
    );
}

#[test]
fn prints_error_messages() {
    let (_dir, db, config) = setup("errors");
    let long_name = "a".repeat(33);
    let script = format!(
        "insert -1 cstack foo@bar.com\ninsert 1 {long_name} a@b\ninsert 1 x\nupdate\n.tables\ninsert 1 a a@b\ninsert 1 a a@b\n.exit\n"
    );
    let out = run_script(&db, &config, &script);
    assert_eq!(
        responses(&out),
        vec![
            "ID must be positive.\n",
            "String is too long.\n",
            "Syntax error. Could not parse statement.\n",
            "Unrecognized keyword at start of 'update'.\n",
            "Unrecognized command '.tables'\n",
            "Executed.\n",
            "Error: Duplicate key.\n",
        ]
    );
}

#[test]
fn prints_constants() {
    let (_dir, db, config) = setup("constants");
    let out = run_script(&db, &config, ".constants\n.exit\n");
    assert_eq!(
        responses(&out),
        vec![
            "Constants:\nROW_SIZE: 293\nCOMMON_NODE_HEADER_SIZE: 6\nLEAF_NODE_HEADER_SIZE: 14\nLEAF_NODE_CELL_SIZE: 297\nLEAF_NODE_SPACE_FOR_CELLS: 4082\nLEAF_NODE_MAX_CELLS: 13\n"
        ]
    );
}

#[test]
fn prints_structure_of_a_split_tree() {
    let (_dir, db, config) = setup("btree");
    let mut script = String::new();
    for id in 1..=14 {
        script.push_str(&format!("insert {id} user{id} person{id}@example.com\n"));
    }
    script.push_str(".btree\ninsert 15 user15 person15@example.com\n.exit\n");
    let out = run_script(&db, &config, &script);
    let chunks = responses(&out);
    assert_eq!(chunks.len(), 16);
    let mut expected = String::from("Tree:\n- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("    - {id}\n"));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("    - {id}\n"));
    }
    assert_eq!(chunks[14], expected);
    assert_eq!(chunks[15], "Executed.\n");
}

#[test]
fn end_of_input_exits_cleanly() {
    let (_dir, db, config) = setup("eof");
    run_script(&db, &config, "insert 3 c c@d\n");
    let out = run_script(&db, &config, "select\n");
    assert!(out.contains("(3, c, c@d)\nExecuted.\n"));
}

#[test]
fn json_format_applies_to_reports() {
    let (_dir, db, config) = setup("json");
    let out = cargo_bin_cmd!("rowbase")
        .arg(&db)
        .args(["--format", "json", "--max-pages", "50"])
        .arg("--config")
        .arg(&config)
        .write_stdin(".verify\n.exit\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).expect("utf8 stdout");
    let body = responses(&out)[0];
    let report: Value = serde_json::from_str(body).expect("verify json");
    assert_eq!(report["success"], true);
    assert_eq!(report["counts"]["leaves"], 1);
}

#[test]
fn config_file_supplies_database_and_capacity() {
    let (_dir, db, config) = setup("configured");
    std::fs::write(
        &config,
        format!(
            "[database]\ndefault = {:?}\n\n[pager]\nmax_pages = 2\n",
            db.display().to_string()
        ),
    )
    .expect("write config");
    let mut script = String::new();
    for id in 1..=14 {
        script.push_str(&format!("insert {id} u{id} e{id}\n"));
    }
    let stderr = cargo_bin_cmd!("rowbase")
        .arg("--config")
        .arg(&config)
        .write_stdin(script)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(stderr).expect("utf8 stderr");
    assert!(
        stderr.contains("error: tried to fetch page number out of bounds: 2 >= 2"),
        "{stderr}"
    );
    // The failed session never flushed.
    assert_eq!(std::fs::metadata(&db).expect("db exists").len(), 0);
}

#[test]
fn missing_database_argument_fails() {
    let (_dir, _db, config) = setup("nodb");
    let stderr = cargo_bin_cmd!("rowbase")
        .arg("--config")
        .arg(&config)
        .write_stdin(".exit\n")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(stderr).expect("utf8 stderr");
    assert!(stderr.contains("error: Must supply a database filename."), "{stderr}");
}
