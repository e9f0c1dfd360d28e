// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use value_set::driver::{self, DriverError, Program};
use value_set::errors::AnalysisError;
use value_set::options::Options;
use walkdir::WalkDir;

// Replay every program in the tests/run-pass directory and check its expectations.
#[test]
fn run_pass() {
    let mut run_pass_path = PathBuf::from_str("tests/run-pass").unwrap();
    if !run_pass_path.exists() {
        run_pass_path = PathBuf::from_str("checker/tests/run-pass").unwrap();
    }
    assert_eq!(run_directory(run_pass_path), 0);
}

// Runs all the programs in the directory and returns the number of failures.
fn run_directory(directory_path: PathBuf) -> usize {
    let options = Options {
        check: true,
        quiet: true,
        ..Options::default()
    };
    let mut files = Vec::new();
    for entry in WalkDir::new(directory_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |e| e == "json")
        {
            files.push(entry.into_path());
        }
    }
    assert!(!files.is_empty());
    files
        .iter()
        .filter(|path| !replay(path, &options))
        .count()
}

// Returns true if the program ran and met its expectations.
fn replay(path: &Path, options: &Options) -> bool {
    let result = driver::load_program(path).and_then(|program| {
        let value_set = driver::run_program(&program, options)?;
        driver::check_expectations(&value_set, &program)
    });
    match result {
        Ok(()) => true,
        Err(e) => {
            println!("{} failed: {}", path.display(), e);
            false
        }
    }
}

fn program(json: &str) -> Program {
    serde_json::from_str(json).unwrap()
}

const UNSUPPORTED_TARGET: &str = r#"{
  "statements": [
    { "Assign": {
        "lhs": { "kind": { "ConstantInt": { "value": 1 } }, "ty": { "Integer": { "width": 32, "signed": true } } },
        "rhs": { "kind": { "ConstantInt": { "value": 2 } }, "ty": { "Integer": { "width": 32, "signed": true } } } } },
    { "Assign": {
        "lhs": { "kind": { "Symbol": { "name": "p" } }, "ty": { "Pointer": "Bool" } },
        "rhs": { "kind": { "AddressOf": { "object": { "kind": { "Symbol": { "name": "b" } }, "ty": "Bool" } } },
                 "ty": { "Pointer": "Bool" } } } }
  ],
  "expectations": [
    { "expression": { "kind": { "Symbol": { "name": "p" } }, "ty": { "Pointer": "Bool" } },
      "objects": ["<b, 0, bool>"] }
  ]
}"#;

#[test]
fn recoverable_errors_are_skipped() {
    let program = program(UNSUPPORTED_TARGET);
    let value_set = driver::run_program(&program, &Options::default()).unwrap();
    driver::check_expectations(&value_set, &program).unwrap();
}

#[test]
fn strict_replay_stops_at_recoverable_errors() {
    let program = program(UNSUPPORTED_TARGET);
    let options = Options {
        strict: true,
        ..Options::default()
    };
    match driver::run_program(&program, &options) {
        Err(DriverError::Analysis { location, source }) => {
            assert_eq!(location, 0);
            assert_eq!(
                source,
                AnalysisError::UnsupportedAssignmentTarget {
                    kind: "constant_int"
                }
            );
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn fatal_errors_stop_the_replay() {
    let program = program(
        r#"{ "statements": [ { "FunctionCall": { "lhs": null, "function": "g", "arguments": [] } } ] }"#,
    );
    match driver::run_program(&program, &Options::default()) {
        Err(DriverError::Analysis { source, .. }) => assert!(source.is_fatal()),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn mismatched_expectations_are_reported() {
    let program = program(
        r#"{
  "statements": [],
  "expectations": [
    { "expression": { "kind": { "Symbol": { "name": "p" } }, "ty": { "Pointer": "Bool" } },
      "objects": ["<b, 0, bool>"] }
  ]
}"#,
    );
    let value_set = driver::run_program(&program, &Options::default()).unwrap();
    match driver::check_expectations(&value_set, &program) {
        Err(DriverError::ExpectationMismatch { actual, .. }) => {
            assert_eq!(actual, vec!["unknown".to_string()])
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn missing_program_file() {
    let result = driver::load_program(Path::new("tests/run-pass/no-such-program.json"));
    assert!(matches!(result, Err(DriverError::Io(..))));
}

#[test]
fn options_accumulate() {
    let mut options = Options::default();
    options.parse_from_str("--check 'my program.json'").unwrap();
    assert!(options.check);
    assert!(!options.strict);
    assert_eq!(options.program, Some(PathBuf::from("my program.json")));
    options
        .parse(&["--strict".to_string(), "-q".to_string()])
        .unwrap();
    assert!(options.check);
    assert!(options.strict);
    assert!(options.quiet);
    assert_eq!(options.program, Some(PathBuf::from("my program.json")));
}

#[test]
fn unknown_options_are_rejected() {
    let mut options = Options::default();
    assert!(options.parse(&["--no-such-flag".to_string()]).is_err());
    assert!(options.parse_from_str("'unterminated").is_err());
}
