// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command, Error};
use std::path::PathBuf;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command {
    Command::new("value-set")
        .no_binary_name(true)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Replays a straight line program against a value set and prints the points-to facts.")
        .arg(
            Arg::new("program")
                .value_parser(clap::value_parser!(PathBuf))
                .help("A JSON file with the symbols, statements and expectations of the program."),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Do not print the final state."),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Compare the final state with the expectations of the program.")
                .long_help(
                    "Every expectation names an expression and the objects its value set must contain.\n\
                     The run fails if any value set differs from its expectation.",
                ),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Stop at the first statement that cannot be interpreted.")
                .long_help(
                    "By default, assignments to targets that the value set cannot track are reported and skipped.",
                ),
        )
}

/// Represents options passed to the value set driver.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Options {
    pub program: Option<PathBuf>,
    pub quiet: bool,
    pub check: bool,
    pub strict: bool,
}

impl Options {
    /// Parse options from an argument string. The argument string will be split using unix
    /// shell escaping rules.
    pub fn parse_from_str(&mut self, s: &str) -> Result<(), Error> {
        let args = shellwords::split(s).map_err(|e| {
            Error::raw(
                ErrorKind::InvalidValue,
                format!("Cannot parse argument string: {:?}\n", e),
            )
        })?;
        self.parse(&args)
    }

    /// Parses options from a list of strings, not including the binary name.
    /// Flags that are present are turned on, flags that are absent keep their current value,
    /// so options can be accumulated from several sources.
    pub fn parse(&mut self, args: &[String]) -> Result<(), Error> {
        let matches = make_options_parser().try_get_matches_from(args.iter())?;
        if let Some(program) = matches.get_one::<PathBuf>("program") {
            self.program = Some(program.clone());
        }
        if matches.get_flag("quiet") {
            self.quiet = true;
        }
        if matches.get_flag("check") {
            self.check = true;
        }
        if matches.get_flag("strict") {
            self.strict = true;
        }
        Ok(())
    }
}
