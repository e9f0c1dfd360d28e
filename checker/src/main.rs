// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::env;
use std::io;
use std::process;
use value_set::driver;
use value_set::options::Options;

fn main() {
    // Initialize loggers.
    if env::var("VALUE_SET_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("VALUE_SET_LOG")
            .write_style("VALUE_SET_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Flags from the environment come first, so that the command line can add to them.
    let mut options = Options::default();
    if let Ok(flags) = env::var("VALUE_SET_FLAGS") {
        if let Err(e) = options.parse_from_str(&flags) {
            e.exit();
        }
    }
    let command_line_arguments: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = options.parse(&command_line_arguments) {
        e.exit();
    }

    let program_path = match &options.program {
        Some(path) => path.clone(),
        None => {
            eprintln!("value-set: no program file given (try --help)");
            process::exit(2);
        }
    };

    let result = driver::load_program(&program_path).and_then(|program| {
        let value_set = driver::run_program(&program, &options)?;
        if !options.quiet {
            value_set.output(&mut io::stdout().lock())?;
        }
        if options.check {
            driver::check_expectations(&value_set, &program)?;
        }
        Ok(())
    });
    if let Err(e) = result {
        eprintln!("value-set: {}: {}", program_path.display(), e);
        process::exit(1);
    }
}
