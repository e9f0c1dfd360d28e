// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Replays a straight line program, given as JSON, against a single value set.
//! This is how the value set is exercised outside of a full fixed point analysis.

use crate::code::Statement;
use crate::errors::AnalysisError;
use crate::expression::Expression;
use crate::object_numbering::ObjectNumbering;
use crate::options::Options;
use crate::types::SymbolTable;
use crate::value_set::ValueSet;

use itertools::Itertools;
use log::{debug, info, warn};
use log_derive::logfn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// A program to replay and the facts expected to hold once it has run.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Program {
    #[serde(default)]
    pub symbols: SymbolTable,
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

/// The objects, as printed by the value set output, that the value of the expression
/// must point to at the end of the program. The order does not matter.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct Expectation {
    pub expression: Rc<Expression>,
    pub objects: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot read program: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("statement {location}: {source}")]
    Analysis {
        location: usize,
        #[source]
        source: AnalysisError,
    },

    #[error("value set of `{expression}` is {{ {} }}, expected {{ {} }}", .actual.join(", "), .expected.join(", "))]
    ExpectationMismatch {
        expression: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Reads a program from a JSON file.
pub fn load_program(path: &Path) -> Result<Program, DriverError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Interprets the statements of the program in order, starting from an empty value set.
/// The index of a statement is its location number.
#[logfn(DEBUG)]
pub fn run_program(program: &Program, options: &Options) -> Result<ValueSet, DriverError> {
    let ns = &program.symbols;
    let mut value_set = ValueSet::new(ObjectNumbering::new());
    for (location, statement) in program.statements.iter().enumerate() {
        value_set.location_number = location;
        debug!("{}: {}", location, statement.kind_name());
        let result = match statement {
            Statement::FunctionCall {
                lhs,
                function,
                arguments,
            } => value_set
                .do_function_call(function, arguments, ns)
                .and_then(|_| value_set.do_end_function(lhs.as_ref(), ns)),
            _ => value_set.apply_code(statement, ns),
        };
        if let Err(source) = result {
            if source.is_fatal() || options.strict {
                return Err(DriverError::Analysis { location, source });
            }
            warn!("skipping statement {}: {}", location, source);
        }
    }
    Ok(value_set)
}

/// Checks that the value set of every expected expression is exactly the expected set of
/// objects.
pub fn check_expectations(value_set: &ValueSet, program: &Program) -> Result<(), DriverError> {
    for expectation in program.expectations.iter() {
        let actual = value_set
            .get_value_set(&expectation.expression, &program.symbols)
            .iter()
            .map(|descriptor| descriptor.to_string())
            .sorted()
            .dedup()
            .collect_vec();
        let expected = expectation
            .objects
            .iter()
            .cloned()
            .sorted()
            .dedup()
            .collect_vec();
        if actual != expected {
            return Err(DriverError::ExpectationMismatch {
                expression: expectation.expression.to_string(),
                expected,
                actual,
            });
        }
        info!("{} = {{ {} }}", expectation.expression, actual.join(", "));
    }
    Ok(())
}
