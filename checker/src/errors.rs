// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::rc::Rc;
use thiserror::Error;

/// Outcomes of the transfer functions that are reported to the driver rather than
/// treated as broken invariants.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AnalysisError {
    /// The left hand side of an assignment does not denote storage the value set can track.
    /// The statement can be skipped.
    #[error("assignment to unsupported target `{kind}`")]
    UnsupportedAssignmentTarget { kind: &'static str },

    /// The namespace has no signature for a called function.
    #[error("no signature found for function `{name}`")]
    UnknownFunction { name: Rc<str> },

    /// A statement outside of the vocabulary that apply_code understands.
    #[error("unexpected statement `{kind}`")]
    UnexpectedStatement { kind: &'static str },
}

impl AnalysisError {
    /// True if the analysis of the procedure cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            AnalysisError::UnsupportedAssignmentTarget { .. } => false,
            AnalysisError::UnknownFunction { .. } | AnalysisError::UnexpectedStatement { .. } => {
                true
            }
        }
    }
}
