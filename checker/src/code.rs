// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::AnalysisError;
use crate::expression::{Expression, ExpressionKind};
use crate::object_map::ObjectMap;
use crate::types::{Namespace, Type};
use crate::value_set::ValueSet;

use log::debug;
use log_derive::logfn_inputs;
use mirai_annotations::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;

/// The statements of the intermediate representation that the value set can interpret.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    Block {
        statements: Vec<Statement>,
    },
    Assign {
        lhs: Rc<Expression>,
        rhs: Rc<Expression>,
    },
    /// Initialization of a declared variable.
    Init {
        lhs: Rc<Expression>,
        rhs: Rc<Expression>,
    },
    /// Declares a variable, which starts out without a valid value.
    Decl {
        symbol: Rc<Expression>,
    },
    /// An expression evaluated for its side effects.
    Expression {
        expression: Rc<Expression>,
    },
    Free {
        pointer: Rc<Expression>,
    },
    Printf {
        arguments: Vec<Rc<Expression>>,
    },
    Return {
        value: Option<Rc<Expression>>,
    },
    Asm,
    CppDelete {
        pointer: Rc<Expression>,
    },
    CppDeleteArray {
        pointer: Rc<Expression>,
    },
    /// A call of the named function. Calls are interpreted by do_function_call and
    /// do_end_function, which need to bracket the analysis of the callee.
    FunctionCall {
        lhs: Option<Rc<Expression>>,
        function: Rc<str>,
        arguments: Vec<Option<Rc<Expression>>>,
    },
}

impl Statement {
    /// A short name for the kind of statement, for use in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Block { .. } => "block",
            Statement::Assign { .. } => "assign",
            Statement::Init { .. } => "init",
            Statement::Decl { .. } => "decl",
            Statement::Expression { .. } => "expression",
            Statement::Free { .. } => "free",
            Statement::Printf { .. } => "printf",
            Statement::Return { .. } => "return",
            Statement::Asm => "asm",
            Statement::CppDelete { .. } => "cpp_delete",
            Statement::CppDeleteArray { .. } => "cpp_delete[]",
            Statement::FunctionCall { .. } => "function_call",
        }
    }
}

/// Statements
impl ValueSet {
    /// Updates the state to reflect the execution of the given statement.
    #[logfn_inputs(TRACE)]
    pub fn apply_code(&mut self, code: &Statement, ns: &dyn Namespace) -> Result<(), AnalysisError> {
        match code {
            Statement::Block { statements } => {
                for statement in statements.iter() {
                    self.apply_code(statement, ns)?;
                }
                Ok(())
            }
            Statement::Assign { lhs, rhs } | Statement::Init { lhs, rhs } => {
                self.assign(lhs, rhs, ns, false)
            }
            Statement::Decl { symbol } => {
                precondition!(matches!(symbol.kind, ExpressionKind::Symbol { .. }));
                let invalid = Expression::invalid(symbol.ty.clone());
                self.assign(symbol, &invalid, ns, false)
            }
            Statement::Expression { .. }
            | Statement::Printf { .. }
            | Statement::Asm
            | Statement::CppDelete { .. }
            | Statement::CppDeleteArray { .. } => {
                // Nothing that a pointer could observe.
                Ok(())
            }
            Statement::Free { pointer } => {
                self.do_free(pointer, ns);
                Ok(())
            }
            Statement::Return { value } => {
                if let Some(value) = value {
                    let return_value = Expression::return_value(value.ty.clone());
                    self.assign(&return_value, value, ns, false)?;
                }
                Ok(())
            }
            Statement::FunctionCall { .. } => Err(AnalysisError::UnexpectedStatement {
                kind: code.kind_name(),
            }),
        }
    }

    /// Records that the heap objects the pointer may point to may have been freed.
    /// Every location that may point to one of the freed allocation sites is updated, not
    /// just the operand, since there may be other aliases of the freed object.
    #[logfn_inputs(TRACE)]
    pub fn do_free(&mut self, pointer: &Rc<Expression>, ns: &dyn Namespace) {
        let value_set = self.get_value_set_map(pointer, ns);

        let mut to_mark: HashSet<Option<usize>> = HashSet::new();
        for (n, _) in value_set.iter() {
            let object = self.objects().object(n);
            if let ExpressionKind::DynamicObject {
                instance, invalid, ..
            } = &object.kind
            {
                if !*invalid {
                    to_mark.insert(*instance);
                }
            }
        }
        if to_mark.is_empty() {
            return;
        }

        // The pointer may be one of several aliases, only some of which were freed on this
        // path, so the objects become unknown rather than invalid.
        let mut updates = Vec::new();
        for (path, object_map) in self.entries() {
            let mut new_object_map = ObjectMap::new();
            let mut changed = false;
            for (n, offset) in object_map.iter() {
                let object = self.objects().object(n);
                match &object.kind {
                    ExpressionKind::DynamicObject { instance, .. } if to_mark.contains(instance) => {
                        let freed = Expression::new(
                            ExpressionKind::DynamicObject {
                                instance: *instance,
                                invalid: false,
                                unknown: true,
                            },
                            object.ty.clone(),
                        );
                        self.insert_object(&mut new_object_map, &freed, offset);
                        changed = true;
                    }
                    _ => {
                        new_object_map.insert(n, offset);
                    }
                }
            }
            if changed {
                updates.push((path.clone(), new_object_map));
            }
        }
        debug!("free updates {} locations", updates.len());
        for (path, object_map) in updates {
            self.set_entry(path, object_map);
        }
    }

    /// Binds the actual arguments of a call to the formal parameters of the callee.
    /// The actuals are first copied into dummy arguments and only then into the formals, so
    /// that an actual that mentions a formal of the callee (as in a recursive call) sees the
    /// value it had before the call. A missing actual has an unknown value.
    #[logfn_inputs(TRACE)]
    pub fn do_function_call(
        &mut self,
        function: &str,
        arguments: &[Option<Rc<Expression>>],
        ns: &dyn Namespace,
    ) -> Result<(), AnalysisError> {
        let parameters = match ns.lookup_function(function).map(|ty| ns.follow(&ty)) {
            Some(ty) => match ty.as_ref() {
                Type::Code { parameters, .. } => parameters.clone(),
                _ => {
                    return Err(AnalysisError::UnknownFunction {
                        name: Rc::from(function),
                    })
                }
            },
            None => {
                return Err(AnalysisError::UnknownFunction {
                    name: Rc::from(function),
                })
            }
        };

        for (i, argument) in arguments.iter().enumerate() {
            let argument = match argument {
                Some(argument) => argument.clone(),
                None => match parameters.get(i) {
                    Some(parameter) => Expression::unknown(parameter.ty.clone()),
                    None => {
                        debug!("ignoring missing variadic argument {} of {}", i, function);
                        continue;
                    }
                },
            };
            let dummy = Expression::dummy_argument(i, argument.ty.clone());
            // Each call gets fresh dummies.
            self.assign(&dummy, &argument, ns, false)?;
        }

        for (i, parameter) in parameters.iter().enumerate() {
            let name = match &parameter.name {
                Some(name) => name,
                None => continue,
            };
            let formal = Expression::symbol(name, parameter.ty.clone());
            let actual = if i < arguments.len() {
                Expression::dummy_argument(i, parameter.ty.clone())
            } else {
                Expression::unknown(parameter.ty.clone())
            };
            self.assign(&formal, &actual, ns, true)?;
        }
        Ok(())
    }

    /// Copies the value returned by the callee into the receiver of the call result.
    #[logfn_inputs(TRACE)]
    pub fn do_end_function(
        &mut self,
        lhs: Option<&Rc<Expression>>,
        ns: &dyn Namespace,
    ) -> Result<(), AnalysisError> {
        if let Some(lhs) = lhs {
            let return_value = Expression::return_value(lhs.ty.clone());
            self.assign(lhs, &return_value, ns, false)?;
        }
        Ok(())
    }
}
