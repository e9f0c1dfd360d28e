// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Not every test crate uses every helper.
#![allow(dead_code)]

use itertools::Itertools;
use std::rc::Rc;
use value_set::expression::Expression;
use value_set::object_numbering::ObjectNumbering;
use value_set::types::{Member, Parameter, SymbolTable, Type};
use value_set::value_set::ValueSet;

pub fn int() -> Rc<Type> {
    Type::signed_int(32)
}

pub fn int_ptr() -> Rc<Type> {
    Type::pointer_to(int())
}

pub fn int_ptr_ptr() -> Rc<Type> {
    Type::pointer_to(int_ptr())
}

/// struct S { int *a; int *b; }
pub fn pair_type() -> Rc<Type> {
    Rc::new(Type::Struct {
        tag: Rc::from("S"),
        members: vec![
            Member {
                name: Rc::from("a"),
                ty: int_ptr(),
            },
            Member {
                name: Rc::from("b"),
                ty: int_ptr(),
            },
        ],
    })
}

pub fn var(name: &str, ty: Rc<Type>) -> Rc<Expression> {
    Expression::symbol(name, ty)
}

/// &name, where name is an int.
pub fn address_of_int(name: &str) -> Rc<Expression> {
    Expression::address_of(var(name, int()))
}

/// A symbol table that declares int *f(int *a, int *b).
pub fn symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    symbols.add_function(
        "f",
        Rc::new(Type::Code {
            parameters: vec![
                Parameter {
                    name: Some(Rc::from("a")),
                    ty: int_ptr(),
                },
                Parameter {
                    name: Some(Rc::from("b")),
                    ty: int_ptr(),
                },
            ],
            return_type: int_ptr(),
        }),
    );
    symbols
}

pub fn new_value_set() -> ValueSet {
    ValueSet::new(ObjectNumbering::new())
}

/// The objects the value of expr may point to, as printed by the value set output, sorted.
pub fn objects_of(value_set: &ValueSet, expr: &Rc<Expression>, ns: &SymbolTable) -> Vec<String> {
    value_set
        .get_value_set(expr, ns)
        .iter()
        .map(|d| d.to_string())
        .sorted()
        .collect()
}

/// The locations expr may denote, as printed by the value set output, sorted.
pub fn references_of(
    value_set: &ValueSet,
    expr: &Rc<Expression>,
    ns: &SymbolTable,
) -> Vec<String> {
    value_set
        .get_reference_set(expr, ns)
        .iter()
        .map(|d| d.to_string())
        .sorted()
        .collect()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
