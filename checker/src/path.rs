// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
use log_derive::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Display, Formatter, Result};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A location that a value set tracks: a root plus a chain of member and index selectors.
/// Equality is structural. The hash is computed once, when the path is built, since paths
/// are keys of every value map and are hashed again on each join.
#[derive(Serialize, Deserialize, Clone, Eq, Ord, PartialOrd)]
pub struct Path {
    pub value: PathEnum,
    hash: u64,
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Debug::fmt(&self.value, f)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Debug::fmt(&self.value, f)
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Path) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl From<PathEnum> for Path {
    #[logfn_inputs(TRACE)]
    fn from(value: PathEnum) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Path {
            value,
            hash: hasher.finish(),
        }
    }
}

/// A path identifies a tracked location: a root object followed by the member and
/// element selections that lead from it to a sub-object.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathEnum {
    /// A named program variable.
    Variable { name: Rc<str> },

    /// The heap objects allocated at a particular allocation site.
    DynamicObject { instance: usize },

    /// The location that receives the operand of a return statement.
    ReturnValue,

    /// The temporary used to pass the actual argument with this ordinal.
    DummyArgument { ordinal: usize },

    /// The qualifier denotes some struct, union or array.
    /// The selector denotes a member or an element.
    QualifiedPath {
        length: usize,
        qualifier: Rc<Path>,
        selector: Rc<PathSelector>,
    },
}

impl Debug for PathEnum {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathEnum::Variable { name } => f.write_str(name),
            PathEnum::DynamicObject { instance } => {
                f.write_fmt(format_args!("value_set::dynamic_object{}", instance))
            }
            PathEnum::ReturnValue => f.write_str("RETURN_VALUE"),
            PathEnum::DummyArgument { ordinal } => {
                f.write_fmt(format_args!("value_set::dummy_arg_{}", ordinal))
            }
            PathEnum::QualifiedPath {
                qualifier,
                selector,
                ..
            } => f.write_fmt(format_args!("{:?}{:?}", qualifier, selector)),
        }
    }
}

impl Path {
    pub fn new_variable(name: Rc<str>) -> Rc<Path> {
        Rc::new(PathEnum::Variable { name }.into())
    }

    pub fn new_dynamic_object(instance: usize) -> Rc<Path> {
        Rc::new(PathEnum::DynamicObject { instance }.into())
    }

    pub fn new_return_value() -> Rc<Path> {
        Rc::new(PathEnum::ReturnValue.into())
    }

    pub fn new_dummy_argument(ordinal: usize) -> Rc<Path> {
        Rc::new(PathEnum::DummyArgument { ordinal }.into())
    }

    pub fn new_field(qualifier: Rc<Path>, name: Rc<str>) -> Rc<Path> {
        Path::new_qualified(qualifier, Rc::new(PathSelector::Field(name)))
    }

    pub fn new_index(qualifier: Rc<Path>) -> Rc<Path> {
        Path::new_qualified(qualifier, Rc::new(PathSelector::Index))
    }

    /// Returns a new path qualifier.selector.
    #[logfn_inputs(TRACE)]
    pub fn new_qualified(qualifier: Rc<Path>, selector: Rc<PathSelector>) -> Rc<Path> {
        let length = qualifier.path_length() + 1;
        Rc::new(
            PathEnum::QualifiedPath {
                length,
                qualifier,
                selector,
            }
            .into(),
        )
    }

    /// Returns a qualified path of the form root.selectors[0].selectors[1]...
    #[logfn_inputs(TRACE)]
    pub fn add_selectors(root: &Rc<Path>, selectors: &[Rc<PathSelector>]) -> Rc<Path> {
        let mut result = root.clone();
        for selector in selectors.iter() {
            result = Path::new_qualified(result, selector.clone());
        }
        result
    }

    /// The number of selectors plus one.
    pub fn path_length(&self) -> usize {
        match &self.value {
            PathEnum::QualifiedPath { length, .. } => *length,
            _ => 1,
        }
    }

    /// Returns the unqualified path at the root of this path.
    pub fn root(self: &Rc<Path>) -> Rc<Path> {
        match &self.value {
            PathEnum::QualifiedPath { qualifier, .. } => qualifier.root(),
            _ => self.clone(),
        }
    }

    /// True if the path is rooted by a dynamic object or by the return value.
    /// Entries for such paths record heap and data flow facts that a join must never drop.
    pub fn is_always_retained(&self) -> bool {
        match &self.value {
            PathEnum::DynamicObject { .. } | PathEnum::ReturnValue => true,
            PathEnum::QualifiedPath { qualifier, .. } => qualifier.is_always_retained(),
            _ => false,
        }
    }
}

/// The selector denotes a member or an element of the qualifier.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathSelector {
    /// Select the struct or union member with the given name.
    Field(Rc<str>),

    /// Select an element of an array. Elements are not distinguished, so one index
    /// selector stands for all of them.
    Index,
}

impl Debug for PathSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathSelector::Field(name) => f.write_fmt(format_args!(".{}", name)),
            PathSelector::Index => f.write_str("[]"),
        }
    }
}

impl PathSelector {
    /// Returns a selector list that has this selector in front of suffix.
    pub fn prepend_to(self, suffix: &[Rc<PathSelector>]) -> Vec<Rc<PathSelector>> {
        let mut result = Vec::with_capacity(suffix.len() + 1);
        result.push(Rc::new(self));
        result.extend(suffix.iter().cloned());
        result
    }
}
