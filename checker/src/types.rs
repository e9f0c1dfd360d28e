// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use itertools::Itertools;
use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter, Result};
use std::rc::Rc;

/// The type of an expression, as understood by the front end that produced the IR.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Type {
    Bool,
    Integer {
        width: u32,
        signed: bool,
    },
    Float {
        width: u32,
    },
    /// A pointer to values of the subtype.
    Pointer(Rc<Type>),
    Array {
        subtype: Rc<Type>,
        size: ArraySize,
    },
    /// A string literal type, width counts characters including the terminator.
    String {
        width: u64,
    },
    Struct {
        tag: Rc<str>,
        members: Vec<Member>,
    },
    Union {
        tag: Rc<str>,
        members: Vec<Member>,
    },
    /// The type of a function.
    Code {
        parameters: Vec<Parameter>,
        return_type: Rc<Type>,
    },
    /// void
    Empty,
    /// A reference to a named type that has to be looked up in the namespace.
    Symbol(Rc<str>),
}

/// The number of elements of an array type.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ArraySize {
    Fixed(u64),
    /// The size is only known at run time.
    Dynamic,
    Infinite,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Member {
    pub name: Rc<str>,
    pub ty: Rc<Type>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Parameter {
    /// Unnamed parameters cannot be bound at a call site.
    pub name: Option<Rc<str>>,
    pub ty: Rc<Type>,
}

/// Reasons why the byte size of a type cannot be computed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeError {
    DynamicallySized,
    InfinitelySized,
    /// The size does not fit into an i128.
    TooLarge,
    /// The type has no size (void, functions) or names a type the namespace does not know.
    Symbolic,
}

impl Type {
    pub fn pointer_to(subtype: Rc<Type>) -> Rc<Type> {
        Rc::new(Type::Pointer(subtype))
    }

    pub fn array_of(subtype: Rc<Type>, size: u64) -> Rc<Type> {
        Rc::new(Type::Array {
            subtype,
            size: ArraySize::Fixed(size),
        })
    }

    pub fn signed_int(width: u32) -> Rc<Type> {
        Rc::new(Type::Integer {
            width,
            signed: true,
        })
    }

    pub fn unsigned_int(width: u32) -> Rc<Type> {
        Rc::new(Type::Integer {
            width,
            signed: false,
        })
    }

    /// The type used for array indices and offsets.
    pub fn index_type() -> Rc<Type> {
        Type::signed_int(64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(..))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String { .. })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Type::Code { .. })
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self, Type::Struct { .. } | Type::Union { .. })
    }

    /// The members of a struct or union type, empty for every other type.
    pub fn members(&self) -> &[Member] {
        match self {
            Type::Struct { members, .. } | Type::Union { members, .. } => members,
            _ => &[],
        }
    }

    /// The type of the named member of a struct or union type.
    pub fn member_type(&self, name: &str) -> Option<Rc<Type>> {
        self.members()
            .iter()
            .find(|m| m.name.as_ref() == name)
            .map(|m| m.ty.clone())
    }

    /// The position of the named member of a struct or union type.
    pub fn member_number(&self, name: &str) -> Option<usize> {
        self.members().iter().position(|m| m.name.as_ref() == name)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Integer { width, signed } => {
                f.write_fmt(format_args!("{}{}", if *signed { "int" } else { "uint" }, width))
            }
            Type::Float { width } => f.write_fmt(format_args!("float{}", width)),
            Type::Pointer(subtype) => f.write_fmt(format_args!("{} *", subtype)),
            Type::Array { subtype, size } => match size {
                ArraySize::Fixed(n) => f.write_fmt(format_args!("{}[{}]", subtype, n)),
                ArraySize::Dynamic => f.write_fmt(format_args!("{}[*]", subtype)),
                ArraySize::Infinite => f.write_fmt(format_args!("{}[]", subtype)),
            },
            Type::String { .. } => f.write_str("string"),
            Type::Struct { tag, .. } => f.write_fmt(format_args!("struct {}", tag)),
            Type::Union { tag, .. } => f.write_fmt(format_args!("union {}", tag)),
            Type::Code {
                parameters,
                return_type,
            } => f.write_fmt(format_args!(
                "{} ({})",
                return_type,
                parameters.iter().map(|p| p.ty.to_string()).join(", ")
            )),
            Type::Empty => f.write_str("void"),
            Type::Symbol(name) => f.write_str(name),
        }
    }
}

/// The services the analysis needs from the front end's symbol table.
pub trait Namespace: Debug {
    /// Returns the type bound to the given name, if there is one.
    fn lookup_type(&self, name: &str) -> Option<Rc<Type>>;

    /// Returns the code type of the named function, if there is one.
    fn lookup_function(&self, name: &str) -> Option<Rc<Type>>;

    /// The width of a data pointer, in bits.
    fn pointer_width(&self) -> u32 {
        64
    }

    /// Replaces symbol types with the types they name, until the result is not a symbol.
    /// Unknown names are left as they are.
    fn follow(&self, ty: &Rc<Type>) -> Rc<Type> {
        let mut result = ty.clone();
        // A chain longer than the number of distinct names is a cycle.
        for _ in 0..64 {
            let named = match result.as_ref() {
                Type::Symbol(name) => self.lookup_type(name),
                _ => None,
            };
            match named {
                Some(t) => result = t,
                None => break,
            }
        }
        result
    }
}

/// A namespace built from explicit tables, as deserialized from a program file.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SymbolTable {
    #[serde(default)]
    pub types: HashMap<Rc<str>, Rc<Type>>,
    #[serde(default)]
    pub functions: HashMap<Rc<str>, Rc<Type>>,
    #[serde(default = "default_pointer_width")]
    pub pointer_width: u32,
}

fn default_pointer_width() -> u32 {
    64
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            types: HashMap::new(),
            functions: HashMap::new(),
            pointer_width: default_pointer_width(),
        }
    }

    pub fn add_type(&mut self, name: &str, ty: Rc<Type>) {
        self.types.insert(Rc::from(name), ty);
    }

    pub fn add_function(&mut self, name: &str, ty: Rc<Type>) {
        self.functions.insert(Rc::from(name), ty);
    }
}

impl Namespace for SymbolTable {
    fn lookup_type(&self, name: &str) -> Option<Rc<Type>> {
        self.types.get(name).cloned()
    }

    fn lookup_function(&self, name: &str) -> Option<Rc<Type>> {
        self.functions.get(name).cloned()
    }

    fn pointer_width(&self) -> u32 {
        self.pointer_width
    }
}

/// Returns the number of bytes occupied by a value of the given type.
#[logfn_inputs(TRACE)]
pub fn pointer_offset_size(ty: &Rc<Type>, ns: &dyn Namespace) -> std::result::Result<i128, SizeError> {
    let ty = ns.follow(ty);
    match ty.as_ref() {
        Type::Bool => Ok(1),
        Type::Integer { width, .. } | Type::Float { width } => Ok(i128::from((*width + 7) / 8)),
        Type::Pointer(..) => Ok(i128::from((ns.pointer_width() + 7) / 8)),
        Type::Array { subtype, size } => match size {
            ArraySize::Fixed(n) => i128::from(*n)
                .checked_mul(pointer_offset_size(subtype, ns)?)
                .ok_or(SizeError::TooLarge),
            ArraySize::Dynamic => Err(SizeError::DynamicallySized),
            ArraySize::Infinite => Err(SizeError::InfinitelySized),
        },
        Type::String { width } => Ok(i128::from(*width)),
        Type::Struct { members, .. } => {
            let mut total = 0;
            for member in members.iter().filter(|m| !m.ty.is_code()) {
                total = pointer_offset_size(&member.ty, ns)?
                    .checked_add(total)
                    .ok_or(SizeError::TooLarge)?;
            }
            Ok(total)
        }
        Type::Union { members, .. } => {
            let mut largest = 0;
            for member in members.iter().filter(|m| !m.ty.is_code()) {
                largest = largest.max(pointer_offset_size(&member.ty, ns)?);
            }
            Ok(largest)
        }
        Type::Code { .. } | Type::Empty | Type::Symbol(..) => Err(SizeError::Symbolic),
    }
}

/// True if the two types are the same once all symbol types have been followed.
pub fn base_type_eq(t1: &Rc<Type>, t2: &Rc<Type>, ns: &dyn Namespace) -> bool {
    if t1 == t2 {
        return true;
    }
    let t1 = ns.follow(t1);
    let t2 = ns.follow(t2);
    match (t1.as_ref(), t2.as_ref()) {
        (Type::Pointer(s1), Type::Pointer(s2)) => base_type_eq(s1, s2, ns),
        (
            Type::Array {
                subtype: s1,
                size: n1,
            },
            Type::Array {
                subtype: s2,
                size: n2,
            },
        ) => n1 == n2 && base_type_eq(s1, s2, ns),
        (
            Type::Struct {
                tag: tag1,
                members: m1,
            },
            Type::Struct {
                tag: tag2,
                members: m2,
            },
        )
        | (
            Type::Union {
                tag: tag1,
                members: m1,
            },
            Type::Union {
                tag: tag2,
                members: m2,
            },
        ) => {
            tag1 == tag2
                && m1.len() == m2.len()
                && m1
                    .iter()
                    .zip(m2.iter())
                    .all(|(a, b)| a.name == b.name && base_type_eq(&a.ty, &b.ty, ns))
        }
        (t1, t2) => t1 == t2,
    }
}
