// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::types::Type;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};
use std::rc::Rc;

/// A typed expression of the intermediate representation produced by the front end.
/// Expressions are also used as object descriptors: the memory objects that pointers
/// may refer to are represented by the expressions that denote them.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: Rc<Type>,
}

/// The closed vocabulary of expression shapes.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ExpressionKind {
    /// A named program variable.
    Symbol { name: Rc<str> },

    /// The location that receives the value of a return statement.
    ReturnValue,

    /// A temporary used to pass an actual argument to a formal parameter.
    DummyArgument { ordinal: usize },

    ConstantInt { value: i128 },

    ConstantBool { value: bool },

    /// A string literal. Used as a memory object, it is the storage of the literal.
    ConstantString { value: Rc<str> },

    /// A struct literal with one value per member, in member order.
    ConstantStruct { members: Vec<Rc<Expression>> },

    /// An array literal with one value per element.
    ConstantArray { elements: Vec<Rc<Expression>> },

    /// An array literal with every element set to the initializer.
    ConstantArrayOf { initializer: Rc<Expression> },

    /// Any value of the type. As a memory object: some object that could not be determined.
    Unknown,

    /// A value that must not be used, such as an uninitialized variable.
    Invalid,

    /// The object a null pointer points to.
    NullObject,

    /// The heap object allocated at the allocation site identified by instance.
    /// An instance of None identifies no particular allocation site.
    DynamicObject {
        instance: Option<usize>,
        // The object is known to have been freed.
        invalid: bool,
        // The object may have been freed.
        unknown: bool,
    },

    /// An element of an array or string.
    Index {
        source: Rc<Expression>,
        index: Rc<Expression>,
    },

    /// A member of a struct or union.
    Member {
        source: Rc<Expression>,
        member: Rc<str>,
    },

    /// The object the pointer points to. *
    Dereference { pointer: Rc<Expression> },

    /// The address of the object. &
    AddressOf { object: Rc<Expression> },

    /// Either true_value or false_value, depending on the value of condition. ?:
    IfThenElse {
        condition: Rc<Expression>,
        true_value: Rc<Expression>,
        false_value: Rc<Expression>,
    },

    /// The operand converted to the type of this expression.
    Typecast { from: Rc<Expression> },

    /// The sum of left and right. If the type is a pointer, this is pointer arithmetic. +
    Add {
        left: Rc<Expression>,
        right: Rc<Expression>,
    },

    /// The difference of left and right. If the type is a pointer, this is pointer arithmetic. -
    Sub {
        left: Rc<Expression>,
        right: Rc<Expression>,
    },

    /// The product of left and right. *
    Mul {
        left: Rc<Expression>,
        right: Rc<Expression>,
    },

    /// An expression with a side effect.
    SideEffect { effect: SideEffectKind },

    /// A copy of source with the given field (a member name string) or index changed
    /// to update_value.
    With {
        source: Rc<Expression>,
        update_field: Rc<Expression>,
        update_value: Rc<Expression>,
    },

    /// The bytes found at offset in the source object, read as a value of this type.
    ByteExtract {
        source: Rc<Expression>,
        offset: Rc<Expression>,
    },

    // The following are only used by assertions over the program state. They do not
    // denote storage.
    ZeroString { string: Rc<Expression> },
    ZeroLengthString { string: Rc<Expression> },
    ValidObject { value: Rc<Expression> },
    DeallocatedObject { value: Rc<Expression> },
    DynamicSize { value: Rc<Expression> },
}

/// The kinds of side effects that can occur inside expressions.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SideEffectKind {
    /// A C heap allocation of a value of the allocated type.
    Malloc { alloc_type: Rc<Type> },
    /// C++ new. The allocated type is the target type of the expression's pointer type.
    CppNew,
    /// C++ new[].
    CppNewArray,
    /// A nondeterministic choice of value.
    Nondet,
    /// A function call that has not been lowered into a call statement.
    FunctionCall,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: Rc<Type>) -> Rc<Expression> {
        Rc::new(Expression { kind, ty })
    }

    pub fn symbol(name: &str, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(
            ExpressionKind::Symbol {
                name: Rc::from(name),
            },
            ty,
        )
    }

    pub fn return_value(ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::ReturnValue, ty)
    }

    pub fn dummy_argument(ordinal: usize, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::DummyArgument { ordinal }, ty)
    }

    pub fn constant_int(value: i128, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::ConstantInt { value }, ty)
    }

    /// A constant of the index type.
    pub fn index_constant(value: i128) -> Rc<Expression> {
        Expression::constant_int(value, Type::index_type())
    }

    pub fn constant_string(value: &str) -> Rc<Expression> {
        let width = value.len() as u64 + 1;
        Expression::new(
            ExpressionKind::ConstantString {
                value: Rc::from(value),
            },
            Rc::new(Type::String { width }),
        )
    }

    pub fn constant_struct(members: Vec<Rc<Expression>>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::ConstantStruct { members }, ty)
    }

    pub fn constant_array(elements: Vec<Rc<Expression>>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::ConstantArray { elements }, ty)
    }

    pub fn constant_array_of(initializer: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::ConstantArrayOf { initializer }, ty)
    }

    pub fn unknown(ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Unknown, ty)
    }

    pub fn invalid(ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Invalid, ty)
    }

    pub fn null_object(ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::NullObject, ty)
    }

    pub fn dynamic_object(instance: usize, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(
            ExpressionKind::DynamicObject {
                instance: Some(instance),
                invalid: false,
                unknown: false,
            },
            ty,
        )
    }

    pub fn index(source: Rc<Expression>, index: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Index { source, index }, ty)
    }

    pub fn member(source: Rc<Expression>, member: &str, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(
            ExpressionKind::Member {
                source,
                member: Rc::from(member),
            },
            ty,
        )
    }

    pub fn dereference(pointer: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Dereference { pointer }, ty)
    }

    /// The address of object, typed as a pointer to the type of object.
    pub fn address_of(object: Rc<Expression>) -> Rc<Expression> {
        let ty = Type::pointer_to(object.ty.clone());
        Expression::new(ExpressionKind::AddressOf { object }, ty)
    }

    /// A conditional expression with the type of true_value.
    pub fn if_then_else(
        condition: Rc<Expression>,
        true_value: Rc<Expression>,
        false_value: Rc<Expression>,
    ) -> Rc<Expression> {
        let ty = true_value.ty.clone();
        Expression::new(
            ExpressionKind::IfThenElse {
                condition,
                true_value,
                false_value,
            },
            ty,
        )
    }

    pub fn typecast(from: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Typecast { from }, ty)
    }

    pub fn add(left: Rc<Expression>, right: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Add { left, right }, ty)
    }

    pub fn sub(left: Rc<Expression>, right: Rc<Expression>, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::Sub { left, right }, ty)
    }

    /// A call to malloc that allocates a value of alloc_type. The result is a void pointer.
    pub fn malloc(alloc_type: Rc<Type>) -> Rc<Expression> {
        Expression::new(
            ExpressionKind::SideEffect {
                effect: SideEffectKind::Malloc { alloc_type },
            },
            Type::pointer_to(Rc::new(Type::Empty)),
        )
    }

    pub fn side_effect(effect: SideEffectKind, ty: Rc<Type>) -> Rc<Expression> {
        Expression::new(ExpressionKind::SideEffect { effect }, ty)
    }

    /// A copy of source (of the same type) with the named member replaced by update_value.
    pub fn with_member(
        source: Rc<Expression>,
        member: &str,
        update_value: Rc<Expression>,
    ) -> Rc<Expression> {
        let ty = source.ty.clone();
        Expression::new(
            ExpressionKind::With {
                source,
                update_field: Expression::constant_string(member),
                update_value,
            },
            ty,
        )
    }

    /// A copy of the source array with the element at index replaced by update_value.
    pub fn with_element(
        source: Rc<Expression>,
        index: Rc<Expression>,
        update_value: Rc<Expression>,
    ) -> Rc<Expression> {
        let ty = source.ty.clone();
        Expression::new(
            ExpressionKind::With {
                source,
                update_field: index,
                update_value,
            },
            ty,
        )
    }

    pub fn byte_extract(
        source: Rc<Expression>,
        offset: Rc<Expression>,
        ty: Rc<Type>,
    ) -> Rc<Expression> {
        Expression::new(ExpressionKind::ByteExtract { source, offset }, ty)
    }

    /// Returns the value of a constant integer expression.
    pub fn as_constant_int(&self) -> Option<i128> {
        if let ExpressionKind::ConstantInt { value } = &self.kind {
            Some(*value)
        } else {
            None
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, ExpressionKind::Unknown)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, ExpressionKind::Invalid)
    }

    /// A short name for the shape of this expression, for use in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::Symbol { .. } => "symbol",
            ExpressionKind::ReturnValue => "return_value",
            ExpressionKind::DummyArgument { .. } => "dummy_argument",
            ExpressionKind::ConstantInt { .. } => "constant_int",
            ExpressionKind::ConstantBool { .. } => "constant_bool",
            ExpressionKind::ConstantString { .. } => "constant_string",
            ExpressionKind::ConstantStruct { .. } => "constant_struct",
            ExpressionKind::ConstantArray { .. } => "constant_array",
            ExpressionKind::ConstantArrayOf { .. } => "constant_array_of",
            ExpressionKind::Unknown => "unknown",
            ExpressionKind::Invalid => "invalid",
            ExpressionKind::NullObject => "null_object",
            ExpressionKind::DynamicObject { .. } => "dynamic_object",
            ExpressionKind::Index { .. } => "index",
            ExpressionKind::Member { .. } => "member",
            ExpressionKind::Dereference { .. } => "dereference",
            ExpressionKind::AddressOf { .. } => "address_of",
            ExpressionKind::IfThenElse { .. } => "if",
            ExpressionKind::Typecast { .. } => "typecast",
            ExpressionKind::Add { .. } => "add",
            ExpressionKind::Sub { .. } => "sub",
            ExpressionKind::Mul { .. } => "mul",
            ExpressionKind::SideEffect { .. } => "sideeffect",
            ExpressionKind::With { .. } => "with",
            ExpressionKind::ByteExtract { .. } => "byte_extract",
            ExpressionKind::ZeroString { .. } => "zero_string",
            ExpressionKind::ZeroLengthString { .. } => "zero_length_string",
            ExpressionKind::ValidObject { .. } => "valid_object",
            ExpressionKind::DeallocatedObject { .. } => "deallocated_object",
            ExpressionKind::DynamicSize { .. } => "dynamic_size",
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.kind {
            ExpressionKind::Symbol { name } => f.write_str(name),
            ExpressionKind::ReturnValue => f.write_str("value_set::return_value"),
            ExpressionKind::DummyArgument { ordinal } => {
                f.write_fmt(format_args!("value_set::dummy_arg_{}", ordinal))
            }
            ExpressionKind::ConstantInt { value } => f.write_fmt(format_args!("{}", value)),
            ExpressionKind::ConstantBool { value } => f.write_fmt(format_args!("{}", value)),
            ExpressionKind::ConstantString { value } => f.write_fmt(format_args!("{:?}", value)),
            ExpressionKind::ConstantStruct { members } => {
                f.write_fmt(format_args!("{{ {} }}", members.iter().join(", ")))
            }
            ExpressionKind::ConstantArray { elements } => {
                f.write_fmt(format_args!("{{ {} }}", elements.iter().join(", ")))
            }
            ExpressionKind::ConstantArrayOf { initializer } => {
                f.write_fmt(format_args!("ARRAY_OF({})", initializer))
            }
            ExpressionKind::Unknown => f.write_str("unknown"),
            ExpressionKind::Invalid => f.write_str("invalid"),
            ExpressionKind::NullObject => f.write_str("NULL-object"),
            ExpressionKind::DynamicObject {
                instance,
                invalid,
                unknown,
            } => {
                let name = match instance {
                    Some(n) => format!("dynamic_object{}", n),
                    None => "dynamic_object".to_string(),
                };
                if *invalid {
                    f.write_fmt(format_args!("invalid({})", name))
                } else if *unknown {
                    f.write_fmt(format_args!("unknown({})", name))
                } else {
                    f.write_str(&name)
                }
            }
            ExpressionKind::Index { source, index } => {
                f.write_fmt(format_args!("{}[{}]", source, index))
            }
            ExpressionKind::Member { source, member } => {
                f.write_fmt(format_args!("{}.{}", source, member))
            }
            ExpressionKind::Dereference { pointer } => f.write_fmt(format_args!("*{}", pointer)),
            ExpressionKind::AddressOf { object } => f.write_fmt(format_args!("&{}", object)),
            ExpressionKind::IfThenElse {
                condition,
                true_value,
                false_value,
            } => f.write_fmt(format_args!(
                "({} ? {} : {})",
                condition, true_value, false_value
            )),
            ExpressionKind::Typecast { from } => f.write_fmt(format_args!("({}){}", self.ty, from)),
            ExpressionKind::Add { left, right } => f.write_fmt(format_args!("({} + {})", left, right)),
            ExpressionKind::Sub { left, right } => f.write_fmt(format_args!("({} - {})", left, right)),
            ExpressionKind::Mul { left, right } => f.write_fmt(format_args!("({} * {})", left, right)),
            ExpressionKind::SideEffect { effect } => match effect {
                SideEffectKind::Malloc { alloc_type } => {
                    f.write_fmt(format_args!("malloc({})", alloc_type))
                }
                SideEffectKind::CppNew => f.write_fmt(format_args!("new {}", self.ty)),
                SideEffectKind::CppNewArray => f.write_fmt(format_args!("new[] {}", self.ty)),
                SideEffectKind::Nondet => f.write_str("nondet()"),
                SideEffectKind::FunctionCall => f.write_str("call()"),
            },
            ExpressionKind::With {
                source,
                update_field,
                update_value,
            } => f.write_fmt(format_args!(
                "({} WITH [{}:={}])",
                source, update_field, update_value
            )),
            ExpressionKind::ByteExtract { source, offset } => {
                f.write_fmt(format_args!("byte_extract({}, {})", source, offset))
            }
            ExpressionKind::ZeroString { string } => {
                f.write_fmt(format_args!("zero_string({})", string))
            }
            ExpressionKind::ZeroLengthString { string } => {
                f.write_fmt(format_args!("zero_length_string({})", string))
            }
            ExpressionKind::ValidObject { value } => {
                f.write_fmt(format_args!("valid_object({})", value))
            }
            ExpressionKind::DeallocatedObject { value } => {
                f.write_fmt(format_args!("deallocated_object({})", value))
            }
            ExpressionKind::DynamicSize { value } => {
                f.write_fmt(format_args!("dynamic_size({})", value))
            }
        }
    }
}
