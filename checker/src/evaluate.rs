// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::{Expression, ExpressionKind, SideEffectKind};
use crate::object_map::{ObjectDescriptor, ObjectMap, Offset};
use crate::path::{Path, PathSelector};
use crate::types::{self, Namespace, SizeError, Type};
use crate::value_set::ValueSet;

use log::debug;
use log_derive::{logfn, logfn_inputs};
use mirai_annotations::*;
use std::rc::Rc;

/// Queries
impl ValueSet {
    /// Returns the objects that the value of expr may point to.
    pub fn get_value_set(&self, expr: &Rc<Expression>, ns: &dyn Namespace) -> Vec<ObjectDescriptor> {
        let object_map = self.get_value_set_map(expr, ns);
        self.to_descriptors(&object_map)
    }

    /// Returns the objects that the value of expr may point to, as an object map.
    #[logfn_inputs(TRACE)]
    #[logfn(TRACE)]
    pub fn get_value_set_map(&self, expr: &Rc<Expression>, ns: &dyn Namespace) -> ObjectMap {
        let mut dest = ObjectMap::new();
        self.get_value_set_rec(expr, &mut dest, &[], &expr.ty, ns);
        dest
    }

    /// Returns the locations that expr may denote.
    pub fn get_reference_set(
        &self,
        expr: &Rc<Expression>,
        ns: &dyn Namespace,
    ) -> Vec<ObjectDescriptor> {
        let object_map = self.get_reference_set_map(expr, ns);
        self.to_descriptors(&object_map)
    }

    /// Returns the locations that expr may denote, as an object map.
    #[logfn_inputs(TRACE)]
    #[logfn(TRACE)]
    pub fn get_reference_set_map(&self, expr: &Rc<Expression>, ns: &dyn Namespace) -> ObjectMap {
        let mut dest = ObjectMap::new();
        self.get_reference_set_rec(expr, &mut dest, ns);
        dest
    }

    /// Adds the objects the value of expr.suffix may point to into dest.
    /// The suffix lists the member and element selections applied to expr by the enclosing
    /// expressions, outermost last. original_type is the type of the outermost expression.
    #[logfn_inputs(TRACE)]
    pub(crate) fn get_value_set_rec(
        &self,
        expr: &Rc<Expression>,
        dest: &mut ObjectMap,
        suffix: &[Rc<PathSelector>],
        original_type: &Rc<Type>,
        ns: &dyn Namespace,
    ) {
        match &expr.kind {
            ExpressionKind::Unknown | ExpressionKind::Invalid => {
                self.insert_unknown(dest, original_type);
                return;
            }
            ExpressionKind::Index { source, .. } => {
                precondition!({
                    let source_type = ns.follow(&source.ty);
                    source_type.is_array() || source_type.is_string()
                });
                let suffix = PathSelector::Index.prepend_to(suffix);
                self.get_value_set_rec(source, dest, &suffix, original_type, ns);
                return;
            }
            ExpressionKind::Member { source, member } => {
                precondition!(ns.follow(&source.ty).is_struct_or_union());
                let suffix = PathSelector::Field(member.clone()).prepend_to(suffix);
                self.get_value_set_rec(source, dest, &suffix, original_type, ns);
                return;
            }
            ExpressionKind::Symbol { name } => {
                if name.as_ref() == "NULL" {
                    if let Type::Pointer(subtype) = ns.follow(&expr.ty).as_ref() {
                        let null_object = Expression::null_object(subtype.clone());
                        self.insert_object(dest, &null_object, Offset::Exact(0));
                        return;
                    }
                }
                if self.union_entry(dest, &Path::new_variable(name.clone()), suffix) {
                    return;
                }
            }
            ExpressionKind::ReturnValue => {
                if self.union_entry(dest, &Path::new_return_value(), suffix) {
                    return;
                }
            }
            ExpressionKind::DummyArgument { ordinal } => {
                if self.union_entry(dest, &Path::new_dummy_argument(*ordinal), suffix) {
                    return;
                }
            }
            ExpressionKind::IfThenElse {
                true_value,
                false_value,
                ..
            } => {
                self.get_value_set_rec(true_value, dest, suffix, original_type, ns);
                self.get_value_set_rec(false_value, dest, suffix, original_type, ns);
                return;
            }
            ExpressionKind::AddressOf { object } => {
                self.get_reference_set_rec(object, dest, ns);
                return;
            }
            ExpressionKind::Dereference { .. } => {
                let reference_set = self.get_reference_set_map(expr, ns);
                if !reference_set.is_empty() {
                    for (n, _) in reference_set.iter() {
                        let object = self.objects().object(n);
                        self.get_value_set_rec(&object, dest, suffix, original_type, ns);
                    }
                    return;
                }
            }
            ExpressionKind::ConstantInt { .. }
            | ExpressionKind::ConstantBool { .. }
            | ExpressionKind::ConstantString { .. } => {
                // Scalar constants do not point anywhere. The null pointer is a symbol.
                return;
            }
            ExpressionKind::Typecast { from } => {
                self.get_value_set_rec(from, dest, suffix, original_type, ns);
                return;
            }
            ExpressionKind::Add { left, right } | ExpressionKind::Sub { left, right } => {
                if ns.follow(&expr.ty).is_pointer() {
                    let is_sub = matches!(expr.kind, ExpressionKind::Sub { .. });
                    self.get_pointer_arithmetic_value_set(left, right, is_sub, dest, ns);
                    return;
                }
            }
            ExpressionKind::SideEffect { effect } => {
                match effect {
                    SideEffectKind::Malloc { alloc_type } => {
                        checked_precondition!(suffix.is_empty());
                        let dynamic_object =
                            Expression::dynamic_object(self.location_number, alloc_type.clone());
                        self.insert_object(dest, &dynamic_object, Offset::Exact(0));
                    }
                    SideEffectKind::CppNew | SideEffectKind::CppNewArray => {
                        checked_precondition!(suffix.is_empty());
                        let alloc_type = match ns.follow(&expr.ty).as_ref() {
                            Type::Pointer(subtype) => subtype.clone(),
                            _ => assume_unreachable!("new must have a pointer type"),
                        };
                        let dynamic_object =
                            Expression::dynamic_object(self.location_number, alloc_type);
                        self.insert_object(dest, &dynamic_object, Offset::Exact(0));
                    }
                    SideEffectKind::Nondet => {
                        // Nondeterministic values are not modelled and contribute no objects.
                        debug!("ignoring nondeterministic value {}", expr);
                    }
                    SideEffectKind::FunctionCall => {
                        assume_unreachable!("calls must be lowered into call statements")
                    }
                }
                return;
            }
            ExpressionKind::ConstantStruct { .. } => {
                // Like a static struct object.
                let object = Expression::new(
                    ExpressionKind::AddressOf {
                        object: expr.clone(),
                    },
                    expr.ty.clone(),
                );
                self.insert_object(dest, &object, Offset::Exact(0));
                return;
            }
            ExpressionKind::With {
                source,
                update_value,
                ..
            } => {
                // Does not track which member or element changed.
                self.get_value_set_rec(source, dest, suffix, original_type, ns);
                self.get_value_set_rec(update_value, dest, &[], original_type, ns);
                return;
            }
            ExpressionKind::ConstantArray { .. } | ExpressionKind::ConstantArrayOf { .. } => {
                assume_unreachable!("array literals must be decomposed by assign");
            }
            ExpressionKind::DynamicObject { instance, .. } => {
                // An object of no particular allocation site has no entry to read.
                if let Some(instance) = instance {
                    if self.union_entry(dest, &Path::new_dynamic_object(*instance), suffix) {
                        return;
                    }
                }
            }
            _ => {}
        }
        self.insert_unknown(dest, original_type);
    }

    /// Joins the entry for root.suffix into dest. Returns false if the location is not tracked.
    fn union_entry(
        &self,
        dest: &mut ObjectMap,
        root: &Rc<Path>,
        suffix: &[Rc<PathSelector>],
    ) -> bool {
        let path = Path::add_selectors(root, suffix);
        match self.get_entry(&path) {
            Some(object_map) => {
                dest.union(object_map);
                true
            }
            None => false,
        }
    }

    /// Adds the objects that pointer +/- scalar may point to into dest.
    #[logfn_inputs(TRACE)]
    fn get_pointer_arithmetic_value_set(
        &self,
        left: &Rc<Expression>,
        right: &Rc<Expression>,
        is_sub: bool,
        dest: &mut ObjectMap,
        ns: &dyn Namespace,
    ) {
        let left_is_pointer = ns.follow(&left.ty).is_pointer();
        let right_is_pointer = ns.follow(&right.ty).is_pointer();
        checked_precondition!(
            !(left_is_pointer && right_is_pointer),
            "pointer arithmetic with two pointer operands"
        );
        let (pointer, scalar) = if left_is_pointer {
            (left, right)
        } else {
            (right, left)
        };

        let mut pointer_set = ObjectMap::new();
        self.get_value_set_rec(pointer, &mut pointer_set, &[], &pointer.ty, ns);

        // The offset is in bytes, based on the type the pointer is perceived to point to here.
        let delta = match scalar.as_constant_int() {
            Some(0) => Some(0),
            Some(value) => {
                let element_type = match ns.follow(&pointer.ty).as_ref() {
                    Type::Pointer(subtype) => subtype.clone(),
                    _ => assume_unreachable!("the pointer operand must have a pointer type"),
                };
                let element_size = match types::pointer_offset_size(&element_type, ns) {
                    Ok(size) => Some(size),
                    Err(SizeError::DynamicallySized)
                    | Err(SizeError::InfinitelySized)
                    | Err(SizeError::TooLarge) => None,
                    Err(SizeError::Symbolic) => {
                        if let Type::Empty = ns.follow(&element_type).as_ref() {
                            // Arithmetic on void pointers counts bytes.
                            Some(1)
                        } else {
                            assume_unreachable!(
                                "pointer arithmetic on a type whose size cannot be determined"
                            )
                        }
                    }
                };
                // An offset that does not fit is just unknown.
                element_size
                    .and_then(|size| value.checked_mul(size))
                    .and_then(|delta| if is_sub { delta.checked_neg() } else { Some(delta) })
            }
            None => None,
        };

        for (n, offset) in pointer_set.iter() {
            dest.insert(n, offset.offset_by(delta));
        }
    }

    /// Adds the locations that expr may denote into dest.
    #[logfn_inputs(TRACE)]
    pub(crate) fn get_reference_set_rec(
        &self,
        expr: &Rc<Expression>,
        dest: &mut ObjectMap,
        ns: &dyn Namespace,
    ) {
        match &expr.kind {
            ExpressionKind::Symbol { .. }
            | ExpressionKind::ReturnValue
            | ExpressionKind::DummyArgument { .. }
            | ExpressionKind::DynamicObject { .. }
            | ExpressionKind::ConstantString { .. } => {
                // The sub-arrays of a multi dimensional array are referenced without an offset.
                let is_multi_dimensional = match ns.follow(&expr.ty).as_ref() {
                    Type::Array { subtype, .. } => ns.follow(subtype).is_array(),
                    _ => false,
                };
                let offset = if is_multi_dimensional {
                    Offset::Unknown
                } else {
                    Offset::Exact(0)
                };
                self.insert_object(dest, expr, offset);
            }
            ExpressionKind::Dereference { pointer } => {
                self.get_value_set_rec(pointer, dest, &[], &expr.ty, ns);
            }
            ExpressionKind::Index { source, index } => {
                let array_references = self.get_reference_set_map(source, ns);
                for (n, offset) in array_references.iter() {
                    let object = self.objects().object(n);
                    if object.is_unknown() {
                        self.insert_unknown(dest, &expr.ty);
                        continue;
                    }
                    let object_type = ns.follow(&object.ty);
                    if !(object_type.is_array() || object_type.is_string()) {
                        assume_unreachable!(
                            "the container of an index must be an array or a string"
                        );
                    }
                    let object = if object.ty != source.ty {
                        Expression::typecast(object, source.ty.clone())
                    } else {
                        object
                    };
                    let new_index =
                        Expression::index(object, Expression::index_constant(0), expr.ty.clone());
                    let offset = match index.as_constant_int() {
                        Some(0) => offset,
                        Some(i) if offset.is_zero() => Offset::Exact(i),
                        _ => Offset::Unknown,
                    };
                    self.insert_object(dest, &new_index, offset);
                }
            }
            ExpressionKind::Member { source, member } => {
                let struct_references = self.get_reference_set_map(source, ns);
                for (n, offset) in struct_references.iter() {
                    let object = self.objects().object(n);
                    if object.is_unknown() {
                        self.insert_unknown(dest, &expr.ty);
                        continue;
                    }
                    let object = if object.ty != source.ty {
                        Expression::typecast(object, source.ty.clone())
                    } else {
                        object
                    };
                    let new_member = Expression::member(object, member, expr.ty.clone());
                    self.insert_object(dest, &new_member, offset);
                }
            }
            ExpressionKind::IfThenElse {
                true_value,
                false_value,
                ..
            } => {
                self.get_reference_set_rec(true_value, dest, ns);
                self.get_reference_set_rec(false_value, dest, ns);
            }
            ExpressionKind::Typecast { from } => {
                self.get_reference_set_rec(from, dest, ns);
            }
            ExpressionKind::ByteExtract { source, offset } => {
                // The extracted bytes live in the source object.
                let offset = match offset.as_constant_int() {
                    Some(offset) => Offset::Exact(offset),
                    None => Offset::Unknown,
                };
                self.insert_object(dest, source, offset);
            }
            _ => {
                self.insert_unknown(dest, &expr.ty);
            }
        }
    }
}
