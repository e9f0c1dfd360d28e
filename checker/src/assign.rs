// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::AnalysisError;
use crate::expression::{Expression, ExpressionKind};
use crate::object_map::ObjectMap;
use crate::path::{Path, PathSelector};
use crate::types::{self, Namespace, Type};
use crate::value_set::ValueSet;

use log::debug;
use log_derive::logfn_inputs;
use mirai_annotations::*;
use std::rc::Rc;

/// Assignment
impl ValueSet {
    /// Updates the state to reflect lhs = rhs. If add_to_sets is true, the objects of rhs
    /// are joined into the locations denoted by lhs (weak update), otherwise they replace
    /// the objects recorded for those locations (strong update).
    ///
    /// Struct, union and array assignments are decomposed into assignments of their
    /// members and elements.
    #[logfn_inputs(TRACE)]
    pub fn assign(
        &mut self,
        lhs: &Rc<Expression>,
        rhs: &Rc<Expression>,
        ns: &dyn Namespace,
        add_to_sets: bool,
    ) -> Result<(), AnalysisError> {
        if let ExpressionKind::IfThenElse {
            true_value,
            false_value,
            ..
        } = &rhs.kind
        {
            self.assign(lhs, true_value, ns, add_to_sets)?;
            return self.assign(lhs, false_value, ns, true);
        }

        let lhs_type = ns.follow(&lhs.ty);
        match lhs_type.as_ref() {
            Type::Struct { members, .. } | Type::Union { members, .. } => {
                for member in members.iter() {
                    // Methods have no storage.
                    if ns.follow(&member.ty).is_code() {
                        continue;
                    }
                    let lhs_member = Expression::member(lhs.clone(), &member.name, member.ty.clone());
                    let rhs_member = match &rhs.kind {
                        ExpressionKind::Unknown => Expression::unknown(member.ty.clone()),
                        ExpressionKind::Invalid => Expression::invalid(member.ty.clone()),
                        _ => {
                            precondition!(types::base_type_eq(&rhs.ty, &lhs.ty, ns));
                            Self::make_member(rhs, &member.name, ns)
                        }
                    };
                    self.assign(&lhs_member, &rhs_member, ns, add_to_sets)?;
                }
                Ok(())
            }
            Type::Array { subtype, .. } => {
                let lhs_index = Expression::index(
                    lhs.clone(),
                    Expression::unknown(Type::index_type()),
                    subtype.clone(),
                );
                match &rhs.kind {
                    ExpressionKind::Unknown | ExpressionKind::Invalid => {
                        self.assign(&lhs_index, rhs, ns, add_to_sets)
                    }
                    ExpressionKind::ConstantArrayOf { initializer } => {
                        self.assign(&lhs_index, initializer, ns, add_to_sets)
                    }
                    ExpressionKind::ConstantArray { elements } => {
                        // All elements go to the same location, so only the first may overwrite.
                        let mut add_to_sets = add_to_sets;
                        for element in elements.iter() {
                            self.assign(&lhs_index, element, ns, add_to_sets)?;
                            add_to_sets = true;
                        }
                        Ok(())
                    }
                    ExpressionKind::ConstantString { .. } => {
                        // The characters of a string literal do not point anywhere.
                        Ok(())
                    }
                    ExpressionKind::With {
                        source,
                        update_value,
                        ..
                    } => {
                        let source_index = Expression::index(
                            source.clone(),
                            Expression::unknown(Type::index_type()),
                            subtype.clone(),
                        );
                        self.assign(&lhs_index, &source_index, ns, add_to_sets)?;
                        self.assign(&lhs_index, update_value, ns, true)
                    }
                    _ => {
                        precondition!(types::base_type_eq(&rhs.ty, &lhs.ty, ns));
                        let rhs_index = Expression::index(
                            rhs.clone(),
                            Expression::unknown(Type::index_type()),
                            subtype.clone(),
                        );
                        self.assign(&lhs_index, &rhs_index, ns, true)
                    }
                }
            }
            _ => {
                let values_rhs = self.get_value_set_map(rhs, ns);
                self.assign_rec(lhs, &values_rhs, &[], ns, add_to_sets)
            }
        }
    }

    /// Stores values_rhs into the locations denoted by lhs.suffix.
    #[logfn_inputs(TRACE)]
    pub(crate) fn assign_rec(
        &mut self,
        lhs: &Rc<Expression>,
        values_rhs: &ObjectMap,
        suffix: &[Rc<PathSelector>],
        ns: &dyn Namespace,
        add_to_sets: bool,
    ) -> Result<(), AnalysisError> {
        match &lhs.kind {
            ExpressionKind::Symbol { name } => {
                let path = Path::add_selectors(&Path::new_variable(name.clone()), suffix);
                self.update_entry(path, values_rhs, add_to_sets);
            }
            ExpressionKind::ReturnValue => {
                let path = Path::add_selectors(&Path::new_return_value(), suffix);
                self.update_entry(path, values_rhs, add_to_sets);
            }
            ExpressionKind::DummyArgument { ordinal } => {
                let path = Path::add_selectors(&Path::new_dummy_argument(*ordinal), suffix);
                self.update_entry(path, values_rhs, add_to_sets);
            }
            ExpressionKind::DynamicObject { instance, .. } => {
                // An object that cannot be named cannot be updated.
                if let Some(instance) = instance {
                    // A dynamic object stands for every allocation made at its site.
                    let path = Path::add_selectors(&Path::new_dynamic_object(*instance), suffix);
                    self.update_entry(path, values_rhs, true);
                } else {
                    debug!("ignoring assignment to a dynamic object of unknown instance");
                }
            }
            ExpressionKind::Dereference { .. } => {
                let reference_set = self.get_reference_set_map(lhs, ns);
                // With more than one target, any one of them may be the one written.
                let add_to_sets = add_to_sets || reference_set.len() != 1;
                for (n, _) in reference_set.sorted().collect::<Vec<_>>() {
                    let object = self.objects().object(n);
                    if !object.is_unknown() {
                        self.assign_rec(&object, values_rhs, suffix, ns, add_to_sets)?;
                    }
                }
            }
            ExpressionKind::Index { source, .. } => {
                precondition!({
                    let source_type = ns.follow(&source.ty);
                    source_type.is_array()
                        || source_type.is_string()
                        || matches!(source.kind, ExpressionKind::DynamicObject { .. })
                });
                let suffix = PathSelector::Index.prepend_to(suffix);
                self.assign_rec(source, values_rhs, &suffix, ns, true)?;
            }
            ExpressionKind::Member { source, member } => {
                // The source may have been reached through a dereference, so its type may
                // have to be looked up.
                precondition!(
                    ns.follow(&source.ty).is_struct_or_union()
                        || matches!(source.kind, ExpressionKind::DynamicObject { .. })
                );
                let suffix = PathSelector::Field(member.clone()).prepend_to(suffix);
                self.assign_rec(source, values_rhs, &suffix, ns, add_to_sets)?;
            }
            ExpressionKind::ZeroString { .. }
            | ExpressionKind::ZeroLengthString { .. }
            | ExpressionKind::ConstantString { .. }
            | ExpressionKind::NullObject
            | ExpressionKind::ValidObject { .. }
            | ExpressionKind::DeallocatedObject { .. }
            | ExpressionKind::DynamicSize { .. } => {
                // Not storage.
            }
            ExpressionKind::Typecast { from } => {
                self.assign_rec(from, values_rhs, suffix, ns, add_to_sets)?;
            }
            ExpressionKind::ByteExtract { source, .. } => {
                self.assign_rec(source, values_rhs, suffix, ns, true)?;
            }
            _ => {
                return Err(AnalysisError::UnsupportedAssignmentTarget {
                    kind: lhs.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Returns an expression for the named member of src, looking through struct literals,
    /// member updates and typecasts to find the member's value without building a member
    /// expression where possible.
    pub fn make_member(src: &Rc<Expression>, member: &str, ns: &dyn Namespace) -> Rc<Expression> {
        let src_type = ns.follow(&src.ty);
        precondition!(src_type.is_struct_or_union());
        match &src.kind {
            ExpressionKind::ConstantStruct { members } => {
                if let Some(value) = src_type
                    .member_number(member)
                    .and_then(|no| members.get(no))
                {
                    return value.clone();
                }
            }
            ExpressionKind::With {
                source,
                update_field,
                update_value,
            } => {
                if let ExpressionKind::ConstantString { value } = &update_field.kind {
                    if value.as_ref() == member {
                        return update_value.clone();
                    }
                    return Self::make_member(source, member, ns);
                }
                assume_unreachable!("a struct update must name a member");
            }
            ExpressionKind::Typecast { from } => {
                return Self::make_member(from, member, ns);
            }
            _ => {}
        }
        let member_type = match src_type.member_type(member) {
            Some(ty) => ty,
            None => assume_unreachable!("the member must belong to the struct type"),
        };
        Expression::member(src.clone(), member, member_type)
    }
}
