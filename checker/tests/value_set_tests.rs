// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::*;
use std::rc::Rc;
use value_set::expression::{Expression, ExpressionKind, SideEffectKind};
use value_set::object_numbering::ObjectNumbering;
use value_set::path::Path;
use value_set::types::{self, ArraySize, SizeError, Type};
use value_set::value_set::ValueSet;

#[test]
fn address_of_variable() {
    let ns = symbols();
    let mut vs = new_value_set();
    let p = var("p", int_ptr());
    vs.assign(&p, &address_of_int("x"), &ns, false).unwrap();
    assert_eq!(objects_of(&vs, &p, &ns), strings(&["<x, 0, int32>"]));
}

#[test]
fn untracked_variable_is_unknown() {
    let ns = symbols();
    let vs = new_value_set();
    assert_eq!(objects_of(&vs, &var("p", int_ptr()), &ns), strings(&["unknown"]));
}

#[test]
fn scalar_constants_point_nowhere() {
    let ns = symbols();
    let vs = new_value_set();
    assert!(objects_of(&vs, &Expression::constant_int(7, int()), &ns).is_empty());
    assert!(objects_of(&vs, &Expression::constant_string("hello"), &ns).is_empty());
}

#[test]
fn null_points_to_the_null_object() {
    let ns = symbols();
    let vs = new_value_set();
    assert_eq!(
        objects_of(&vs, &var("NULL", int_ptr()), &ns),
        strings(&["<NULL-object, 0, int32>"])
    );
}

#[test]
fn nondet_contributes_nothing() {
    let ns = symbols();
    let vs = new_value_set();
    let nondet = Expression::side_effect(SideEffectKind::Nondet, int_ptr());
    assert!(objects_of(&vs, &nondet, &ns).is_empty());
}

#[test]
fn conditional_is_the_union_of_both_branches() {
    let ns = symbols();
    let mut vs = new_value_set();
    let p = var("p", int_ptr());
    let q = var("q", int_ptr());
    vs.assign(&p, &address_of_int("a"), &ns, false).unwrap();
    vs.assign(&q, &address_of_int("b"), &ns, false).unwrap();
    let choice = Expression::if_then_else(var("c", Rc::new(Type::Bool)), p, q);
    assert_eq!(
        objects_of(&vs, &choice, &ns),
        strings(&["<a, 0, int32>", "<b, 0, int32>"])
    );
}

#[test]
fn pointer_arithmetic_scales_by_element_size() {
    let ns = symbols();
    let mut vs = new_value_set();
    let long = Type::signed_int(64);
    let long_ptr = Type::pointer_to(long.clone());
    let byte_ptr = Type::pointer_to(Type::unsigned_int(8));
    let arr = var("arr", Type::array_of(long, 10));

    // q = (unsigned char *)&arr; p = (long *)(q + 4);
    let q = var("q", byte_ptr.clone());
    let p = var("p", long_ptr.clone());
    vs.assign(
        &q,
        &Expression::typecast(Expression::address_of(arr), byte_ptr.clone()),
        &ns,
        false,
    )
    .unwrap();
    let q_plus_4 = Expression::add(q, Expression::index_constant(4), byte_ptr);
    vs.assign(&p, &Expression::typecast(q_plus_4, long_ptr.clone()), &ns, false)
        .unwrap();
    assert_eq!(objects_of(&vs, &p, &ns), strings(&["<arr, 4, int64[10]>"]));

    let p_plus_3 = Expression::add(p.clone(), Expression::index_constant(3), long_ptr.clone());
    assert_eq!(
        objects_of(&vs, &p_plus_3, &ns),
        strings(&["<arr, 28, int64[10]>"])
    );
    let p_minus_1 = Expression::sub(p.clone(), Expression::index_constant(1), long_ptr.clone());
    assert_eq!(
        objects_of(&vs, &p_minus_1, &ns),
        strings(&["<arr, -4, int64[10]>"])
    );

    // An unknown offset stays unknown, whatever is added.
    let i = var("i", Type::index_type());
    let p_plus_i = Expression::add(p, i, long_ptr.clone());
    assert_eq!(objects_of(&vs, &p_plus_i, &ns), strings(&["<arr, *, int64[10]>"]));
    let r = var("r", long_ptr.clone());
    vs.assign(&r, &p_plus_i, &ns, false).unwrap();
    let r_plus_3 = Expression::add(r, Expression::index_constant(3), long_ptr);
    assert_eq!(objects_of(&vs, &r_plus_3, &ns), strings(&["<arr, *, int64[10]>"]));
}

#[test]
fn void_pointer_arithmetic_counts_bytes() {
    let ns = symbols();
    let mut vs = new_value_set();
    let void_ptr = Type::pointer_to(Rc::new(Type::Empty));
    let v = var("v", void_ptr.clone());
    vs.assign(
        &v,
        &Expression::typecast(address_of_int("x"), void_ptr.clone()),
        &ns,
        false,
    )
    .unwrap();
    let v_plus_2 = Expression::add(v, Expression::index_constant(2), void_ptr);
    assert_eq!(objects_of(&vs, &v_plus_2, &ns), strings(&["<x, 2, int32>"]));
}

#[test]
fn arithmetic_on_dynamically_sized_elements_loses_the_offset() {
    let ns = symbols();
    let mut vs = new_value_set();
    let vla = Rc::new(Type::Array {
        subtype: int(),
        size: ArraySize::Dynamic,
    });
    let vla_ptr = Type::pointer_to(vla.clone());
    let p = var("p", vla_ptr.clone());
    vs.assign(&p, &Expression::address_of(var("a", vla)), &ns, false)
        .unwrap();
    let p_plus_1 = Expression::add(p.clone(), Expression::index_constant(1), vla_ptr.clone());
    assert_eq!(objects_of(&vs, &p_plus_1, &ns), strings(&["<a, *, int32[*]>"]));
    // Adding zero never needs the element size.
    let p_plus_0 = Expression::add(p, Expression::index_constant(0), vla_ptr);
    assert_eq!(objects_of(&vs, &p_plus_0, &ns), strings(&["<a, 0, int32[*]>"]));
}

#[test]
fn offsets_that_overflow_become_unknown() {
    let ns = symbols();
    let mut vs = new_value_set();
    let long = Type::signed_int(64);
    let long_ptr = Type::pointer_to(long.clone());
    let byte_ptr = Type::pointer_to(Type::unsigned_int(8));
    let p = var("p", long_ptr.clone());
    let q = var("q", byte_ptr.clone());
    vs.assign(&p, &Expression::address_of(var("x", long)), &ns, false)
        .unwrap();
    vs.assign(&q, &Expression::typecast(p.clone(), byte_ptr.clone()), &ns, false)
        .unwrap();

    // The scaled offset does not fit.
    let far = Expression::add(p, Expression::index_constant(i128::MAX / 2), long_ptr);
    assert_eq!(objects_of(&vs, &far, &ns), strings(&["<x, *, int64>"]));
    // Neither does its negation.
    let before = Expression::sub(q.clone(), Expression::index_constant(i128::MIN), byte_ptr.clone());
    assert_eq!(objects_of(&vs, &before, &ns), strings(&["<x, *, int64>"]));
    // Nor the sum with the offset already recorded.
    let r = var("r", byte_ptr.clone());
    vs.assign(
        &r,
        &Expression::add(q, Expression::index_constant(i128::MAX), byte_ptr.clone()),
        &ns,
        false,
    )
    .unwrap();
    assert_eq!(objects_of(&vs, &r, &ns), vec![format!("<x, {}, int64>", i128::MAX)]);
    let r_plus_1 = Expression::add(r, Expression::index_constant(1), byte_ptr);
    assert_eq!(objects_of(&vs, &r_plus_1, &ns), strings(&["<x, *, int64>"]));
}

#[test]
fn sizes_that_overflow_are_too_large() {
    let ns = symbols();
    let long = Type::signed_int(64);
    let big = Type::array_of(long, u64::MAX);
    assert_eq!(
        types::pointer_offset_size(&big, &ns),
        Ok(i128::from(u64::MAX) * 8)
    );
    let huge = Type::array_of(big.clone(), u64::MAX);
    assert_eq!(types::pointer_offset_size(&huge, &ns), Err(SizeError::TooLarge));
    let halves = Rc::new(Type::Struct {
        tag: Rc::from("Halves"),
        members: vec![
            types::Member {
                name: Rc::from("first"),
                ty: Type::array_of(big.clone(), u64::MAX / 16),
            },
            types::Member {
                name: Rc::from("second"),
                ty: Type::array_of(big, u64::MAX / 16),
            },
        ],
    });
    assert_eq!(types::pointer_offset_size(&halves, &ns), Err(SizeError::TooLarge));

    // Stepping over an element of such a type loses the offset.
    let mut vs = new_value_set();
    let halves_ptr = Type::pointer_to(halves.clone());
    let p = var("p", halves_ptr.clone());
    vs.assign(&p, &Expression::address_of(var("h", halves)), &ns, false)
        .unwrap();
    let p_plus_0 = Expression::add(p.clone(), Expression::index_constant(0), halves_ptr.clone());
    assert_eq!(objects_of(&vs, &p_plus_0, &ns), strings(&["<h, 0, struct Halves>"]));
    let p_plus_1 = Expression::add(p, Expression::index_constant(1), halves_ptr);
    assert_eq!(objects_of(&vs, &p_plus_1, &ns), strings(&["<h, *, struct Halves>"]));
}

#[test]
#[should_panic]
fn pointer_plus_pointer_is_rejected() {
    let ns = symbols();
    let vs = new_value_set();
    let sum = Expression::add(var("p", int_ptr()), var("q", int_ptr()), int_ptr());
    vs.get_value_set(&sum, &ns);
}

#[test]
#[should_panic]
fn array_literal_must_not_reach_the_evaluator() {
    let ns = symbols();
    let vs = new_value_set();
    let literal = Expression::constant_array(
        vec![address_of_int("x")],
        Type::array_of(int_ptr(), 1),
    );
    vs.get_value_set(&literal, &ns);
}

#[test]
fn reference_set_of_variables_and_elements() {
    let ns = symbols();
    let vs = new_value_set();
    let arr = var("arr", Type::array_of(int(), 10));
    assert_eq!(references_of(&vs, &arr, &ns), strings(&["<arr, 0, int32[10]>"]));

    let element = Expression::index(arr.clone(), Expression::index_constant(2), int());
    assert_eq!(
        references_of(&vs, &element, &ns),
        strings(&["<arr[0], 2, int32>"])
    );
    let element = Expression::index(arr, var("i", Type::index_type()), int());
    assert_eq!(
        references_of(&vs, &element, &ns),
        strings(&["<arr[0], *, int32>"])
    );
}

#[test]
fn index_into_an_array_reached_at_an_offset() {
    let ns = symbols();
    let mut vs = new_value_set();
    let array_type = Type::array_of(int(), 10);
    let array_ptr = Type::pointer_to(array_type.clone());
    let byte_ptr = Type::pointer_to(Type::unsigned_int(8));
    let arr = var("arr", array_type.clone());
    let q = var("q", byte_ptr.clone());
    let p = var("p", array_ptr.clone());

    // q = (unsigned char *)&arr; p = (int (*)[10])(q + 4);
    vs.assign(
        &q,
        &Expression::typecast(Expression::address_of(arr), byte_ptr.clone()),
        &ns,
        false,
    )
    .unwrap();
    let q_plus_4 = Expression::add(q, Expression::index_constant(4), byte_ptr);
    vs.assign(&p, &Expression::typecast(q_plus_4, array_ptr), &ns, false)
        .unwrap();
    assert_eq!(objects_of(&vs, &p, &ns), strings(&["<arr, 4, int32[10]>"]));

    let row = Expression::dereference(p, array_type);
    let first = Expression::index(row.clone(), Expression::index_constant(0), int());
    assert_eq!(references_of(&vs, &first, &ns), strings(&["<arr[0], 4, int32>"]));
    // The constant index is not added to the offset the array was reached at.
    let third = Expression::index(row, Expression::index_constant(2), int());
    assert_eq!(references_of(&vs, &third, &ns), strings(&["<arr[0], *, int32>"]));
}

#[test]
fn reference_set_of_extracted_bytes() {
    let ns = symbols();
    let vs = new_value_set();
    let x = var("x", int());
    let byte = Type::unsigned_int(8);
    let at_2 = Expression::byte_extract(x.clone(), Expression::index_constant(2), byte.clone());
    assert_eq!(references_of(&vs, &at_2, &ns), strings(&["<x, 2, int32>"]));
    let at_i = Expression::byte_extract(x, var("i", Type::index_type()), byte);
    assert_eq!(references_of(&vs, &at_i, &ns), strings(&["<x, *, int32>"]));
}

#[test]
fn sub_arrays_are_referenced_without_an_offset() {
    let ns = symbols();
    let vs = new_value_set();
    let matrix = var("m", Type::array_of(Type::array_of(int(), 4), 3));
    assert_eq!(references_of(&vs, &matrix, &ns), strings(&["<m, *, int32[4][3]>"]));
}

#[test]
fn reference_set_of_members() {
    let ns = symbols();
    let vs = new_value_set();
    let s = var("s", pair_type());
    let member = Expression::member(s, "a", int_ptr());
    assert_eq!(references_of(&vs, &member, &ns), strings(&["<s.a, 0, int32 *>"]));
}

#[test]
fn dereference_of_unknown_pointer_is_unknown() {
    let ns = symbols();
    let vs = new_value_set();
    let deref = Expression::dereference(var("p", int_ptr()), int());
    assert_eq!(references_of(&vs, &deref, &ns), strings(&["unknown"]));
}

#[test]
fn value_of_dereference() {
    let ns = symbols();
    let mut vs = new_value_set();
    let p = var("p", int_ptr());
    let pp = var("pp", int_ptr_ptr());
    vs.assign(&p, &address_of_int("x"), &ns, false).unwrap();
    vs.assign(&pp, &Expression::address_of(p.clone()), &ns, false)
        .unwrap();
    let deref = Expression::dereference(pp, int_ptr());
    assert_eq!(references_of(&vs, &deref, &ns), strings(&["<p, 0, int32 *>"]));
    assert_eq!(objects_of(&vs, &deref, &ns), strings(&["<x, 0, int32>"]));
}

#[test]
fn dereference_of_an_anonymous_heap_object_is_unknown() {
    let ns = symbols();
    let mut vs = new_value_set();
    let anonymous = Expression::new(
        ExpressionKind::DynamicObject {
            instance: None,
            invalid: false,
            unknown: false,
        },
        int_ptr(),
    );
    let p = var("p", int_ptr_ptr());
    vs.assign(&p, &Expression::address_of(anonymous), &ns, false)
        .unwrap();
    assert_eq!(objects_of(&vs, &p, &ns), strings(&["<dynamic_object, 0, int32 *>"]));

    let target = Expression::dereference(p, int_ptr());
    assert_eq!(objects_of(&vs, &target, &ns), strings(&["unknown"]));
    // There is no entry to write either.
    vs.assign(&target, &address_of_int("x"), &ns, false).unwrap();
    assert_eq!(vs.len(), 1);
    assert_eq!(objects_of(&vs, &target, &ns), strings(&["unknown"]));
}

#[test]
fn new_allocates_the_pointed_to_type() {
    let ns = symbols();
    let mut vs = new_value_set();
    vs.location_number = 4;
    let new_int = Expression::side_effect(SideEffectKind::CppNew, int_ptr());
    assert_eq!(objects_of(&vs, &new_int, &ns), strings(&["<dynamic_object4, 0, int32>"]));
    let new_pairs =
        Expression::side_effect(SideEffectKind::CppNewArray, Type::pointer_to(pair_type()));
    assert_eq!(
        objects_of(&vs, &new_pairs, &ns),
        strings(&["<dynamic_object4, 0, struct S>"])
    );

    let p = var("p", int_ptr());
    vs.assign(&p, &new_int, &ns, false).unwrap();
    assert_eq!(objects_of(&vs, &p, &ns), strings(&["<dynamic_object4, 0, int32>"]));
}

#[test]
fn with_update_joins_base_and_update() {
    let ns = symbols();
    let mut vs = new_value_set();
    let s = var("s", pair_type());
    let s_a = Expression::member(s.clone(), "a", int_ptr());
    vs.assign(&s_a, &address_of_int("x"), &ns, false).unwrap();
    let updated = Expression::with_member(s, "a", address_of_int("z"));
    let member = Expression::member(updated, "a", int_ptr());
    assert_eq!(
        objects_of(&vs, &member, &ns),
        strings(&["<x, 0, int32>", "<z, 0, int32>"])
    );
}

#[test]
fn union_is_monotone_and_idempotent() {
    let ns = symbols();
    let objects = ObjectNumbering::new();
    let p = var("p", int_ptr());
    let q = var("q", int_ptr());

    let mut a = ValueSet::new(objects.clone());
    a.assign(&p, &address_of_int("x"), &ns, false).unwrap();
    let mut b = ValueSet::new(objects);
    b.assign(&p, &address_of_int("y"), &ns, false).unwrap();
    b.assign(&q, &address_of_int("x"), &ns, false).unwrap();

    assert!(a.make_union(&b, true));
    assert_eq!(
        objects_of(&a, &p, &ns),
        strings(&["<x, 0, int32>", "<y, 0, int32>"])
    );
    assert_eq!(objects_of(&a, &q, &ns), strings(&["<x, 0, int32>"]));
    assert!(!a.make_union(&b, true));
    // b is unaffected.
    assert_eq!(objects_of(&b, &p, &ns), strings(&["<y, 0, int32>"]));
}

#[test]
fn union_without_keep_new_retains_only_heap_and_return_entries() {
    let ns = symbols();
    let objects = ObjectNumbering::new();
    let mut a = ValueSet::new(objects.clone());
    let mut b = ValueSet::new(objects);
    b.assign(&var("q", int_ptr()), &address_of_int("x"), &ns, false)
        .unwrap();
    b.assign(
        &Expression::return_value(int_ptr()),
        &address_of_int("x"),
        &ns,
        false,
    )
    .unwrap();
    b.location_number = 7;
    let p = var("p", int_ptr());
    b.assign(
        &p,
        &Expression::typecast(Expression::malloc(int_ptr()), int_ptr_ptr()),
        &ns,
        false,
    )
    .unwrap();
    b.assign(
        &Expression::dereference(p, int_ptr()),
        &address_of_int("y"),
        &ns,
        false,
    )
    .unwrap();

    assert!(a.make_union(&b, false));
    assert!(a.get_entry(&Path::new_variable(Rc::from("q"))).is_none());
    assert!(a.get_entry(&Path::new_variable(Rc::from("p"))).is_none());
    assert!(a.get_entry(&Path::new_return_value()).is_some());
    assert!(a.get_entry(&Path::new_dynamic_object(7)).is_some());
    assert!(!a.make_union(&b, false));
}

#[test]
#[should_panic]
fn union_requires_a_shared_numbering() {
    let mut a = new_value_set();
    let b = new_value_set();
    a.make_union(&b, true);
}

#[test]
fn add_var_and_clear() {
    let ns = symbols();
    let mut vs = new_value_set();
    let path = Path::new_variable(Rc::from("p"));
    vs.add_var(path.clone());
    assert!(vs.get_entry(&path).unwrap().is_empty());
    // An empty entry is tracked, but points nowhere.
    assert!(objects_of(&vs, &var("p", int_ptr()), &ns).is_empty());
    vs.clear();
    assert!(vs.is_empty());
}

#[test]
fn output_format() {
    let ns = symbols();
    let mut vs = new_value_set();
    vs.assign(&var("p", int_ptr()), &address_of_int("x"), &ns, false)
        .unwrap();
    vs.assign(
        &Expression::return_value(int_ptr()),
        &var("q", int_ptr()),
        &ns,
        false,
    )
    .unwrap();
    let mut buffer = Vec::new();
    vs.output(&mut buffer).unwrap();
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "RETURN_VALUE = { unknown } \np = { <x, 0, int32> } \n"
    );
}

#[test]
fn output_wraps_long_lines() {
    let ns = symbols();
    let mut vs = new_value_set();
    let p = var("p", int_ptr());
    for name in ["first", "second", "third", "fourth"] {
        vs.assign(&p, &address_of_int(name), &ns, true).unwrap();
    }
    let mut buffer = Vec::new();
    vs.output(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert_eq!(
        text,
        "p = { <first, 0, int32>, <second, 0, int32>, <third, 0, int32>, \n      <fourth, 0, int32> } \n"
    );
}
