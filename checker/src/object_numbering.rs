// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::Expression;

use mirai_annotations::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// A small dense number that stands for an object descriptor in object maps.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectNumber(pub u32);

/// An append only table that numbers object descriptors by their structure.
/// Structurally equal descriptors always get the same number and numbers are never reused.
///
/// A numbering is owned by an analysis session and shared (via Rc) by all of the value sets
/// of that session. Object maps only have meaning relative to the numbering they were built
/// with. The table is not synchronized: sessions that run in parallel need their own tables.
#[derive(Default)]
pub struct ObjectNumbering {
    objects: RefCell<Vec<Rc<Expression>>>,
    numbers: RefCell<HashMap<Rc<Expression>, ObjectNumber>>,
}

impl Debug for ObjectNumbering {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_list().entries(self.objects.borrow().iter()).finish()
    }
}

impl ObjectNumbering {
    pub fn new() -> Rc<ObjectNumbering> {
        Rc::new(ObjectNumbering::default())
    }

    /// Returns the number of the given object, allocating the next free number if the
    /// object has not been seen before.
    pub fn number(&self, object: &Rc<Expression>) -> ObjectNumber {
        if let Some(n) = self.numbers.borrow().get(object) {
            return *n;
        }
        let mut objects = self.objects.borrow_mut();
        checked_assume!(objects.len() < u32::MAX as usize);
        let n = ObjectNumber(objects.len() as u32);
        objects.push(object.clone());
        self.numbers.borrow_mut().insert(object.clone(), n);
        n
    }

    /// Returns the object with the given number.
    /// The number must have been handed out by this table.
    pub fn object(&self, n: ObjectNumber) -> Rc<Expression> {
        let objects = self.objects.borrow();
        checked_precondition!((n.0 as usize) < objects.len());
        objects[n.0 as usize].clone()
    }

    /// The number of distinct objects seen so far.
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}
