// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::{Expression, ExpressionKind};
use crate::object_numbering::ObjectNumber;

use itertools::Itertools;
use log_derive::*;
use rpds::HashTrieMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter, Result};
use std::rc::Rc;

/// The byte offset into an object that a pointer refers to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Offset {
    Exact(i128),
    /// Any offset is possible.
    Unknown,
}

impl Offset {
    pub fn is_set(&self) -> bool {
        matches!(self, Offset::Exact(..))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Offset::Exact(0))
    }

    /// Adds delta to an exact offset. If either side is unknown, or the sum overflows,
    /// the result is unknown.
    pub fn offset_by(&self, delta: Option<i128>) -> Offset {
        match (self, delta) {
            (Offset::Exact(offset), Some(delta)) => match offset.checked_add(delta) {
                Some(sum) => Offset::Exact(sum),
                None => Offset::Unknown,
            },
            _ => Offset::Unknown,
        }
    }

    /// The least upper bound of the two offsets: exact only if both are exact and equal.
    pub fn join(&self, other: &Offset) -> Offset {
        match (self, other) {
            (Offset::Exact(o1), Offset::Exact(o2)) if o1 == o2 => *self,
            _ => Offset::Unknown,
        }
    }
}

/// The objects, and offsets into them, that a location may refer to.
///
/// The backing map is persistent: cloning an object map shares all of its structure and
/// every update copies the nodes it changes, so an update through one handle can never
/// be observed through another.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ObjectMap {
    map: HashTrieMap<ObjectNumber, Offset>,
}

impl Debug for ObjectMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map()
            .entries(self.map.iter().sorted_by_key(|(n, _)| **n))
            .finish()
    }
}

impl ObjectMap {
    pub fn new() -> ObjectMap {
        ObjectMap::default()
    }

    pub fn len(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, n: ObjectNumber) -> Option<Offset> {
        self.map.get(&n).copied()
    }

    pub fn contains(&self, n: ObjectNumber) -> bool {
        self.map.contains_key(&n)
    }

    /// Iterates over the entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectNumber, Offset)> + '_ {
        self.map.iter().map(|(n, o)| (*n, *o))
    }

    /// Iterates over the entries in object number order.
    pub fn sorted(&self) -> impl Iterator<Item = (ObjectNumber, Offset)> + '_ {
        self.iter().sorted_by_key(|(n, _)| *n)
    }

    /// Adds object n with the given offset. If n is already present with a different
    /// offset, the offset of the entry becomes unknown.
    /// Returns true if the map changed.
    #[logfn(TRACE)]
    pub fn insert(&mut self, n: ObjectNumber, offset: Offset) -> bool {
        match self.map.get(&n) {
            None => {
                self.map.insert_mut(n, offset);
                true
            }
            Some(old) => {
                let joined = old.join(&offset);
                if joined == *old {
                    false
                } else {
                    self.map.insert_mut(n, joined);
                    true
                }
            }
        }
    }

    /// Sets the entry for n, discarding any previous offset.
    pub fn set(&mut self, n: ObjectNumber, offset: Offset) {
        self.map.insert_mut(n, offset);
    }

    /// Inserts every entry of other into self. Returns true if self changed.
    #[logfn(TRACE)]
    pub fn union(&mut self, other: &ObjectMap) -> bool {
        if self.map.is_empty() {
            if other.map.is_empty() {
                return false;
            }
            self.map = other.map.clone();
            return true;
        }
        let mut changed = false;
        for (n, offset) in other.iter() {
            if self.insert(n, offset) {
                changed = true;
            }
        }
        changed
    }
}

/// An object together with the offset into it, as handed to clients of value set queries.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectDescriptor {
    pub object: Rc<Expression>,
    /// None for unknown and invalid objects, which have no meaningful offset.
    pub offset: Option<Offset>,
}

impl ObjectDescriptor {
    pub fn new(object: Rc<Expression>, offset: Offset) -> ObjectDescriptor {
        let offset = match &object.kind {
            ExpressionKind::Unknown | ExpressionKind::Invalid => None,
            _ => Some(offset),
        };
        ObjectDescriptor { object, offset }
    }

    /// The exact offset into the object, if known.
    pub fn exact_offset(&self) -> Option<i128> {
        match self.offset {
            Some(Offset::Exact(offset)) => Some(offset),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.object.is_unknown()
    }
}

impl Display for ObjectDescriptor {
    /// Unknown and invalid objects print as just the object, other objects as
    /// <object, offset, type> with * for an unknown offset.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.offset {
            None => Display::fmt(&self.object, f),
            Some(Offset::Exact(offset)) => {
                f.write_fmt(format_args!("<{}, {}, {}>", self.object, offset, self.object.ty))
            }
            Some(Offset::Unknown) => {
                f.write_fmt(format_args!("<{}, *, {}>", self.object, self.object.ty))
            }
        }
    }
}
