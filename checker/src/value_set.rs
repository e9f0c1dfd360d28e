// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::Expression;
use crate::object_map::{ObjectDescriptor, ObjectMap, Offset};
use crate::object_numbering::ObjectNumbering;
use crate::path::Path;
use crate::types::Type;

use itertools::Itertools;
use log::info;
use log_derive::{logfn, logfn_inputs};
use mirai_annotations::*;
use rpds::HashTrieMap;
use std::fmt::{Debug, Formatter, Result};
use std::io;
use std::io::Write;
use std::rc::Rc;

/// The abstract state of one program point: for every tracked location, the objects
/// (and offsets into them) that the value stored at the location may point to.
#[derive(Clone)]
pub struct ValueSet {
    /// The number of the statement being interpreted. Heap objects are named after the
    /// location of the statement that allocates them.
    pub location_number: usize,
    /// Locations without an entry have an unknown value.
    values: HashTrieMap<Rc<Path>, ObjectMap>,
    objects: Rc<ObjectNumbering>,
}

impl Debug for ValueSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map()
            .entries(self.values.iter().sorted_by_key(|(p, _)| *p))
            .finish()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &ValueSet) -> bool {
        Rc::ptr_eq(&self.objects, &other.objects) && self.values == other.values
    }
}

impl Eq for ValueSet {}

/// Construction and access
impl ValueSet {
    /// Returns an empty value set whose objects are numbered by the given table.
    pub fn new(objects: Rc<ObjectNumbering>) -> ValueSet {
        ValueSet {
            location_number: 0,
            values: HashTrieMap::default(),
            objects,
        }
    }

    /// The numbering shared by this value set and every value set derived from it.
    pub fn objects(&self) -> &Rc<ObjectNumbering> {
        &self.objects
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.values = HashTrieMap::default();
    }

    /// The number of tracked locations.
    pub fn len(&self) -> usize {
        self.values.size()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the objects recorded for the given location, if the location is tracked.
    pub fn get_entry(&self, path: &Rc<Path>) -> Option<&ObjectMap> {
        self.values.get(path)
    }

    /// Iterates over all tracked locations, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&Rc<Path>, &ObjectMap)> {
        self.values.iter()
    }

    /// Starts tracking the given location, with an empty object map, if it is not tracked already.
    pub fn add_var(&mut self, path: Rc<Path>) {
        if !self.values.contains_key(&path) {
            self.values.insert_mut(path, ObjectMap::new());
        }
    }

    /// Updates the entry for path. A weak update (add_to_sets) joins values into the
    /// existing entry, a strong update replaces it.
    #[logfn_inputs(TRACE)]
    pub(crate) fn update_entry(&mut self, path: Rc<Path>, values: &ObjectMap, add_to_sets: bool) {
        if add_to_sets {
            let mut object_map = self.values.get(&path).cloned().unwrap_or_default();
            if object_map.union(values) || !self.values.contains_key(&path) {
                self.values.insert_mut(path, object_map);
            }
        } else {
            self.values.insert_mut(path, values.clone());
        }
    }

    /// Replaces the entry for path without joining.
    pub(crate) fn set_entry(&mut self, path: Rc<Path>, values: ObjectMap) {
        self.values.insert_mut(path, values);
    }

    /// Adds object to dest, numbering it if necessary.
    pub(crate) fn insert_object(
        &self,
        dest: &mut ObjectMap,
        object: &Rc<Expression>,
        offset: Offset,
    ) -> bool {
        let n = self.objects.number(object);
        dest.insert(n, offset)
    }

    /// Adds the unknown object of the given type to dest.
    pub(crate) fn insert_unknown(&self, dest: &mut ObjectMap, ty: &Rc<Type>) -> bool {
        self.insert_object(dest, &Expression::unknown(ty.clone()), Offset::Unknown)
    }

    /// Translates an object map into the descriptors handed out to clients, in a
    /// deterministic order.
    pub fn to_descriptors(&self, object_map: &ObjectMap) -> Vec<ObjectDescriptor> {
        object_map
            .sorted()
            .map(|(n, offset)| ObjectDescriptor::new(self.objects.object(n), offset))
            .collect()
    }
}

/// Join
impl ValueSet {
    /// Joins other into self. Locations that are only tracked by other are added to self
    /// if keep_new is true, or if they are rooted by a dynamic object or the return value.
    /// Returns true if self changed.
    #[logfn_inputs(TRACE)]
    #[logfn(TRACE)]
    pub fn make_union(&mut self, other: &ValueSet, keep_new: bool) -> bool {
        checked_precondition!(Rc::ptr_eq(&self.objects, &other.objects));
        let mut changed = false;
        for (path, new_map) in other.values.iter() {
            match self.values.get(path).cloned() {
                None => {
                    if keep_new || path.is_always_retained() {
                        self.values.insert_mut(path.clone(), new_map.clone());
                        changed = true;
                    }
                }
                Some(mut object_map) => {
                    if object_map.union(new_map) {
                        self.values.insert_mut(path.clone(), object_map);
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

/// Output
impl ValueSet {
    /// Writes one line per tracked location, in path order.
    pub fn output<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (path, object_map) in self
            .values
            .iter()
            .sorted_by_key(|(p, _)| p.to_string())
        {
            write!(out, "{} = {{ ", path)?;
            let descriptors = self.to_descriptors(object_map);
            let mut width = 0;
            for (i, descriptor) in descriptors.iter().enumerate() {
                let result = descriptor.to_string();
                write!(out, "{}", result)?;
                width += result.len();
                if i + 1 < descriptors.len() {
                    write!(out, ", ")?;
                    if width >= 40 {
                        write!(out, "\n      ")?;
                        width = 0;
                    }
                }
            }
            writeln!(out, " }} ")?;
        }
        Ok(())
    }

    /// Writes the output to the log.
    pub fn dump(&self) {
        let mut buffer = Vec::new();
        if self.output(&mut buffer).is_ok() {
            info!("{}", String::from_utf8_lossy(&buffer));
        }
    }
}
