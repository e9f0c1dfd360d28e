// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
// A value set (points-to) analysis over a small C like intermediate representation.
// For every tracked location, a value set records the objects, and the byte offsets into
// them, that the value stored at the location may point to. The transfer functions in
// assign, code and evaluate update and query this state, and make_union joins two states
// during fixed point iteration.

pub mod assign;
pub mod code;
pub mod driver;
pub mod errors;
pub mod evaluate;
pub mod expression;
pub mod object_map;
pub mod object_numbering;
pub mod options;
pub mod path;
pub mod types;
pub mod value_set;
