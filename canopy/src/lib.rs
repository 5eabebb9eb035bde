// Copyright 2025 canopy Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! canopy - region-scoped eviction for tree caches.
//!
//! The engine lives in [`canopy_eviction`]. This crate re-exports it and adds [`NodeTree`], a hierarchical node store
//! that feeds the engine and carries out its eviction decisions.

mod prelude;
mod tree;

pub use prelude::*;
pub use tree::{NodeTree, NodeValue};
