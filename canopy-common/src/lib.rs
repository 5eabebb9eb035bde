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

//! Shared components and utils for canopy.

/// Allow to enable debug assertions in release profile with feature "strict_assertions".
pub mod assert;
/// Time source used to stamp node entries and expire pins.
pub mod clock;
/// The canopy error and result types.
pub mod error;
/// Hierarchical node path.
pub mod fqn;
/// A concurrent object pool.
pub mod object_pool;
/// A generational slab arena.
pub mod slab;
