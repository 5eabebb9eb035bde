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

use canopy_common::{
    error::{Error, Result},
    fqn::Fqn,
};

use super::EvictionQueue;
use crate::{
    entry::NodeEntry,
    list::{Cursor, EvictionQueueList},
};

/// A queue that tracks nothing.
#[derive(Debug, Default)]
pub struct NullQueue {
    // Always empty, only hands out cursors.
    empty: EvictionQueueList<()>,
}

impl EvictionQueue for NullQueue {
    fn get_first_node_entry(&self) -> Option<&NodeEntry> {
        None
    }

    fn get_node_entry(&self, _: &Fqn) -> Option<&NodeEntry> {
        None
    }

    fn add_node_entry(&mut self, _: NodeEntry) -> Result<()> {
        Ok(())
    }

    fn remove_node_entry(&mut self, _: &Fqn) -> Option<NodeEntry> {
        None
    }

    fn visit_node_entry(&mut self, _: &Fqn, _: u64) -> bool {
        false
    }

    fn modify_element_count(&mut self, _: &Fqn, _: isize, _: u64) -> bool {
        false
    }

    fn number_of_nodes(&self) -> usize {
        0
    }

    fn number_of_elements(&self) -> usize {
        0
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &NodeEntry> + '_> {
        Box::new(std::iter::empty())
    }

    fn cursor(&self) -> Cursor {
        self.empty.cursor()
    }

    fn cursor_next<'a>(&'a self, _: &mut Cursor) -> Result<Option<&'a NodeEntry>> {
        Ok(None)
    }

    fn cursor_remove(&mut self, _: &mut Cursor) -> Result<NodeEntry> {
        Err(Error::IllegalState("null queue holds no entry"))
    }

    fn clear(&mut self) {}
}
