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

use std::{
    collections::BTreeMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use canopy_common::{
    fqn::Fqn,
    slab::{Slab, Token},
    strict_assert,
};
use canopy_eviction::{action::EvictionAction, event::EventType, region_manager::RegionManager};
use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::RwLock;

/// Value stored in the data of a [`NodeTree`] node.
pub trait NodeValue: Clone + Send + Sync + 'static {
    /// Interpret the value as an absolute expiration time in millis.
    fn as_expiration(&self) -> Option<u64> {
        None
    }
}

impl NodeValue for u64 {
    fn as_expiration(&self) -> Option<u64> {
        Some(*self)
    }
}

impl NodeValue for String {
    fn as_expiration(&self) -> Option<u64> {
        self.parse().ok()
    }
}

impl NodeValue for Vec<u8> {}

struct TreeNode<V> {
    fqn: Fqn,
    parent: Option<Token>,
    children: BTreeMap<String, Token>,
    data: BTreeMap<String, V>,
    /// `false` for a node whose data was evicted while it still had children.
    resident: bool,
}

impl<V> TreeNode<V> {
    fn new(fqn: Fqn, parent: Option<Token>) -> Self {
        Self {
            fqn,
            parent,
            children: BTreeMap::new(),
            data: BTreeMap::new(),
            resident: true,
        }
    }
}

/// Arena of tree nodes with parent and child links.
struct Arena<V> {
    nodes: Slab<TreeNode<V>>,
    index: HashMap<Fqn, Token>,
    root: Token,
}

impl<V> Arena<V> {
    fn new() -> Self {
        let mut nodes = Slab::default();
        let root = nodes.insert(TreeNode::new(Fqn::root(), None));
        let mut index = HashMap::new();
        index.insert(Fqn::root(), root);
        Self { nodes, index, root }
    }

    fn node(&self, fqn: &Fqn) -> Option<&TreeNode<V>> {
        self.index.get(fqn).and_then(|&token| self.nodes.get(token))
    }

    fn node_mut(&mut self, fqn: &Fqn) -> Option<&mut TreeNode<V>> {
        let token = *self.index.get(fqn)?;
        self.nodes.get_mut(token)
    }

    /// Get or create the node at `fqn` and all its missing ancestors. Created paths are appended to `created`.
    fn get_or_create(&mut self, fqn: &Fqn, created: &mut Vec<Fqn>) -> Token {
        let mut parent = self.root;
        for depth in 1..=fqn.depth() {
            let path = fqn.ancestor(depth);
            parent = match self.index.get(&path) {
                Some(&token) => token,
                None => {
                    let token = self.nodes.insert(TreeNode::new(path.clone(), Some(parent)));
                    if let (Some(node), Some(name)) = (self.nodes.get_mut(parent), path.name()) {
                        node.children.insert(name.to_string(), token);
                    }
                    self.index.insert(path.clone(), token);
                    created.push(path);
                    token
                }
            };
        }
        parent
    }

    /// Like [`Arena::get_or_create`], but a placeholder at `fqn` becomes resident again and is reported in `created`.
    fn get_or_create_resident(&mut self, fqn: &Fqn, created: &mut Vec<Fqn>) -> Token {
        let token = self.get_or_create(fqn, created);
        if let Some(node) = self.nodes.get_mut(token) {
            if !node.resident {
                node.resident = true;
                created.push(fqn.clone());
            }
        }
        token
    }

    /// Remove the subtree of `token`, children before parents. Removed paths are appended to `removed`.
    ///
    /// The root node itself is never removed, its data is cleared instead.
    fn remove_subtree(&mut self, token: Token, removed: &mut Vec<Fqn>) {
        let children = match self.nodes.get_mut(token) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children.into_values() {
            self.remove_subtree(child, removed);
        }
        if token == self.root {
            if let Some(root) = self.nodes.get_mut(token) {
                root.data.clear();
                root.resident = true;
            }
            return;
        }
        if let Some(node) = self.nodes.remove(token) {
            self.index.remove(&node.fqn);
            removed.push(node.fqn);
        }
    }

    /// Unlink a removed node from its parent and drop placeholder ancestors left without children.
    fn unlink(&mut self, parent: Option<Token>, name: Option<&str>, removed: &mut Vec<Fqn>) {
        let (Some(parent), Some(name)) = (parent, name) else {
            return;
        };
        let Some(node) = self.nodes.get_mut(parent) else {
            return;
        };
        node.children.remove(name);
        if parent == self.root || node.resident || !node.children.is_empty() {
            return;
        }
        let grandparent = node.parent;
        let name = node.fqn.name().map(str::to_string);
        if let Some(node) = self.nodes.remove(parent) {
            tracing::trace!("[tree]: drop placeholder {}", node.fqn);
            self.index.remove(&node.fqn);
            removed.push(node.fqn);
        }
        self.unlink(grandparent, name.as_deref(), removed);
    }

    /// Remove the node at `fqn` and its subtree.
    fn remove_node(&mut self, fqn: &Fqn, removed: &mut Vec<Fqn>) -> bool {
        let Some(&token) = self.index.get(fqn) else {
            return false;
        };
        let parent = self.nodes.get(token).and_then(|node| node.parent);
        self.remove_subtree(token, removed);
        if token != self.root {
            self.unlink(parent, fqn.name(), removed);
        }
        true
    }

    /// Evict the node at `fqn`.
    ///
    /// Recursive eviction removes the subtree. Otherwise a node with children keeps its place as an empty placeholder
    /// and a leaf is removed.
    fn evict(&mut self, fqn: &Fqn, recursive: bool, removed: &mut Vec<Fqn>) -> bool {
        let Some(&token) = self.index.get(fqn) else {
            return false;
        };
        if recursive {
            return self.remove_node(fqn, removed);
        }
        let Some(node) = self.nodes.get_mut(token) else {
            return false;
        };
        if node.children.is_empty() && token != self.root {
            return self.remove_node(fqn, removed);
        }
        node.data.clear();
        node.resident = token == self.root;
        removed.push(fqn.clone());
        true
    }

    fn len(&self) -> usize {
        strict_assert!(self.nodes.len() == self.index.len());
        self.nodes.len()
    }
}

struct NodeTreeInner<V> {
    arena: RwLock<Arena<V>>,
    manager: Option<RegionManager>,
    recursive: AtomicBool,
}

/// A hierarchical node store keyed by [`Fqn`].
///
/// Every node holds a map of data elements. When built with a [`RegionManager`], mutations and reads are reported as
/// eviction events, and the tree carries out evictions as an [`EvictionAction`].
///
/// Cloning is cheap and clones share the same nodes.
pub struct NodeTree<V> {
    inner: Arc<NodeTreeInner<V>>,
}

impl<V> Clone for NodeTree<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Debug for NodeTree<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.inner.arena.read().len())
            .field("recursive", &self.inner.recursive.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> Default for NodeTree<V>
where
    V: NodeValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> NodeTree<V>
where
    V: NodeValue,
{
    /// Create a tree that reports nothing.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a tree that reports its events to `manager`.
    pub fn with_region_manager(manager: RegionManager) -> Self {
        Self::build(Some(manager))
    }

    fn build(manager: Option<RegionManager>) -> Self {
        Self {
            inner: Arc::new(NodeTreeInner {
                arena: RwLock::new(Arena::new()),
                manager,
                recursive: AtomicBool::new(false),
            }),
        }
    }

    /// The region manager events are reported to.
    pub fn region_manager(&self) -> Option<&RegionManager> {
        self.inner.manager.as_ref()
    }

    /// Make evictions requested by the engine remove whole subtrees.
    pub fn set_recursive_eviction(&self, recursive: bool) {
        self.inner.recursive.store(recursive, Ordering::Relaxed);
    }

    /// Returns `true` if evictions requested by the engine remove whole subtrees.
    pub fn is_recursive_eviction(&self) -> bool {
        self.inner.recursive.load(Ordering::Relaxed)
    }

    fn report(&self, events: impl IntoIterator<Item = (Fqn, EventType)>) {
        if let Some(manager) = self.inner.manager.as_ref() {
            for (fqn, kind) in events {
                manager.register_eviction_event(&fqn, kind);
            }
        }
    }

    fn report_removed(&self, removed: Vec<Fqn>) {
        self.report(removed.into_iter().map(|fqn| (fqn, EventType::RemoveNode)));
    }

    /// Create the node at `fqn` and its missing ancestors, or make a placeholder at `fqn` resident again.
    ///
    /// Returns `false` if a resident node already existed.
    pub fn put_node(&self, fqn: &Fqn) -> bool {
        let mut created = vec![];
        {
            let mut arena = self.inner.arena.write();
            arena.get_or_create_resident(fqn, &mut created);
        }
        let fresh = !created.is_empty();
        self.report(created.into_iter().map(|fqn| (fqn, EventType::AddNode)));
        fresh
    }

    /// Store `value` under `key` in the data of the node at `fqn`, creating the node if needed.
    ///
    /// Returns the replaced value.
    pub fn put(&self, fqn: &Fqn, key: impl Into<String>, value: V) -> Option<V> {
        let mut created = vec![];
        let old = {
            let mut arena = self.inner.arena.write();
            let token = arena.get_or_create_resident(fqn, &mut created);
            arena.nodes.get_mut(token).and_then(|node| node.data.insert(key.into(), value))
        };
        let update = match old {
            Some(_) => EventType::VisitNode,
            None => EventType::AddElement,
        };
        self.report(
            created
                .into_iter()
                .map(|fqn| (fqn, EventType::AddNode))
                .chain(std::iter::once((fqn.clone(), update))),
        );
        old
    }

    /// Get the value under `key` in the data of the node at `fqn`. Reading an existing node counts as a visit.
    pub fn get(&self, fqn: &Fqn, key: &str) -> Option<V> {
        let (exists, value) = {
            let arena = self.inner.arena.read();
            match arena.node(fqn) {
                Some(node) => (true, node.data.get(key).cloned()),
                None => (false, None),
            }
        };
        if exists {
            self.report([(fqn.clone(), EventType::VisitNode)]);
        }
        value
    }

    /// Get a copy of the data of the node at `fqn`. Counts as a visit.
    pub fn get_data(&self, fqn: &Fqn) -> Option<BTreeMap<String, V>> {
        let data = self.inner.arena.read().node(fqn).map(|node| node.data.clone());
        if data.is_some() {
            self.report([(fqn.clone(), EventType::VisitNode)]);
        }
        data
    }

    /// Remove the value under `key` from the data of the node at `fqn`.
    pub fn remove(&self, fqn: &Fqn, key: &str) -> Option<V> {
        let value = self
            .inner
            .arena
            .write()
            .node_mut(fqn)
            .and_then(|node| node.data.remove(key));
        if value.is_some() {
            self.report([(fqn.clone(), EventType::RemoveElement)]);
        }
        value
    }

    /// Remove the node at `fqn` with its subtree. Removing the root clears the tree.
    pub fn remove_node(&self, fqn: &Fqn) -> bool {
        let mut removed = vec![];
        let found = self.inner.arena.write().remove_node(fqn, &mut removed);
        self.report_removed(removed);
        found
    }

    /// Evict the node at `fqn`.
    ///
    /// With `recursive`, the whole subtree goes. Otherwise a node with children only loses its data and stays as a
    /// placeholder, and a leaf is removed. Returns `false` if there is no node at `fqn`.
    pub fn evict(&self, fqn: &Fqn, recursive: bool) -> bool {
        let mut removed = vec![];
        let found = self.inner.arena.write().evict(fqn, recursive, &mut removed);
        tracing::trace!("[tree]: evict {} (recursive: {}), removed: {:?}", fqn, recursive, removed);
        self.report_removed(removed);
        found
    }

    /// Returns `true` if a node exists at `fqn`, placeholders included.
    pub fn exists(&self, fqn: &Fqn) -> bool {
        self.inner.arena.read().index.contains_key(fqn)
    }

    /// Returns `true` if the node at `fqn` is a placeholder left by a non-recursive eviction.
    pub fn is_placeholder(&self, fqn: &Fqn) -> bool {
        self.inner.arena.read().node(fqn).is_some_and(|node| !node.resident)
    }

    /// Paths of the direct children of `fqn`, ordered by name.
    pub fn children(&self, fqn: &Fqn) -> Vec<Fqn> {
        let arena = self.inner.arena.read();
        arena
            .node(fqn)
            .map(|node| {
                node.children
                    .values()
                    .filter_map(|&token| arena.nodes.get(token).map(|child| child.fqn.clone()))
                    .collect_vec()
            })
            .unwrap_or_default()
    }

    /// Number of data elements of the node at `fqn`.
    pub fn data_len(&self, fqn: &Fqn) -> usize {
        self.inner.arena.read().node(fqn).map(|node| node.data.len()).unwrap_or_default()
    }

    /// Number of nodes, the root and placeholders included.
    pub fn node_count(&self) -> usize {
        self.inner.arena.read().len()
    }
}

impl<V> EvictionAction for NodeTree<V>
where
    V: NodeValue,
{
    fn evict(&self, fqn: &Fqn) -> bool {
        let recursive = self.is_recursive_eviction();
        let mut removed = vec![];
        let found = self.inner.arena.write().evict(fqn, recursive, &mut removed);
        if !found {
            tracing::debug!("[tree]: node {} to evict is already gone", fqn);
        }
        // The engine already dropped the entry of `fqn` itself.
        removed.retain(|path| path != fqn);
        self.report_removed(removed);
        true
    }

    fn expiration(&self, fqn: &Fqn, key: &str) -> Option<u64> {
        self.inner
            .arena
            .read()
            .node(fqn)
            .and_then(|node| node.data.get(key))
            .and_then(NodeValue::as_expiration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fqn(path: &str) -> Fqn {
        Fqn::parse(path)
    }

    #[test_log::test]
    fn test_put_get_remove() {
        let tree = NodeTree::<String>::new();
        assert_eq!(tree.put(&fqn("/a/b"), "k", "v1".to_string()), None);
        assert_eq!(tree.put(&fqn("/a/b"), "k", "v2".to_string()), Some("v1".to_string()));
        assert!(tree.exists(&fqn("/a")));
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.get(&fqn("/a/b"), "k").as_deref(), Some("v2"));
        assert_eq!(tree.get(&fqn("/a/b"), "x"), None);
        assert_eq!(tree.data_len(&fqn("/a/b")), 1);
        assert_eq!(tree.remove(&fqn("/a/b"), "k").as_deref(), Some("v2"));
        assert_eq!(tree.remove(&fqn("/a/b"), "k"), None);
        assert_eq!(tree.data_len(&fqn("/a/b")), 0);
        assert!(!tree.put_node(&fqn("/a/b")));
        assert!(tree.put_node(&fqn("/a/c")));
        assert_eq!(tree.children(&fqn("/a")), vec![fqn("/a/b"), fqn("/a/c")]);
    }

    #[test_log::test]
    fn test_evict_non_recursive() {
        let tree = NodeTree::<u64>::new();
        tree.put(&fqn("/a"), "k", 1);
        tree.put(&fqn("/a/b"), "k", 2);
        tree.put(&fqn("/a/c"), "k", 3);

        assert!(tree.evict(&fqn("/a"), false));
        assert!(tree.exists(&fqn("/a")));
        assert!(tree.is_placeholder(&fqn("/a")));
        assert_eq!(tree.data_len(&fqn("/a")), 0);
        assert_eq!(tree.get(&fqn("/a/b"), "k"), Some(2));

        assert!(tree.evict(&fqn("/a/b"), false));
        assert!(!tree.exists(&fqn("/a/b")));
        assert!(tree.exists(&fqn("/a")));

        // The last child of a placeholder takes the placeholder with it.
        assert!(tree.evict(&fqn("/a/c"), false));
        assert!(!tree.exists(&fqn("/a")));
        assert_eq!(tree.node_count(), 1);
        assert!(!tree.evict(&fqn("/a"), false));
    }

    #[test_log::test]
    fn test_evict_recursive() {
        let tree = NodeTree::<u64>::new();
        tree.put(&fqn("/a/b/c"), "k", 1);
        tree.put(&fqn("/a/d"), "k", 1);
        tree.put(&fqn("/e"), "k", 1);

        assert!(tree.evict(&fqn("/a"), true));
        assert!(!tree.exists(&fqn("/a/b/c")));
        assert!(!tree.exists(&fqn("/a")));
        assert!(tree.exists(&fqn("/e")));

        assert!(tree.remove_node(&Fqn::root()));
        assert!(tree.exists(&Fqn::root()));
        assert_eq!(tree.node_count(), 1);
    }

    #[test_log::test]
    fn test_placeholder_revived_by_put() {
        let tree = NodeTree::<u64>::new();
        tree.put(&fqn("/a"), "k", 1);
        tree.put(&fqn("/a/b"), "k", 1);
        tree.evict(&fqn("/a"), false);
        tree.put(&fqn("/a"), "k", 2);
        assert!(!tree.is_placeholder(&fqn("/a")));
        tree.remove_node(&fqn("/a/b"));
        assert!(tree.exists(&fqn("/a")));
    }

    #[test_log::test]
    fn test_expiration_lookup() {
        let tree = NodeTree::<String>::new();
        tree.put(&fqn("/a"), "expiration", "1500".to_string());
        tree.put(&fqn("/b"), "expiration", "soon".to_string());
        assert_eq!(EvictionAction::expiration(&tree, &fqn("/a"), "expiration"), Some(1500));
        assert_eq!(EvictionAction::expiration(&tree, &fqn("/b"), "expiration"), None);
        assert_eq!(EvictionAction::expiration(&tree, &fqn("/c"), "expiration"), None);
    }
}
