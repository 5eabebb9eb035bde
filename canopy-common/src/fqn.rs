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
    cmp::Ordering,
    convert::Infallible,
    fmt::{Debug, Display},
    str::FromStr,
    sync::Arc,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Fully qualified name of a node in the hierarchical key space.
///
/// An [`Fqn`] is an immutable sequence of path elements. The root is the empty sequence and displays as `/`.
///
/// Paths are totally ordered by depth first, then element by element lexicographically. With this ordering an ancestor
/// always sorts before its descendants.
///
/// Cloning an [`Fqn`] is cheap: the elements are shared.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Fqn {
    elements: Arc<[Arc<str>]>,
}

impl Fqn {
    /// The root path.
    pub fn root() -> Self {
        Self { elements: Arc::new([]) }
    }

    /// Build a path from its elements. Empty elements are skipped.
    pub fn from_elements<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let elements = elements
            .into_iter()
            .filter(|e| !e.as_ref().is_empty())
            .map(|e| Arc::<str>::from(e.as_ref()))
            .collect_vec();
        Self {
            elements: elements.into(),
        }
    }

    /// Parse a `/` separated path, e.g. `/a/b/c`. The leading separator is optional.
    pub fn parse(path: &str) -> Self {
        Self::from_elements(path.split('/'))
    }

    /// Path elements, root first.
    pub fn elements(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.elements.iter().map(|e| e.as_ref())
    }

    /// Number of elements. The root has depth 0.
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if this is the root path.
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// The last element, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.elements.last().map(|e| e.as_ref())
    }

    /// The parent path. The parent of the root is the root.
    pub fn parent(&self) -> Self {
        self.ancestor(self.depth().saturating_sub(1))
    }

    /// The ancestor at `depth`, or `self` if `depth >= self.depth()`.
    pub fn ancestor(&self, depth: usize) -> Self {
        if depth >= self.depth() {
            return self.clone();
        }
        Self {
            elements: self.elements[..depth].into(),
        }
    }

    /// The direct child named `name`.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if name.is_empty() {
            return self.clone();
        }
        let elements = self
            .elements
            .iter()
            .cloned()
            .chain(std::iter::once(Arc::<str>::from(name)))
            .collect_vec();
        Self {
            elements: elements.into(),
        }
    }

    /// Returns `true` if `self` is a direct child of `parent`.
    pub fn is_child_of(&self, parent: &Fqn) -> bool {
        self.depth() == parent.depth() + 1 && self.starts_with(parent)
    }

    /// Returns `true` if `self` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Fqn) -> bool {
        self.depth() > ancestor.depth() && self.starts_with(ancestor)
    }

    /// Returns `true` if `self` equals `ancestor` or is one of its descendants.
    pub fn is_child_or_equals(&self, ancestor: &Fqn) -> bool {
        self.depth() >= ancestor.depth() && self.starts_with(ancestor)
    }

    fn starts_with(&self, prefix: &Fqn) -> bool {
        self.elements.iter().zip(prefix.elements.iter()).all(|(a, b)| a == b) && self.depth() >= prefix.depth()
    }
}

impl Default for Fqn {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialOrd for Fqn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fqn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| self.elements.iter().cmp(other.elements.iter()))
    }
}

impl Display for Fqn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for element in self.elements.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

impl Debug for Fqn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fqn({self})")
    }
}

impl FromStr for Fqn {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Fqn {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Fqn {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Fqn> for String {
    fn from(fqn: Fqn) -> Self {
        fqn.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Fqn::parse("/a/b/c").to_string(), "/a/b/c");
        assert_eq!(Fqn::parse("a//b/").to_string(), "/a/b");
        assert_eq!(Fqn::parse("/").to_string(), "/");
        assert!(Fqn::parse("").is_root());
        assert_eq!(Fqn::parse("/a/b").depth(), 2);
        assert_eq!(Fqn::parse("/a/b").name(), Some("b"));
    }

    #[test]
    fn test_relations() {
        let root = Fqn::root();
        let a = Fqn::parse("/a");
        let ab = a.child("b");
        let abc = ab.child("c");

        assert_eq!(ab, Fqn::parse("/a/b"));
        assert_eq!(abc.parent(), ab);
        assert_eq!(root.parent(), root);
        assert_eq!(abc.ancestor(1), a);
        assert_eq!(abc.ancestor(10), abc);

        assert!(ab.is_child_of(&a));
        assert!(!abc.is_child_of(&a));
        assert!(abc.is_descendant_of(&a));
        assert!(abc.is_descendant_of(&root));
        assert!(!a.is_descendant_of(&a));
        assert!(a.is_child_or_equals(&a));
        assert!(!Fqn::parse("/ab").is_child_or_equals(&a));
        assert!(!a.is_child_or_equals(&ab));
    }

    #[test]
    fn test_ordering() {
        let mut fqns = ["/b", "/a/z", "/", "/a", "/a/b", "/c/a/a"]
            .into_iter()
            .map(Fqn::parse)
            .collect_vec();
        fqns.sort();
        let fqns = fqns.iter().map(|f| f.to_string()).collect_vec();
        assert_eq!(fqns, vec!["/", "/a", "/b", "/a/b", "/a/z", "/c/a/a"]);
    }

    #[test]
    fn test_serde() {
        let fqn = Fqn::parse("/a/b");
        let json = serde_json::to_string(&fqn).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: Fqn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fqn);
    }
}
