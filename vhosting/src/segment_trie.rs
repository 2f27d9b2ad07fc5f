//! Longest-prefix-match container keyed by sequences of path segments.

use std::collections::HashMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate key /{}", .0.join("/"))]
pub struct DuplicateKey(pub Vec<String>);

#[derive(Debug)]
struct Node<V> {
    children: HashMap<String, Node<V>>,
    value: Option<V>,
}

// Manual impl so that `V: Default` is not required.
impl<V> Default for Node<V> {
    fn default() -> Self {
        Node {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// A value found in the trie and the number of key segments it consumed.
#[derive(Debug, PartialEq)]
pub struct TrieMatch<'a, V> {
    pub value: &'a V,
    pub matched: usize,
}

#[derive(Debug)]
pub struct SegmentTrie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for SegmentTrie<V> {
    fn default() -> Self {
        SegmentTrie {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<V> SegmentTrie<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` at `key`. Fails if a value is already stored at that
    /// exact key, leaving the trie untouched.
    pub fn add<S: AsRef<str>>(&mut self, key: &[S], value: V) -> Result<&V, DuplicateKey> {
        // A failed add only happens when the whole path already exists, so
        // walking with `or_default` never leaves new empty nodes behind.
        let mut node = &mut self.root;
        for segment in key {
            node = node.children.entry(segment.as_ref().to_string()).or_default();
        }
        if node.value.is_some() {
            return Err(DuplicateKey(
                key.iter().map(|s| s.as_ref().to_string()).collect(),
            ));
        }
        self.len += 1;
        Ok(node.value.insert(value))
    }

    /// Looks up `key`.
    ///
    /// Without `fallback` only a value stored at the exact key is returned.
    /// With `fallback`, an exact match still wins, otherwise the value of the
    /// deepest visited node that holds one is returned, together with the
    /// number of segments leading to it.
    pub fn get<S: AsRef<str>>(&self, key: &[S], fallback: bool) -> Option<TrieMatch<'_, V>> {
        let mut node = &self.root;
        let mut best = None;

        for (index, segment) in key.iter().enumerate() {
            if fallback && let Some(value) = &node.value {
                best = Some(TrieMatch {
                    value,
                    matched: index,
                });
            }
            match node.children.get(segment.as_ref()) {
                Some(child) => node = child,
                None => return best,
            }
        }

        match &node.value {
            Some(value) => Some(TrieMatch {
                value,
                matched: key.len(),
            }),
            None => best,
        }
    }

    /// Every stored value, depth-first. The order is unspecified.
    pub fn values(&self) -> Vec<&V> {
        fn walk<'a, V>(node: &'a Node<V>, out: &mut Vec<&'a V>) {
            if let Some(value) = &node.value {
                out.push(value);
            }
            for child in node.children.values() {
                walk(child, out);
            }
        }

        let mut out = Vec::with_capacity(self.len);
        walk(&self.root, &mut out);
        out
    }

    /// The values closest to the root: on every branch, the first stored
    /// value met while descending. Nothing below such a value is returned.
    pub fn top_level_values(&self) -> Vec<&V> {
        fn walk<'a, V>(node: &'a Node<V>, out: &mut Vec<&'a V>) {
            if let Some(value) = &node.value {
                out.push(value);
                return;
            }
            for child in node.children.values() {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }
}
