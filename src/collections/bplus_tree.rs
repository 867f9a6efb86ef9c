//! An ordered B+-tree with optional order statistics (spec.md §4.3).
//!
//! Generalizes `halo`'s `BrandedBPlusTree` (`src/collections/btree/bplus_tree.rs`):
//! the same index-based-children node shape and `B = 6` sizing survive, but
//! nodes now grow into a pooled `Vec<Node<K, V>>` (one slot per node, never
//! shrunk, free list on delete) rather than fixed `MaybeUninit` arrays, so
//! splitting and merging don't need unsafe shifts. Parent pointers, a
//! doubly-linked leaf chain, and a maintained subtree-size let `find_ith`
//! and bidirectional iteration work without re-deriving position from a
//! root-to-leaf walk every time.

use std::cmp::Ordering;

/// Branching factor: internal nodes hold between `B - 1` and `2B - 1` keys
/// (the root may hold fewer), matching the teacher's `B = 6`.
pub const B: usize = 6;
const MAX_KEYS: usize = 2 * B - 1;
const MIN_KEYS: usize = B - 1;

type NodeId = usize;

enum Node<K, V> {
    Internal {
        parent: Option<NodeId>,
        keys: Vec<K>,
        children: Vec<NodeId>,
        /// Sum of live leaf entries under each child, parallel to `children`.
        /// Maintained incrementally; absent entirely when the tree was built
        /// with `with_order_statistics(false)`.
        child_sizes: Vec<usize>,
    },
    Leaf {
        parent: Option<NodeId>,
        keys: Vec<K>,
        vals: Vec<V>,
        prev: Option<NodeId>,
        next: Option<NodeId>,
    },
}

impl<K, V> Node<K, V> {
    fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    fn len(&self) -> usize {
        match self {
            Node::Internal { keys, .. } => keys.len(),
            Node::Leaf { keys, .. } => keys.len(),
        }
    }

    fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Internal { parent, .. } => *parent,
            Node::Leaf { parent, .. } => *parent,
        }
    }

    fn set_parent(&mut self, p: Option<NodeId>) {
        match self {
            Node::Internal { parent, .. } => *parent = p,
            Node::Leaf { parent, .. } => *parent = p,
        }
    }
}

/// An ordered map from `K` to `V`, backed by a B+-tree.
///
/// Values live only in leaves; internal nodes hold separator keys. Leaves
/// are chained for `O(1)` successor/predecessor access once positioned.
pub struct BPlusTree<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
    root: NodeId,
    len: usize,
    track_order_statistics: bool,
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Creates an empty tree that maintains `O(log n)` [`BPlusTree::find_ith`].
    pub fn new() -> Self {
        Self::with_order_statistics(true)
    }

    /// Creates an empty tree, optionally skipping the per-child size
    /// bookkeeping `find_ith` relies on (spec.md §4.3's ordinal-statistics
    /// option is opt-in precisely because it costs an extra write on every
    /// insert/delete along the root-to-leaf path).
    pub fn with_order_statistics(track_order_statistics: bool) -> Self {
        let mut nodes = Vec::new();
        nodes.push(Some(Node::Leaf {
            parent: None,
            keys: Vec::new(),
            vals: Vec::new(),
            prev: None,
            next: None,
        }));
        Self {
            nodes,
            free: Vec::new(),
            root: 0,
            len: 0,
            track_order_statistics,
        }
    }

    /// Number of key-value pairs stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry, invalidating all outstanding cursors.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.len = 0;
        self.nodes.push(Some(Node::Leaf {
            parent: None,
            keys: Vec::new(),
            vals: Vec::new(),
            prev: None,
            next: None,
        }));
        self.root = 0;
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        self.nodes[id].as_ref().expect("dangling node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.nodes[id].as_mut().expect("dangling node id")
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, id: NodeId) {
        self.nodes[id] = None;
        self.free.push(id);
    }

    /// Looks up a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let (leaf, idx) = self.locate(key)?;
        match self.node(leaf) {
            Node::Leaf { vals, .. } => Some(&vals[idx]),
            _ => unreachable!(),
        }
    }

    /// Looks up a key, yielding a mutable reference.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (leaf, idx) = self.locate(key)?;
        match self.node_mut(leaf) {
            Node::Leaf { vals, .. } => Some(&mut vals[idx]),
            _ => unreachable!(),
        }
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    fn locate(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut cur = self.root;
        loop {
            match self.node(cur) {
                Node::Internal { keys, children, .. } => {
                    let i = match keys.binary_search(key) {
                        Ok(i) => i + 1,
                        Err(i) => i,
                    };
                    cur = children[i];
                }
                Node::Leaf { keys, .. } => {
                    return match keys.binary_search(key) {
                        Ok(i) => Some((cur, i)),
                        Err(_) => None,
                    };
                }
            }
        }
    }

    /// Inserts `key -> val`, returning the previous value if `key` was
    /// already present (the previous value's position in the ordering is
    /// unaffected; this is a replace, not a second entry).
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        let mut cur = self.root;
        let mut path = Vec::new();
        loop {
            match self.node(cur) {
                Node::Internal { keys, children, .. } => {
                    let i = match keys.binary_search(&key) {
                        Ok(i) => i + 1,
                        Err(i) => i,
                    };
                    path.push((cur, i));
                    cur = children[i];
                }
                Node::Leaf { keys, .. } => {
                    match keys.binary_search(&key) {
                        Ok(i) => {
                            let old = match self.node_mut(cur) {
                                Node::Leaf { vals, .. } => std::mem::replace(&mut vals[i], val),
                                _ => unreachable!(),
                            };
                            return Some(old);
                        }
                        Err(i) => {
                            match self.node_mut(cur) {
                                Node::Leaf { keys, vals, .. } => {
                                    keys.insert(i, key);
                                    vals.insert(i, val);
                                }
                                _ => unreachable!(),
                            }
                            self.len += 1;
                            self.bump_sizes_on_path(&path, 1);
                            if self.node(cur).len() > MAX_KEYS {
                                self.split_leaf(cur, &path);
                            }
                            return None;
                        }
                    }
                }
            }
        }
    }

    fn bump_sizes_on_path(&mut self, path: &[(NodeId, usize)], delta: i64) {
        if !self.track_order_statistics {
            return;
        }
        for &(node, child_idx) in path {
            if let Node::Internal { child_sizes, .. } = self.node_mut(node) {
                let v = &mut child_sizes[child_idx];
                *v = (*v as i64 + delta) as usize;
            }
        }
    }

    fn split_leaf(&mut self, leaf_id: NodeId, path: &[(NodeId, usize)]) {
        let (mid_key, right_id, right_len) = {
            let (right_keys, right_vals, old_next, mid_key) = match self.node_mut(leaf_id) {
                Node::Leaf { keys, vals, next, .. } => {
                    let mid = keys.len() / 2;
                    let right_keys = keys.split_off(mid);
                    let right_vals = vals.split_off(mid);
                    let mid_key = right_keys[0].clone();
                    (right_keys, right_vals, *next, mid_key)
                }
                _ => unreachable!(),
            };
            let right_len = right_keys.len();
            let right = Node::Leaf {
                parent: self.node(leaf_id).parent(),
                keys: right_keys,
                vals: right_vals,
                prev: Some(leaf_id),
                next: old_next,
            };
            let right_id = self.alloc_node(right);
            if let Some(n) = old_next {
                if let Node::Leaf { prev, .. } = self.node_mut(n) {
                    *prev = Some(right_id);
                }
            }
            if let Node::Leaf { next, .. } = self.node_mut(leaf_id) {
                *next = Some(right_id);
            }
            (mid_key, right_id, right_len)
        };
        let left_len = self.node(leaf_id).len();
        self.insert_into_parent(leaf_id, mid_key, right_id, path, left_len, right_len);
    }

    fn insert_into_parent(
        &mut self,
        left_id: NodeId,
        sep: K,
        right_id: NodeId,
        path: &[(NodeId, usize)],
        left_size: usize,
        right_size: usize,
    ) {
        match path.last() {
            None => {
                let sizes = if self.track_order_statistics {
                    vec![left_size, right_size]
                } else {
                    Vec::new()
                };
                let new_root = Node::Internal {
                    parent: None,
                    keys: vec![sep],
                    children: vec![left_id, right_id],
                    child_sizes: sizes,
                };
                let root_id = self.alloc_node(new_root);
                self.node_mut(left_id).set_parent(Some(root_id));
                self.node_mut(right_id).set_parent(Some(root_id));
                self.root = root_id;
            }
            Some(&(parent_id, child_idx)) => {
                self.node_mut(right_id).set_parent(Some(parent_id));
                match self.node_mut(parent_id) {
                    Node::Internal { keys, children, child_sizes, .. } => {
                        keys.insert(child_idx, sep);
                        children.insert(child_idx + 1, right_id);
                        if !child_sizes.is_empty() {
                            child_sizes[child_idx] = left_size;
                            child_sizes.insert(child_idx + 1, right_size);
                        }
                    }
                    _ => unreachable!(),
                }
                if self.node(parent_id).len() > MAX_KEYS {
                    self.split_internal(parent_id, &path[..path.len() - 1]);
                }
            }
        }
    }

    fn split_internal(&mut self, node_id: NodeId, path: &[(NodeId, usize)]) {
        let (sep, right_id, left_size, right_size) = match self.node_mut(node_id) {
            Node::Internal { keys, children, child_sizes, .. } => {
                let mid = keys.len() / 2;
                let sep = keys.remove(mid);
                let right_keys = keys.split_off(mid);
                let right_children = children.split_off(mid + 1);
                let right_sizes = if child_sizes.is_empty() {
                    Vec::new()
                } else {
                    child_sizes.split_off(mid + 1)
                };
                let left_size: usize = if child_sizes.is_empty() { 0 } else { child_sizes.iter().sum() };
                let right_size: usize = right_sizes.iter().sum();
                let right = Node::Internal {
                    parent: None,
                    keys: right_keys,
                    children: right_children,
                    child_sizes: right_sizes,
                };
                (sep, right, left_size, right_size)
            }
            _ => unreachable!(),
        };
        let right_children: Vec<NodeId> = match &right_id {
            Node::Internal { children, .. } => children.clone(),
            _ => unreachable!(),
        };
        let right_node_id = self.alloc_node(right_id);
        for c in right_children {
            self.node_mut(c).set_parent(Some(right_node_id));
        }
        self.insert_into_parent(node_id, sep, right_node_id, path, left_size, right_size);
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut cur = self.root;
        let mut path = Vec::new();
        loop {
            match self.node(cur) {
                Node::Internal { keys, children, .. } => {
                    let i = match keys.binary_search(key) {
                        Ok(i) => i + 1,
                        Err(i) => i,
                    };
                    path.push((cur, i));
                    cur = children[i];
                }
                Node::Leaf { keys, .. } => {
                    let i = keys.binary_search(key).ok()?;
                    let val = match self.node_mut(cur) {
                        Node::Leaf { keys, vals, .. } => {
                            keys.remove(i);
                            vals.remove(i)
                        }
                        _ => unreachable!(),
                    };
                    self.len -= 1;
                    self.bump_sizes_on_path(&path, -1);
                    self.rebalance_after_removal(cur, &path);
                    return Some(val);
                }
            }
        }
    }

    fn rebalance_after_removal(&mut self, node_id: NodeId, path: &[(NodeId, usize)]) {
        let min_keys = if node_id == self.root { 0 } else { MIN_KEYS };
        if self.node(node_id).len() >= min_keys {
            return;
        }
        if path.is_empty() {
            // Root underflow: collapse a single-child internal root.
            if let Node::Internal { keys, children, .. } = self.node(node_id) {
                if keys.is_empty() && children.len() == 1 {
                    let only = children[0];
                    self.node_mut(only).set_parent(None);
                    self.free_node(node_id);
                    self.root = only;
                }
            }
            return;
        }

        let (parent_id, my_idx) = *path.last().unwrap();
        let left_sib = my_idx.checked_sub(1);
        let right_sib = {
            let sib_count = match self.node(parent_id) {
                Node::Internal { children, .. } => children.len(),
                _ => unreachable!(),
            };
            if my_idx + 1 < sib_count { Some(my_idx + 1) } else { None }
        };

        if let Some(li) = left_sib {
            if self.try_redistribute_or_merge(parent_id, li, my_idx, path) {
                return;
            }
        }
        if let Some(ri) = right_sib {
            self.try_redistribute_or_merge(parent_id, my_idx, ri, path);
        }
    }

    /// Attempts to fix underflow at child index `right` by first trying to
    /// redistribute a key from `left`, falling back to merging the two.
    /// Returns `true` once the underflow at `right` has been resolved.
    fn try_redistribute_or_merge(
        &mut self,
        parent_id: NodeId,
        left_idx: usize,
        right_idx: usize,
        path: &[(NodeId, usize)],
    ) -> bool {
        let (left_id, right_id) = match self.node(parent_id) {
            Node::Internal { children, .. } => (children[left_idx], children[right_idx]),
            _ => unreachable!(),
        };
        let left_len = self.node(left_id).len();
        let right_len = self.node(right_id).len();

        if left_len > MIN_KEYS {
            self.redistribute_right_from_left(parent_id, left_idx, left_id, right_id);
            true
        } else if right_len > MIN_KEYS {
            self.redistribute_left_from_right(parent_id, left_idx, left_id, right_id);
            true
        } else {
            self.merge(parent_id, left_idx, left_id, right_id, path);
            true
        }
    }

    fn redistribute_right_from_left(&mut self, parent_id: NodeId, sep_idx: usize, left_id: NodeId, right_id: NodeId) {
        let both_leaves = self.node(left_id).is_leaf();
        if both_leaves {
            let (moved_key, moved_val) = match self.node_mut(left_id) {
                Node::Leaf { keys, vals, .. } => (keys.pop().unwrap(), vals.pop().unwrap()),
                _ => unreachable!(),
            };
            let new_sep = moved_key.clone();
            match self.node_mut(right_id) {
                Node::Leaf { keys, vals, .. } => {
                    keys.insert(0, moved_key);
                    vals.insert(0, moved_val);
                }
                _ => unreachable!(),
            }
            if let Node::Internal { keys, .. } = self.node_mut(parent_id) {
                keys[sep_idx] = new_sep;
            }
        } else {
            let (moved_key, moved_child) = match self.node_mut(left_id) {
                Node::Internal { keys, children, .. } => (keys.pop().unwrap(), children.pop().unwrap()),
                _ => unreachable!(),
            };
            self.node_mut(moved_child).set_parent(Some(right_id));
            let sep = match self.node(parent_id) {
                Node::Internal { keys, .. } => keys[sep_idx].clone(),
                _ => unreachable!(),
            };
            match self.node_mut(right_id) {
                Node::Internal { keys, children, .. } => {
                    keys.insert(0, sep);
                    children.insert(0, moved_child);
                }
                _ => unreachable!(),
            }
            if let Node::Internal { keys, .. } = self.node_mut(parent_id) {
                keys[sep_idx] = moved_key;
            }
        }
        self.recompute_child_sizes(parent_id, sep_idx, left_id, right_id);
    }

    fn redistribute_left_from_right(&mut self, parent_id: NodeId, sep_idx: usize, left_id: NodeId, right_id: NodeId) {
        let both_leaves = self.node(right_id).is_leaf();
        if both_leaves {
            let (moved_key, moved_val) = match self.node_mut(right_id) {
                Node::Leaf { keys, vals, .. } => (keys.remove(0), vals.remove(0)),
                _ => unreachable!(),
            };
            let new_sep = match self.node(right_id) {
                Node::Leaf { keys, .. } => keys[0].clone(),
                _ => unreachable!(),
            };
            match self.node_mut(left_id) {
                Node::Leaf { keys, vals, .. } => {
                    keys.push(moved_key);
                    vals.push(moved_val);
                }
                _ => unreachable!(),
            }
            if let Node::Internal { keys, .. } = self.node_mut(parent_id) {
                keys[sep_idx] = new_sep;
            }
        } else {
            let (moved_key, moved_child) = match self.node_mut(right_id) {
                Node::Internal { keys, children, .. } => (keys.remove(0), children.remove(0)),
                _ => unreachable!(),
            };
            self.node_mut(moved_child).set_parent(Some(left_id));
            let sep = match self.node(parent_id) {
                Node::Internal { keys, .. } => keys[sep_idx].clone(),
                _ => unreachable!(),
            };
            match self.node_mut(left_id) {
                Node::Internal { keys, children, .. } => {
                    keys.push(sep);
                    children.push(moved_child);
                }
                _ => unreachable!(),
            }
            if let Node::Internal { keys, .. } = self.node_mut(parent_id) {
                keys[sep_idx] = moved_key;
            }
        }
        self.recompute_child_sizes(parent_id, sep_idx, left_id, right_id);
    }

    fn merge(&mut self, parent_id: NodeId, sep_idx: usize, left_id: NodeId, right_id: NodeId, path: &[(NodeId, usize)]) {
        let is_leaf = self.node(left_id).is_leaf();
        if is_leaf {
            let (right_keys, right_vals, right_next) = match self.node_mut(right_id) {
                Node::Leaf { keys, vals, next, .. } => (std::mem::take(keys), std::mem::take(vals), *next),
                _ => unreachable!(),
            };
            if let Node::Leaf { keys, vals, next, .. } = self.node_mut(left_id) {
                keys.extend(right_keys);
                vals.extend(right_vals);
                *next = right_next;
            }
            if let Some(n) = right_next {
                if let Node::Leaf { prev, .. } = self.node_mut(n) {
                    *prev = Some(left_id);
                }
            }
        } else {
            let sep = match self.node(parent_id) {
                Node::Internal { keys, .. } => keys[sep_idx].clone(),
                _ => unreachable!(),
            };
            let (right_keys, right_children) = match self.node_mut(right_id) {
                Node::Internal { keys, children, .. } => (std::mem::take(keys), std::mem::take(children)),
                _ => unreachable!(),
            };
            for &c in &right_children {
                self.node_mut(c).set_parent(Some(left_id));
            }
            if let Node::Internal { keys, children, .. } = self.node_mut(left_id) {
                keys.push(sep);
                keys.extend(right_keys);
                children.extend(right_children);
            }
        }
        self.free_node(right_id);

        match self.node_mut(parent_id) {
            Node::Internal { keys, children, child_sizes, .. } => {
                keys.remove(sep_idx);
                children.remove(sep_idx + 1);
                if !child_sizes.is_empty() {
                    let merged = child_sizes.remove(sep_idx + 1);
                    child_sizes[sep_idx] += merged;
                }
            }
            _ => unreachable!(),
        }
        self.rebalance_after_removal(parent_id, &path[..path.len() - 1]);
    }

    fn subtree_size(&self, id: NodeId) -> usize {
        match self.node(id) {
            Node::Leaf { keys, .. } => keys.len(),
            Node::Internal { child_sizes, .. } => child_sizes.iter().sum(),
        }
    }

    /// Redistribution moves one entry (leaf) or one child (internal)
    /// between `left_id` and `right_id` without changing the total under
    /// `parent_id`, so the two affected slots are refreshed from the
    /// siblings' own (now up to date) subtree sizes.
    fn recompute_child_sizes(&mut self, parent_id: NodeId, sep_idx: usize, left_id: NodeId, right_id: NodeId) {
        if !self.track_order_statistics {
            return;
        }
        let left_size = self.subtree_size(left_id);
        let right_size = self.subtree_size(right_id);
        if let Node::Internal { child_sizes, .. } = self.node_mut(parent_id) {
            if !child_sizes.is_empty() {
                child_sizes[sep_idx] = left_size;
                child_sizes[sep_idx + 1] = right_size;
            }
        }
    }

    /// Returns the `i`-th entry in sorted order (0-based), if the tree
    /// was built with order statistics and `i < len()`.
    pub fn find_ith(&self, mut i: usize) -> Option<(&K, &V)> {
        if !self.track_order_statistics || i >= self.len {
            return None;
        }
        let mut cur = self.root;
        loop {
            match self.node(cur) {
                Node::Internal { children, child_sizes, .. } => {
                    let mut found = None;
                    for (idx, &sz) in child_sizes.iter().enumerate() {
                        if i < sz {
                            found = Some((children[idx], i));
                            break;
                        }
                        i -= sz;
                    }
                    let (next, rem) = found?;
                    cur = next;
                    i = rem;
                }
                Node::Leaf { keys, vals, .. } => {
                    return Some((&keys[i], &vals[i]));
                }
            }
        }
    }

    /// First key in sorted order.
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut cur = self.root;
        loop {
            match self.node(cur) {
                Node::Internal { children, .. } => cur = children[0],
                Node::Leaf { keys, vals, .. } => {
                    return keys.first().map(|k| (k, vals.first().unwrap()));
                }
            }
        }
    }

    fn leaf_len(&self, leaf: NodeId) -> usize {
        match self.node(leaf) {
            Node::Leaf { keys, .. } => keys.len(),
            _ => unreachable!(),
        }
    }

    fn leaf_next(&self, leaf: NodeId) -> Option<NodeId> {
        match self.node(leaf) {
            Node::Leaf { next, .. } => *next,
            _ => unreachable!(),
        }
    }

    fn leaf_prev(&self, leaf: NodeId) -> Option<NodeId> {
        match self.node(leaf) {
            Node::Leaf { prev, .. } => *prev,
            _ => unreachable!(),
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut cur = self.root;
        loop {
            match self.node(cur) {
                Node::Internal { children, .. } => cur = children[0],
                Node::Leaf { .. } => return cur,
            }
        }
    }

    fn rightmost_leaf(&self) -> NodeId {
        let mut cur = self.root;
        loop {
            match self.node(cur) {
                Node::Internal { children, .. } => cur = *children.last().unwrap(),
                Node::Leaf { .. } => return cur,
            }
        }
    }

    /// Slot immediately after `(leaf, idx)` in key order, or `None` past
    /// the last entry.
    fn advance(&self, leaf: NodeId, idx: usize) -> Option<(NodeId, usize)> {
        if idx + 1 < self.leaf_len(leaf) {
            Some((leaf, idx + 1))
        } else {
            self.leaf_next(leaf).map(|n| (n, 0))
        }
    }

    /// Slot immediately before `(leaf, idx)` in key order, or `None`
    /// before the first entry.
    fn retreat(&self, leaf: NodeId, idx: usize) -> Option<(NodeId, usize)> {
        if idx > 0 {
            Some((leaf, idx - 1))
        } else {
            self.leaf_prev(leaf).map(|p| (p, self.leaf_len(p) - 1))
        }
    }

    /// A cursor positioned before the first entry, or at the single
    /// collapsed sentinel if the tree is empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor {
            tree: self,
            pos: if self.is_empty() {
                Position::After
            } else {
                Position::At(self.leftmost_leaf(), 0)
            },
        }
    }

    /// A cursor positioned one past the last entry (the after-end
    /// sentinel). Decrementing it yields the last entry, unless the tree
    /// is empty, in which case it stays put.
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor { tree: self, pos: Position::After }
    }

    /// Equivalent to [`BPlusTree::begin`].
    pub fn cbegin(&self) -> Cursor<'_, K, V> {
        self.begin()
    }

    /// Equivalent to [`BPlusTree::end`].
    pub fn cend(&self) -> Cursor<'_, K, V> {
        self.end()
    }

    /// A forward-and-backward, in-order iterator, walking the leaf chain
    /// rather than re-descending from the root between leaves.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { front: self.begin(), back: self.end() }
    }

    /// Checks every B+-tree invariant: sorted keys, branching-factor
    /// bounds (except the root), parent pointers, leaf chain continuity,
    /// and (if enabled) order-statistics consistency. Intended for tests.
    pub fn verify_ok(&self) -> Result<(), String> {
        self.verify_node(self.root, None, true)?;
        Ok(())
    }

    fn verify_node(&self, id: NodeId, parent: Option<NodeId>, is_root: bool) -> Result<usize, String> {
        let node = self.node(id);
        if node.parent() != parent {
            return Err(format!("node {id} has wrong parent pointer"));
        }
        match node {
            Node::Leaf { keys, vals, .. } => {
                if keys.len() != vals.len() {
                    return Err(format!("leaf {id} keys/vals length mismatch"));
                }
                if !is_root && keys.len() < MIN_KEYS {
                    return Err(format!("leaf {id} underflowed: {} < {MIN_KEYS}", keys.len()));
                }
                if keys.len() > MAX_KEYS {
                    return Err(format!("leaf {id} overflowed"));
                }
                for w in keys.windows(2) {
                    if w[0].cmp(&w[1]) != Ordering::Less {
                        return Err(format!("leaf {id} keys out of order"));
                    }
                }
                Ok(keys.len())
            }
            Node::Internal { keys, children, child_sizes, .. } => {
                if children.len() != keys.len() + 1 {
                    return Err(format!("internal {id} children/keys arity mismatch"));
                }
                if !is_root && keys.len() < MIN_KEYS {
                    return Err(format!("internal {id} underflowed"));
                }
                if keys.len() > MAX_KEYS {
                    return Err(format!("internal {id} overflowed"));
                }
                let mut total = 0;
                for (idx, &c) in children.iter().enumerate() {
                    let sub = self.verify_node(c, Some(id), false)?;
                    if self.track_order_statistics && child_sizes[idx] != sub {
                        return Err(format!(
                            "internal {id} child_sizes[{idx}] = {} but subtree has {sub}",
                            child_sizes[idx]
                        ));
                    }
                    total += sub;
                }
                Ok(total)
            }
        }
    }
}

/// A cursor position: before the first entry, at a specific leaf slot,
/// or after the last entry. The two sentinels collapse to the same
/// value when the tree is empty.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Before,
    At(NodeId, usize),
    After,
}

/// A bidirectional cursor with explicit before-begin/after-end sentinels
/// (spec.md §4.3). Obtained from [`BPlusTree::begin`]/[`BPlusTree::end`].
pub struct Cursor<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    pos: Position,
}

impl<'a, K: Ord + Clone, V> Cursor<'a, K, V> {
    /// The entry at this position, or `None` at a sentinel.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        match self.pos {
            Position::At(leaf, idx) => match self.tree.node(leaf) {
                Node::Leaf { keys, vals, .. } => Some((&keys[idx], &vals[idx])),
                _ => unreachable!(),
            },
            _ => None,
        }
    }

    /// Moves to the next entry in key order. No-op on the after-end
    /// sentinel, or on any position when the tree is empty.
    pub fn next(&mut self) {
        self.pos = match self.pos {
            Position::Before => {
                if self.tree.is_empty() {
                    Position::After
                } else {
                    Position::At(self.tree.leftmost_leaf(), 0)
                }
            }
            Position::At(leaf, idx) => self
                .tree
                .advance(leaf, idx)
                .map_or(Position::After, |(l, i)| Position::At(l, i)),
            Position::After => Position::After,
        };
    }

    /// Moves to the previous entry in key order. No-op on the
    /// before-begin sentinel, or on any position when the tree is empty.
    pub fn prev(&mut self) {
        self.pos = match self.pos {
            Position::After => {
                if self.tree.is_empty() {
                    Position::After
                } else {
                    let leaf = self.tree.rightmost_leaf();
                    Position::At(leaf, self.tree.leaf_len(leaf) - 1)
                }
            }
            Position::At(leaf, idx) => self
                .tree
                .retreat(leaf, idx)
                .map_or(Position::Before, |(l, i)| Position::At(l, i)),
            Position::Before => Position::Before,
        };
    }
}

impl<'a, K, V> PartialEq for Cursor<'a, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl<'a, K, V> Eq for Cursor<'a, K, V> {}

/// A forward-and-backward, in-order iterator over a [`BPlusTree`], built
/// from a pair of cursors that close in on each other.
pub struct Iter<'a, K, V> {
    front: Cursor<'a, K, V>,
    back: Cursor<'a, K, V>,
}

impl<'a, K: Ord + Clone, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.pos == self.back.pos {
            return None;
        }
        let item = self.front.get()?;
        self.front.next();
        Some(item)
    }
}

impl<'a, K: Ord + Clone, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.pos == self.back.pos {
            return None;
        }
        self.back.prev();
        self.back.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut t = BPlusTree::new();
        for i in 0..500i64 {
            t.insert(i, i * 2);
        }
        t.verify_ok().unwrap();
        assert_eq!(t.len(), 500);
        for i in 0..500i64 {
            assert_eq!(t.get(&i), Some(&(i * 2)));
        }
        for i in (0..500i64).step_by(3) {
            assert_eq!(t.remove(&i), Some(i * 2));
            t.verify_ok().unwrap();
        }
        assert_eq!(t.len(), 334);
    }

    #[test]
    fn find_ith_matches_sorted_order() {
        let mut t = BPlusTree::new();
        for i in (0..200i64).rev() {
            t.insert(i, i * 2);
        }
        t.verify_ok().unwrap();
        for i in 0..200usize {
            assert_eq!(t.find_ith(i), Some((&(i as i64), &((i as i64) * 2))));
        }
        assert_eq!(t.find_ith(200), None);
    }

    #[test]
    fn iterator_visits_keys_in_order() {
        let mut t = BPlusTree::new();
        for i in [5, 1, 9, 3, 7, 2, 8, 4, 6, 0] {
            t.insert(i, ());
        }
        let collected: Vec<i32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(collected, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn leaf_chain_stays_consistent_across_splits_and_merges() {
        let mut t = BPlusTree::with_order_statistics(false);
        for i in 0..300i64 {
            t.insert(i, i);
        }
        for i in (0..300i64).filter(|i| i % 2 == 0) {
            t.remove(&i);
        }
        let collected: Vec<i64> = t.iter().map(|(k, _)| *k).collect();
        let expected: Vec<i64> = (0..300).filter(|i| i % 2 != 0).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn clear_empties_the_tree() {
        let mut t = BPlusTree::new();
        for i in 0..50i64 {
            t.insert(i, i);
        }
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.get(&0), None);
        t.insert(1, 1);
        assert_eq!(t.get(&1), Some(&1));
    }

    #[test]
    fn bidirectional_cursor_round_trips_sentinels() {
        let t: BPlusTree<i64, i64> = BPlusTree::new();
        assert!(t.begin() == t.end());
        assert!(t.cbegin() == t.cend());
        let mut c = t.end();
        c.prev();
        assert!(c == t.end());

        let mut t = BPlusTree::new();
        for i in 0..300i64 {
            t.insert(i, i * i);
        }
        let mut c = t.end();
        c.prev();
        assert_eq!(c.get(), Some((&299, &(299 * 299))));
        for _ in 0..299 {
            c.prev();
        }
        assert_eq!(c.get(), Some((&0, &0)));
        c.prev();
        assert_eq!(c.get(), None);
        c.next();
        assert_eq!(c.get(), Some((&0, &0)));

        let forward: Vec<i64> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(forward, (0..300).collect::<Vec<_>>());
        let backward: Vec<i64> = t.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(backward, (0..300).rev().collect::<Vec<_>>());
    }
}
