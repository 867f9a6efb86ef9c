//! A red/black tree carrying an associative reduction over its in-order
//! sequence, plus order statistics (spec.md §4.4).
//!
//! `halo` has no red/black tree of its own; this module is grounded on
//! the pool-of-nodes, index-based-children idiom its B+-tree and
//! `generational_pool.rs` both use, generalized to the classic
//! parent-pointer red/black balancing scheme, and on the reduction
//! bookkeeping (`r1`/`r2` partial sums over a key ordering) that
//! `original_source`'s `RedBlackTree.hpp` keeps per node for range
//! queries — reimplemented here as the generic [`Reduce`](super::reduction::Reduce)
//! trait rather than a hardcoded sum.

use super::reduction::{NullReduce, Reduce};
use std::cmp::Ordering;

type NodeId = usize;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

struct Node<K, V, Acc> {
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
    key: K,
    value: V,
    /// Count of nodes in this node's subtree, including itself.
    size: usize,
    /// The reduction accumulated over this node's subtree, in key order.
    acc: Acc,
}

/// An ordered map from `K` to `V` kept balanced by red/black coloring,
/// with an incrementally-maintained reduction `R` over subtrees.
///
/// Use `RedBlackTree<K, V, NullReduce>` (aliased as
/// [`OrderedSet`](type@OrderedSet) is not provided; construct directly)
/// when only ordering and order statistics are needed.
pub struct RedBlackTree<K, V, R: Reduce<V> = NullReduce> {
    nodes: Vec<Option<Node<K, V, R::Value>>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    reduce: R,
}

impl<K: Ord, V> Default for RedBlackTree<K, V, NullReduce> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> RedBlackTree<K, V, NullReduce> {
    /// A tree with no reduction beyond ordering and order statistics.
    pub fn new() -> Self {
        Self::with_reduce(NullReduce)
    }
}

impl<K: Ord, V, R: Reduce<V>> RedBlackTree<K, V, R> {
    /// Builds a tree that maintains `reduce` over its in-order sequence.
    pub fn with_reduce(reduce: R) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            reduce,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry, invalidating all outstanding cursors.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    fn node(&self, id: NodeId) -> &Node<K, V, R::Value> {
        self.nodes[id].as_ref().expect("dangling node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V, R::Value> {
        self.nodes[id].as_mut().expect("dangling node id")
    }

    fn size_of(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |i| self.node(i).size)
    }

    fn acc_of(&self, id: Option<NodeId>) -> R::Value {
        id.map_or_else(|| self.reduce.nil(), |i| self.node(i).acc.clone())
    }

    fn alloc(&mut self, node: Node<K, V, R::Value>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    /// Recomputes `size`/`acc` for `id` from its two children plus its own value.
    fn refresh(&mut self, id: NodeId) {
        let left = self.node(id).left;
        let right = self.node(id).right;
        let own = self.reduce.leaf(&self.node(id).value);
        let left_acc = self.acc_of(left);
        let right_acc = self.acc_of(right);
        let acc = self.reduce.combine(&left_acc, &self.reduce.combine(&own, &right_acc));
        let size = 1 + self.size_of(left) + self.size_of(right);
        let n = self.node_mut(id);
        n.size = size;
        n.acc = acc;
    }

    /// Walks from `id` to the root, refreshing `size`/`acc` along the way.
    fn refresh_to_root(&mut self, mut id: NodeId) {
        loop {
            self.refresh(id);
            match self.node(id).parent {
                Some(p) => id = p,
                None => break,
            }
        }
    }

    fn color(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |i| self.node(i).color)
    }

    /// Looks up a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find_node(key).map(|id| &self.node(id).value)
    }

    /// Looks up a key, yielding a mutable reference. The reduction is
    /// *not* updated automatically by this method; use
    /// [`RedBlackTree::get_mut_tracked`] when the new value changes
    /// what `R` would compute for it.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find_node(key)?;
        Some(&mut self.node_mut(id).value)
    }

    /// A deferred-write handle: mutate the value through it, and on
    /// drop every ancestor's reduction is recomputed exactly once. This
    /// mirrors spec.md's deferred-write indexing proxy — direct
    /// `get_mut` is cheaper but silently leaves `R`'s bookkeeping stale
    /// if the caller changes anything `R` depends on.
    pub fn get_mut_tracked(&mut self, key: &K) -> Option<ValueGuard<'_, K, V, R>> {
        let id = self.find_node(key)?;
        Some(ValueGuard { tree: self, id })
    }

    fn find_node(&self, key: &K) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match key.cmp(&self.node(id).key) {
                Ordering::Equal => return Some(id),
                Ordering::Less => cur = self.node(id).left,
                Ordering::Greater => cur = self.node(id).right,
            }
        }
        None
    }

    /// Greatest key `<= key` (`closed`), or strictly `< key` (open).
    pub fn find_glb(&self, key: &K, closed: bool) -> Option<(&K, &V)> {
        let mut cur = self.root;
        let mut best = None;
        while let Some(id) = cur {
            match key.cmp(&self.node(id).key) {
                Ordering::Equal => {
                    if closed {
                        return Some((&self.node(id).key, &self.node(id).value));
                    }
                    cur = self.node(id).left;
                }
                Ordering::Less => cur = self.node(id).left,
                Ordering::Greater => {
                    best = Some(id);
                    cur = self.node(id).right;
                }
            }
        }
        best.map(|id| (&self.node(id).key, &self.node(id).value))
    }

    /// Least key `>= key` (`closed`), or strictly `> key` (open).
    pub fn find_lub(&self, key: &K, closed: bool) -> Option<(&K, &V)> {
        let mut cur = self.root;
        let mut best = None;
        while let Some(id) = cur {
            match key.cmp(&self.node(id).key) {
                Ordering::Equal => {
                    if closed {
                        return Some((&self.node(id).key, &self.node(id).value));
                    }
                    cur = self.node(id).right;
                }
                Ordering::Greater => cur = self.node(id).right,
                Ordering::Less => {
                    best = Some(id);
                    cur = self.node(id).left;
                }
            }
        }
        best.map(|id| (&self.node(id).key, &self.node(id).value))
    }

    /// The `i`-th entry in sorted order (0-based).
    pub fn find_ith(&self, mut i: usize) -> Option<(&K, &V)> {
        if i >= self.len {
            return None;
        }
        let mut cur = self.root?;
        loop {
            let left_size = self.size_of(self.node(cur).left);
            match i.cmp(&left_size) {
                Ordering::Less => cur = self.node(cur).left.unwrap(),
                Ordering::Equal => return Some((&self.node(cur).key, &self.node(cur).value)),
                Ordering::Greater => {
                    i -= left_size + 1;
                    cur = self.node(cur).right.unwrap();
                }
            }
        }
    }

    /// `combine` of the reduction over every entry with key `<= key`
    /// (`closed`), or strictly `< key` (open).
    pub fn reduce_lub(&self, key: &K, closed: bool) -> R::Value {
        let mut acc = self.reduce.nil();
        let mut cur = self.root;
        while let Some(id) = cur {
            match key.cmp(&self.node(id).key) {
                Ordering::Less => cur = self.node(id).left,
                Ordering::Equal => {
                    let left_acc = self.acc_of(self.node(id).left);
                    acc = self.reduce.combine(&acc, &left_acc);
                    if closed {
                        let own = self.reduce.leaf(&self.node(id).value);
                        acc = self.reduce.combine(&acc, &own);
                    }
                    break;
                }
                Ordering::Greater => {
                    let left_acc = self.acc_of(self.node(id).left);
                    let own = self.reduce.leaf(&self.node(id).value);
                    acc = self.reduce.combine(&acc, &self.reduce.combine(&left_acc, &own));
                    cur = self.node(id).right;
                }
            }
        }
        acc
    }

    /// Inverts a monotone cumulative reduction: the greatest key whose
    /// closed prefix reduction (`reduce_lub(key, true)`) is `< y`. Walks
    /// root to leaf carrying a running remainder, descending left while
    /// the remainder doesn't exceed the left subtree's accumulated value
    /// and otherwise consuming that subtree plus the current node before
    /// continuing right. `None` if the tree is empty or `y` doesn't
    /// exceed even the smallest key's own contribution.
    pub fn find_sum_glb(&self, y: &R::Value) -> Option<(&K, &V)>
    where
        R::Value: Ord + std::ops::Sub<Output = R::Value>,
    {
        let mut remainder = y.clone();
        let mut cur = self.root;
        let mut result = None;
        while let Some(id) = cur {
            let left_acc = self.acc_of(self.node(id).left);
            if remainder <= left_acc {
                cur = self.node(id).left;
            } else {
                let own = self.reduce.leaf(&self.node(id).value);
                let consumed = self.reduce.combine(&left_acc, &own);
                remainder = remainder - consumed;
                result = Some(id);
                cur = self.node(id).right;
            }
        }
        result.map(|id| (&self.node(id).key, &self.node(id).value))
    }

    /// Inserts `key -> value`, returning the previous value if present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut cur = self.root;
        let mut parent = None;
        let mut went_left = false;
        while let Some(id) = cur {
            parent = Some(id);
            match key.cmp(&self.node(id).key) {
                Ordering::Equal => {
                    let old = std::mem::replace(&mut self.node_mut(id).value, value);
                    self.refresh_to_root(id);
                    return Some(old);
                }
                Ordering::Less => {
                    went_left = true;
                    cur = self.node(id).left;
                }
                Ordering::Greater => {
                    went_left = false;
                    cur = self.node(id).right;
                }
            }
        }

        let acc = self.reduce.leaf(&value);
        let new_id = self.alloc(Node {
            parent,
            left: None,
            right: None,
            color: Color::Red,
            key,
            value,
            size: 1,
            acc,
        });
        match parent {
            None => self.root = Some(new_id),
            Some(p) => {
                if went_left {
                    self.node_mut(p).left = Some(new_id);
                } else {
                    self.node_mut(p).right = Some(new_id);
                }
            }
        }
        self.len += 1;
        self.insert_fixup(new_id);
        self.refresh_to_root(parent.unwrap_or(new_id));
        None
    }

    fn rotate_left(&mut self, x: NodeId) {
        let y = self.node(x).right.expect("rotate_left needs a right child");
        let y_left = self.node(y).left;
        self.node_mut(x).right = y_left;
        if let Some(yl) = y_left {
            self.node_mut(yl).parent = Some(x);
        }
        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
        self.refresh(x);
        self.refresh(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let y = self.node(x).left.expect("rotate_right needs a left child");
        let y_right = self.node(y).right;
        self.node_mut(x).left = y_right;
        if let Some(yr) = y_right {
            self.node_mut(yr).parent = Some(x);
        }
        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
        self.refresh(x);
        self.refresh(y);
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while self.color(self.node(z).parent) == Color::Red {
            let parent = self.node(z).parent.unwrap();
            let grandparent = self.node(parent).parent.unwrap();
            if Some(parent) == self.node(grandparent).left {
                let uncle = self.node(grandparent).right;
                if self.color(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle.unwrap()).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    z = grandparent;
                } else {
                    if Some(z) == self.node(parent).right {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.node(z).parent.unwrap();
                    let grandparent = self.node(parent).parent.unwrap();
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.node(grandparent).left;
                if self.color(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle.unwrap()).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    z = grandparent;
                } else {
                    if Some(z) == self.node(parent).left {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.node(z).parent.unwrap();
                    let grandparent = self.node(parent).parent.unwrap();
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
            if self.root == Some(z) {
                break;
            }
        }
        if let Some(r) = self.root {
            self.node_mut(r).color = Color::Black;
        }
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let z = self.find_node(key)?;
        self.len -= 1;

        let mut y = z;
        let mut y_original_color = self.node(y).color;
        let x_info;

        if self.node(z).left.is_none() {
            let x = self.node(z).right;
            x_info = (x, self.node(z).parent);
            self.transplant(z, x);
        } else if self.node(z).right.is_none() {
            let x = self.node(z).left;
            x_info = (x, self.node(z).parent);
            self.transplant(z, x);
        } else {
            y = self.minimum(self.node(z).right.unwrap());
            y_original_color = self.node(y).color;
            let x = self.node(y).right;
            if self.node(y).parent == Some(z) {
                x_info = (x, Some(y));
                if let Some(xi) = x {
                    self.node_mut(xi).parent = Some(y);
                }
            } else {
                let y_parent = self.node(y).parent;
                self.transplant(y, x);
                self.node_mut(y).right = self.node(z).right;
                if let Some(r) = self.node(y).right {
                    self.node_mut(r).parent = Some(y);
                }
                x_info = (x, y_parent);
            }
            self.transplant(z, Some(y));
            self.node_mut(y).left = self.node(z).left;
            if let Some(l) = self.node(y).left {
                self.node_mut(l).parent = Some(y);
            }
            self.node_mut(y).color = self.node(z).color;
        }

        let value = {
            let slot = self.nodes[z].take().expect("removed node must exist");
            self.free.push(z);
            slot.value
        };

        if y_original_color == Color::Black {
            self.delete_fixup(x_info.0, x_info.1);
        }
        if let Some(start) = x_info.1.or(Some(y)) {
            if self.nodes[start].is_some() {
                self.refresh_to_root(start);
            }
        } else if let Some(r) = self.root {
            self.refresh_to_root(r);
        }

        Some(value)
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.node(id).left {
            id = l;
        }
        id
    }

    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.node(u).parent;
        match parent {
            None => self.root = v,
            Some(p) => {
                if self.node(p).left == Some(u) {
                    self.node_mut(p).left = v;
                } else {
                    self.node_mut(p).right = v;
                }
            }
        }
        if let Some(vi) = v {
            self.node_mut(vi).parent = parent;
        }
    }

    /// Six-case delete fixup (CLRS numbering). `x` may be a "virtual"
    /// nil carrying `parent` as its logical parent, since this tree has
    /// no sentinel node to hang a color on.
    fn delete_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else { break };
            if x == self.node(p).left {
                let mut w = self.node(p).right.expect("sibling must exist for a black non-root");
                if self.color(Some(w)) == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_left(p);
                    w = self.node(p).right.unwrap();
                }
                if self.color(self.node(w).left) == Color::Black
                    && self.color(self.node(w).right) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color(self.node(w).right) == Color::Black {
                        if let Some(wl) = self.node(w).left {
                            self.node_mut(wl).color = Color::Black;
                        }
                        self.node_mut(w).color = Color::Red;
                        self.rotate_right(w);
                        w = self.node(p).right.unwrap();
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    if let Some(wr) = self.node(w).right {
                        self.node_mut(wr).color = Color::Black;
                    }
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let mut w = self.node(p).left.expect("sibling must exist for a black non-root");
                if self.color(Some(w)) == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_right(p);
                    w = self.node(p).left.unwrap();
                }
                if self.color(self.node(w).right) == Color::Black
                    && self.color(self.node(w).left) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color(self.node(w).left) == Color::Black {
                        if let Some(wr) = self.node(w).right {
                            self.node_mut(wr).color = Color::Black;
                        }
                        self.node_mut(w).color = Color::Red;
                        self.rotate_left(w);
                        w = self.node(p).left.unwrap();
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    if let Some(wl) = self.node(w).left {
                        self.node_mut(wl).color = Color::Black;
                    }
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        if let Some(xi) = x {
            self.node_mut(xi).color = Color::Black;
        }
    }

    fn first_id(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Some(l) = self.node(cur).left {
            cur = l;
        }
        Some(cur)
    }

    fn last_id(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Some(r) = self.node(cur).right {
            cur = r;
        }
        Some(cur)
    }

    /// In-order successor of `id`, or `None` if `id` holds the greatest key.
    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.node(id).right {
            let mut cur = r;
            while let Some(l) = self.node(cur).left {
                cur = l;
            }
            return Some(cur);
        }
        let mut cur = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// In-order predecessor of `id`, or `None` if `id` holds the least key.
    fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.node(id).left {
            let mut cur = l;
            while let Some(r) = self.node(cur).right {
                cur = r;
            }
            return Some(cur);
        }
        let mut cur = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).right == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// A cursor positioned before the first entry, or at the single
    /// collapsed sentinel if the tree is empty.
    pub fn begin(&self) -> Cursor<'_, K, V, R> {
        Cursor {
            tree: self,
            pos: self.first_id().map_or(Position::After, Position::At),
        }
    }

    /// A cursor positioned one past the last entry (the after-end
    /// sentinel). Decrementing it yields the last entry, unless the tree
    /// is empty, in which case it stays put.
    pub fn end(&self) -> Cursor<'_, K, V, R> {
        Cursor { tree: self, pos: Position::After }
    }

    /// Equivalent to [`RedBlackTree::begin`]; named to match the
    /// const/non-const pairing the B+-tree exposes.
    pub fn cbegin(&self) -> Cursor<'_, K, V, R> {
        self.begin()
    }

    /// Equivalent to [`RedBlackTree::end`].
    pub fn cend(&self) -> Cursor<'_, K, V, R> {
        self.end()
    }

    /// A forward-and-backward, in-order iterator.
    pub fn iter(&self) -> Iter<'_, K, V, R> {
        Iter { front: self.begin(), back: self.end() }
    }

    /// Checks red/black coloring, BST ordering, parent pointers, and
    /// subtree-size/reduction consistency. Intended for tests.
    pub fn verify_ok(&self) -> Result<(), String> {
        if let Some(r) = self.root {
            if self.color(Some(r)) != Color::Black {
                return Err("root is not black".into());
            }
            self.verify_node(r, None)?;
        }
        Ok(())
    }

    fn verify_node(&self, id: NodeId, parent: Option<NodeId>) -> Result<(usize, usize), String> {
        let n = self.node(id);
        if n.parent != parent {
            return Err(format!("node {id} has wrong parent pointer"));
        }
        if n.color == Color::Red {
            if self.color(n.left) == Color::Red || self.color(n.right) == Color::Red {
                return Err(format!("red node {id} has a red child"));
            }
        }
        if let Some(l) = n.left {
            if self.node(l).key.cmp(&n.key) != Ordering::Less {
                return Err(format!("left child of {id} is not smaller"));
            }
        }
        if let Some(r) = n.right {
            if self.node(r).key.cmp(&n.key) != Ordering::Greater {
                return Err(format!("right child of {id} is not greater"));
            }
        }
        let (left_count, left_black) = n.left.map_or(Ok((0, 1)), |l| self.verify_node(l, Some(id)))?;
        let (right_count, right_black) = n.right.map_or(Ok((0, 1)), |r| self.verify_node(r, Some(id)))?;
        if left_black != right_black {
            return Err(format!("black-height mismatch under {id}"));
        }
        if n.size != 1 + left_count + right_count {
            return Err(format!("node {id} has stale size"));
        }
        let own_black = if n.color == Color::Black { 1 } else { 0 };
        Ok((n.size, left_black + own_black))
    }
}

/// A cursor position: before the first entry, at a specific node, or
/// after the last entry. The two sentinels collapse to the same value
/// when the tree is empty.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Before,
    At(NodeId),
    After,
}

/// A bidirectional cursor with explicit before-begin/after-end sentinels
/// (spec.md §4.4). Obtained from [`RedBlackTree::begin`]/[`RedBlackTree::end`].
pub struct Cursor<'a, K, V, R: Reduce<V>> {
    tree: &'a RedBlackTree<K, V, R>,
    pos: Position,
}

impl<'a, K: Ord, V, R: Reduce<V>> Cursor<'a, K, V, R> {
    /// The entry at this position, or `None` at a sentinel.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        match self.pos {
            Position::At(id) => {
                let n = self.tree.node(id);
                Some((&n.key, &n.value))
            }
            _ => None,
        }
    }

    /// Moves to the next entry in key order. No-op on the after-end
    /// sentinel, or on any position when the tree is empty.
    pub fn next(&mut self) {
        self.pos = match self.pos {
            Position::Before => self.tree.first_id().map_or(Position::After, Position::At),
            Position::At(id) => self.tree.successor(id).map_or(Position::After, Position::At),
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
                    Position::At(self.tree.last_id().unwrap())
                }
            }
            Position::At(id) => self.tree.predecessor(id).map_or(Position::Before, Position::At),
            Position::Before => Position::Before,
        };
    }
}

impl<'a, K, V, R: Reduce<V>> PartialEq for Cursor<'a, K, V, R> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl<'a, K, V, R: Reduce<V>> Eq for Cursor<'a, K, V, R> {}

/// A forward-and-backward, in-order iterator built from a pair of
/// cursors that close in on each other.
pub struct Iter<'a, K, V, R: Reduce<V>> {
    front: Cursor<'a, K, V, R>,
    back: Cursor<'a, K, V, R>,
}

impl<'a, K: Ord, V, R: Reduce<V>> Iterator for Iter<'a, K, V, R> {
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

impl<'a, K: Ord, V, R: Reduce<V>> DoubleEndedIterator for Iter<'a, K, V, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.pos == self.back.pos {
            return None;
        }
        self.back.prev();
        self.back.get()
    }
}

/// A deferred-write handle returned by [`RedBlackTree::get_mut_tracked`].
pub struct ValueGuard<'a, K: Ord, V, R: Reduce<V>> {
    tree: &'a mut RedBlackTree<K, V, R>,
    id: NodeId,
}

impl<'a, K: Ord, V, R: Reduce<V>> std::ops::Deref for ValueGuard<'a, K, V, R> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.tree.node(self.id).value
    }
}

impl<'a, K: Ord, V, R: Reduce<V>> std::ops::DerefMut for ValueGuard<'a, K, V, R> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.tree.node_mut(self.id).value
    }
}

impl<'a, K: Ord, V, R: Reduce<V>> Drop for ValueGuard<'a, K, V, R> {
    fn drop(&mut self) {
        self.tree.refresh_to_root(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::reduction::SumReduce;

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut t = RedBlackTree::new();
        for i in 0..500i64 {
            t.insert(i, i * 2);
        }
        t.verify_ok().unwrap();
        assert_eq!(t.len(), 500);
        for i in (0..500i64).step_by(3) {
            assert_eq!(t.remove(&i), Some(i * 2));
            t.verify_ok().unwrap();
        }
        assert_eq!(t.len(), 334);
    }

    #[test]
    fn find_ith_and_glb_lub_agree_with_sorted_order() {
        let mut t = RedBlackTree::new();
        for i in (0..200i64).rev() {
            if i % 2 == 0 {
                t.insert(i, i);
            }
        }
        t.verify_ok().unwrap();
        let evens: Vec<i64> = (0..200).step_by(2).collect();
        for (i, &k) in evens.iter().enumerate() {
            assert_eq!(t.find_ith(i), Some((&k, &k)));
        }
        assert_eq!(t.find_glb(&7, true), Some((&6, &6)));
        assert_eq!(t.find_lub(&7, true), Some((&8, &8)));
        assert_eq!(t.find_glb(&8, true), Some((&8, &8)));
        assert_eq!(t.find_glb(&8, false), Some((&6, &6)));
        assert_eq!(t.find_lub(&8, true), Some((&8, &8)));
        assert_eq!(t.find_lub(&8, false), Some((&10, &10)));
    }

    #[test]
    fn reduce_lub_is_a_prefix_sum_open_and_closed() {
        let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &u64| *v));
        for i in 1..=10u64 {
            t.insert(i, i);
        }
        t.verify_ok().unwrap();
        assert_eq!(t.reduce_lub(&5, true), 1 + 2 + 3 + 4 + 5);
        assert_eq!(t.reduce_lub(&5, false), 1 + 2 + 3 + 4);
    }

    #[test]
    fn find_sum_glb_inverts_the_closed_prefix_sum() {
        let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &u64| *v));
        for i in 1..=10u64 {
            t.insert(i, i);
        }
        t.verify_ok().unwrap();
        for k in 1..=10u64 {
            let prefix = t.reduce_lub(&k, true);
            assert_eq!(t.find_sum_glb(&prefix), Some((&k, &k)));
        }
        assert_eq!(t.find_sum_glb(&0), None);
    }

    #[test]
    fn value_guard_recomputes_reduction_on_drop() {
        let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &u64| *v));
        for i in 1..=5u64 {
            t.insert(i, i);
        }
        {
            let mut g = t.get_mut_tracked(&3).unwrap();
            *g = 300;
        }
        assert_eq!(t.reduce_lub(&5, true), 1 + 2 + 300 + 4 + 5);
    }

    #[test]
    fn clear_empties_the_tree() {
        let mut t = RedBlackTree::new();
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
        let t: RedBlackTree<i64, i64> = RedBlackTree::new();
        assert!(t.begin() == t.end());
        assert!(t.cbegin() == t.cend());
        let mut c = t.end();
        c.prev();
        assert!(c == t.end());

        let mut t = RedBlackTree::new();
        for i in 0..5i64 {
            t.insert(i, i * i);
        }
        let mut c = t.end();
        c.prev();
        assert_eq!(c.get(), Some((&4, &16)));
        for _ in 0..4 {
            c.prev();
        }
        assert_eq!(c.get(), Some((&0, &0)));
        c.prev();
        assert_eq!(c.get(), None);
        c.next();
        assert_eq!(c.get(), Some((&0, &0)));

        let forward: Vec<i64> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(forward, vec![0, 1, 2, 3, 4]);
        let backward: Vec<i64> = t.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(backward, vec![4, 3, 2, 1, 0]);
    }
}
