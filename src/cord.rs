//! The `Cord` container: an identifier-addressed skip list.
//!
//! Entries form a linear order starting at a permanent *root* entry whose id
//! is `Id::default()` and whose length is 0. Every entry is addressed by a
//! caller-supplied id, and carries a length captured from its payload at
//! insertion time. Per-level forward widths make positional queries
//! logarithmic:
//!
//! ```text
//! Level 2: ROOT (w=8) ----------------------------> NIL
//! Level 1: ROOT (w=5) -> B (w=3) ------------------> NIL
//! Level 0: ROOT (w=0) -> A (w=5) -> B (w=2) -> C (w=1) -> NIL
//! ```
//!
//! A node's width at level `i` is the total length from the start of that
//! entry to the start of its level-`i` successor (or the end of the list), so
//! walking any level and summing widths telescopes to absolute positions.
//!
//! All mutation funnels through [`Cord::splice`], which performs an optional
//! contiguous deletion followed by an optional insertion in one
//! seek/delete/insert pass, keeping every width exact.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem::MaybeUninit;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{CordError, Result};
use crate::iter::{Cursor, Iter};
use crate::length::Length;
use crate::node::{random_height, CursorRef, Idx, Level, Node, HEAD, MAX_HEIGHT, NIL, POOL_SIZE};

/// Entry metadata returned by [`Cord::info`].
///
/// `prev` is the level-0 predecessor's id (the root is its own predecessor);
/// `next` is `None` for the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info<'a, Id, T> {
    pub id: Id,
    pub prev: Id,
    pub next: Option<Id>,
    pub len: i64,
    pub data: &'a T,
}

/// A removed entry, reported in removal (= sequence) order. The payload is
/// moved out of the structure, so removal doubles as extraction — enough to
/// undo a deletion by re-inserting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed<Id, T> {
    pub id: Id,
    pub len: i64,
    pub data: T,
}

/// A yielded entry: the captured length plus a payload reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item<'a, T> {
    pub len: i64,
    pub data: &'a T,
}

/// Per-level seek record: the node whose level-`i` link reaches the anchor,
/// and the length from that node's start through the anchor's end.
#[derive(Clone, Copy)]
struct Seek {
    node: Idx,
    sub: i64,
}

/// An indexed ordered sequence keyed by caller-supplied ids.
///
/// Not safe for concurrent mutation; mutation between the steps of a paused
/// [`Cursor`] is fine.
pub struct Cord<Id, T> {
    nodes: Vec<Node<Id, T>>,
    by_id: FxHashMap<Id, Idx>,
    /// Up to POOL_SIZE recycled arena slots; overflow slots are left
    /// untracked. Slots pinned by a paused cursor stay out of here until
    /// the last cursor detaches.
    pool: Vec<Idx>,
    /// Current list height; always equals the root's level count.
    height: usize,
    len: i64,
    last_id: Id,
}

impl<Id, T> Cord<Id, T>
where
    Id: Clone + Eq + Hash + Default,
{
    /// Builds an empty cord with a default root payload.
    pub fn new() -> Self
    where
        T: Default,
    {
        Self::new_root(T::default())
    }

    /// Builds an empty cord; `root` becomes the payload of the root entry.
    pub fn new_root(root: T) -> Self {
        let mut head = Node::new(Id::default(), 0, root, 1);
        head.levels[0] = Level { next: NIL, prev: HEAD, width: 0 };
        // The root's tower only ever grows to MAX_HEIGHT; reserve once.
        head.levels.reserve(MAX_HEIGHT - 1);

        let mut by_id = FxHashMap::default();
        by_id.insert(Id::default(), HEAD);

        Cord {
            nodes: vec![head],
            by_id,
            pool: Vec::new(),
            height: 1,
            len: 0,
            last_id: Id::default(),
        }
    }

    /// Total length of all entries. O(1).
    pub fn len(&self) -> i64 {
        self.len
    }

    /// Number of live entries, excluding the root. O(1).
    pub fn count(&self) -> usize {
        self.by_id.len() - 1
    }

    /// True when no entries besides the root exist.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Id of the last entry in sequence order; the root id when empty.
    pub fn last_id(&self) -> Id {
        self.last_id.clone()
    }

    /// Position after the entry with the given id, or -1 when absent.
    ///
    /// Walks from the node's top level back to the root, accumulating
    /// predecessor widths. ~O(log n).
    pub fn find(&self, id: &Id) -> i64 {
        let Some(&idx) = self.by_id.get(id) else { return -1 };

        let mut node = idx;
        let mut pos = 0;
        while node != HEAD {
            let link = self.node(node).height() - 1;
            node = self.node(node).levels[link].prev;
            pos += self.node(node).levels[link].width;
        }

        pos + self.node(idx).len
    }

    /// Level-0 neighbourhood of an entry, or `None` when absent. O(1).
    pub fn info(&self, id: &Id) -> Option<Info<'_, Id, T>> {
        let &idx = self.by_id.get(id)?;
        let node = self.node(idx);
        let l0 = node.levels[0];

        Some(Info {
            id: node.id.clone(),
            prev: self.node(l0.prev).id.clone(),
            next: (l0.next != NIL).then(|| self.node(l0.next).id.clone()),
            len: node.len,
            data: self.payload(idx),
        })
    }

    /// Payload of a live entry. Payloads are immutable while inserted;
    /// removal hands the payload back through [`Removed`].
    pub fn data(&self, id: &Id) -> Option<&T> {
        self.by_id.get(id).map(|&idx| self.payload(idx))
    }

    /// Finds the entry covering `position`, returning its id and the offset
    /// from the end of that entry back to the requested position. ~O(log n).
    ///
    /// Positions on an entry boundary are ambiguous — most visibly around
    /// zero-length entries. `bias_after` picks the side: `false` stops at
    /// the earlier entry (position 0 always lands the root), `true` crosses
    /// zero-length runs to the latest same-position entry (the total length
    /// always lands the last entry).
    pub fn by_position(&self, position: i64, bias_after: bool) -> (Id, i64) {
        if position < 0 || (!bias_after && position == 0) {
            return (Id::default(), 0);
        }
        if position > self.len || (bias_after && position == self.len) {
            return (self.last_id.clone(), 0);
        }

        let mut position = position;
        let mut e = HEAD;
        'levels: for h in (0..self.height).rev() {
            loop {
                let l = self.node(e).levels[h];
                if position <= l.width {
                    break;
                }
                position -= l.width;
                if l.next == NIL {
                    continue 'levels;
                }
                e = l.next;
            }

            // Biasing to the later side crosses every boundary the position
            // sits on, including zero-width links.
            while bias_after {
                let l = self.node(e).levels[h];
                if position < l.width || l.next == NIL {
                    break;
                }
                position -= l.width;
                e = l.next;
            }
        }

        (self.node(e).id.clone(), self.node(e).len - position)
    }

    /// Relative order of two entries: `Less` when `a` precedes `b`. `None`
    /// when either id is absent; `Some(Equal)` only for `a == b`. ~O(log n),
    /// cheaper than two [`Cord::find`] calls because it never computes
    /// absolute positions.
    pub fn compare(&self, a: &Id, b: &Id) -> Option<Ordering> {
        if a == b {
            return self.by_id.contains_key(a).then_some(Ordering::Equal);
        }

        let mut anode = self.by_id.get(a).copied()?;
        let mut bnode = self.by_id.get(b).copied()?;

        // Index the taller node's predecessor chain so the other node has
        // the shallower climb; the swap flips the reported sign.
        let mut cmp = Ordering::Greater;
        if self.node(anode).height() < self.node(bnode).height() {
            cmp = Ordering::Less;
            std::mem::swap(&mut anode, &mut bnode);
        }

        let mut anodes = [NIL; MAX_HEIGHT];
        self.rseek(anode, &mut anodes);

        let mut curr = bnode;
        let mut i = 1;
        loop {
            let mut ll = self.node(curr).height();
            while i < ll {
                if curr == anodes[i] {
                    // Stepped "right" into the indexed chain: the indexed
                    // node continues ahead of us.
                    return Some(cmp);
                }
                i += 1;
            }

            ll -= 1;
            curr = self.node(curr).levels[ll].prev;
            if curr == anodes[ll] {
                // Stepped "up" into the indexed chain: we sit in its wake.
                return Some(cmp.reverse());
            }
            if curr == HEAD {
                // Reached the root without ever meeting the chain.
                return Some(cmp);
            }
        }
    }

    /// True when `a` strictly precedes `b`. For sorting.
    pub fn less(&self, a: &Id, b: &Id) -> bool {
        self.compare(a, b) == Some(Ordering::Less)
    }

    /// Signed distance `find(b) - find(a)`, or `None` when either is absent.
    pub fn between(&self, a: &Id, b: &Id) -> Option<i64> {
        let pos_a = self.find(a);
        if pos_a < 0 {
            return None;
        }
        let pos_b = self.find(b);
        if pos_b < 0 {
            return None;
        }
        Some(pos_b - pos_a)
    }

    /// Forward iterator over `(id, item)` starting after the entry `after`;
    /// empty when `after` is absent. Borrows the cord, so use
    /// [`Cord::cursor`] instead when mutating mid-iteration.
    pub fn iter(&self, after: &Id) -> Iter<'_, Id, T> {
        Iter::new(self, self.lookup(after).unwrap_or(NIL))
    }

    /// Detached forward cursor starting after the entry `after`.
    ///
    /// The cord may be mutated freely between [`Cursor::next`] calls; a
    /// paused cursor survives deletion of its current entry by resuming from
    /// the nearest surviving predecessor. Must only be driven with the cord
    /// that created it.
    pub fn cursor(&self, after: &Id) -> Cursor<Id> {
        Cursor::new(after.clone())
    }

    /// Inserts an entry with `id` and `data` after the entry `after`.
    pub fn insert(&mut self, after: &Id, id: Id, data: T) -> Result<()>
    where
        T: Length,
    {
        self.splice(after, None, Some((id, data))).map(|_| ())
    }

    /// Removes the run after `after` through `until` inclusive, returning
    /// the removed entries. Does not require the payload's [`Length`]
    /// capability.
    pub fn delete(&mut self, after: &Id, until: &Id) -> Result<Vec<Removed<Id, T>>> {
        let after_idx = self.by_id.get(after).copied().ok_or(CordError::BadAnchor)?;
        let until = (until != after).then_some(until);
        Ok(self.splice_at(after_idx, until, None))
    }

    /// The unified mutation primitive: one anchored pass performing an
    /// optional contiguous deletion followed by an optional insertion.
    ///
    /// - `after` anchors both halves; deletion starts at its successor, the
    ///   new entry lands directly after it. The root id is a valid anchor.
    /// - `delete_until` ends the deletion at that id, inclusive. Passing the
    ///   anchor itself deletes nothing; an id never encountered deletes
    ///   through the end of the list rather than erroring.
    /// - `insert` supplies the new entry's id and payload; the payload's
    ///   [`Length`] is captured here, once.
    ///
    /// Errors ([`CordError::BadAnchor`], [`CordError::IdExists`],
    /// [`CordError::NegativeLength`]) are detected before any mutation.
    /// ~O(log n + m) for m removed entries.
    pub fn splice(
        &mut self,
        after: &Id,
        delete_until: Option<&Id>,
        insert: Option<(Id, T)>,
    ) -> Result<Vec<Removed<Id, T>>>
    where
        T: Length,
    {
        let after_idx = self.by_id.get(after).copied().ok_or(CordError::BadAnchor)?;

        let insert = match insert {
            Some((id, data)) => {
                if self.by_id.contains_key(&id) {
                    return Err(CordError::IdExists);
                }
                let len = data.length();
                if len < 0 {
                    return Err(CordError::NegativeLength);
                }
                Some((id, len, data))
            }
            None => None,
        };

        let until = delete_until.filter(|u| *u != after);
        Ok(self.splice_at(after_idx, until, insert))
    }

    /// Diagnostic dump of the tower grid at `debug!` level: one row per
    /// entry with `+width` per live link (`*` on the last link of a level),
    /// pipes for levels passing over the entry.
    pub fn debug_print(&self)
    where
        Id: Debug,
        T: Debug,
    {
        const PIPE: &str = "|     ";
        const BLANK: &str = "      ";

        debug!("> cord len={} height={}", self.len, self.height);

        let mut curr = HEAD;
        let mut render_height = self.height;
        loop {
            let node = self.node(curr);
            let mut parts = String::new();

            for (i, l) in node.levels.iter().enumerate() {
                let mut key = '+';
                if l.next == NIL {
                    key = '*';
                    render_height = render_height.min(i);
                }
                parts.push_str(&format!("{key}{:<5}", l.width));
            }
            for j in node.height()..self.height {
                parts.push_str(if j >= render_height { BLANK } else { PIPE });
            }
            parts.push_str(&format!("id={:?} {:?}", node.id, self.payload(curr)));
            debug!("- {parts}");

            curr = node.levels[0].next;
            if curr == NIL {
                break;
            }
            debug!("  {}", PIPE.repeat(render_height));
        }
    }

    // --- Splice internals ---

    /// Anchored delete-then-insert. Validation already happened; `until`
    /// is never the anchor's own id and `insert` carries a checked length.
    fn splice_at(
        &mut self,
        after_idx: Idx,
        until: Option<&Id>,
        insert: Option<(Id, i64, T)>,
    ) -> Vec<Removed<Id, T>> {
        // Seek phase: climb from the anchor to the root, recording for each
        // level the node whose link reaches the anchor and the length from
        // that node's start through the anchor's end.
        let seek_height = self.height;
        let mut seek = [Seek { node: HEAD, sub: 0 }; MAX_HEIGHT];
        let mut cur = Seek { node: after_idx, sub: self.node(after_idx).len };
        let mut i = 0;
        loop {
            let nl = self.node(cur.node).height();
            while i < nl {
                seek[i] = cur;
                i += 1;
            }
            if cur.node == HEAD || i == seek_height {
                break;
            }
            let link = i - 1;
            cur.node = self.node(cur.node).levels[link].prev;
            cur.sub += self.node(cur.node).levels[link].width;
        }

        let mut removed = Vec::new();
        if let Some(until) = until {
            loop {
                let e = self.node(after_idx).levels[0].next;
                if e == NIL {
                    // Ran off the end: the anchor is now the last entry.
                    self.last_id = self.node(after_idx).id.clone();
                    break;
                }

                let e_len = self.node(e).len;
                let e_height = self.node(e).height();
                let e_id = self.node(e).id.clone();
                let data = unsafe { self.node_mut(e).data.assume_init_read() };
                removed.push(Removed { id: e_id.clone(), len: e_len, data });

                // A cursor paused here resumes from the predecessor.
                let node = self.node_mut(e);
                let prev0 = node.levels[0].prev;
                if let Some(c) = node.cursor.as_mut() {
                    c.at = prev0;
                }

                self.by_id.remove(&e_id);
                self.len -= e_len;

                for j in 0..seek_height {
                    let s = seek[j].node;
                    if j >= e_height {
                        self.node_mut(s).levels[j].width -= e_len;
                        continue;
                    }
                    let el = self.node(e).levels[j];
                    {
                        let sl = &mut self.node_mut(s).levels[j];
                        sl.width += el.width - e_len;
                        sl.next = el.next;
                    }
                    if el.next != NIL {
                        self.node_mut(el.next).levels[j].prev = s;
                    }
                }

                self.retire(e);
                if e_id == *until {
                    break;
                }
            }

            if !self.by_id.contains_key(&self.last_id) {
                self.last_id = self.node(after_idx).id.clone();
            }
        }

        if let Some((id, len, data)) = insert {
            let was_empty = self.by_id.len() == 1;
            let height = random_height();
            let idx = self.alloc(id.clone(), len, data, height);
            self.by_id.insert(id.clone(), idx);

            let mut i = 0;
            while i < height {
                if i < self.height {
                    let n = seek[i].node;
                    let nl = self.node(n).levels[i];
                    if nl.next != NIL {
                        self.node_mut(nl.next).levels[i].prev = idx;
                    }
                    let st = seek[i].sub;
                    self.node_mut(idx).levels[i] =
                        Level { next: nl.next, prev: n, width: len + nl.width - st };
                    let sl = &mut self.node_mut(n).levels[i];
                    sl.next = idx;
                    sl.width = st;
                } else {
                    // Raise the list by one level. The root's new top link
                    // spans from position 0 through the anchor's end; the
                    // new node's covers the rest.
                    while cur.node != HEAD {
                        let link = self.node(cur.node).height() - 1;
                        cur.node = self.node(cur.node).levels[link].prev;
                        cur.sub += self.node(cur.node).levels[link].width;
                    }
                    self.node_mut(HEAD)
                        .levels
                        .push(Level { next: idx, prev: HEAD, width: cur.sub });
                    self.height += 1;
                    self.node_mut(idx).levels[i] =
                        Level { next: NIL, prev: HEAD, width: self.len - cur.sub + len };
                }
                i += 1;
            }
            // Links too tall for the new node now span one more entry.
            for j in i..seek_height {
                self.node_mut(seek[j].node).levels[j].width += len;
            }

            self.len += len;
            if after_idx == HEAD {
                if was_empty {
                    self.last_id = id;
                }
            } else if self.last_id == self.node(after_idx).id {
                self.last_id = id;
            }
        }

        self.check_invariants();
        removed
    }

    /// Hands back a recycled slot or grows the arena.
    fn alloc(&mut self, id: Id, len: i64, data: T, height: usize) -> Idx {
        if let Some(idx) = self.pool.pop() {
            let node = self.node_mut(idx);
            node.id = id;
            node.len = len;
            node.data = MaybeUninit::new(data);
            node.levels.resize(height, Level::default());
            idx
        } else {
            debug_assert!(self.nodes.len() < NIL as usize);
            self.nodes.push(Node::new(id, len, data, height));
            (self.nodes.len() - 1) as Idx
        }
    }

    /// Recycles a removed node's slot, unless a paused cursor pins it (the
    /// cursor release recycles it instead).
    fn retire(&mut self, idx: Idx) {
        if self.node(idx).cursor.is_some() {
            return;
        }
        self.recycle(idx);
    }

    /// Clears a removed node and, pool capacity permitting, tracks its slot
    /// for reuse; once the pool holds POOL_SIZE slots the rest are simply
    /// left untracked. The payload was already moved out; clearing the id
    /// and links drops the last retained values and makes a stale cursor
    /// resume end cleanly (`next == NIL`).
    fn recycle(&mut self, idx: Idx) {
        let node = self.node_mut(idx);
        node.id = Id::default();
        for l in node.levels.iter_mut() {
            *l = Level::default();
        }
        if self.pool.len() < POOL_SIZE {
            self.pool.push(idx);
        }
    }

    // --- Compare internals ---

    /// Records the upward predecessor chain of `curr`: for each level, the
    /// node reached at that level when climbing towers back to the root.
    fn rseek(&self, mut curr: Idx, target: &mut [Idx; MAX_HEIGHT]) {
        let mut i = 0;
        loop {
            let ll = self.node(curr).height();
            while i < ll {
                target[i] = curr;
                i += 1;
                if i == self.height {
                    return;
                }
            }
            curr = self.node(curr).levels[ll - 1].prev;
        }
    }

    // --- Cursor protocol (driven by `iter::Cursor`) ---

    pub(crate) fn lookup(&self, id: &Id) -> Option<Idx> {
        self.by_id.get(id).copied()
    }

    /// Pins a cursor to a live node before yielding it.
    pub(crate) fn cursor_attach(&mut self, idx: Idx) {
        let node = self.node_mut(idx);
        match node.cursor.as_mut() {
            Some(c) => c.count += 1,
            None => node.cursor = Some(CursorRef { count: 1, at: idx }),
        }
    }

    /// Releases one pin from a paused node and returns where the cursor
    /// resumes: the node itself, or the predecessor a deletion retargeted
    /// the pin to. Dropping the last pin of a removed node recycles it.
    pub(crate) fn cursor_release(&mut self, idx: Idx) -> Idx {
        let live = self.by_id.get(&self.node(idx).id) == Some(&idx);
        let node = self.node_mut(idx);
        let c = node.cursor.as_mut().expect("cursor released from an unpinned node");
        let at = c.at;
        c.count -= 1;
        if c.count == 0 {
            node.cursor = None;
            if !live {
                self.recycle(idx);
            }
        }
        at
    }

    // --- Arena access ---

    pub(crate) fn node(&self, idx: Idx) -> &Node<Id, T> {
        &self.nodes[idx as usize]
    }

    fn node_mut(&mut self, idx: Idx) -> &mut Node<Id, T> {
        &mut self.nodes[idx as usize]
    }

    /// Payload of a live (level-0 reachable) node.
    pub(crate) fn payload(&self, idx: Idx) -> &T {
        unsafe { self.node(idx).data.assume_init_ref() }
    }

    // --- Invariant checking ---

    /// Debug-build structural audit, run after every completed splice.
    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        let mut start = FxHashMap::default();
        let mut pos = 0i64;
        let mut order = Vec::new();
        let mut idx = HEAD;
        loop {
            start.insert(idx, pos);
            order.push(idx);
            pos += self.node(idx).len;
            let next = self.node(idx).levels[0].next;
            if next == NIL {
                break;
            }
            idx = next;
        }

        assert_eq!(order.len(), self.by_id.len(), "level-0 walk disagrees with the id index");
        assert_eq!(pos, self.len, "entry lengths do not sum to len()");
        assert_eq!(self.node(HEAD).height(), self.height, "root level count != height");
        assert!(self.by_id.contains_key(&self.last_id), "last_id names a dead entry");

        for &idx in &order {
            let node = self.node(idx);
            assert_eq!(self.by_id.get(&node.id), Some(&idx), "id index misses a live node");
            assert!(node.len >= 0, "negative captured length");
            for (l, level) in node.levels.iter().enumerate() {
                let end = if level.next == NIL { self.len } else { start[&level.next] };
                assert_eq!(level.width, end - start[&idx], "level {l} width out of sync");
                if level.next != NIL {
                    assert_eq!(
                        self.node(level.next).levels[l].prev,
                        idx,
                        "level {l} back-link out of sync"
                    );
                }
                if idx == HEAD {
                    assert_eq!(level.prev, HEAD, "root must be its own predecessor");
                }
            }
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_invariants(&self) {}
}

impl<Id, T> Default for Cord<Id, T>
where
    Id: Clone + Eq + Hash + Default,
    T: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id, T> Drop for Cord<Id, T> {
    fn drop(&mut self) {
        // Only live nodes still hold a payload; removed ones handed theirs
        // out through `Removed`.
        let mut idx = HEAD;
        loop {
            unsafe { self.nodes[idx as usize].data.assume_init_drop() };
            idx = self.nodes[idx as usize].levels[0].next;
            if idx == NIL {
                break;
            }
        }
    }
}
