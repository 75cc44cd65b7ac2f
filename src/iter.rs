//! Forward iteration.
//!
//! Two flavours:
//!
//! - [`Iter`] borrows the cord and is a plain [`Iterator`]. While it lives
//!   the borrow checker rules out mutation, so it needs no bookkeeping.
//! - [`Cursor`] is detached: each step takes `&mut Cord`, so the cord may be
//!   spliced freely between steps. Before yielding an entry the cursor pins
//!   it with a counted record inside the node; deleting the pinned entry
//!   retargets the record to its level-0 predecessor, and the next step
//!   resumes from the retargeted node's successor. Iteration therefore never
//!   skips an entry or observes a dangling link — deletion behind the cursor
//!   looks like "resume from the nearest surviving predecessor", deletion
//!   and insertion ahead of it are simply observed.

use std::hash::Hash;

use crate::cord::{Cord, Item};
use crate::node::{Idx, NIL};

/// Borrowing forward iterator, created by [`Cord::iter`].
pub struct Iter<'a, Id, T> {
    cord: &'a Cord<Id, T>,
    at: Idx,
}

impl<'a, Id, T> Iter<'a, Id, T> {
    pub(crate) fn new(cord: &'a Cord<Id, T>, at: Idx) -> Self {
        Iter { cord, at }
    }
}

impl<'a, Id, T> Iterator for Iter<'a, Id, T>
where
    Id: Clone + Eq + Hash + Default,
{
    type Item = (&'a Id, Item<'a, T>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.at == NIL {
            return None;
        }
        let next = self.cord.node(self.at).levels[0].next;
        if next == NIL {
            self.at = NIL;
            return None;
        }
        self.at = next;
        let node = self.cord.node(next);
        Some((&node.id, Item { len: node.len, data: self.cord.payload(next) }))
    }
}

/// Detached mutation-tolerant iterator, created by [`Cord::cursor`].
///
/// Single-pass and forward-only; obtain a fresh cursor to restart. A cursor
/// must only be driven with the cord that created it.
///
/// While paused on an entry the cursor pins that node's slot; the pin is
/// released by the next [`Cursor::next`] call or by [`Cursor::stop`].
/// Dropping a paused cursor without either leaves the pin in place.
pub struct Cursor<Id> {
    state: State<Id>,
}

enum State<Id> {
    /// Not yet stepped; resolves the start id on the first step.
    Start(Id),
    /// Paused on the node it last yielded.
    Paused(Idx),
    Done,
}

impl<Id> Cursor<Id>
where
    Id: Clone + Eq + Hash + Default,
{
    pub(crate) fn new(after: Id) -> Self {
        Cursor { state: State::Start(after) }
    }

    /// Advances past the entry this cursor is paused on (or past the start
    /// anchor on the first call) and yields the next entry.
    pub fn next<'a, T>(&mut self, cord: &'a mut Cord<Id, T>) -> Option<(Id, Item<'a, T>)> {
        let at = match std::mem::replace(&mut self.state, State::Done) {
            State::Done => return None,
            State::Start(id) => cord.lookup(&id)?,
            State::Paused(idx) => cord.cursor_release(idx),
        };

        let next = cord.node(at).levels[0].next;
        if next == NIL {
            return None;
        }
        cord.cursor_attach(next);
        self.state = State::Paused(next);

        let node = cord.node(next);
        Some((node.id.clone(), Item { len: node.len, data: cord.payload(next) }))
    }

    /// Releases a paused cursor without advancing. Only needed when walking
    /// away before the cursor returns `None`.
    pub fn stop<T>(self, cord: &mut Cord<Id, T>) {
        if let State::Paused(idx) = self.state {
            cord.cursor_release(idx);
        }
    }
}
