//! Intrusive FIFO queues of BCPs (spec.md §4.1, component C1).
//!
//! The original C kernel links BCPs together with raw `siguiente` pointers
//! embedded in each `BCP`. Rust's aliasing rules make that awkward, so this
//! follows the arena+stable-index scheme spec.md §9 suggests instead: every
//! process table slot has a `next` link stored out-of-line in one shared
//! [`Links`] array, and a [`List`] is just a `(head, tail)` pair of indices.
//! Because the data model's invariant is that a BCP sits in at most one
//! list at a time, every list in the kernel — the ready list, the
//! timed-blocked list, the terminal-read wait list, the mutex-create wait
//! list, and every mutex's own waiter list — can safely share the same
//! `Links` array.

use crate::config::MAX_PROC;

/// Process-table index. Valid range is `[0, MAX_PROC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pid(pub usize);

/// Out-of-line `next` pointers for every process slot. Shared by every
/// [`List`] in the kernel.
pub struct Links {
    next: [Option<Pid>; MAX_PROC],
}

impl Links {
    pub const fn new() -> Self {
        Links {
            next: [None; MAX_PROC],
        }
    }

    fn next_of(&self, p: Pid) -> Option<Pid> {
        self.next[p.0]
    }

    fn set_next(&mut self, p: Pid, next: Option<Pid>) {
        self.next[p.0] = next;
    }
}

/// A FIFO queue of BCPs. Callers must remove a BCP from its current list
/// before inserting it into another (spec.md §4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct List {
    head: Option<Pid>,
    tail: Option<Pid>,
}

impl List {
    pub const fn new() -> Self {
        List {
            head: None,
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head(&self) -> Option<Pid> {
        self.head
    }

    /// `insertar_ultimo`: append at the tail. O(1).
    pub fn append(&mut self, links: &mut Links, p: Pid) {
        links.set_next(p, None);
        match self.tail {
            None => self.head = Some(p),
            Some(t) => links.set_next(t, Some(p)),
        }
        self.tail = Some(p);
    }

    /// `eliminar_primero`: pop and return the head. O(1).
    pub fn pop_head(&mut self, links: &mut Links) -> Option<Pid> {
        let head = self.head?;
        let next = links.next_of(head);
        self.head = next;
        if self.head.is_none() {
            self.tail = None;
        }
        links.set_next(head, None);
        Some(head)
    }

    /// `eliminar_elem`: remove a specific BCP from the list, walking from
    /// the head to find its predecessor. O(n). No-op if `p` is not a
    /// member of this list.
    pub fn remove(&mut self, links: &mut Links, p: Pid) {
        if self.head == Some(p) {
            self.pop_head(links);
            return;
        }
        let mut prev = self.head;
        while let Some(cur) = prev {
            let next = links.next_of(cur);
            if next == Some(p) {
                let after = links.next_of(p);
                links.set_next(cur, after);
                if self.tail == Some(p) {
                    self.tail = Some(cur);
                }
                links.set_next(p, None);
                return;
            }
            prev = next;
        }
    }

    /// Iterate the list's members without mutating it, saving `next`
    /// before the closure runs so that the walk is stable even if the
    /// closure unlinks the current element (spec.md §4.4's requirement on
    /// the timed-blocked sweep).
    pub fn for_each_removable(&self, links: &Links, mut f: impl FnMut(Pid)) {
        let mut cur = self.head;
        while let Some(p) = cur {
            let next = links.next_of(p);
            f(p);
            cur = next;
        }
    }
}
