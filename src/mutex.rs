//! Named-mutex subsystem data model (spec.md §3, §4.11 — component C11).
//! The operations themselves (`sis_crear_mutex` and friends) live on
//! `Kernel` in `mutex_ops.rs`; this module only holds the slot shape.

use crate::config::MAX_NOM_MUT;
use crate::list::{List, Pid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexType {
    Recursive,
    NonRecursive,
}

impl MutexType {
    /// `tabla_mutex[pos].tipo = tipo` in `sis_crear_mutex`: the original
    /// stores whatever wire value it's handed and only ever tests it with
    /// `== RECURSIVO` (`original_source/minikernel/kernel.c`, `sis_lock`).
    /// Any non-`RECURSIVO` value is therefore non-recursive, not an error —
    /// there is no "unknown mutex type" rejection in the source.
    pub fn from_wire(v: i64) -> Self {
        if v == crate::config::RECURSIVO {
            MutexType::Recursive
        } else {
            MutexType::NonRecursive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexState {
    Unused,
    Locked,
    Unlocked,
}

/// One mutex-table slot (spec.md §3 "Mutex-table slot").
pub struct MutexSlot {
    pub name: [u8; MAX_NOM_MUT],
    pub name_len: usize,
    pub kind: MutexType,
    pub state: MutexState,
    pub owner: Option<Pid>,
    /// Recursion count: ≥1 while LOCKED, 0 otherwise.
    pub n_blocks: u32,
    /// Count of per-process descriptors referring to this slot.
    pub n_opens: u32,
    /// FIFO of BCPs blocked in `lock` on this slot.
    pub waiters: List,
}

impl MutexSlot {
    pub const fn unused() -> Self {
        MutexSlot {
            name: [0; MAX_NOM_MUT],
            name_len: 0,
            kind: MutexType::NonRecursive,
            state: MutexState::Unused,
            owner: None,
            n_blocks: 0,
            n_opens: 0,
            waiters: List::new(),
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    fn set_name(&mut self, name: &[u8]) {
        self.name[..name.len()].copy_from_slice(name);
        self.name_len = name.len();
    }

    /// `UNUSED -> UNLOCKED` on create.
    pub fn activate(&mut self, name: &[u8], kind: MutexType) {
        self.set_name(name);
        self.kind = kind;
        self.state = MutexState::Unlocked;
        self.owner = None;
        self.n_blocks = 0;
        self.n_opens = 1;
        self.waiters = List::new();
    }
}
