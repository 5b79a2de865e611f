//! The BCP (process control block) and process-table lifecycle (spec.md
//! §3, §4.2, §4.8 — components C2 and C8).

use crate::config::{MAX_PROC, NUM_MUT_PROC};
use crate::hal::{Context, Hal};
use crate::list::Pid;

/// A process's lifecycle state (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// The process control block. One lives in each process-table slot.
pub struct Bcp<H: Hal> {
    pub state: ProcessState,
    pub context: H::Context,
    pub stack: Option<H::Stack>,
    pub image: Option<H::Image>,
    /// Ticks remaining before a `sis_dormir` sleep ends.
    pub ticks_bloq: u32,
    /// Ticks remaining in the process's current quantum.
    pub ticks_rodaja_restantes: u32,
    /// Clock ticks that landed while this process was running in user mode.
    pub int_usuario: u64,
    /// Clock ticks that landed while this process was running in system
    /// (kernel) mode.
    pub int_sistema: u64,
    /// Per-process mutex descriptor table: each entry is either `None`
    /// (free) or the index of a live mutex-table slot.
    pub desc_mutex: [Option<usize>; NUM_MUT_PROC],
}

impl<H: Hal> Bcp<H> {
    fn unused() -> Self {
        Bcp {
            state: ProcessState::Unused,
            context: H::Context::empty(),
            stack: None,
            image: None,
            ticks_bloq: 0,
            ticks_rodaja_restantes: 0,
            int_usuario: 0,
            int_sistema: 0,
            desc_mutex: [None; NUM_MUT_PROC],
        }
    }

    /// Re-initialize a freshly allocated slot for a brand-new process.
    fn reset_for_new_task(&mut self, context: H::Context, image: H::Image, stack: H::Stack) {
        self.state = ProcessState::Ready;
        self.context = context;
        self.image = Some(image);
        self.stack = Some(stack);
        self.ticks_bloq = 0;
        self.ticks_rodaja_restantes = 0;
        self.int_usuario = 0;
        self.int_sistema = 0;
        self.desc_mutex = [None; NUM_MUT_PROC];
    }
}

/// Fixed-size process table with linear-scan allocation (spec.md §4.2). No
/// defragmentation, no dynamic growth.
pub struct Table<H: Hal> {
    slots: [Bcp<H>; MAX_PROC],
}

impl<H: Hal> Table<H> {
    pub fn new() -> Self {
        Table {
            slots: core::array::from_fn(|_| Bcp::unused()),
        }
    }

    pub fn get(&self, pid: Pid) -> &Bcp<H> {
        &self.slots[pid.0]
    }

    pub fn get_mut(&mut self, pid: Pid) -> &mut Bcp<H> {
        &mut self.slots[pid.0]
    }

    /// Borrow `from`'s context mutably (to be saved into) and `to`'s
    /// context immutably (to be switched to) at the same time. Used by the
    /// scheduler around `Hal::cambio_contexto`.
    pub fn context_pair(&mut self, from: Pid, to: Pid) -> (&mut H::Context, &H::Context) {
        assert_ne!(from.0, to.0, "cannot switch a process's context into itself");
        if from.0 < to.0 {
            let (left, right) = self.slots.split_at_mut(to.0);
            (&mut left[from.0].context, &right[0].context)
        } else {
            let (left, right) = self.slots.split_at_mut(from.0);
            (&mut right[0].context, &left[to.0].context)
        }
    }

    /// `buscar_BCP_libre`: first `Unused` slot, or `None` (ENOSLOT).
    pub fn find_free(&self) -> Option<Pid> {
        self.slots
            .iter()
            .position(|b| b.state == ProcessState::Unused)
            .map(Pid)
    }

    /// Allocate `pid` for a brand-new task.
    pub fn activate(&mut self, pid: Pid, context: H::Context, image: H::Image, stack: H::Stack) {
        self.slots[pid.0].reset_for_new_task(context, image, stack);
    }

    /// Release a terminated process's slot back to `Unused`, returning its
    /// owned image/stack so the caller can hand them back to the HAL.
    pub fn retire(&mut self, pid: Pid) -> (Option<H::Image>, Option<H::Stack>) {
        let bcp = &mut self.slots[pid.0];
        bcp.state = ProcessState::Terminated;
        (bcp.image.take(), bcp.stack.take())
    }

    pub fn mark_unused(&mut self, pid: Pid) {
        self.slots[pid.0].state = ProcessState::Unused;
    }
}
