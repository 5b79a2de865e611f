//! The kernel-wide state `S` spec.md §9 describes: the process table, every
//! BCP list, the mutex table, the terminal buffer and the scalar counters,
//! all behind one value whose mutating methods are the only route to
//! modify them. The IPL-raising discipline spec.md §5 describes is that
//! value's internal locking protocol — see the individual operation
//! modules (`scheduler.rs`, `clock.rs`, `mutex_ops.rs`, `terminal_ops.rs`,
//! `process_ops.rs`, `fault.rs`, `syscall.rs`) for where it's applied.
//!
//! `Kernel<H>` is generic over the [`Hal`] trait so the same logic runs
//! against a real x86_64 HAL in production and against
//! [`MockHal`](crate::hal_mock::MockHal) under test.

use crate::config::NUM_MUT;
use crate::hal::Hal;
use crate::list::{Links, List, Pid};
use crate::mutex::MutexSlot;
use crate::process::Table;
use crate::terminal::Buffer;

pub struct Kernel<H: Hal> {
    pub(crate) hal: H,
    pub(crate) procs: Table<H>,
    pub(crate) links: Links,

    /// FIFO of READY BCPs. The running process is also this list's head.
    pub(crate) ready: List,
    /// Unordered list of BCPs sleeping on time (`sis_dormir`).
    pub(crate) timed_blocked: List,
    /// FIFO of BCPs blocked on an empty terminal input buffer.
    pub(crate) term_wait: List,
    /// FIFO of BCPs blocked because the mutex-table quota was full.
    pub(crate) mutex_create_wait: List,

    pub(crate) mutexes: [MutexSlot; NUM_MUT],
    pub(crate) n_mutex_open: usize,

    pub(crate) term_buf: Buffer,

    /// The currently RUNNING process. `None` only before the very first
    /// dispatch.
    pub(crate) current: Option<Pid>,

    /// Global count of clock ticks delivered since boot.
    pub(crate) num_ints: u64,
    /// Set/cleared only around explicit user-pointer dereferences made on
    /// a syscall's behalf (spec.md §4.7, §6).
    pub(crate) acceso_parametro: bool,
    /// Id of the process the clock handler wants preempted once the
    /// deferred software interrupt fires (spec.md §4.4/§4.5).
    pub(crate) proc_a_expulsar: Option<Pid>,
}

impl<H: Hal> Kernel<H> {
    pub fn new(hal: H) -> Self {
        Kernel {
            hal,
            procs: Table::new(),
            links: Links::new(),
            ready: List::new(),
            timed_blocked: List::new(),
            term_wait: List::new(),
            mutex_create_wait: List::new(),
            mutexes: core::array::from_fn(|_| MutexSlot::unused()),
            n_mutex_open: 0,
            term_buf: Buffer::new(),
            current: None,
            num_ints: 0,
            acceso_parametro: false,
            proc_a_expulsar: None,
        }
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Total clock ticks delivered since boot (`sis_tiempos_proceso`'s
    /// return value — see spec.md §9).
    pub fn num_ints(&self) -> u64 {
        self.num_ints
    }
}
