//! Kernel-wide size/timing constants.
//!
//! The original teaching kernel this crate is modeled on (see
//! `original_source/minikernel` in the retrieval pack) pulls these from a
//! `const.h` we don't have a copy of; the values below are our own choices,
//! documented in DESIGN.md.

/// Maximum number of simultaneously live processes. The process table is a
/// fixed array of this size; there is no dynamic growth.
pub const MAX_PROC: usize = 16;

/// Global quota on simultaneously open (non-`SIN_USAR`) mutex slots.
pub const NUM_MUT: usize = 16;

/// Per-process mutex descriptor table size.
pub const NUM_MUT_PROC: usize = 4;

/// Maximum mutex name length, in bytes.
pub const MAX_NOM_MUT: usize = 32;

/// Capacity of the terminal input ring buffer.
pub const TAM_BUF_TERM: usize = 128;

/// Tick budget assigned to a process on dispatch (the "rodaja").
pub const TICKS_POR_RODAJA: u32 = 15;

/// Clock interrupt frequency, in Hz. `sis_dormir`'s argument (seconds) is
/// multiplied by this to get a tick count.
pub const TICK: u32 = 50;

/// Kernel stack size allocated per process via `Hal::crear_pila`.
pub const TAM_PILA: usize = 4096 * 4;

/// Number of entries in the syscall dispatch table (the 11 calls listed in
/// spec.md §6 plus the optional `leer_caracter` terminal extension at index
/// 11 — see SPEC_FULL.md §4 and DESIGN.md for why it gets a table slot
/// here).
pub const NSERVICIOS: usize = 12;

/// Recursive mutex type, per spec.md §4.11.
pub const RECURSIVO: i64 = 0;
/// Non-recursive mutex type, per spec.md §4.11.
pub const NO_RECURSIVO: i64 = 1;
