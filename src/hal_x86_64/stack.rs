//! Fixed pool of kernel stacks backing `Hal::crear_pila`/`liberar_pila`.
//!
//! The kernel core is deliberately alloc-free (`process.rs`'s `Table` is a
//! fixed array, not a `Vec`); the x86_64 HAL mirrors that rather than
//! reaching for `alloc::vec::Vec<u8>` the way the teacher's
//! `scheduler::spawn` does. One `TAM_PILA`-sized slot per process-table
//! entry, indexed the same way `Pid` indexes the process table.

use core::cell::UnsafeCell;

use spin::Mutex;

use crate::config::{MAX_PROC, TAM_PILA};
use crate::hal::Stack as StackTrait;

#[repr(align(16))]
struct StackSlot(UnsafeCell<[u8; TAM_PILA]>);

// SAFETY: each slot is handed out to at most one live `Stack` at a time,
// enforced by `FREE` below; the kernel never reads/writes a slot's bytes
// itself, only hands its address to the HAL's context-switch asm.
unsafe impl Sync for StackSlot {}

static STACKS: [StackSlot; MAX_PROC] =
    [const { StackSlot(UnsafeCell::new([0; TAM_PILA])) }; MAX_PROC];

static FREE: Mutex<[bool; MAX_PROC]> = Mutex::new([true; MAX_PROC]);

/// A leased kernel stack. `top()` is the address `fijar_contexto_ini` uses
/// as the new task's initial `rsp`.
pub struct Stack {
    index: usize,
}

impl StackTrait for Stack {}

impl Stack {
    pub fn alloc() -> Self {
        let mut free = FREE.lock();
        let index = free
            .iter()
            .position(|f| *f)
            .expect("hal_x86_64::stack pool exhausted (MAX_PROC slots)");
        free[index] = false;
        Stack { index }
    }

    pub fn top(&self) -> u64 {
        let base = STACKS[self.index].0.get() as u64;
        base + TAM_PILA as u64
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        FREE.lock()[self.index] = true;
    }
}
