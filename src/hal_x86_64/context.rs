//! Saved register context and the raw context-switch asm (spec.md §6 "HAL
//! imports": `cambio_contexto`). Kept close to verbatim from the teacher's
//! `scheduler::context` — same callee-saved-register layout, same naked-asm
//! switch — adapted to implement this crate's [`crate::hal::Context`] trait
//! instead of the teacher's own `Context::new`/`empty` inherent methods.

use core::arch::naked_asm;

use crate::hal::Context as ContextTrait;

/// CPU register context saved/restored during a context switch. All
/// callee-saved registers on the x86_64 System V ABI, plus the return
/// address `switch_context` resumes at.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Context {
    pub rsp: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rip: u64,
}

impl ContextTrait for Context {
    fn empty() -> Self {
        Context {
            rsp: 0,
            rbp: 0,
            rbx: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rip: 0,
        }
    }
}

impl Context {
    /// Build the initial context for a brand-new task: `rip` points at
    /// `entry`, `rsp` at the top of its (already 16-byte-aligned-minus-8)
    /// kernel stack (`fijar_contexto_ini`).
    pub fn new(entry: u64, stack_top: u64) -> Self {
        let aligned_sp = (stack_top - 8) & !0xF;
        Context {
            rsp: aligned_sp,
            rbp: 0,
            rbx: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rip: entry,
        }
    }
}

/// `cambio_contexto(&from, &to)`: save callee-saved registers into `old`,
/// restore from `new`, and jump. Returns to its caller only once some later
/// `switch_context`/`restore_context` targets `old` again.
///
/// # Safety
/// Both pointers must reference live, correctly laid-out [`Context`]
/// values; `new`'s `rsp` must point into a stack that is still mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(old: *mut Context, new: *const Context) {
    naked_asm!(
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x38], rax",
        "mov rsp, [rsi + 0x00]",
        "mov rbp, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        "jmp [rsi + 0x38]",
        "2:",
        "ret",
    );
}

/// `cambio_contexto(&None, &to)`: jump into `new` without saving anything.
/// Used for the boot dispatch and for `liberar_proceso`, where the caller's
/// own context is being discarded.
///
/// # Safety
/// `new` must reference a live [`Context`] with a valid `rsp`.
#[unsafe(naked)]
pub unsafe extern "C" fn restore_context(new: *const Context) {
    naked_asm!(
        "mov rsp, [rdi + 0x00]",
        "mov rbp, [rdi + 0x08]",
        "mov rbx, [rdi + 0x10]",
        "mov r12, [rdi + 0x18]",
        "mov r13, [rdi + 0x20]",
        "mov r14, [rdi + 0x28]",
        "mov r15, [rdi + 0x30]",
        "jmp [rdi + 0x38]",
    );
}
