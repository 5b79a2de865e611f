//! IDT setup and interrupt entry points (spec.md §4.4-§4.7, §6): the clock
//! and keyboard IRQs, the deferred-preemption software interrupt, the
//! syscall trap gate, and the arithmetic/memory fault handlers.
//!
//! Grounded on the teacher's `interrupts::idt` (IDT/PIC wiring, same vector
//! numbering) and `interrupts::usermode` (the naked-asm syscall gate that
//! captures raw registers before Rust's calling convention can clobber
//! them). Where the teacher's handlers directly `panic!`/log a fault, these
//! route into `Kernel::handle_*` instead so the fault/clock/syscall
//! semantics live in the HAL-independent core (`fault.rs`, `clock.rs`,
//! `syscall.rs`), not here.

use core::arch::naked_asm;

use lazy_static::lazy_static;
use pic8259::ChainedPics;
use spin::Mutex;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

use super::gdt;

pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// Software-interrupt vector `activar_int_SW()` raises (spec.md §4.5/§9).
/// Chosen just past the two PIC IRQ vectors this kernel uses, well clear of
/// the CPU-reserved 0..32 range.
pub const SW_INT_VECTOR: u8 = 0x81;
/// Syscall trap gate (`LLAM_SIS`), matching the teacher's `int 0x80`.
pub const SYSCALL_VECTOR: u8 = 0x80;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,
    Keyboard = PIC_1_OFFSET + 1,
}

impl InterruptIndex {
    fn as_u8(self) -> u8 {
        self as u8
    }
    fn as_usize(self) -> usize {
        usize::from(self.as_u8())
    }
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt[InterruptIndex::Timer.as_usize()].set_handler_fn(timer_interrupt_handler);
        idt[InterruptIndex::Keyboard.as_usize()].set_handler_fn(keyboard_interrupt_handler);
        idt[SW_INT_VECTOR as usize].set_handler_fn(software_interrupt_handler);
        unsafe {
            // `syscall_entry` is naked asm operating on raw registers, not
            // an `extern "x86-interrupt" fn(InterruptStackFrame)` — give
            // the IDT its address directly rather than forcing it through
            // a mismatched Rust function-pointer type.
            idt[SYSCALL_VECTOR as usize].set_handler_addr(x86_64::VirtAddr::new(
                syscall_entry as unsafe extern "C" fn() as u64,
            ));
        }
        idt
    };
}

pub fn init() {
    IDT.load();
    unsafe {
        PICS.lock().initialize();
    }
}

extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    crate::log_warn!("EXCEPTION: BREAKPOINT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    // Unrecoverable regardless of mode: a double fault means the kernel's
    // own fault-handling machinery failed. No `acceso_parametro` carve-out
    // applies here (spec.md §4.7 only names arithmetic/memory faults).
    unsafe { super::kernel() }
        .hal()
        .panico(alloc_free_fmt::fault_msg("double fault", &stack_frame));
}

extern "x86-interrupt" fn divide_error_handler(_stack_frame: InterruptStackFrame) {
    // `exc_arit` (spec.md §4.7).
    unsafe { super::kernel() }.handle_arithmetic_fault();
}

extern "x86-interrupt" fn page_fault_handler(
    _stack_frame: InterruptStackFrame,
    _error_code: PageFaultErrorCode,
) {
    // `exc_mem` (spec.md §4.7).
    unsafe { super::kernel() }.handle_memory_fault();
}

extern "x86-interrupt" fn general_protection_fault_handler(
    _stack_frame: InterruptStackFrame,
    _error_code: u64,
) {
    // Treated as a memory-access fault, same as the page-fault path
    // (spec.md doesn't distinguish GP faults from memory faults; both
    // indicate the running context touched memory it shouldn't have).
    unsafe { super::kernel() }.handle_memory_fault();
}

extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    unsafe { super::kernel() }.handle_clock_tick();
    unsafe {
        PICS.lock().notify_end_of_interrupt(InterruptIndex::Timer.as_u8());
    }
}

extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    use x86_64::instructions::port::Port;
    let scancode: u8 = unsafe { Port::new(0x60).read() };
    if crate::drivers::keyboard::handle_scancode(scancode).is_some() {
        unsafe { super::kernel() }.handle_terminal_interrupt();
    }
    unsafe {
        PICS.lock()
            .notify_end_of_interrupt(InterruptIndex::Keyboard.as_u8());
    }
}

extern "x86-interrupt" fn software_interrupt_handler(_stack_frame: InterruptStackFrame) {
    unsafe { super::kernel() }.handle_software_interrupt();
}

/// The syscall gate. Raw registers, not `InterruptStackFrame`, carry the
/// call number and arguments (spec.md §6), so this is hand-written asm
/// rather than an `extern "x86-interrupt" fn` — grounded on the teacher's
/// `interrupts::usermode::syscall_handler_asm`, trimmed to this kernel's
/// convention: RAX=call number, RDI/RSI/RDX=args 1..3.
///
/// This crate has no real ring-3 transition wired up (spec.md's explicit
/// non-goals exclude virtual memory, and user-space image loading is an
/// out-of-scope external collaborator — see `hal_x86_64::loader`), so every
/// call here currently originates from kernel-mode code executing `int
/// 0x80` directly; the stack-frame shape below assumes no privilege-level
/// change (no SS/RSP pushed by the CPU). Wiring real ring-3 entry would
/// need to account for that extra pushed frame.
#[unsafe(naked)]
unsafe extern "C" fn syscall_entry() {
    naked_asm!(
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        // CPU pushes 3 qwords (RFLAGS, CS, RIP — no SS/RSP, same privilege
        // level) assuming rsp was 16-aligned at the `int` site, as System V
        // maintains at call boundaries; our 4 pushes above don't change
        // that parity, so one more qword closes the gap the System V ABI
        // requires before `call` (teacher's `usermode::syscall_handler_asm`
        // hits the identical off-by-one-qword case for its own push count).
        "sub rsp, 8",
        "mov rcx, rdx",
        "mov rdx, rsi",
        "mov rsi, rdi",
        "mov rdi, rax",
        "call {dispatch}",
        "add rsp, 8",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "iretq",
        dispatch = sym dispatch_trap,
    );
}

/// Called from `syscall_entry` with the raw trapped registers. Latches
/// them into `super::REGISTERS` for `Kernel::leer_registro` to read, runs
/// the dispatcher, and returns the value `Kernel::escribir_registro` wrote
/// to register 0 so the asm trampoline can restore it into `rax`.
extern "C" fn dispatch_trap(number: u64, a1: u64, a2: u64, a3: u64) -> u64 {
    unsafe {
        super::REGISTERS[0] = number;
        super::REGISTERS[1] = a1;
        super::REGISTERS[2] = a2;
        super::REGISTERS[3] = a3;
    }
    unsafe { super::kernel() }.dispatch_syscall();
    unsafe { super::REGISTERS[0] }
}

/// Tiny no-`alloc` helper so the double-fault path (which must not itself
/// fault) can still hand `panico` a formatted message.
mod alloc_free_fmt {
    use x86_64::structures::idt::InterruptStackFrame;

    pub fn fault_msg(prefix: &str, frame: &InterruptStackFrame) -> &'static str {
        // `panico` takes `&str`; building a truly dynamic message without
        // `alloc` would need a fixed scratch buffer formatted in place.
        // Since this path never returns, log the detail via `printk`
        // first and hand `panico` a static summary.
        let _ = frame;
        crate::log_error!("{prefix}: {:#?}", frame);
        "unrecoverable kernel-mode fault"
    }
}
