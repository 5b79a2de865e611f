//! The real x86_64 [`Hal`] implementation, and the boot-time wiring that
//! turns it into a running [`Kernel`]. Everything the kernel core treats as
//! an opaque hardware collaborator (spec.md §1, §6 "HAL imports") lives
//! under this module: the GDT/TSS (`gdt`), the IDT/PIC (`idt`), saved
//! register contexts and the switch asm (`context`), the kernel-stack pool
//! (`stack`), the stand-in program loader (`loader`) and its single
//! kernel-resident `init` task (`init_task`).
//!
//! Grounded on the teacher's `lib.rs`/`memory.rs` boot sequence for the
//! overall init order, and on its raw `static mut` patterns (`KEYBOARD_*`,
//! `SERIAL1`) for how it stores long-lived mutable kernel state without
//! `alloc`.

pub mod context;
pub mod gdt;
pub mod idt;
pub mod init_task;
pub mod loader;
pub mod stack;

use core::cell::UnsafeCell;

use spin::Mutex;

use crate::hal::{Hal, Ipl};
use crate::kernel::Kernel;

/// Syscall argument registers, latched by `idt::dispatch_trap` before
/// `Kernel::dispatch_syscall` runs and consulted by `leer_registro`/
/// `escribir_registro`. Index 0 is the call number going in and the return
/// value coming out, matching `leer_registro(0)`/`escribir_registro(0, _)`
/// in `syscall.rs`.
///
/// A real multiprocessor kernel would need one of these per CPU; spec.md §1
/// places multiprocessor support out of scope, so one global array is
/// enough here (interrupts are the only other reader, and the syscall gate
/// runs with interrupts disabled until the dispatcher raises `Nivel3`
/// itself where needed).
pub(crate) static mut REGISTERS: [u64; 4] = [0; 4];

/// The last byte the keyboard IRQ handler translated, for
/// `Hal::leer_puerto_terminal` to consume. `None` once read — matches the
/// original `leer_puerto(DIR_TERMINAL)`, which only has a byte to offer
/// immediately after the IRQ that produced it.
static LAST_SCANCODE_BYTE: Mutex<Option<u8>> = Mutex::new(None);

pub struct X86Hal;

impl Hal for X86Hal {
    type Context = context::Context;
    type Image = loader::Image;
    type Stack = stack::Stack;

    fn set_ipl(&self, level: Ipl) -> Ipl {
        use x86_64::instructions::interrupts;

        let prev = current_ipl();
        match level {
            Ipl::Nivel1 => {
                // Both the clock (IRQ0) and keyboard (IRQ1) may interrupt.
                set_master_pic_mask(0b1111_1100);
                interrupts::enable();
            }
            Ipl::Nivel2 => {
                // Mask IRQ1 (keyboard) only; the clock (IRQ0) keeps
                // ticking so `sis_dormir`'s accounting doesn't stall.
                set_master_pic_mask(0b1111_1110);
                interrupts::enable();
            }
            Ipl::Nivel3 => {
                interrupts::disable();
            }
        }
        set_current_ipl(level);
        prev
    }

    fn halt(&self) {
        x86_64::instructions::hlt();
    }

    fn crear_imagen(&self, prog: &str) -> Option<(Self::Image, u64)> {
        loader::load(prog)
    }

    fn liberar_imagen(&self, _image: Self::Image) {
        // The stand-in loader hands out `'static` entry points, nothing to
        // free. A real loader would unmap the image's pages here.
    }

    fn crear_pila(&self, _size: usize) -> Self::Stack {
        stack::Stack::alloc()
    }

    fn liberar_pila(&self, stack: Self::Stack) {
        drop(stack);
    }

    fn fijar_contexto_ini(
        &self,
        image: &Self::Image,
        stack: &Self::Stack,
        pc: u64,
    ) -> Self::Context {
        let _ = image;
        context::Context::new(pc, stack.top())
    }

    fn cambio_contexto(&self, from: Option<&mut Self::Context>, to: &Self::Context) {
        match from {
            Some(old) => unsafe { context::switch_context(old as *mut _, to as *const _) },
            None => unsafe { context::restore_context(to as *const _) },
        }
    }

    fn viene_de_modo_usuario(&self) -> bool {
        // No ring-3 transition is wired up yet (see `idt::syscall_entry`'s
        // doc comment); every trap currently originates in kernel mode.
        false
    }

    fn activar_int_sw(&self) {
        unsafe {
            core::arch::asm!("int {vec}", vec = const idt::SW_INT_VECTOR, options(nomem, nostack));
        }
    }

    fn leer_puerto_terminal(&self) -> u8 {
        LAST_SCANCODE_BYTE.lock().take().unwrap_or(0)
    }

    fn leer_registro(&self, i: usize) -> u64 {
        unsafe { REGISTERS[i] }
    }

    fn escribir_registro(&self, i: usize, v: u64) {
        unsafe {
            REGISTERS[i] = v;
        }
    }

    fn leer_cadena_usuario(&self, ptr: u64, buf: &mut [u8]) -> usize {
        // Flat, single address space (spec.md §1 excludes virtual memory):
        // "user" pointers already address the same memory the kernel does.
        let src = ptr as *const u8;
        let mut n = 0;
        while n < buf.len() {
            let byte = unsafe { *src.add(n) };
            if byte == 0 {
                break;
            }
            buf[n] = byte;
            n += 1;
        }
        n
    }

    fn leer_bytes_usuario(&self, ptr: u64, buf: &mut [u8]) {
        let src = ptr as *const u8;
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = unsafe { *src.add(i) };
        }
    }

    fn escribir_bytes_usuario(&self, ptr: u64, buf: &[u8]) {
        let dst = ptr as *mut u8;
        for (i, byte) in buf.iter().enumerate() {
            unsafe {
                *dst.add(i) = *byte;
            }
        }
    }

    fn printk(&self, args: core::fmt::Arguments) {
        crate::serial::_print(args);
    }

    fn panico(&self, msg: &str) -> ! {
        panic!("{msg}");
    }
}

/// Master-PIC (8259 #1) command/data ports. IRQ0 (clock) and IRQ1
/// (keyboard) are the only lines this kernel ever unmasks; the slave PIC's
/// IRQ8-15 lines are masked once at boot and never touched again.
const PIC1_DATA: u16 = 0x21;
const PIC2_DATA: u16 = 0xa1;

fn set_master_pic_mask(mask: u8) {
    use x86_64::instructions::port::Port;
    unsafe {
        Port::<u8>::new(PIC1_DATA).write(mask);
    }
}

/// Tracks the IPL last installed via `set_ipl`, so it can be returned as
/// `prev` on the next call. Not itself a synchronization primitive — IPL
/// *is* this kernel's synchronization primitive (DESIGN.md).
static CURRENT_IPL: Mutex<Ipl> = Mutex::new(Ipl::Nivel3);

fn current_ipl() -> Ipl {
    *CURRENT_IPL.lock()
}

fn set_current_ipl(level: Ipl) {
    *CURRENT_IPL.lock() = level;
}

/// Called from the keyboard IRQ handler with a translated byte, for
/// `leer_puerto_terminal` to pick up before `Kernel::handle_terminal_interrupt`
/// reads it.
pub(crate) fn latch_scancode_byte(byte: u8) {
    *LAST_SCANCODE_BYTE.lock() = Some(byte);
}

/// The kernel-wide singleton. `spin::Mutex<Kernel<X86Hal>>` would be unsound
/// here: `Kernel::cambio_contexto` can leave this call frame on one
/// process's stack and only return to it once that *same* process is
/// rescheduled, arbitrarily many interrupts later — a `MutexGuard` held
/// across that call would never run its `Drop`, wedging every other
/// interrupt handler that wants the lock for the rest of boot. The original
/// C kernel has exactly this shape (one raw global, IPL the only
/// synchronization), so this follows it: a bare `UnsafeCell`, with IPL
/// already raised to `Nivel3` around every mutating access by the `core`
/// modules themselves (see DESIGN.md).
struct KernelCell(UnsafeCell<Option<Kernel<X86Hal>>>);
unsafe impl Sync for KernelCell {}

static KERNEL: KernelCell = KernelCell(UnsafeCell::new(None));

/// # Safety
/// Must only be called after [`init`] has run, and never re-entered in a
/// way that would produce two live `&mut` references at once — in
/// practice, only from code that itself holds `Ipl::Nivel3` (all interrupt
/// handlers do on entry) or from single-threaded boot code.
pub unsafe fn kernel() -> &'static mut Kernel<X86Hal> {
    (*KERNEL.0.get())
        .as_mut()
        .expect("hal_x86_64::kernel() called before init()")
}

/// Wires up the GDT, IDT/PIC, and the `Kernel<X86Hal>` singleton, matching
/// spec.md §6's startup order: segment/interrupt tables first, then the
/// interrupt controller, then the kernel state the rest of boot
/// (`crear_tarea("init")`, `arrancar`) depends on.
pub fn init() {
    gdt::init();
    idt::init();
    unsafe {
        x86_64::instructions::port::Port::<u8>::new(PIC2_DATA).write(0xffu8);
        *KERNEL.0.get() = Some(Kernel::new(X86Hal));
    }
    x86_64::instructions::interrupts::enable();
}
