#![cfg_attr(not(test), no_std)]
#![feature(abi_x86_interrupt)]

//! A pedagogical preemptive microkernel: process table, round-robin
//! scheduler, clock/terminal/software/fault interrupt handling, a blocking
//! sleep primitive, and a named recursive/non-recursive mutex subsystem,
//! all written against an abstract [`hal::Hal`] so the same logic runs
//! under `cargo test` (`hal_mock::MockHal`) and on real x86_64
//! (`hal_x86_64::X86Hal`).
//!
//! See DESIGN.md for how each module here is grounded, and SPEC_FULL.md for
//! the full set of operations it implements.

pub mod config;
pub mod error;
pub mod hal;
pub mod kernel;
pub mod list;
pub mod process;

pub mod clock;
pub mod fault;
pub mod mutex;
pub mod mutex_ops;
pub mod process_ops;
pub mod scheduler;
pub mod syscall;
pub mod terminal;
pub mod terminal_ops;

#[cfg(test)]
pub mod hal_mock;

pub mod drivers;
pub mod hal_x86_64;
pub mod serial;

#[cfg(not(test))]
use core::panic::PanicInfo;

/// The startup sequence spec.md §6 describes: install the segment and
/// interrupt tables and the interrupt controller, bring up the kernel
/// state, load `init`, and dispatch into it. Grounded on the teacher's own
/// `_start`, reordered to match spec.md's "HAL setup, then kernel state,
/// then `crear_tarea("init")`, then `arrancar`" sequence rather than the
/// teacher's vga/memory/scheduler/syscalls ordering (this kernel has no
/// vga console, paging, or alloc-backed scheduler to bring up).
///
/// Only built for the real target: under `cargo test` this crate links
/// `std`, whose own `main`/panic runtime would collide with a second
/// `_start`/`#[panic_handler]` here (teacher's `r3-os`/`nyx-os` in the
/// retrieval pack gate the same way).
#[cfg(not(test))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    serial::init();
    log_info!("minikernel starting.");

    hal_x86_64::init();
    drivers::init();
    log_info!("GDT, IDT, PIC and drivers initialized.");

    let kernel = unsafe { hal_x86_64::kernel() };
    match kernel.crear_tarea("init") {
        Ok(_) => log_info!("init task created."),
        Err(e) => panic!("failed to create the init task: {e:?}"),
    }

    kernel.arrancar();

    // `arrancar` never returns on real hardware (`Hal::cambio_contexto`
    // diverges into `init`'s context); reaching here means the dispatch
    // came back, which spec.md treats as a fatal startup failure.
    panic!("OS reactivated unexpectedly");
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log_error!("{}", info);
    loop {
        x86_64::instructions::hlt();
    }
}
