//! The kernel-resident `init` entry point `hal_x86_64::loader` resolves
//! `crear_tarea("init")` to.
//!
//! spec.md §1 places "user-space programs loaded from images" and "the
//! init process" out of scope as external collaborators — a real build
//! would load this from an on-disk image the way the teacher's
//! `userland/` binaries are built and linked separately. Since there is no
//! loader here to produce one, `init` is this single idle loop: enough for
//! the startup sequence (spec.md §6) to have something runnable to
//! dispatch into at boot.

/// Never returns. Parks the CPU at `Ipl::Nivel1` between clock ticks so the
/// scheduler always has a process to fall back to when nothing else is
/// ready.
pub extern "C" fn init_entry() -> ! {
    loop {
        x86_64::instructions::interrupts::enable_and_hlt();
    }
}
