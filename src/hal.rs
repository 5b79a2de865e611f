//! The trait boundary between the kernel proper (this crate's `core`
//! module) and the hardware/loader collaborators spec.md §1 declares out of
//! scope: CPU context save/restore, the interrupt controller, the clock and
//! keyboard tick sources, the loader, port I/O, `printk`/`panico`, and IPL
//! manipulation.
//!
//! The kernel is generic over `H: Hal` so that its logic can be exercised
//! against [`MockHal`](crate::hal_mock::MockHal) under `cargo test` on the
//! host, and against [`hal_x86_64::X86Hal`](crate::hal_x86_64::X86Hal) in the
//! real `no_std` build. Every method here corresponds 1:1 to one of the "HAL
//! imports" spec.md §6 lists.

/// Interrupt-priority level. Higher values mask more device interrupt
/// sources; `Nivel3` masks everything a list mutation must be atomic
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ipl {
    /// Lowest level: idle-wait. Clock and terminal interrupts may fire.
    Nivel1,
    /// Terminal interrupts masked.
    Nivel2,
    /// All device interrupts masked.
    Nivel3,
}

/// A process's saved register context. Owned opaquely by the HAL; the
/// kernel only ever moves it by value or takes `&mut` references into the
/// process table.
pub trait Context: Sized {
    /// An all-zero context used for slots that have never run, and as the
    /// placeholder the very first scheduled process switches away *from*.
    fn empty() -> Self;
}

/// An opaque memory-image descriptor produced by the loader.
pub trait Image {}

/// An opaque kernel-stack allocation.
pub trait Stack {}

/// The hardware/loader/abstraction-layer contract the kernel core relies
/// on. See spec.md §6 "HAL imports" for the C-side names each method here
/// is derived from.
pub trait Hal {
    type Context: Context;
    type Image: Image;
    type Stack: Stack;

    /// `fijar_nivel_int(level) -> prev_level`.
    fn set_ipl(&self, level: Ipl) -> Ipl;

    /// `halt()`. Only ever called at `Ipl::Nivel1` from the scheduler's
    /// idle loop.
    fn halt(&self);

    /// `crear_imagen(prog, &pc) -> image*`. Returns the image descriptor and
    /// the initial program counter, or `None` on load failure.
    fn crear_imagen(&self, prog: &str) -> Option<(Self::Image, u64)>;

    /// `liberar_imagen(image*)`.
    fn liberar_imagen(&self, image: Self::Image);

    /// `crear_pila(size)`.
    fn crear_pila(&self, size: usize) -> Self::Stack;

    /// `liberar_pila(stk)`.
    fn liberar_pila(&self, stack: Self::Stack);

    /// `fijar_contexto_ini(image, pila, size, pc, &ctx)`.
    fn fijar_contexto_ini(
        &self,
        image: &Self::Image,
        stack: &Self::Stack,
        pc: u64,
    ) -> Self::Context;

    /// `cambio_contexto(&from_or_null, &to)`. `from` is `None` exactly when
    /// the caller is discarding its own context (process termination, or
    /// the very first dispatch at boot).
    ///
    /// # Contract
    /// On real hardware this call does not return to its caller until the
    /// CPU switches back to `from`'s context (it is a full context switch,
    /// not a function call in the usual sense). Kernel code downstream of
    /// this call must treat everything after it as running on behalf of
    /// whichever process was switched back in, not the process that
    /// initiated the switch.
    fn cambio_contexto(&self, from: Option<&mut Self::Context>, to: &Self::Context);

    /// `viene_de_modo_usuario()`.
    fn viene_de_modo_usuario(&self) -> bool;

    /// `activar_int_SW()`. Raises the deferred-preemption software
    /// interrupt (spec.md §4.5/§9).
    fn activar_int_sw(&self);

    /// `leer_puerto(DIR_TERMINAL)`.
    fn leer_puerto_terminal(&self) -> u8;

    /// `leer_registro(i)`. Syscall argument `i` (0 is the call number).
    fn leer_registro(&self, i: usize) -> u64;

    /// `escribir_registro(i, v)`. Used to write the syscall return value
    /// back to register 0.
    fn escribir_registro(&self, i: usize, v: u64);

    /// Copies a NUL-terminated user-space string starting at `ptr` into
    /// `buf`, stopping at the first NUL or `buf.len()`, whichever comes
    /// first. Returns the number of bytes copied (excluding the NUL).
    /// Bridges the user-address-space boundary spec.md declares out of
    /// scope for the kernel proper; on real hardware this walks the
    /// process's page tables, which this crate never touches directly.
    fn leer_cadena_usuario(&self, ptr: u64, buf: &mut [u8]) -> usize;

    /// Copies exactly `buf.len()` raw bytes from user space at `ptr`, for
    /// syscalls with an explicit length argument (`escribir(buf*, len)`)
    /// rather than a NUL-terminated string.
    fn leer_bytes_usuario(&self, ptr: u64, buf: &mut [u8]);

    /// Copies `buf` into user space at `ptr`. Used by `sis_tiempos_proceso`
    /// to write `{usuario, sistema}` through the caller's out-parameter —
    /// the dereference `acceso_parametro` exists to guard (spec.md §4.7,
    /// §6 "User-memory access").
    fn escribir_bytes_usuario(&self, ptr: u64, buf: &[u8]);

    /// `printk`.
    fn printk(&self, args: core::fmt::Arguments);

    /// `panico`. Never returns.
    fn panico(&self, msg: &str) -> !;
}
