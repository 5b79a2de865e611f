//! Arithmetic and memory fault handlers (spec.md §4.7 — component C7).
//!
//! Both faults kill the offending process by falling through to
//! [`Kernel::liberar_proceso`](crate::process_ops), cascading its mutexes
//! and resources. A fault landing while the kernel itself is executing is
//! fatal — `panico` — except for the one case `acceso_parametro` exists to
//! carve out: a syscall deliberately dereferencing a user-supplied pointer
//! (e.g. `tiempos_proceso`'s output parameter) is still "on behalf of" user
//! code and must not panic the kernel.

use crate::hal::Hal;
use crate::list::Pid;

impl<H: Hal> crate::kernel::Kernel<H> {
    /// `exc_arit`. A fault in kernel mode is always fatal here — there is
    /// no analogue of `acceso_parametro` for arithmetic faults in the
    /// original source, so none is modeled.
    pub fn handle_arithmetic_fault(&mut self) -> Pid {
        if !self.hal.viene_de_modo_usuario() {
            self.hal.panico("arithmetic fault while executing kernel code");
        }
        self.liberar_proceso()
    }

    /// `exc_mem`. Fatal in kernel mode unless the fault happened while a
    /// syscall was mid-dereference of a user pointer (`acceso_parametro`).
    pub fn handle_memory_fault(&mut self) -> Pid {
        if !self.hal.viene_de_modo_usuario() && !self.acceso_parametro {
            self.hal.panico("memory fault while executing kernel code");
        }
        self.liberar_proceso()
    }
}
