//! The system-call dispatch table (spec.md §6 — component C6): reads the
//! call number and arguments from HAL registers, routes to the matching
//! `Kernel` operation, and writes the result back to register 0.
//!
//! Every operation here funnels its internal `Result<_, KernelError>` (or,
//! for the suspension points, its `*Outcome` enum) through
//! [`KernelError::wire`] so the single C ABI error value, `-1`, is produced
//! in exactly one place (spec.md §7 "Propagation policy").

use crate::config::{MAX_NOM_MUT, NSERVICIOS};
use crate::error::KernelError;
use crate::hal::Hal;
use crate::kernel::Kernel;
use crate::mutex_ops::{CrearMutexOutcome, LockOutcome};
use crate::terminal_ops::TerminalReadOutcome;

/// Syscall numbers, in the order spec.md §6 lists them.
pub mod num {
    pub const CREAR_PROCESO: u64 = 0;
    pub const TERMINAR_PROCESO: u64 = 1;
    pub const ESCRIBIR: u64 = 2;
    pub const OBTENER_ID_PR: u64 = 3;
    pub const DORMIR: u64 = 4;
    pub const TIEMPOS_PROCESO: u64 = 5;
    pub const CREAR_MUTEX: u64 = 6;
    pub const ABRIR_MUTEX: u64 = 7;
    pub const LOCK: u64 = 8;
    pub const UNLOCK: u64 = 9;
    pub const CERRAR_MUTEX: u64 = 10;
    pub const LEER_CARACTER: u64 = 11;
}

/// Largest `escribir` payload this dispatcher will copy out of user space
/// in one call. Not named in spec.md; chosen to match the terminal
/// buffer's own size since both bound a single "one line at a time" I/O
/// operation.
const MAX_ESCRIBIR_LEN: usize = crate::config::TAM_BUF_TERM;

impl<H: Hal> Kernel<H> {
    /// `tratar_llamsis`: the trap handler installed for `LLAM_SIS`.
    pub fn dispatch_syscall(&mut self) {
        let number = self.hal.leer_registro(0);
        let result = self.run_syscall(number);
        self.hal.escribir_registro(0, result);
    }

    fn run_syscall(&mut self, number: u64) -> u64 {
        if number >= NSERVICIOS as u64 {
            return KernelError::UnknownSyscall.wire() as u64;
        }

        match number {
            num::CREAR_PROCESO => {
                let mut buf = [0u8; MAX_NOM_MUT];
                let ptr = self.hal.leer_registro(1);
                let n = self.hal.leer_cadena_usuario(ptr, &mut buf);
                let prog = core::str::from_utf8(&buf[..n]).unwrap_or("");
                match self.crear_tarea(prog) {
                    Ok(pid) => pid.0 as u64,
                    Err(e) => e.wire() as u64,
                }
            }

            num::TERMINAR_PROCESO => {
                self.liberar_proceso();
                0
            }

            num::ESCRIBIR => {
                let ptr = self.hal.leer_registro(1);
                let len = (self.hal.leer_registro(2) as usize).min(MAX_ESCRIBIR_LEN);
                let mut buf = [0u8; MAX_ESCRIBIR_LEN];
                self.hal.leer_bytes_usuario(ptr, &mut buf[..len]);
                if let Ok(text) = core::str::from_utf8(&buf[..len]) {
                    self.hal.printk(format_args!("{text}"));
                }
                len as u64
            }

            num::OBTENER_ID_PR => {
                self.current.map(|pid| pid.0 as u64).unwrap_or(KernelError::NoFreeSlot.wire() as u64)
            }

            num::DORMIR => {
                let secs = self.hal.leer_registro(1) as u32;
                self.dormir(secs);
                // spec.md §4.9: `sis_dormir` always returns 0 to the caller
                // once woken, regardless of which process the scheduler
                // happened to dispatch at the moment it fell asleep.
                0
            }

            num::TIEMPOS_PROCESO => {
                let out_ptr = self.hal.leer_registro(1);
                self.tiempos_proceso(out_ptr)
            }

            num::CREAR_MUTEX => {
                let mut buf = [0u8; MAX_NOM_MUT];
                let name_ptr = self.hal.leer_registro(1);
                let kind = self.hal.leer_registro(2) as i64;
                let n = self.hal.leer_cadena_usuario(name_ptr, &mut buf);
                match self.crear_mutex(&buf[..n], kind) {
                    Ok(CrearMutexOutcome::Created(id)) => id as u64,
                    Ok(CrearMutexOutcome::Blocked { .. }) => {
                        // Matches `sis_crear_mutex`'s own shape: a blocked
                        // caller has no return value yet, it gets one once
                        // rescheduled and this dispatch runs again for it.
                        0
                    }
                    Err(e) => e.wire() as u64,
                }
            }

            num::ABRIR_MUTEX => {
                let mut buf = [0u8; MAX_NOM_MUT];
                let name_ptr = self.hal.leer_registro(1);
                let n = self.hal.leer_cadena_usuario(name_ptr, &mut buf);
                match self.abrir_mutex(&buf[..n]) {
                    Ok(id) => id as u64,
                    Err(e) => e.wire() as u64,
                }
            }

            num::LOCK => {
                let id = self.hal.leer_registro(1) as usize;
                match self.lock(id) {
                    Ok(LockOutcome::Acquired) => 0,
                    Ok(LockOutcome::Blocked { .. }) => 0,
                    Err(e) => e.wire() as u64,
                }
            }

            num::UNLOCK => {
                let id = self.hal.leer_registro(1) as usize;
                match self.unlock(id) {
                    Ok(()) => 0,
                    Err(e) => e.wire() as u64,
                }
            }

            num::CERRAR_MUTEX => {
                let id = self.hal.leer_registro(1) as usize;
                match self.cerrar_mutex(id) {
                    Ok(()) => 0,
                    Err(e) => e.wire() as u64,
                }
            }

            num::LEER_CARACTER => match self.leer_caracter() {
                TerminalReadOutcome::Ready(byte) => byte as u64,
                TerminalReadOutcome::Blocked { .. } => 0,
            },

            _ => KernelError::UnknownSyscall.wire() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::num;
    use crate::hal_mock::MockHal;
    use crate::kernel::Kernel;
    use crate::process::ProcessState;

    #[test]
    fn unknown_syscall_number_returns_wire_error() {
        let mut kernel = Kernel::new(MockHal::new());
        kernel.hal().set_register(0, num::LEER_CARACTER + 1);
        kernel.dispatch_syscall();
        assert_eq!(kernel.hal().leer_registro(0) as i64, -1);
    }

    #[test]
    fn obtener_id_pr_returns_current_pid() {
        let mut kernel = Kernel::new(MockHal::new());
        let a = kernel.crear_tarea("a").unwrap();
        kernel.procs.get_mut(a).state = ProcessState::Running;
        kernel.current = Some(a);

        kernel.hal().set_register(0, num::OBTENER_ID_PR);
        kernel.dispatch_syscall();

        assert_eq!(kernel.hal().leer_registro(0), a.0 as u64);
    }

    #[test]
    fn crear_proceso_reads_program_name_from_user_pointer() {
        let mut kernel = Kernel::new(MockHal::new());
        kernel.hal().set_user_string(b"init");
        kernel.hal().set_register(0, num::CREAR_PROCESO);
        kernel.hal().set_register(1, 0xdead_beef);

        kernel.dispatch_syscall();

        let result = kernel.hal().leer_registro(0) as i64;
        assert!(result >= 0, "expected a pid, got {result}");
    }
}
