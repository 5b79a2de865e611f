//! Internal error taxonomy (spec.md §7). Every CORE operation that can fail
//! returns `Result<T, KernelError>`; the syscall dispatcher (`syscall.rs`)
//! is the single place that collapses this back to the C ABI's `-1`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// `ENOSLOT`: no free process-table entry.
    NoFreeSlot,
    /// The HAL's `crear_imagen` failed to load the program image.
    ImageLoadFailed,
    /// Mutex name longer than `MAX_NOM_MUT`.
    NameTooLong,
    /// Caller's mutex descriptor table is full.
    NoFreeDescriptor,
    /// A live mutex already has this name.
    NameInUse,
    /// No mutex exists with the given name.
    UnknownMutex,
    /// Caller holds no open descriptor for this mutex id.
    NotOpen,
    /// `unlock` on a mutex that isn't `LOCKED`.
    NotLocked,
    /// `unlock` by a process that isn't the current owner.
    NotOwner,
    /// Non-recursive mutex re-locked by its own owner.
    WouldDeadlock,
    /// Syscall number outside `[0, NSERVICIOS)`.
    UnknownSyscall,
}

impl KernelError {
    /// The C ABI has exactly one error value: `-1`. This exists purely so
    /// call sites read as "turn this failure into the wire value" rather
    /// than a bare `-1` showing up unexplained throughout `syscall.rs`.
    pub const fn wire(self) -> i64 {
        -1
    }
}
