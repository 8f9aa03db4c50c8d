use std::{fmt, io};

/// Errors surfaced by queue lifecycle and blocking operations.
///
/// OS errors from the shared-memory syscalls are classified exactly once,
/// at the syscall boundary, into [`QueueError::Shm`] carrying both the
/// failing operation and the classified kind. No retry is attempted
/// internally. `InvalidMagic` is terminal for the affected handle;
/// `Cancelled` is always recoverable.
#[derive(Debug)]
pub enum QueueError {
    /// The segment exists but does not contain a queue.
    InvalidMagic,
    /// Free-key search exhausted the key space.
    NoFreeKeys,
    /// A blocking operation observed its cancellation token.
    Cancelled,
    /// Configuration rejected by the builder.
    Config(String),
    /// Installing the termination-signal handler failed.
    Signal(io::Error),
    /// A shared-memory syscall failed.
    Shm { op: ShmOp, kind: ShmKind },
}

/// The syscall-level operation a [`QueueError::Shm`] is annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmOp {
    Create,
    Open,
    Attach,
    Detach,
    Delete,
}

/// Classified OS error kinds from the shared-memory syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmKind {
    NotExist,
    NoAccess,
    TooSmall,
    AlreadyExists,
    InvalidSize,
    TooManyFiles,
    NoMem,
    NoIds,
    RemovedId,
    InvalidAddrOrId,
    NotAttached,
    Os(i32),
}

impl fmt::Display for ShmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ShmOp::Create => "create shared memory",
            ShmOp::Open => "open shared memory",
            ShmOp::Attach => "attach to shared memory",
            ShmOp::Detach => "detach from shared memory",
            ShmOp::Delete => "delete shared memory",
        };
        f.write_str(op)
    }
}

impl fmt::Display for ShmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShmKind::NotExist => write!(f, "segment doesn't exist"),
            ShmKind::NoAccess => write!(f, "no access to segment"),
            ShmKind::TooSmall => write!(f, "segment exists, but it's too small to fit the queue"),
            ShmKind::AlreadyExists => write!(f, "segment already exists"),
            ShmKind::InvalidSize => write!(f, "requested size doesn't fit into system limits"),
            ShmKind::TooManyFiles => {
                write!(f, "system-wide limit on total number of open files is reached")
            }
            ShmKind::NoMem => write!(f, "no memory for segment overhead / descriptor / page tables"),
            ShmKind::NoIds => {
                write!(f, "all possible IDs are taken or system-wide memory limit exceeded")
            }
            ShmKind::RemovedId => write!(f, "segment ID is removed"),
            ShmKind::InvalidAddrOrId => {
                write!(f, "invalid segment ID, unaligned or invalid addr, or can't attach segment")
            }
            ShmKind::NotAttached => {
                write!(f, "there's no segment attached at this addr, or addr is invalid")
            }
            ShmKind::Os(errno) => {
                write!(f, "system error: {}", io::Error::from_raw_os_error(*errno))
            }
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::InvalidMagic => write!(f, "invalid magic"),
            QueueError::NoFreeKeys => write!(f, "no free keys"),
            QueueError::Cancelled => write!(f, "operation cancelled"),
            QueueError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            QueueError::Signal(e) => write!(f, "signal handling error: {}", e),
            QueueError::Shm { op, kind } => write!(f, "{}: {}", op, kind),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Signal(e) => Some(e),
            _ => None,
        }
    }
}

/// Classify an `errno` from `shmget`. `create` selects the operation name
/// and disambiguates `EINVAL`, which means "requested size over system
/// limits" on creation but "existing segment smaller than requested" on
/// a plain open.
pub(crate) fn classify_get(errno: i32, create: bool) -> QueueError {
    let op = if create { ShmOp::Create } else { ShmOp::Open };
    let kind = match errno {
        libc::ENOENT => ShmKind::NotExist,
        libc::EACCES => ShmKind::NoAccess,
        libc::EINVAL if create => ShmKind::InvalidSize,
        libc::EINVAL => ShmKind::TooSmall,
        libc::EEXIST => ShmKind::AlreadyExists,
        libc::ENFILE => ShmKind::TooManyFiles,
        libc::ENOMEM => ShmKind::NoMem,
        libc::ENOSPC => ShmKind::NoIds,
        other => ShmKind::Os(other),
    };
    QueueError::Shm { op, kind }
}

/// Classify an `errno` from `shmat`.
pub(crate) fn classify_attach(errno: i32) -> QueueError {
    let kind = match errno {
        libc::EACCES => ShmKind::NoAccess,
        libc::EIDRM => ShmKind::RemovedId,
        libc::EINVAL => ShmKind::InvalidAddrOrId,
        libc::ENOMEM => ShmKind::NoMem,
        other => ShmKind::Os(other),
    };
    QueueError::Shm { op: ShmOp::Attach, kind }
}

/// Classify an `errno` from `shmdt`.
pub(crate) fn classify_detach(errno: i32) -> QueueError {
    let kind = match errno {
        libc::EINVAL => ShmKind::NotAttached,
        other => ShmKind::Os(other),
    };
    QueueError::Shm { op: ShmOp::Detach, kind }
}

/// Classify an `errno` from `shmctl(IPC_RMID)`.
pub(crate) fn classify_remove(errno: i32) -> QueueError {
    let kind = match errno {
        libc::EIDRM => ShmKind::RemovedId,
        other => ShmKind::Os(other),
    };
    QueueError::Shm { op: ShmOp::Delete, kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_classification() {
        assert!(matches!(
            classify_get(libc::ENOENT, false),
            QueueError::Shm { op: ShmOp::Open, kind: ShmKind::NotExist }
        ));
        assert!(matches!(
            classify_get(libc::EINVAL, true),
            QueueError::Shm { op: ShmOp::Create, kind: ShmKind::InvalidSize }
        ));
        assert!(matches!(
            classify_get(libc::EINVAL, false),
            QueueError::Shm { op: ShmOp::Open, kind: ShmKind::TooSmall }
        ));
        assert!(matches!(
            classify_get(libc::EEXIST, true),
            QueueError::Shm { op: ShmOp::Create, kind: ShmKind::AlreadyExists }
        ));
    }

    #[test]
    fn detach_classification() {
        assert!(matches!(
            classify_detach(libc::EINVAL),
            QueueError::Shm { op: ShmOp::Detach, kind: ShmKind::NotAttached }
        ));
    }

    #[test]
    fn unknown_errno_is_preserved() {
        match classify_attach(libc::EBADF) {
            QueueError::Shm { op: ShmOp::Attach, kind: ShmKind::Os(errno) } => {
                assert_eq!(errno, libc::EBADF)
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn display_includes_operation() {
        let err = classify_get(libc::ENOENT, false);
        assert_eq!(err.to_string(), "open shared memory: segment doesn't exist");
    }
}
