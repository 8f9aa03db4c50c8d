//! Thin wrappers over the System V shared memory syscalls.
//!
//! Each wrapper returns the raw `errno` on failure; classification into
//! [`QueueError`](crate::errors::QueueError) happens once, at the call
//! site in `errors.rs`. Nothing here retries.

use std::io;
use std::mem;
use std::ptr;

/// Access mode for every segment this crate creates or opens.
pub(crate) const ACCESS: libc::c_int = 0o600;

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// `shmget(2)`: bind a key to a segment id.
pub(crate) fn get(key: libc::key_t, size: usize, flags: libc::c_int) -> Result<i32, i32> {
    let id = unsafe { libc::shmget(key, size, flags) };
    if id == -1 {
        Err(last_errno())
    } else {
        Ok(id)
    }
}

/// `shmat(2)` plus an `IPC_STAT` to learn the mapping size.
///
/// The kernel always maps the whole segment regardless of the size passed
/// to `shmget`, so the real extent has to come from `shm_segsz`.
pub(crate) fn attach(id: i32) -> Result<(*mut u8, usize), i32> {
    let addr = unsafe { libc::shmat(id, ptr::null(), 0) };
    if addr as isize == -1 {
        return Err(last_errno());
    }
    let size = match stat_size(id) {
        Ok(size) => size,
        Err(errno) => {
            unsafe { libc::shmdt(addr) };
            return Err(errno);
        }
    };
    Ok((addr as *mut u8, size))
}

/// `shmctl(2)` with `IPC_STAT`: the segment's size in bytes.
pub(crate) fn stat_size(id: i32) -> Result<usize, i32> {
    let mut ds: libc::shmid_ds = unsafe { mem::zeroed() };
    let rc = unsafe { libc::shmctl(id, libc::IPC_STAT, &mut ds) };
    if rc == -1 {
        Err(last_errno())
    } else {
        Ok(ds.shm_segsz as usize)
    }
}

/// `shmdt(2)`: unmap the segment from this process.
pub(crate) fn detach(addr: *mut u8) -> Result<(), i32> {
    let rc = unsafe { libc::shmdt(addr as *const libc::c_void) };
    if rc == -1 {
        Err(last_errno())
    } else {
        Ok(())
    }
}

/// `shmctl(2)` with `IPC_RMID`: mark the segment for removal.
///
/// The kernel frees it once the last attached process detaches.
pub(crate) fn remove(id: i32) -> Result<(), i32> {
    let rc = unsafe { libc::shmctl(id, libc::IPC_RMID, ptr::null_mut()) };
    if rc == -1 {
        Err(last_errno())
    } else {
        Ok(())
    }
}
