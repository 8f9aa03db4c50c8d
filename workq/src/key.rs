//! Free-key search.

use log::debug;

use crate::errors::QueueError;
use crate::sys;

/// Find a key not currently bound to any shared memory segment, suitable
/// for [`Queue::create`](crate::Queue::create).
///
/// Guesses five random keys, then falls back to a sequential scan of the
/// whole key space. Returns [`QueueError::NoFreeKeys`] only once the scan
/// is exhausted. The reserved `IPC_PRIVATE` key is never returned.
pub fn find_free_key() -> Result<libc::key_t, QueueError> {
    for _ in 0..5 {
        let key = rand::random::<libc::key_t>();
        if is_key_free(key) {
            return Ok(key);
        }
    }
    debug!("random key guesses exhausted, scanning sequentially");
    let mut key = libc::key_t::MIN;
    loop {
        if is_key_free(key) {
            return Ok(key);
        }
        if key == libc::key_t::MAX {
            return Err(QueueError::NoFreeKeys);
        }
        key += 1;
    }
}

fn is_key_free(key: libc::key_t) -> bool {
    if key == libc::IPC_PRIVATE {
        // Reserved: always allocates a fresh segment, never names one.
        return false;
    }
    matches!(sys::get(key, 0, sys::ACCESS), Err(libc::ENOENT))
}
