//! The queue proper: segment lifecycle and the enqueue/dequeue state
//! machine.
//!
//! All mutual exclusion is done with the in-segment spinlocks; the queue
//! never waits in the kernel. Every operation follows the same lock
//! ordering: header lock first, then at most one slot lock, with the slot
//! lock acquired while the header lock is still held and released after
//! it. The header lock is dropped before the payload copy so the critical
//! section stays short.

use std::cmp;
use std::thread;

use log::debug;

use crate::cancel::CancelToken;
use crate::errors::{self, QueueError};
use crate::segment::{self, Segment};
use crate::sys;

/// A handle to one shared-memory queue.
///
/// The handle owns this process's attachment of the segment and nothing
/// else; the segment itself lives in the OS until [`Queue::delete`] has
/// been called and the last attached process has detached. A handle is
/// safe to share across threads; the in-segment locks serialize access.
///
/// Dropping a handle does not detach the segment. Call [`Queue::close`]
/// explicitly; after it, the handle must not be used for anything except
/// [`Queue::delete`].
pub struct Queue {
    key: libc::key_t,
    id: i32,
    pub(crate) seg: Segment,
}

impl Queue {
    /// Create a queue of `max_len` messages of `msg_size_words` 64-bit
    /// words each.
    ///
    /// `key` must name the queue system-wide; use
    /// [`find_free_key`](crate::find_free_key) to pick one. If the key is
    /// already bound to a large-enough segment that segment is reused,
    /// otherwise it is removed and recreated at the required size. The
    /// header is (re)initialized unconditionally, so any ring state a
    /// previous incarnation left behind is discarded.
    pub fn create(key: libc::key_t, msg_size_words: u32, max_len: u32) -> Result<Queue, QueueError> {
        let msg_size = msg_size_words * 8;
        let total = segment::total_size(msg_size, max_len);

        let id = match sys::get(key, total, sys::ACCESS) {
            Ok(id) => id,
            Err(libc::ENOENT) => create_exclusive(key, total)?,
            Err(libc::EINVAL) => {
                // The existing segment is too small to hold this queue.
                delete_by_key(key)?;
                create_exclusive(key, total)?
            }
            Err(errno) => return Err(errors::classify_get(errno, false)),
        };

        let (base, mapped) = sys::attach(id).map_err(errors::classify_attach)?;
        // A reused segment may be larger than needed; the view is
        // truncated to this queue's own extent.
        let seg = Segment::new(base, cmp::min(mapped, total));

        seg.set_magic();
        seg.set_msg_size(msg_size);
        seg.set_max_len(max_len);
        seg.set_start_idx(0);
        seg.set_queue_len(0);

        debug!("created queue: key={} id={} bytes={}", key, id, total);
        Ok(Queue { key, id, seg })
    }

    /// Open an existing queue.
    ///
    /// The total segment size is not known up front, so the key is first
    /// bound with only the parameter bytes to read `msg_size` and
    /// `max_len`, then detached and re-bound at full size. The magic is
    /// validated at both phases.
    pub fn open(key: libc::key_t) -> Result<Queue, QueueError> {
        let (_, seg) = open_segment(key, segment::PARAMS_SIZE)?;
        let msg_size = seg.get_msg_size();
        let max_len = seg.get_max_len();
        sys::detach(seg.base()).map_err(errors::classify_detach)?;

        let total = segment::total_size(msg_size, max_len);
        let (id, seg) = open_segment(key, total)?;

        debug!("opened queue: key={} id={} bytes={}", key, id, total);
        Ok(Queue { key, id, seg })
    }

    /// Detach the segment from this process. The queue keeps existing in
    /// the system until [`Queue::delete`] is called and every attached
    /// process has closed.
    pub fn close(&mut self) -> Result<(), QueueError> {
        sys::detach(self.seg.base()).map_err(errors::classify_detach)
    }

    /// Mark the segment for removal. It is freed once the last attached
    /// process detaches; opening the same key fails from this point on.
    pub fn delete(&self) -> Result<(), QueueError> {
        debug!("deleting queue: key={} id={}", self.key, self.id);
        sys::remove(self.id).map_err(errors::classify_remove)
    }

    pub fn key(&self) -> libc::key_t {
        self.key
    }

    /// Payload size per message, in bytes.
    pub fn msg_size(&self) -> u32 {
        self.seg.get_msg_size()
    }

    /// Capacity in messages.
    pub fn max_len(&self) -> u32 {
        self.seg.get_max_len()
    }

    /// Enqueue, overwriting the oldest message when full. Never fails and
    /// never waits for space.
    ///
    /// `msg` must be exactly [`Queue::msg_size`] bytes; anything else is a
    /// programmer error and panics.
    pub fn enqueue_shift(&self, msg: &[u8]) {
        self.seg.lock_header();

        let cur_len = self.seg.get_queue_len();
        let max_len = self.seg.get_max_len();
        let start_idx = self.seg.get_start_idx();

        let msg_idx = (start_idx + cur_len) % max_len;

        if cur_len < max_len {
            self.seg.set_queue_len(cur_len + 1);
        } else {
            // Full: evict the oldest by advancing the start of the ring.
            self.seg.set_start_idx((start_idx + 1) % max_len);
        }

        self.seg.lock_msg(msg_idx);
        self.seg.unlock_header();
        self.seg.copy_in(msg_idx, msg);
        self.seg.unlock_msg(msg_idx);
    }

    /// Enqueue if there is space. Returns `false` when the queue is full.
    pub fn enqueue_try(&self, msg: &[u8]) -> bool {
        self.seg.lock_header();

        let cur_len = self.seg.get_queue_len();
        let max_len = self.seg.get_max_len();
        if cur_len >= max_len {
            self.seg.unlock_header();
            return false;
        }

        self.append(cur_len, max_len, msg);
        true
    }

    /// Enqueue, polling with bounded backoff until space is available or
    /// `cancel` is tripped. Cancellation is checked once per iteration,
    /// never while a lock is held, and leaves the ring untouched.
    pub fn enqueue_block(&self, cancel: &CancelToken, msg: &[u8]) -> Result<(), QueueError> {
        let mut i: u64 = 0;
        let (cur_len, max_len) = loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Cancelled);
            }

            let cur_len = self.seg.get_queue_len();
            let max_len = self.seg.get_max_len();
            if cur_len < max_len {
                // The unlocked peek saw space; re-verify under the lock.
                self.seg.lock_header();
                let cur_len = self.seg.get_queue_len();
                let max_len = self.seg.get_max_len();
                if cur_len >= max_len {
                    self.seg.unlock_header();
                    i += 1;
                    continue;
                }
                break (cur_len, max_len);
            }

            thread::sleep(segment::poll_delay(i));
            i += 1;
        };

        self.append(cur_len, max_len, msg);
        Ok(())
    }

    /// Dequeue the oldest message into `to` if one exists. Returns
    /// `false` when the queue is empty.
    ///
    /// `to` must be exactly [`Queue::msg_size`] bytes.
    pub fn dequeue_try(&self, to: &mut [u8]) -> bool {
        self.seg.lock_header();

        let cur_len = self.seg.get_queue_len();
        if cur_len == 0 {
            self.seg.unlock_header();
            return false;
        }

        self.take_front(cur_len, to);
        true
    }

    /// Dequeue, polling with bounded backoff until a message arrives or
    /// `cancel` is tripped.
    pub fn dequeue_block(&self, cancel: &CancelToken, to: &mut [u8]) -> Result<(), QueueError> {
        let mut i: u64 = 0;
        let cur_len = loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Cancelled);
            }

            let cur_len = self.seg.get_queue_len();
            if cur_len > 0 {
                self.seg.lock_header();
                let cur_len = self.seg.get_queue_len();
                if cur_len == 0 {
                    self.seg.unlock_header();
                    i += 1;
                    continue;
                }
                break cur_len;
            }

            thread::sleep(segment::poll_delay(i));
            i += 1;
        };

        self.take_front(cur_len, to);
        Ok(())
    }

    // Append at the tail. The header lock must be held on entry; it is
    // released once the target slot's lock is taken, before the copy.
    fn append(&self, cur_len: u32, max_len: u32, msg: &[u8]) {
        self.seg.set_queue_len(cur_len + 1);

        let start_idx = self.seg.get_start_idx();
        let msg_idx = (start_idx + cur_len) % max_len;

        self.seg.lock_msg(msg_idx);
        self.seg.unlock_header();
        self.seg.copy_in(msg_idx, msg);
        self.seg.unlock_msg(msg_idx);
    }

    // Remove the head. Same locking contract as `append`. The slot is
    // logically out of the ring before the copy, but its lock keeps any
    // enqueuer that lands on the same physical slot out until the copy
    // is done.
    fn take_front(&self, cur_len: u32, to: &mut [u8]) {
        self.seg.set_queue_len(cur_len - 1);

        let start_idx = self.seg.get_start_idx();
        let max_len = self.seg.get_max_len();
        self.seg.set_start_idx((start_idx + 1) % max_len);

        self.seg.lock_msg(start_idx);
        self.seg.unlock_header();
        self.seg.copy_out(start_idx, to);
        self.seg.unlock_msg(start_idx);
    }
}

fn create_exclusive(key: libc::key_t, total: usize) -> Result<i32, QueueError> {
    sys::get(key, total, sys::ACCESS | libc::IPC_CREAT | libc::IPC_EXCL)
        .map_err(|errno| errors::classify_get(errno, true))
}

fn delete_by_key(key: libc::key_t) -> Result<(), QueueError> {
    let id = sys::get(key, 0, sys::ACCESS).map_err(|errno| errors::classify_get(errno, false))?;
    sys::remove(id).map_err(errors::classify_remove)
}

fn open_segment(key: libc::key_t, size: usize) -> Result<(i32, Segment), QueueError> {
    let id = sys::get(key, size, sys::ACCESS).map_err(|errno| errors::classify_get(errno, false))?;
    let (base, mapped) = sys::attach(id).map_err(errors::classify_attach)?;
    let seg = Segment::new(base, mapped);
    if let Err(err) = seg.check_magic() {
        let _ = sys::detach(base);
        return Err(err);
    }
    Ok((id, seg))
}
