//! Queue configuration for tools and services that load their parameters
//! from a file.

use serde_derive::{Deserialize, Serialize};

use crate::errors::QueueError;
use crate::key::find_free_key;
use crate::queue::Queue;

/// Parameters of one queue. Use [`QueueConfig::builder`] to construct a
/// validated instance, or deserialize it from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Segment key. `None` lets [`QueueConfig::create`] pick a free one.
    pub key: Option<libc::key_t>,
    /// Payload size per message, in 64-bit words.
    pub msg_size_words: u32,
    /// Capacity: the number of messages the queue holds at once.
    pub max_len: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            key: None,
            msg_size_words: 4,
            max_len: 64,
        }
    }
}

impl QueueConfig {
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder {
            config: QueueConfig::default(),
        }
    }

    /// Create the queue, resolving an unset key through the free-key
    /// search.
    pub fn create(&self) -> Result<Queue, QueueError> {
        let key = match self.key {
            Some(key) => key,
            None => find_free_key()?,
        };
        Queue::create(key, self.msg_size_words, self.max_len)
    }

    /// Open the queue at the configured key.
    pub fn open(&self) -> Result<Queue, QueueError> {
        let key = self
            .key
            .ok_or_else(|| QueueError::Config("key is required to open a queue".into()))?;
        Queue::open(key)
    }
}

pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    pub fn key(mut self, key: libc::key_t) -> Self {
        self.config.key = Some(key);
        self
    }

    pub fn msg_size_words(mut self, words: u32) -> Self {
        self.config.msg_size_words = words;
        self
    }

    pub fn max_len(mut self, max_len: u32) -> Self {
        self.config.max_len = max_len;
        self
    }

    pub fn build(self) -> Result<QueueConfig, QueueError> {
        if self.config.msg_size_words == 0 {
            return Err(QueueError::Config("msg_size_words must be > 0".into()));
        }
        if self.config.max_len == 0 {
            return Err(QueueError::Config("max_len must be > 0".into()));
        }
        Ok(self.config)
    }
}
