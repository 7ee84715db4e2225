//! Queue construction options.

use crate::error::{Error, Result};

/// Most priority levels a queue may have.
pub const MAX_PRIORITIES: usize = 255;

/// What a producer experiences when its target level is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueBehaviorIfFull {
    /// Fail the enqueue and hand the item back.
    #[default]
    Reject,
    /// Park the producer until a consumer frees a slot.
    Block,
}

/// Which parked consumer a post wakes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakeOrder {
    /// Most recently parked first. Keeps a hot consumer hot.
    #[default]
    Lifo,
    /// Oldest parked first.
    Fifo,
}

/// Shape and policies of a [`PriorityBlockingQueue`](crate::PriorityBlockingQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Capacity of each level, lowest priority first.
    pub capacities: Vec<usize>,
    /// Overflow policy for every level.
    pub behavior: QueueBehaviorIfFull,
    /// Wake order of parked consumers.
    pub wake_order: WakeOrder,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacities: vec![1024; 3],
            behavior: QueueBehaviorIfFull::default(),
            wake_order: WakeOrder::default(),
        }
    }
}

impl QueueConfig {
    /// Starts a [`QueueConfigBuilder`] from the defaults.
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::new()
    }

    /// Checks level count and capacities.
    pub fn validate(&self) -> Result<()> {
        if self.capacities.is_empty() {
            return Err(Error::config("number of priorities must be > 0"));
        }
        if self.capacities.len() > MAX_PRIORITIES {
            return Err(Error::config(format!(
                "too many priorities: {} (max {})",
                self.capacities.len(),
                MAX_PRIORITIES
            )));
        }
        if let Some(level) = self.capacities.iter().position(|&c| c == 0) {
            return Err(Error::config(format!(
                "capacity of priority level {} must be > 0",
                level
            )));
        }
        Ok(())
    }

    /// Number of levels.
    pub fn num_priorities(&self) -> u8 {
        self.capacities.len() as u8
    }
}

/// Builder for [`QueueConfig`]; [`build`](Self::build) validates.
#[derive(Debug, Default)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    /// Builder holding [`QueueConfig::default`].
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
        }
    }

    /// Uses `num_priorities` levels of `capacity` slots each.
    pub fn uniform(mut self, num_priorities: u8, capacity: usize) -> Self {
        self.config.capacities = vec![capacity; num_priorities as usize];
        self
    }

    /// Per-level capacities, lowest priority first.
    pub fn capacities<I: IntoIterator<Item = usize>>(mut self, capacities: I) -> Self {
        self.config.capacities = capacities.into_iter().collect();
        self
    }

    /// Overflow policy.
    pub fn behavior(mut self, behavior: QueueBehaviorIfFull) -> Self {
        self.config.behavior = behavior;
        self
    }

    /// Wake order of parked consumers.
    pub fn wake_order(mut self, order: WakeOrder) -> Self {
        self.config.wake_order = order;
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<QueueConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
