/*!
 * Runtime Configuration
 *
 * Table capacity, stack size, tick period and default quota, with presets and
 * environment overrides.
 */

use super::errors::{Result, SchedulerError};
use super::limits::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of slots, including the bootstrap slot (default: 5)
    pub capacity: usize,

    /// Stack size of each green thread in bytes (default: 4MB)
    pub stack_size: usize,

    /// Timer period; also the idle back-off of the driver loop (default: 10ms)
    pub tick_period: Duration,

    /// Quota of the bootstrap thread, in ticks (default: 1)
    pub default_quota: u32,

    /// Arm the preemption timer at init. Always false without the
    /// `preemptive` feature.
    pub timer_enabled: bool,
}

impl RuntimeConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            stack_size: DEFAULT_STACK_SIZE,
            tick_period: DEFAULT_TICK_PERIOD,
            default_quota: DEFAULT_QUOTA,
            timer_enabled: cfg!(feature = "preemptive"),
        }
    }

    /// Default configuration with the timer disarmed. Ticks then only happen
    /// through `Runtime::tick` or the driver loop.
    pub fn cooperative() -> Self {
        Self {
            timer_enabled: false,
            ..Self::new()
        }
    }

    /// Apply `GTHREADS_*` environment overrides on top of `self`
    ///
    /// Environment variables:
    /// - GTHREADS_CAPACITY: number of slots
    /// - GTHREADS_STACK_SIZE: stack size in bytes
    /// - GTHREADS_TICK_MS: timer period in milliseconds
    /// - GTHREADS_QUOTA: bootstrap quota in ticks
    /// - GTHREADS_TIMER: "0"/"false" disarms the timer
    pub fn from_env(self) -> Result<Self> {
        let mut config = self;
        if let Some(capacity) = env_number("GTHREADS_CAPACITY")? {
            config.capacity = capacity as usize;
        }
        if let Some(stack_size) = env_number("GTHREADS_STACK_SIZE")? {
            config.stack_size = stack_size as usize;
        }
        if let Some(ms) = env_number("GTHREADS_TICK_MS")? {
            config.tick_period = Duration::from_millis(ms);
        }
        if let Some(quota) = env_number("GTHREADS_QUOTA")? {
            config.default_quota = u32::try_from(quota)
                .map_err(|_| SchedulerError::InvalidConfig(format!("quota {} too large", quota)))?;
        }
        if let Ok(value) = std::env::var("GTHREADS_TIMER") {
            config.timer_enabled = !matches!(value.as_str(), "0" | "false" | "off");
        }
        Ok(config)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    pub fn with_default_quota(mut self, quota: u32) -> Self {
        self.default_quota = quota;
        self
    }

    pub fn with_timer(mut self, enabled: bool) -> Self {
        self.timer_enabled = enabled;
        self
    }

    /// Whether a timer will actually be armed for this build
    #[inline]
    pub fn preemptive(&self) -> bool {
        cfg!(feature = "preemptive") && self.timer_enabled
    }

    /// Check every field against the limits in `core::limits`
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(SchedulerError::InvalidConfig(format!(
                "capacity {} is below the minimum of {}",
                self.capacity, MIN_CAPACITY
            )));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(SchedulerError::InvalidConfig(format!(
                "stack size {} is below the minimum of {}",
                self.stack_size, MIN_STACK_SIZE
            )));
        }
        if self.tick_period < MIN_TICK_PERIOD {
            return Err(SchedulerError::InvalidConfig(format!(
                "tick period {:?} is below the minimum of {:?}",
                self.tick_period, MIN_TICK_PERIOD
            )));
        }
        if self.default_quota == 0 {
            return Err(SchedulerError::InvalidQuota(0));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| SchedulerError::InvalidConfig(format!("{}={:?}: {}", key, value, e))),
        Err(_) => Ok(None),
    }
}
