use std::time::Duration;

use crate::CoreError;

/// Runner behavior knobs supplied by the operator.
///
/// Group and consumer names identify this instance against the shared
/// log; the remaining values bound concurrency, fault tolerance and
/// completion-poll frequency.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Consumer group shared by all runner instances.
    pub group: String,
    /// This instance's consumer name; unique within the group.
    pub consumer: String,
    /// Maximum number of concurrently running workers.
    pub capacity: usize,
    /// Identical fault signatures within one window needed to abort.
    pub fault_threshold: u32,
    /// Sliding window length for fault counting.
    pub fault_window: Duration,
    /// Interval between completion polls of live workers.
    pub poll_interval: Duration,
}

impl RunnerConfig {
    /// Create a configuration with default tuning:
    /// - `capacity = 4`
    /// - `fault_threshold = 5`
    /// - `fault_window = 60s`
    /// - `poll_interval = 250ms`
    pub fn new(group: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            consumer: consumer.into(),
            capacity: 4,
            fault_threshold: 5,
            fault_window: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Set the worker concurrency cap.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the fault threshold.
    pub fn with_fault_threshold(mut self, threshold: u32) -> Self {
        self.fault_threshold = threshold;
        self
    }

    /// Set the fault window.
    pub fn with_fault_window(mut self, window: Duration) -> Self {
        self.fault_window = window;
        self
    }

    /// Set the completion-poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validate the configuration before the runner starts.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.group.trim().is_empty() {
            return Err(CoreError::Config("group must not be empty".into()));
        }
        if self.consumer.trim().is_empty() {
            return Err(CoreError::Config("consumer must not be empty".into()));
        }
        if self.capacity == 0 {
            return Err(CoreError::Config("capacity must be at least 1".into()));
        }
        if self.fault_threshold == 0 {
            return Err(CoreError::Config("fault_threshold must be at least 1".into()));
        }
        if self.fault_window.is_zero() {
            return Err(CoreError::Config("fault_window must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config("poll_interval must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RunnerConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(RunnerConfig::new("runners", "runner-1").validate().is_ok());
    }

    #[test]
    fn builders_override_tuning() {
        let cfg = RunnerConfig::new("runners", "runner-1")
            .with_capacity(2)
            .with_fault_threshold(3)
            .with_fault_window(Duration::from_secs(10))
            .with_poll_interval(Duration::from_millis(50));

        assert_eq!(cfg.capacity, 2);
        assert_eq!(cfg.fault_threshold, 3);
        assert_eq!(cfg.fault_window, Duration::from_secs(10));
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn degenerate_values_are_rejected() {
        assert!(RunnerConfig::new("", "c").validate().is_err());
        assert!(RunnerConfig::new("g", " ").validate().is_err());
        assert!(RunnerConfig::new("g", "c").with_capacity(0).validate().is_err());
        assert!(RunnerConfig::new("g", "c").with_fault_threshold(0).validate().is_err());
        assert!(
            RunnerConfig::new("g", "c")
                .with_fault_window(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            RunnerConfig::new("g", "c")
                .with_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
