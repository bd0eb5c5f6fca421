//! Options for create, update and delete operations

use std::time::Duration;

/// Options for create operation
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Wait for the distribution to be deployed
    pub wait: bool,

    /// Caller deadline for the wait; the poller timeout applies when unset
    pub timeout: Option<Duration>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for deployment without a caller deadline
    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    /// Wait for deployment, giving up after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait = true;
        self.timeout = Some(timeout);
        self
    }
}

/// Options for update operation
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Wait for the change to be deployed
    pub wait: bool,

    /// Caller deadline for the wait
    pub timeout: Option<Duration>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait = true;
        self.timeout = Some(timeout);
        self
    }
}

/// Options for delete operation
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Disable the distribution and leave it in place instead of deleting it
    pub retain: bool,

    /// Wait for the distribution to disappear after a delete
    ///
    /// A retained distribution is always waited on until its disabled
    /// configuration is deployed, so this flag has no effect with `retain`.
    pub wait: bool,

    /// Caller deadline for each wait
    pub timeout: Option<Duration>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable instead of delete
    pub fn retain(mut self) -> Self {
        self.retain = true;
        self
    }

    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait = true;
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_options_builder() {
        let opts = CreateOptions::new().with_timeout(Duration::from_secs(600));
        assert!(opts.wait);
        assert_eq!(opts.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_delete_options_default_deletes() {
        let opts = DeleteOptions::new();
        assert!(!opts.retain);
        assert!(!opts.wait);

        let opts = DeleteOptions::new().retain().with_wait();
        assert!(opts.retain);
        assert!(opts.wait);
        assert_eq!(opts.timeout, None);
    }
}
