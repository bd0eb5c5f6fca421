//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - the distribution configuration is invalid
pub const VALIDATION_ERROR: i32 = 2;

/// The distribution does not exist
pub const NOT_FOUND: i32 = 3;

/// Deployment did not finish in time; the change itself was accepted
pub const TIMEOUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Configuration error (following sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
