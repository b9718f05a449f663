//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - the course could not be parsed, migrated or validated
pub const VALIDATION_ERROR: i32 = 2;

/// Version error - helm or reckoner is older than the course requires
pub const VERSION_ERROR: i32 = 3;

/// Selection error - no release left to act on
pub const SELECTION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Release failures - some releases failed under --continue-on-error
pub const RELEASE_FAILURES: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
