//! Exit codes for rigdocctl

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors (I/O, bad arguments, unknown case, ...)
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when a submission fails validation
pub const EXIT_REJECTED: i32 = 2;
