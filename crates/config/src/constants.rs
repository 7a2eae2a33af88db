/// Default timeout for chain and coordinator HTTP queries, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default interval between scheduled reconciliation passes, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Elapsed time since submission after which a transaction the provider
/// cannot find is declared canceled rather than not-yet-propagated.
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 120;

/// Pending documents older than this version are cleared on session start.
pub const CURRENT_STORAGE_VERSION: u32 = 2;
