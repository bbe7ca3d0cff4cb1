//! Global constants for the rust-ad-collector application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Pipeline sizing
/// Capacity of the bounded work queue between the producer and the workers
pub const WORK_QUEUE_CAPACITY: usize = 1000;

/// Default number of concurrent workers
pub const DEFAULT_THREADS: usize = 50;

/// Default interval between status reports in seconds
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 30;

// Identifiers
/// Suffix identifying the Enterprise Domain Controllers well-known group
pub const ENTERPRISE_DC_SUFFIX: &str = "S-1-5-9";

/// Well-known SID for the Everyone principal
pub const EVERYONE_SID: &str = "S-1-1-0";

/// Well-known SID for the Authenticated Users principal
pub const AUTHENTICATED_USERS_SID: &str = "S-1-5-11";

/// Well-known SID suffix for the OWNER RIGHTS principal
pub const OWNER_RIGHTS_SID: &str = "S-1-3-4";

// Computer status values
/// Status string for a successful host task
pub const STATUS_SUCCESS: &str = "Success";

/// Failure reason when the host does not run Windows
pub const STATUS_NON_WINDOWS_OS: &str = "NonWindowsOS";

/// Failure reason when the machine password is too old
pub const STATUS_OLD_PASSWORD: &str = "PwdLastSetOutOfRange";

/// Failure reason when the probe port is closed or filtered
pub const STATUS_PORT_NOT_OPEN: &str = "PortNotOpen";

/// Failure reason when the run was cancelled before the probe finished
pub const STATUS_CANCELLED: &str = "Cancelled";

// Availability probe
/// Port used for the host reachability probe (SMB)
pub const PROBE_PORT: u16 = 445;

/// Default probe timeout in milliseconds
pub const DEFAULT_PORT_SCAN_TIMEOUT_MS: u64 = 10_000;

/// Machine accounts whose password is older than this are treated as stale
pub const PASSWORD_AGE_THRESHOLD_DAYS: i64 = 60;

/// Seconds between 1601-01-01 and the Unix epoch
pub const FILETIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

// userAccountControl bits
/// Account is disabled
pub const UAC_ACCOUNT_DISABLE: i64 = 0x2;

/// Account does not expire its password
pub const UAC_DONT_EXPIRE_PASSWORD: i64 = 0x10000;

/// Account does not require a password
pub const UAC_PASSWORD_NOT_REQUIRED: i64 = 0x20;

/// Machine account of a domain controller
pub const UAC_SERVER_TRUST_ACCOUNT: i64 = 0x2000;

/// Account is trusted for unconstrained delegation
pub const UAC_TRUSTED_FOR_DELEGATION: i64 = 0x80000;

/// Account is sensitive and cannot be delegated
pub const UAC_NOT_DELEGATED: i64 = 0x100000;

/// Kerberos pre-authentication is not required
pub const UAC_DONT_REQUIRE_PREAUTH: i64 = 0x400000;

/// Account is trusted to authenticate for delegation (protocol transition)
pub const UAC_TRUSTED_TO_AUTH_FOR_DELEGATION: i64 = 0x1000000;

// Output
/// Version stamped into the meta block of every output file
pub const OUTPUT_FORMAT_VERSION: u32 = 6;

/// Default prefix for output files
pub const DEFAULT_OUTPUT_PREFIX: &str = "collection";

/// File extension of the output archive
pub const ARCHIVE_EXTENSION: &str = "zip";
