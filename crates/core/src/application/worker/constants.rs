// Worker constants
use std::time::Duration;

/// Sleep duration when no jobs are available (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after worker error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default retry base delay (1000ms = 1s)
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 1000;

/// Default lease on a claimed job before it counts as orphaned (5 minutes)
pub const DEFAULT_LEASE_MS: i64 = 5 * 60 * 1000;

/// How often the lease recovery sweep runs (30s)
pub const DEFAULT_RECOVERY_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of concurrent workers per queue
pub const DEFAULT_WORKER_COUNT: usize = 4;
