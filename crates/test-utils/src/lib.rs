//! Shared fixtures for buildweave's integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fake_toolchain;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single build driven by a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static TRACING: Once = Once::new();

/// Install a test-captured tracing subscriber once per test binary.
///
/// The filter comes from `BUILDWEAVE_LOG` (any `EnvFilter` directive, e.g.
/// `BUILDWEAVE_LOG=buildweave::engine=debug`), defaulting to `info`. Output
/// only shows for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(buildweave::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("build did not finish within {TEST_TIMEOUT:?}"),
    }
}
