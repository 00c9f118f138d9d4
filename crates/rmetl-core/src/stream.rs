//! Shared HTTP client and runtime.
//!
//! reqwest is async; pipelines are plain sequential loops. Requests are
//! driven to completion on a small shared tokio runtime via `block_on`, so
//! callers see an ordinary blocking call.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout, independent of the per-request timeout set by callers
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifying User-Agent sent with every request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Shared async HTTP client.
///
/// Idle connections are not pooled: every request opens and closes its own
/// connection.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(BROWSER_USER_AGENT)
        .pool_max_idle_per_host(0)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
///
/// Must not be entered from inside another runtime (`block_on` panics there).
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});
