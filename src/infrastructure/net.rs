use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Check whether `host:port` accepts TCP connections within `limit`.
///
/// Never fails: resolution errors, refusals and timeouts all read as `false`.
pub async fn check_host_connectivity(host: &str, port: u16, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(host, port, error = %e, "Connectivity probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(
                host,
                port,
                timeout_secs = limit.as_secs(),
                "Connectivity probe timed out"
            );
            false
        }
    }
}

/// Probe the application, log the result, then sleep for the startup delay.
///
/// An unreachable host is only a warning; the fixed delay is what gives the
/// stack time to come up.
pub async fn await_startup(host: &str, port: u16, delay: Duration) {
    if check_host_connectivity(host, port, DEFAULT_PROBE_TIMEOUT).await {
        tracing::info!(host, port, "Successfully connected to application");
    } else {
        tracing::warn!(host, port, "Could not connect to application");
    }

    tokio::time::sleep(delay).await;
}
