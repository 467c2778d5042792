use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::debug;

use crate::config::materialize::read_error_log;
use crate::error::{HarnessError, Result};

/// Upper bound for a single GET; the overall deadline is separate.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `GET base_uri` until the server answers with any HTTP response or
/// `timeout` expires.
///
/// Error statuses count as ready: the point is to know the listener is up,
/// not that the application behaves. Connection failures are retried with
/// backoff until the deadline.
pub async fn await_ready(base_uri: &str, timeout: Duration, error_log: Option<&Path>) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(ATTEMPT_TIMEOUT.min(timeout))
        .build()
        .map_err(HarnessError::HttpClient)?;
    let last_error: Mutex<Option<String>> = Mutex::new(None);

    let result = tokio::time::timeout(timeout, async {
        (|| async { client.get(base_uri).send().await.map(|r| r.status()) })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(50))
                    .with_max_delay(Duration::from_secs(1))
                    .with_max_times(usize::MAX)
                    .with_jitter(),
            )
            .when(|err: &reqwest::Error| !err.is_builder())
            .notify(|err: &reqwest::Error, dur: Duration| {
                debug!(uri = %base_uri, "server not answering yet: {}, retrying in {:?}", err, dur);
                if let Ok(mut last) = last_error.lock() {
                    *last = Some(err.to_string());
                }
            })
            .await
    })
    .await;

    match result {
        Ok(Ok(status)) => {
            debug!(uri = %base_uri, %status, "server answered");
            Ok(())
        }
        Ok(Err(e)) if e.is_builder() => Err(HarnessError::InvalidServerUri {
            uri: base_uri.to_string(),
            reason: e.to_string(),
        }),
        Ok(Err(e)) => Err(timed_out(base_uri, timeout, Some(e.to_string()), error_log)),
        Err(_) => {
            let last = last_error.lock().ok().and_then(|mut l| l.take());
            Err(timed_out(base_uri, timeout, last, error_log))
        }
    }
}

fn timed_out(
    uri: &str,
    timeout: Duration,
    last_error: Option<String>,
    error_log: Option<&Path>,
) -> HarnessError {
    HarnessError::ReadinessTimeout {
        uri: uri.to_string(),
        timeout,
        last_error,
        error_log: error_log.map(read_error_log).unwrap_or_default(),
    }
}
