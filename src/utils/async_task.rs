use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::SystemError;

/// Run `task` until it succeeds, retrying with capped exponential backoff.
///
/// Each attempt is bounded by `policy.timeout_ms`. `policy.max_retries == 0`
/// retries forever. Returns the last error once attempts are exhausted.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    mut task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: FnMut() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let mut attempt = 0;
    let mut current_delay = Duration::from_millis(policy.base_delay_ms);
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);
    let unlimited = policy.max_retries == 0;

    let mut last_error = Error::System(SystemError::RetryTaskFailed("Task failed after max retries".to_string()));
    while unlimited || attempt < policy.max_retries {
        debug!("Attempt {} of {}", attempt + 1, policy.max_retries);
        match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => {
                return Ok(r);
            }
            Ok(Err(e)) => {
                warn!("failed with error: {:?}", &e);
                last_error = e;
            }
            Err(_) => {
                warn!("Task timed out after {:?}", timeout_duration);
                last_error = Error::System(SystemError::RetryTimeout(timeout_duration));
            }
        };

        attempt += 1;
        if unlimited || attempt < policy.max_retries {
            let delay = with_jitter(current_delay);
            debug!("Retrying in {:?}...", delay);
            sleep(delay).await;

            current_delay = (current_delay * 2).min(max_delay);
        }
    }
    warn!("Task failed after {} attempts", attempt);
    Err(last_error)
}

/// Add up to 10% random jitter so reconnecting subscribers spread out.
fn with_jitter(delay: Duration) -> Duration {
    let spread = delay.as_millis() as u64 / 10;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<tokio::task::JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        match task_fn().await {
            Ok(()) | Err(Error::Exit) => debug!("spawned task: {name} stopped"),
            Err(e) => error!("spawned task: {name} stopped with error: {:?}", e),
        }
    });

    if let Some(h) = handles {
        h.push(handle);
    }
}
