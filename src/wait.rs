//! Utilities for polling, timeouts and cancellation.

use std::fmt::Display;
use std::future::{self, Future};
use std::result;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::errors::*;

/// Options controlling how long we wait and what makes us give up.
/// This uses a "builder" pattern, so you can write:
///
/// ```
/// use std::time::Duration;
/// use jaqpot::wait::WaitOptions;
///
/// let options = WaitOptions::default()
///     .timeout(Duration::from_secs(120))
///     .retry_interval(Duration::from_millis(500));
/// ```
#[derive(Clone, Debug)]
pub struct WaitOptions {
    /// How long may the entire wait take? `None` means forever.
    timeout: Option<Duration>,

    /// How long to wait between polls.
    retry_interval: Duration,

    /// Lets the caller abandon the wait from elsewhere.
    cancel_token: Option<CancellationToken>,
}

impl WaitOptions {
    /// Set an optional timeout after which to abandon this `wait`. This
    /// covers the whole wait, unlike the client's per-request timeout.
    pub fn timeout<D: Into<Option<Duration>>>(mut self, timeout: D) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// How long should we wait between polls? Defaults to 1 second.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Abandon the wait with `Error::Cancelled` once `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }

    /// When a wait starting now must end, if ever.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|to| Instant::now() + to)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10 * 60)),
            retry_interval: Duration::from_secs(1),
            cancel_token: None,
        }
    }
}

/// Return this value from a `wait` callback.
pub enum WaitStatus<T, E> {
    /// The task has finished.
    Finished(T),

    /// The task hasn't finished yet, so wait a while and try again.
    Waiting,

    /// The task has failed. We never retry.
    Failed(E),
}

/// Try `e`, and if it fails, end our `wait` with that error.
#[macro_export]
macro_rules! try_wait {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return $crate::wait::WaitStatus::Failed(e.into()),
        }
    };
}

/// Call `f` repeatedly, wait for it to return `WaitStatus::Finished`, an
/// error, a timeout or cancellation. Honors `WaitOptions`.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use jaqpot::wait::{wait, WaitOptions, WaitStatus};
///
/// let value = wait::<_, jaqpot::Error, _, _>(&WaitOptions::default(), || async {
///     WaitStatus::Finished("my value")
/// })
/// .await
/// .expect("an error occured while waiting");
///
/// assert_eq!(value, "my value");
/// # }
/// ```
///
/// If you return `WaitStatus::Waiting` instead, this function will sleep for
/// the retry interval, and then try again.
pub async fn wait<T, E, F, Fut>(options: &WaitOptions, f: F) -> result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WaitStatus<T, E>>,
    E: Display,
    Error: Into<E>,
{
    wait_until(options, options.deadline(), f).await
}

/// Like `wait`, but against a `deadline` fixed by the caller, so that one
/// deadline can cover several steps.
pub(crate) async fn wait_until<T, E, F, Fut>(
    options: &WaitOptions,
    deadline: Option<Instant>,
    mut f: F,
) -> result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WaitStatus<T, E>>,
    E: Display,
    Error: Into<E>,
{
    let retry_interval = options.retry_interval;
    trace!(
        "waiting with deadline {:?}, interval {:?}",
        deadline,
        retry_interval
    );
    loop {
        if options.is_cancelled() {
            trace!("wait cancelled before polling");
            return Err(Error::Cancelled {}.into());
        }

        // Call the function we're waiting on.
        match race(options, deadline, f()).await {
            Ok(WaitStatus::Finished(value)) => {
                trace!("wait finished successfully");
                return Ok(value);
            }
            Ok(WaitStatus::Waiting) => trace!("waiting some more"),
            Ok(WaitStatus::Failed(err)) => {
                trace!("failure, giving up on wait: {}", err);
                return Err(err);
            }
            Err(err) => return Err(err.into()),
        }

        // Check to see if we'll exceed our deadline (if we have one).
        if let Some(deadline) = deadline {
            let next_attempt = Instant::now() + retry_interval;
            if next_attempt > deadline {
                trace!(
                    "next attempt {:?} would fall after deadline {:?}, ending wait",
                    next_attempt,
                    deadline
                );
                return Err(Error::Timeout {}.into());
            }
        }

        // Sleep until our next call, unless somebody cancels us first.
        if let Err(err) = race(options, deadline, tokio::time::sleep(retry_interval)).await {
            return Err(err.into());
        }
    }
}

/// Run a single request, abandoning it if `options` is cancelled or
/// `deadline` passes first.
pub(crate) async fn guard<T, Fut>(
    options: &WaitOptions,
    deadline: Option<Instant>,
    fut: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    race(options, deadline, fut).await?
}

/// Run `fut` to completion unless cancellation or `deadline` comes first.
/// Neither is checked again once `fut` has finished.
async fn race<Fut: Future>(
    options: &WaitOptions,
    deadline: Option<Instant>,
    fut: Fut,
) -> Result<Fut::Output> {
    if options.is_cancelled() {
        trace!("cancelled before starting");
        return Err(Error::Cancelled {});
    }
    if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
        trace!("deadline passed before starting");
        return Err(Error::Timeout {});
    }
    let cancelled = async {
        match options.cancel_token {
            Some(ref token) => token.cancelled().await,
            None => future::pending::<()>().await,
        }
    };
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancelled => {
            trace!("cancelled while running");
            Err(Error::Cancelled {})
        }
        _ = expired => {
            trace!("deadline passed while running");
            Err(Error::Timeout {})
        }
        output = fut => Ok(output),
    }
}

#[tokio::test]
async fn finishes_on_first_observation() {
    let mut calls = 0;
    let value = wait::<_, Error, _, _>(&WaitOptions::default(), || {
        calls += 1;
        async { WaitStatus::Finished(7) }
    })
    .await
    .unwrap();
    assert_eq!(value, 7);
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn polls_until_finished() {
    let options = WaitOptions::default().retry_interval(Duration::from_millis(1));
    let mut calls = 0;
    let value = wait::<_, Error, _, _>(&options, || {
        calls += 1;
        let done = calls == 3;
        async move {
            if done {
                WaitStatus::Finished("done")
            } else {
                WaitStatus::Waiting
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(value, "done");
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn failures_are_not_retried() {
    let options = WaitOptions::default().retry_interval(Duration::from_millis(1));
    let mut calls = 0;
    let result = wait::<(), Error, _, _>(&options, || {
        calls += 1;
        async { WaitStatus::Failed(Error::malformed_reference("")) }
    })
    .await;
    assert!(matches!(result, Err(Error::MalformedReference { .. })));
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn times_out() {
    let options = WaitOptions::default()
        .retry_interval(Duration::from_millis(20))
        .timeout(Duration::from_millis(50));
    let result = wait::<(), Error, _, _>(&options, || async { WaitStatus::Waiting }).await;
    assert!(matches!(result, Err(Error::Timeout {})));
}

#[tokio::test]
async fn cancellation_interrupts_sleep() {
    let token = CancellationToken::new();
    let options = WaitOptions::default()
        .timeout(None)
        .retry_interval(Duration::from_secs(3600))
        .cancel_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let result = wait::<(), Error, _, _>(&options, || async { WaitStatus::Waiting }).await;
    assert!(matches!(result, Err(Error::Cancelled {})));
    canceller.await.unwrap();
}

#[tokio::test]
async fn cancelled_before_first_poll() {
    let token = CancellationToken::new();
    token.cancel();
    let options = WaitOptions::default().cancel_token(token);
    let mut calls = 0;
    let result = wait::<(), Error, _, _>(&options, || {
        calls += 1;
        async { WaitStatus::Waiting }
    })
    .await;
    assert!(matches!(result, Err(Error::Cancelled {})));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn deadline_interrupts_slow_requests() {
    let options = WaitOptions::default().timeout(Duration::from_millis(30));
    let started = Instant::now();
    let result = guard(&options, options.deadline(), async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })
    .await;
    assert!(matches!(result, Err(Error::Timeout {})));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_interrupts_slow_requests() {
    let token = CancellationToken::new();
    let options = WaitOptions::default().cancel_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let result = guard(&options, options.deadline(), async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })
    .await;
    assert!(matches!(result, Err(Error::Cancelled {})));
    canceller.await.unwrap();
}

#[tokio::test]
async fn guard_does_not_start_after_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let options = WaitOptions::default().cancel_token(token);
    let mut started = false;
    let result = guard(&options, None, async {
        started = true;
        Ok(())
    })
    .await;
    assert!(matches!(result, Err(Error::Cancelled {})));
    assert!(!started);
}
