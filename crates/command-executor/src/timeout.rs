//! Deadline helper shared by the runner and by callers driving a child directly

use async_io::Timer;
use futures_lite::future;
use std::future::Future;
use std::time::Duration;

/// Run `future` to completion, or give up once `limit` has elapsed.
///
/// With no limit the future simply runs to completion. When the deadline wins,
/// the future is dropped and the limit is returned as the error.
pub async fn with_timeout<F>(limit: Option<Duration>, future: F) -> Result<F::Output, Duration>
where
    F: Future,
{
    let Some(limit) = limit else {
        return Ok(future.await);
    };

    future::or(async { Ok(future.await) }, async {
        Timer::after(limit).await;
        Err(limit)
    })
    .await
}
