use crate::{Error, Result};
use futures_util::Stream;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Sleep;
use tracing::warn;

/// Fails a stream that goes quiet for longer than `timeout`.
///
/// The deadline resets after every item. A zero timeout disables the check.
pub struct IdleTimeout<S> {
    inner: S,
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
    terminated: bool,
}

impl<S> IdleTimeout<S>
where
    S: Stream + Unpin,
{
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            sleep: Box::pin(tokio::time::sleep(timeout)),
            terminated: false,
        }
    }
}

impl<S, T> Stream for IdleTimeout<S>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        if self.timeout.is_zero() {
            return Pin::new(&mut self.inner).poll_next(cx);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(item))) => {
                let deadline = tokio::time::Instant::now() + self.timeout;
                self.sleep.as_mut().reset(deadline);
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.terminated = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.terminated = true;
                Poll::Ready(None)
            }
            Poll::Pending => match self.sleep.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    self.terminated = true;
                    warn!(
                        timeout_secs = self.timeout.as_secs(),
                        "Upstream went idle, terminating stream"
                    );
                    Poll::Ready(Some(Err(Error::UpstreamIdleTimeout {
                        secs: self.timeout.as_secs(),
                    })))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out() {
        let silent = futures_util::stream::pending::<Result<String>>();
        let mut stream = IdleTimeout::new(silent, Duration::from_secs(5));

        let item = stream.next().await;
        assert!(matches!(
            item,
            Some(Err(Error::UpstreamIdleTimeout { secs: 5 }))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_stream_passes_through() {
        let items: Vec<Result<u32>> = vec![Ok(1), Ok(2)];
        let stream = IdleTimeout::new(futures_util::stream::iter(items), Duration::from_secs(1));

        let out: Vec<u32> = stream.map(|i| i.unwrap()).collect().await;
        assert_eq!(out, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_check() {
        let items: Vec<Result<u32>> = vec![Ok(7)];
        let stream = IdleTimeout::new(futures_util::stream::iter(items), Duration::ZERO);

        let out: Vec<Result<u32>> = stream.collect().await;
        assert_eq!(out.len(), 1);
    }
}
