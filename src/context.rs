//! Per-call deadlines.

use std::time::Duration;
use tokio::time::Instant;

/// Carries the caller's deadline into a single API call.
///
/// The client installs no timeout of its own: a call runs until the transport
/// answers unless the context says otherwise. Cancellation needs no context at
/// all, dropping the returned future aborts the in-flight request.
///
/// # Examples
///
/// ```
/// use circleci_v2::Context;
/// use std::time::Duration;
///
/// let ctx = Context::background();
/// assert!(ctx.deadline().is_none());
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(ctx.deadline().is_some());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// A context without a deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `fut` to completion or until the deadline passes.
    pub(crate) async fn run<F, T>(&self, fut: F) -> crate::Result<T>
    where
        F: std::future::Future<Output = crate::Result<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| crate::Error::Timeout)?,
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn background_never_times_out() {
        let ctx = Context::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn expired_deadline_yields_timeout() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout)));
    }
}
