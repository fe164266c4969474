//! IO modules - side effects (network, filesystem)

pub mod extract;
pub mod range;
pub mod zip_index;

use crate::error::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`, failing with [`Error::Cancelled`] if the token fires first.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let res: Result<()> = cancellable(&token, std::future::pending()).await;
        assert!(matches!(res, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let res = cancellable(&token, async { Ok(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }
}
