//! Optional I/O deadlines.

use std::future::Future;
use std::io;
use std::time::Duration;

/// Run an I/O future, failing with `TimedOut` if `limit` elapses first.
///
/// `None` waits forever.
pub(crate) async fn io_deadline<F, T>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no progress within {:?}", limit),
            )),
        },
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result: io::Result<()> =
            io_deadline(Some(Duration::from_secs(5)), std::future::pending()).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result = io_deadline(Some(Duration::from_secs(5)), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);

        let result = io_deadline(None, async { Ok::<_, io::Error>(8) }).await;
        assert_eq!(result.unwrap(), 8);
    }
}
