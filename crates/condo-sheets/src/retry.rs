//! Backoff for Sheets calls, keyed on whether a request may be replayed.
//!
//! Reads and range overwrites produce the same sheet whether they land
//! once or several times, so any transport failure is retried. An append
//! adds a ledger row each time it reaches the server; once the request may
//! have been sent (a timeout, a reset mid-body) it is never repeated and
//! the caller sees the error.
//!
//! Non-2xx responses are never retried here. The caller inspects them.

use std::future::Future;
use std::time::Duration;

/// Delay before the first retry. Later retries double it.
const FIRST_BACKOFF: Duration = Duration::from_millis(200);

/// How a request may be replayed after a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Replay {
    /// Replaying leaves the sheet unchanged: retry any transport error.
    Safe,
    /// Replaying may write twice: retry only when the connection was never
    /// established.
    ConnectOnly,
}

impl Replay {
    /// Extra attempts after the first.
    const RETRIES: u32 = 3;

    fn allows(self, err: &reqwest::Error) -> bool {
        match self {
            Replay::Safe => true,
            Replay::ConnectOnly => err.is_connect(),
        }
    }
}

fn backoff(retry: u32) -> Duration {
    FIRST_BACKOFF * 2u32.pow(retry)
}

/// Run `send` until it yields a response, the error is not replayable
/// under `replay`, or the retries are spent.
pub(crate) async fn send_with_replay<F, Fut>(
    replay: Replay,
    send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut retry = 0;
    loop {
        let err = match send().await {
            Ok(resp) => return Ok(resp),
            Err(err) => err,
        };
        if !replay.allows(&err) {
            tracing::warn!(?replay, error = %err, "Sheets request may have been sent, not replaying");
            return Err(err);
        }
        if retry == Replay::RETRIES {
            return Err(err);
        }
        let delay = backoff(retry);
        retry += 1;
        tracing::warn!(retry, ?delay, error = %err, "Sheets request failed, backing off");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn short_timeout_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap()
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_millis(200));
        assert_eq!(backoff(1), Duration::from_millis(400));
        assert_eq!(backoff(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn refused_connection_is_retried_for_both_policies() {
        for replay in [Replay::Safe, Replay::ConnectOnly] {
            let calls = AtomicU32::new(0);
            let http = short_timeout_client();
            let result = send_with_replay(replay, || {
                calls.fetch_add(1, Ordering::SeqCst);
                // Port 1 is closed: connection refused.
                http.get("http://127.0.0.1:1/").send()
            })
            .await;

            assert!(result.unwrap_err().is_connect());
            assert_eq!(calls.load(Ordering::SeqCst), Replay::RETRIES + 1, "{replay:?}");
        }
    }

    #[tokio::test]
    async fn timeout_is_retried_only_when_safe() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let http = short_timeout_client();
        let url = server.uri();

        let calls = AtomicU32::new(0);
        let err = send_with_replay(Replay::ConnectOnly, || {
            calls.fetch_add(1, Ordering::SeqCst);
            http.post(&url).send()
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let err = send_with_replay(Replay::Safe, || {
            calls.fetch_add(1, Ordering::SeqCst);
            http.get(&url).send()
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), Replay::RETRIES + 1);
    }

    #[tokio::test]
    async fn error_status_is_returned_without_retry() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = server.uri();
        let resp = send_with_replay(Replay::Safe, || http.get(&url).send())
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 500);
    }
}
