use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use crate::cancel::CancelToken;
use crate::error::{FetchError, FetchErrorKind};
use crate::record::CrawlTarget;

/// Anything that can turn a [`CrawlTarget`] into a page body.
///
/// The pipeline only talks to this trait, so runs can be driven by an in-memory site in
/// tests and by [`Fetcher`] otherwise.
pub trait Fetch: Sync {
    fn fetch(&self, target: &CrawlTarget) -> Result<String, FetchError>;
}

/// Retry and pacing knobs for [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Total attempts per fetch, at least 1.
    pub retries: u32,
    /// Wait before attempt `k + 1` is `backoff_base * k`.
    pub backoff_base: Duration,
    /// Wait before the first attempt of every fetch.
    pub politeness: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            retries: 3,
            backoff_base: Duration::from_millis(800),
            politeness: Duration::from_millis(800),
            timeout: Duration::from_secs(25),
        }
    }
}

/// Blocking HTTP GET client for one run.
///
/// Owns its own agent, so connection pools and cookies never outlive the run that created
/// it. `Fetcher` is `Sync`; workers of the same run share it by reference.
pub struct Fetcher {
    agent: ureq::Agent,
    user_agent: String,
    policy: FetchPolicy,
    cancel: CancelToken,
}

struct Failure {
    kind: FetchErrorKind,
    status: Option<u16>,
    cause: String,
}

impl Fetcher {
    pub fn new(user_agent: &str, policy: FetchPolicy, cancel: CancelToken) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_global(Some(policy.timeout))
            .http_status_as_error(false)
            .build();
        Fetcher {
            agent: ureq::Agent::new_with_config(cfg),
            user_agent: user_agent.to_string(),
            policy,
            cancel,
        }
    }

    /// GET `url` until it answers 200 or the retry budget is spent.
    pub fn get(&self, url: &Url) -> Result<String, FetchError> {
        let retries = self.policy.retries.max(1);
        if !self.cancel.sleep(self.policy.politeness) {
            return Err(FetchError::cancelled(url.as_str(), 0));
        }

        let mut last = Failure {
            kind: FetchErrorKind::NetworkFailure,
            status: None,
            cause: "no attempt made".to_string(),
        };
        for attempt in 1..=retries {
            if self.cancel.is_cancelled() {
                return Err(FetchError::cancelled(url.as_str(), attempt - 1));
            }
            match self.attempt(url) {
                Ok(body) => {
                    trace!(%url, attempt, bytes = body.len(), "fetched");
                    return Ok(body);
                }
                Err(failure) => {
                    debug!(%url, attempt, retries, cause = %failure.cause, "attempt failed");
                    last = failure;
                }
            }
            if attempt < retries && !self.cancel.sleep(self.policy.backoff_base * attempt) {
                return Err(FetchError::cancelled(url.as_str(), attempt));
            }
        }

        Err(FetchError {
            kind: last.kind,
            url: url.as_str().to_string(),
            attempts: retries,
            status: last.status,
            last_cause: last.cause,
        })
    }

    fn attempt(&self, url: &Url) -> Result<String, Failure> {
        let res = self
            .agent
            .get(url.as_str())
            .header("User-Agent", self.user_agent.as_str())
            .call();
        let mut res = match res {
            Ok(res) => res,
            Err(e) => {
                return Err(Failure {
                    kind: FetchErrorKind::NetworkFailure,
                    status: None,
                    cause: e.to_string(),
                });
            }
        };

        let status = res.status().as_u16();
        if status != 200 {
            return Err(Failure {
                kind: FetchErrorKind::HttpStatus,
                status: Some(status),
                cause: format!("HTTP {status}"),
            });
        }
        res.body_mut().read_to_string().map_err(|e| Failure {
            kind: FetchErrorKind::NetworkFailure,
            status: None,
            cause: format!("read body: {e}"),
        })
    }
}

impl Fetch for Fetcher {
    fn fetch(&self, target: &CrawlTarget) -> Result<String, FetchError> {
        debug!(kind = %target.kind, url = %target.url, "GET");
        self.get(&target.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TargetKind;
    use std::time::Instant;

    fn quick_policy(retries: u32, backoff_ms: u64) -> FetchPolicy {
        FetchPolicy {
            retries,
            backoff_base: Duration::from_millis(backoff_ms),
            politeness: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn returns_body_on_200_and_sends_user_agent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/paper")
            .match_header("user-agent", "papercrawl-test/1.0")
            .with_status(200)
            .with_body("<html>ok</html>")
            .expect(1)
            .create();

        let fetcher = Fetcher::new("papercrawl-test/1.0", quick_policy(3, 0), CancelToken::new());
        let url = Url::parse(&format!("{}/paper", server.url())).unwrap();
        let body = fetcher
            .fetch(&CrawlTarget::new(url, TargetKind::Detail))
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
        mock.assert();
    }

    #[test]
    fn non_200_is_retried_exactly_retries_times_with_linear_backoff() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create();

        let fetcher = Fetcher::new("papercrawl-test/1.0", quick_policy(3, 40), CancelToken::new());
        let url = Url::parse(&format!("{}/flaky", server.url())).unwrap();
        let start = Instant::now();
        let err = fetcher.get(&url).unwrap_err();
        let elapsed = start.elapsed();

        mock.assert();
        assert_eq!(err.kind, FetchErrorKind::HttpStatus);
        assert_eq!(err.status, Some(503));
        assert_eq!(err.attempts, 3);
        // 40ms after attempt 1, 80ms after attempt 2, nothing after the last.
        assert!(elapsed >= Duration::from_millis(120), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2_000), "elapsed {elapsed:?}");
    }

    #[test]
    fn unreachable_host_is_a_network_failure() {
        // Port 9 (discard) on loopback is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/nothing").unwrap();
        let fetcher = Fetcher::new("papercrawl-test/1.0", quick_policy(2, 0), CancelToken::new());
        let err = fetcher.get(&url).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NetworkFailure);
        assert_eq!(err.attempts, 2);
        assert_eq!(err.status, None);
    }

    #[test]
    fn cancelled_token_issues_no_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/never").expect(0).create();
        let cancel = CancelToken::new();
        cancel.cancel();
        let fetcher = Fetcher::new("papercrawl-test/1.0", quick_policy(3, 0), cancel);
        let url = Url::parse(&format!("{}/never", server.url())).unwrap();
        let err = fetcher.get(&url).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Cancelled);
        mock.assert();
    }
}
