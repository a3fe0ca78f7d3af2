//! Resilience patterns for unreliable upstreams
//!
//! Timeout configuration plus the ordered-fallback primitive shared by the
//! source resolver and the embed extractor chain.

pub mod timeout {
    //! Timeout configuration for upstream calls

    use std::time::Duration;

    /// Default timeout for search and info lookups
    pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default timeout for embed extraction requests
    pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(20);

    /// Default timeout for proxied fetches
    pub const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout configuration
    #[derive(Debug, Clone, Copy)]
    pub struct TimeoutConfig {
        pub search: Duration,
        pub extraction: Duration,
        pub proxy: Duration,
    }

    impl Default for TimeoutConfig {
        fn default() -> Self {
            Self {
                search: SEARCH_TIMEOUT,
                extraction: EXTRACTION_TIMEOUT,
                proxy: PROXY_TIMEOUT,
            }
        }
    }

    impl TimeoutConfig {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub const fn with_search_timeout(mut self, timeout: Duration) -> Self {
            self.search = timeout;
            self
        }

        #[must_use]
        pub const fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
            self.extraction = timeout;
            self
        }

        #[must_use]
        pub const fn with_proxy_timeout(mut self, timeout: Duration) -> Self {
            self.proxy = timeout;
            self
        }
    }
}

pub mod fallback {
    //! Ordered "try the next candidate" primitive
    //!
    //! Each candidate is attempted at most once, strictly in order. The first
    //! attempt reporting [`Step::Done`] ends the run; empty results and
    //! failures are recorded and the run moves on.

    use std::future::Future;
    use std::time::Duration;

    /// Result of a single attempt
    #[derive(Debug)]
    pub enum Step<T> {
        Done(T),
        Empty,
        Failed(String),
    }

    /// What happened to one candidate
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StepOutcome {
        Success,
        Empty,
        Failed(String),
    }

    /// Record of a whole run
    #[derive(Debug)]
    pub struct FallbackRun<K, T> {
        /// Winning candidate and its value
        pub winner: Option<(K, T)>,
        /// Every attempted candidate in order, winner included
        pub trail: Vec<(K, StepOutcome)>,
    }

    impl<K, T> FallbackRun<K, T> {
        #[must_use]
        pub const fn is_exhausted(&self) -> bool {
            self.winner.is_none()
        }
    }

    /// Walk `candidates` in order until `attempt` yields [`Step::Done`].
    ///
    /// Candidates equal to one already tried are skipped. When `limit` is
    /// set, an attempt exceeding it is dropped (cancelling its in-flight
    /// I/O) and recorded as a failure.
    pub async fn first_success<K, T, I, F, Fut>(
        candidates: I,
        limit: Option<Duration>,
        mut attempt: F,
    ) -> FallbackRun<K, T>
    where
        K: Clone + PartialEq,
        I: IntoIterator<Item = K>,
        F: FnMut(K) -> Fut,
        Fut: Future<Output = Step<T>>,
    {
        let mut trail: Vec<(K, StepOutcome)> = Vec::new();

        for candidate in candidates {
            if trail.iter().any(|(tried, _)| *tried == candidate) {
                continue;
            }

            let fut = attempt(candidate.clone());
            let step = match limit {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or_else(|_| Step::Failed(format!("timed out after {}s", limit.as_secs()))),
                None => fut.await,
            };

            match step {
                Step::Done(value) => {
                    trail.push((candidate.clone(), StepOutcome::Success));
                    return FallbackRun {
                        winner: Some((candidate, value)),
                        trail,
                    };
                }
                Step::Empty => trail.push((candidate, StepOutcome::Empty)),
                Step::Failed(detail) => trail.push((candidate, StepOutcome::Failed(detail))),
            }
        }

        FallbackRun {
            winner: None,
            trail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fallback::{first_success, Step, StepOutcome};
    use super::timeout::TimeoutConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_timeout_config() {
        let config = TimeoutConfig::new().with_proxy_timeout(Duration::from_secs(60));
        assert_eq!(config.proxy.as_secs(), 60);
        assert_eq!(config.search.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = AtomicUsize::new(0);
        let run = first_success(["a", "b", "c"], None, |k| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match k {
                    "a" => Step::Empty,
                    "b" => Step::Done(42),
                    _ => Step::Failed("should not run".into()),
                }
            }
        })
        .await;

        assert_eq!(run.winner, Some(("b", 42)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(run.trail, vec![("a", StepOutcome::Empty), ("b", StepOutcome::Success)]);
    }

    #[tokio::test]
    async fn test_first_success_exhausts_without_repeats() {
        let run = first_success(["a", "b", "a", "c"], None, |k| async move {
            if k == "b" {
                Step::<()>::Failed("boom".into())
            } else {
                Step::Empty
            }
        })
        .await;

        assert!(run.is_exhausted());
        assert_eq!(run.trail.len(), 3);
        assert_eq!(run.trail[1], ("b", StepOutcome::Failed("boom".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_times_out_slow_candidate() {
        let run = first_success(["slow", "fast"], Some(Duration::from_secs(5)), |k| async move {
            if k == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Step::Done(k)
        })
        .await;

        assert_eq!(run.winner.map(|(k, _)| k), Some("fast"));
        assert!(matches!(&run.trail[0].1, StepOutcome::Failed(d) if d.contains("timed out")));
    }
}
