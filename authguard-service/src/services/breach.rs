//! K-anonymity breach corpus client.
//!
//! The plaintext never leaves the process and neither does the full hash:
//! the candidate password is SHA-1 hashed locally, the first five hex
//! characters go out as a range query, and the returned suffix:count lines
//! are scanned locally for the remaining 35 characters.
//!
//! Failure policy is fail-open: if the corpus is unreachable or the timeout
//! fires, the check reports `Unverified` rather than blocking sign-up. The
//! orchestrator records that as a degraded check, distinct from a clean
//! pass. The call is abandoned on timeout, never retried synchronously.

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use std::time::Duration;

use crate::config::BreachConfig;
use crate::models::BreachStatus;

/// Number of hex characters of the digest sent over the network.
const PREFIX_LEN: usize = 5;

/// Seam over the corpus so tests substitute a deterministic stub and the
/// production client stays the only code that touches the network.
#[async_trait]
pub trait BreachCorpus: Send + Sync {
    /// Range query: all known suffix:count pairs for a digest prefix.
    async fn range(&self, prefix: &str) -> Result<Vec<(String, u64)>, anyhow::Error>;
}

/// SHA-1 of the password as uppercase hex, split at the query boundary.
fn digest_parts(password: &str) -> (String, String) {
    let digest = Sha1::digest(password.as_bytes());
    let hex = hex::encode_upper(digest);
    let suffix = hex[PREFIX_LEN..].to_string();
    let mut prefix = hex;
    prefix.truncate(PREFIX_LEN);
    (prefix, suffix)
}

/// Checks candidate passwords against a breach corpus.
pub struct BreachChecker {
    corpus: Box<dyn BreachCorpus>,
    timeout: Duration,
    enabled: bool,
}

impl BreachChecker {
    pub fn new(corpus: Box<dyn BreachCorpus>, config: &BreachConfig) -> Self {
        Self {
            corpus,
            timeout: Duration::from_secs(config.timeout_secs),
            enabled: config.enabled,
        }
    }

    /// Query the corpus for the candidate password.
    ///
    /// Returns `Unverified` when the check is disabled, errors, or runs
    /// past its deadline.
    pub async fn check(&self, password: &str) -> BreachStatus {
        if !self.enabled {
            return BreachStatus::Unverified;
        }

        let (prefix, suffix) = digest_parts(password);

        let result = tokio::time::timeout(self.timeout, self.corpus.range(&prefix)).await;

        match result {
            Ok(Ok(candidates)) => {
                match candidates
                    .iter()
                    .find(|(s, _)| s.eq_ignore_ascii_case(&suffix))
                {
                    Some((_, count)) => BreachStatus::Leaked { count: *count },
                    None => BreachStatus::NotLeaked,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Breach corpus query failed, continuing unverified");
                BreachStatus::Unverified
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Breach corpus query timed out, continuing unverified"
                );
                BreachStatus::Unverified
            }
        }
    }
}

/// Production corpus client speaking the pwned-passwords range protocol.
pub struct HttpBreachCorpus {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBreachCorpus {
    pub fn new(config: &BreachConfig) -> Result<Self, anyhow::Error> {
        // Timeout also set per-client so a stuck DNS lookup cannot outlive
        // the checker's deadline by much.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BreachCorpus for HttpBreachCorpus {
    async fn range(&self, prefix: &str) -> Result<Vec<(String, u64)>, anyhow::Error> {
        let url = format!("{}/range/{}", self.base_url, prefix);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        // Response lines are "SUFFIX:COUNT"; malformed lines are skipped.
        let pairs = body
            .lines()
            .filter_map(|line| {
                let (suffix, count) = line.trim().split_once(':')?;
                Some((suffix.to_string(), count.trim().parse().ok()?))
            })
            .collect();
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn config(enabled: bool) -> BreachConfig {
        BreachConfig {
            enabled,
            api_base_url: "https://corpus.invalid".to_string(),
            timeout_secs: 2,
        }
    }

    /// Stub corpus that records every prefix it is asked about.
    struct RecordingCorpus {
        prefixes: Arc<Mutex<Vec<String>>>,
        response: Vec<(String, u64)>,
    }

    impl RecordingCorpus {
        fn with_response(response: Vec<(String, u64)>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prefixes = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    prefixes: prefixes.clone(),
                    response,
                },
                prefixes,
            )
        }
    }

    #[async_trait]
    impl BreachCorpus for RecordingCorpus {
        async fn range(&self, prefix: &str) -> Result<Vec<(String, u64)>, anyhow::Error> {
            self.prefixes.lock().unwrap().push(prefix.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingCorpus;

    #[async_trait]
    impl BreachCorpus for FailingCorpus {
        async fn range(&self, _prefix: &str) -> Result<Vec<(String, u64)>, anyhow::Error> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct HangingCorpus;

    #[async_trait]
    impl BreachCorpus for HangingCorpus {
        async fn range(&self, _prefix: &str) -> Result<Vec<(String, u64)>, anyhow::Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_digest_split_matches_known_vector() {
        // SHA-1("password") = 5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8
        let (prefix, suffix) = digest_parts("password");
        assert_eq!(prefix, "5BAA6");
        assert_eq!(suffix, "1E4C9B93F3F0682250B6CF8331B7EE68FD8");
    }

    #[tokio::test]
    async fn test_only_five_chars_cross_the_boundary() {
        let (corpus, prefixes) = RecordingCorpus::with_response(Vec::new());
        let checker = BreachChecker::new(Box::new(corpus), &config(true));

        checker.check("hunter2").await;

        let prefixes = prefixes.lock().unwrap();
        assert_eq!(prefixes.len(), 1);
        assert_eq!(prefixes[0].len(), 5);
    }

    #[tokio::test]
    async fn test_leaked_when_suffix_in_candidate_set() {
        let (_, suffix) = digest_parts("password");
        let (corpus, _) = RecordingCorpus::with_response(vec![
            ("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(), 3),
            (suffix, 9_545_824),
        ]);
        let checker = BreachChecker::new(Box::new(corpus), &config(true));

        let status = checker.check("password").await;
        assert_eq!(status, BreachStatus::Leaked { count: 9_545_824 });
    }

    #[tokio::test]
    async fn test_not_leaked_when_suffix_absent() {
        let (corpus, _) = RecordingCorpus::with_response(vec![(
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
            3,
        )]);
        let checker = BreachChecker::new(Box::new(corpus), &config(true));

        let status = checker.check("completely-novel-passphrase-42!").await;
        assert_eq!(status, BreachStatus::NotLeaked);
    }

    #[tokio::test]
    async fn test_corpus_failure_is_fail_open() {
        let checker = BreachChecker::new(Box::new(FailingCorpus), &config(true));
        let status = checker.check("anything").await;
        assert_eq!(status, BreachStatus::Unverified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_the_call() {
        let checker = BreachChecker::new(Box::new(HangingCorpus), &config(true));
        let status = checker.check("anything").await;
        assert_eq!(status, BreachStatus::Unverified);
    }

    #[tokio::test]
    async fn test_disabled_check_reports_unverified() {
        let checker = BreachChecker::new(Box::new(FailingCorpus), &config(false));
        let status = checker.check("anything").await;
        assert_eq!(status, BreachStatus::Unverified);
    }
}
