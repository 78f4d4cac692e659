use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::lookup::WhoisLookup;
use crate::response::WhoisResponse;
use crate::retry::{RetryExecutor, RetryPolicy};

pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub query: String,
    pub success: bool,
    pub data: Option<WhoisResponse>,
    pub error: Option<String>,
    pub attempts: usize,
    pub duration_ms: u64,
}

/// Runs many lookups concurrently over one shared engine.
pub struct BulkExecutor {
    lookup: Arc<WhoisLookup>,
    concurrency: usize,
    rate_limit_delay: Duration,
    retry: RetryExecutor,
}

impl BulkExecutor {
    pub fn new(lookup: Arc<WhoisLookup>) -> Self {
        Self {
            lookup,
            concurrency: 10,
            rate_limit_delay: Duration::from_millis(100),
            retry: RetryExecutor::new(RetryPolicy::no_retry()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Pause taken by each worker before it starts a lookup.
    pub fn with_rate_limit(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    /// Looks up every query. Results come back in completion order.
    #[instrument(skip(self, queries, progress), fields(total = queries.len()))]
    pub async fn execute(
        &self,
        queries: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> Vec<BulkResult> {
        let total = queries.len();
        let completed = AtomicUsize::new(0);

        debug!(
            total = total,
            concurrency = self.concurrency,
            "Starting bulk execution"
        );

        stream::iter(queries)
            .map(|query| {
                let completed = &completed;
                let progress = progress.as_ref();

                async move {
                    if !self.rate_limit_delay.is_zero() {
                        sleep(self.rate_limit_delay).await;
                    }

                    let start = Instant::now();
                    let (result, attempts) = self
                        .retry
                        .execute(|| self.lookup.lookup(&query))
                        .await;
                    let duration_ms = start.elapsed().as_millis() as u64;

                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = progress {
                        progress(count, total, &query);
                    }

                    match result {
                        Ok(response) => BulkResult {
                            query,
                            success: true,
                            data: Some(response),
                            error: None,
                            attempts,
                            duration_ms,
                        },
                        Err(e) => {
                            warn!(query = %query, error = %e, "Bulk lookup failed");
                            BulkResult {
                                query,
                                success: false,
                                data: None,
                                error: Some(e.to_string()),
                                attempts,
                                duration_ms,
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

/// One query per line; blank lines and `#` comments are skipped and only
/// the first column of CSV input is used.
pub fn parse_queries_from_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').next().unwrap_or(line).trim().to_string())
        .filter(|query| !query.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WhoisOptions;
    use crate::testing::{fixtures, FakeFetcher};
    use std::sync::Mutex;

    fn executor(fetcher: FakeFetcher) -> (Arc<FakeFetcher>, BulkExecutor) {
        let fetcher = Arc::new(fetcher);
        let lookup = Arc::new(WhoisLookup::with_fetcher(WhoisOptions::default(), fetcher.clone()));
        let executor = BulkExecutor::new(lookup)
            .with_concurrency(4)
            .with_rate_limit(Duration::ZERO);
        (fetcher, executor)
    }

    #[test]
    fn test_parse_queries_from_file() {
        let content = r#"
# This is a comment
example.com
  whitespace.com
.com
8.8.8.8
csv.example.org,owner,notes
"#;

        let queries = parse_queries_from_file(content);
        assert_eq!(
            queries,
            vec!["example.com", "whitespace.com", ".com", "8.8.8.8", "csv.example.org"]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_each_query() {
        let (_, executor) = executor(
            FakeFetcher::new()
                .with_response("whois.iana.org", "com", fixtures::IANA_COM)
                .with_response("whois.iana.org", "8.8.8.8", fixtures::IANA_8_8_8_8)
                .with_response("whois.arin.net", "n 8.8.8.8", fixtures::ARIN_8_8_8_8),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = seen.clone();
        let progress: ProgressCallback = Box::new(move |done, total, query| {
            seen_in_callback
                .lock()
                .unwrap()
                .push((done, total, query.to_string()));
        });

        let queries = vec!["com".to_string(), "8.8.8.8".to_string(), "".to_string()];
        let mut results = executor.execute(queries, Some(progress)).await;
        results.sort_by(|a, b| a.query.cmp(&b.query));

        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(results[0].error.as_ref().unwrap().contains("query"));
        assert!(results[1].success);
        assert_eq!(results[1].data.as_ref().unwrap().depth(), 2);
        assert!(results[2].success);
        assert_eq!(results[2].data.as_ref().unwrap().depth(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, total, _)| *total == 3));
        let mut counts: Vec<usize> = seen.iter().map(|(done, _, _)| *done).collect();
        counts.sort();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_retry_policy_is_opt_in() {
        let fetcher = FakeFetcher::new().with_failure("whois.iana.org", "connection refused");

        let (plain_fetcher, plain) = executor(fetcher);
        let results = plain.execute(vec!["example.com".to_string()], None).await;
        assert_eq!(results[0].attempts, 1);
        assert_eq!(plain_fetcher.call_count(), 1);

        let (retry_fetcher, retrying) =
            executor(FakeFetcher::new().with_failure("whois.iana.org", "connection refused"));
        let retrying = retrying.with_retry_policy(
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        );
        let results = retrying.execute(vec!["example.com".to_string()], None).await;
        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(retry_fetcher.call_count(), 3);
    }
}
