use crate::metadata::{MetadataExtractor, PageMetadata};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 10;

/// Called with `(completed, total)` after each URL finishes.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// A result tagged with the position of the URL it came from.
pub type IndexedMetadata = (usize, PageMetadata);

type Completed = Arc<Mutex<Vec<IndexedMetadata>>>;

/// Fans metadata extraction out over a fixed pool of workers.
///
/// Workers drain one shared queue, each finishing a page before taking the
/// next, so at most `workers` requests are in flight at once.
pub struct MetadataFetcher {
    extractor: MetadataExtractor,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl MetadataFetcher {
    pub fn new(extractor: MetadataExtractor) -> Self {
        Self {
            extractor,
            workers: DEFAULT_WORKERS,
            progress_callback: None,
            cancel_flag: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Once the flag is set, URLs still waiting in the queue are not fetched
    /// and come back as empty metadata marked `cancelled`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Fetch metadata for every URL. Results arrive in completion order and
    /// there is always exactly one per input URL, failed or not.
    pub async fn fetch_all(&self, urls: Vec<String>) -> Vec<PageMetadata> {
        self.fetch_all_indexed(urls)
            .await
            .into_iter()
            .map(|(_, metadata)| metadata)
            .collect()
    }

    /// Like [`fetch_all`](Self::fetch_all), but each result keeps the index
    /// of its input URL so repeated URLs stay distinguishable.
    pub async fn fetch_all_indexed(&self, urls: Vec<String>) -> Vec<IndexedMetadata> {
        let total = urls.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.workers.min(total);
        info!("Fetching metadata for {} URLs with {} workers", total, workers);

        let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
            Arc::new(Mutex::new(urls.iter().cloned().enumerate().collect()));
        let completed: Completed = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let extractor = self.extractor.clone();
            let queue = queue.clone();
            let completed = completed.clone();
            let progress_cb = self.progress_callback.clone();
            let cancel_flag = self.cancel_flag.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                loop {
                    let work_item = queue.lock().await.pop_front();
                    let Some((index, url)) = work_item else {
                        break;
                    };

                    let cancelled = cancel_flag
                        .as_ref()
                        .is_some_and(|flag| flag.load(Ordering::Relaxed));
                    let metadata = if cancelled {
                        PageMetadata::with_error(url, "cancelled".to_string())
                    } else {
                        extractor.extract(&url).await
                    };

                    Self::record(&completed, &progress_cb, total, index, metadata).await;
                }
                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            if let Err(e) = handle.await {
                warn!("Metadata worker failed: {}", e);
            }
        }

        // A worker that died mid-page leaves a hole; fill it so the result
        // count still matches the input count.
        let seen: HashSet<usize> = completed.lock().await.iter().map(|(i, _)| *i).collect();
        for (index, url) in urls.into_iter().enumerate() {
            if !seen.contains(&index) {
                let metadata = PageMetadata::with_error(url, "worker failed".to_string());
                Self::record(&completed, &self.progress_callback, total, index, metadata).await;
            }
        }

        let mut completed = completed.lock().await;
        info!("Metadata fetch complete. {} pages processed", completed.len());
        completed.drain(..).collect()
    }

    /// Store a result and report progress. The callback runs under the
    /// results lock so `completed` is seen strictly increasing.
    async fn record(
        completed: &Completed,
        progress_cb: &Option<ProgressCallback>,
        total: usize,
        index: usize,
        metadata: PageMetadata,
    ) {
        let mut results = completed.lock().await;
        results.push((index, metadata));
        if let Some(callback) = progress_cb {
            callback(results.len(), total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpFetcher;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn page(title: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_bytes(format!("<html><head><title>{}</title></head></html>", title).into_bytes())
    }

    fn fetcher() -> MetadataFetcher {
        MetadataFetcher::new(MetadataExtractor::new(HttpFetcher::new().unwrap()))
    }

    #[tokio::test]
    async fn test_one_result_per_url_with_failures() {
        let mock_server = MockServer::start().await;

        for i in 0..8 {
            Mock::given(method("GET"))
                .and(path(format!("/ok{}", i)))
                .respond_with(page(&format!("Page {}", i)))
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let mut urls: Vec<String> = (0..8)
            .map(|i| format!("{}/ok{}", mock_server.uri(), i))
            .collect();
        urls.push(format!("{}/broken", mock_server.uri()));
        urls.push(format!("{}/missing", mock_server.uri()));

        let results = fetcher().with_workers(3).fetch_all(urls.clone()).await;

        assert_eq!(results.len(), urls.len());
        let failed = results.iter().filter(|m| m.error.is_some()).count();
        assert_eq!(failed, 2);

        let mut returned: Vec<String> = results.iter().map(|m| m.url.clone()).collect();
        returned.sort();
        let mut expected = urls.clone();
        expected.sort();
        assert_eq!(returned, expected);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_total() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(page("Any").set_delay(Duration::from_millis(5)))
            .mount(&mock_server)
            .await;

        let urls: Vec<String> = (0..25)
            .map(|i| format!("{}/p{}", mock_server.uri(), i))
            .collect();

        let seen: Arc<StdMutex<Vec<(usize, usize)>>> = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let results = fetcher()
            .with_workers(4)
            .with_progress_callback(Arc::new(move |done: usize, total: usize| {
                seen_clone.lock().unwrap().push((done, total));
            }))
            .fetch_all(urls)
            .await;

        assert_eq!(results.len(), 25);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 25);
        for (i, (done, total)) in seen.iter().enumerate() {
            assert_eq!(*done, i + 1);
            assert_eq!(*total, 25);
        }
        let (done, total) = seen.last().unwrap();
        assert_eq!(*done as f64 / *total as f64, 1.0);
    }

    #[tokio::test]
    async fn test_progress_reaches_total_when_everything_fails() {
        let seen: Arc<StdMutex<Vec<(usize, usize)>>> = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let urls = vec![
            "not a url".to_string(),
            "http://127.0.0.1:9/".to_string(),
            "ftp://".to_string(),
        ];
        let results = fetcher()
            .with_progress_callback(Arc::new(move |done: usize, total: usize| {
                seen_clone.lock().unwrap().push((done, total));
            }))
            .fetch_all(urls)
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|m| m.is_empty()));
        assert_eq!(seen.lock().unwrap().last(), Some(&(3, 3)));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(page("Slow").set_delay(Duration::from_millis(100)))
            .mount(&mock_server)
            .await;

        let urls: Vec<String> = (0..6)
            .map(|i| format!("{}/slow{}", mock_server.uri(), i))
            .collect();

        let start = std::time::Instant::now();
        let results = fetcher().with_workers(2).fetch_all(urls).await;
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 6);
        // Three rounds of two requests each
        assert!(elapsed >= Duration::from_millis(300), "finished too fast: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_duplicate_urls_each_get_a_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/same"))
            .respond_with(page("Same"))
            .mount(&mock_server)
            .await;

        let url = format!("{}/same", mock_server.uri());
        let results = fetcher().fetch_all(vec![url.clone(), url.clone(), url]).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|m| m.title == "Same"));
    }

    #[tokio::test]
    async fn test_repeated_url_keeps_each_outcome_by_index() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(page("Flaky"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let url = format!("{}/flaky", mock_server.uri());
        let mut results = fetcher()
            .with_workers(1)
            .fetch_all_indexed(vec![url.clone(), url.clone()])
            .await;
        results.sort_by_key(|(index, _)| *index);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[0].1.title, "Flaky");
        assert!(results[0].1.error.is_none());
        assert_eq!(results[1].0, 1);
        assert!(results[1].1.is_empty());
        assert!(results[1].1.error.is_some());
        assert!(results.iter().all(|(_, m)| m.url == url));
    }

    #[tokio::test]
    async fn test_cancelled_urls_are_not_fetched() {
        let flag = Arc::new(AtomicBool::new(true));
        let urls: Vec<String> = (0..5).map(|i| format!("http://127.0.0.1:9/{}", i)).collect();

        let results = fetcher().with_cancel_flag(flag).fetch_all(urls).await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|m| m.error.as_deref() == Some("cancelled")));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = fetcher().fetch_all(Vec::new()).await;
        assert!(results.is_empty());
    }
}
