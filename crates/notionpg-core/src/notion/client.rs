//! Paginated Notion client: throttled page requests with bounded
//! exponential backoff.
//!
//! Pagination is strictly sequential; each request depends on the cursor
//! returned by the previous response. A failed run restarts from page one —
//! no cursor survives across runs. Transport failures, undecodable bodies,
//! and API error objects all share one retry counter per page request.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::context::RunContext;
use crate::error::{ImportError, Result};
use crate::notion::wire::{Database, DatabaseResponse, Page, QueryRequest, QueryResponse};

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2021-08-16";

/// Raw HTTP seam; lets the retry loop run against a scripted double.
#[async_trait]
pub trait NotionTransport: Send + Sync {
    /// Fetch database metadata, returning the raw response body.
    async fn get_database(&self, token: &str, database_id: &str) -> Result<String>;

    /// Issue one page query, returning the raw response body.
    async fn query(
        &self,
        token: &str,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<String>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotionTransport for HttpTransport {
    async fn get_database(&self, token: &str, database_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{API_BASE}/databases/{database_id}"))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        Ok(response.text().await?)
    }

    async fn query(
        &self,
        token: &str,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{API_BASE}/databases/{database_id}/query"))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .json(request)
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Client over any transport.
pub struct NotionClient<T> {
    transport: T,
}

impl<T: NotionTransport> NotionClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fetch the database's property descriptors. Single attempt; only the
    /// page query loop retries.
    pub async fn get_database(&self, ctx: &RunContext, database_id: &str) -> Result<Database> {
        let t0 = Instant::now();
        let body = self.transport.get_database(&ctx.token, database_id).await?;
        let response: DatabaseResponse =
            serde_json::from_str(&body).map_err(|e| ImportError::Malformed {
                message: e.to_string(),
            })?;
        match response {
            DatabaseResponse::Database(db) => {
                tracing::info!(
                    database_id,
                    elapsed_secs = t0.elapsed().as_secs_f64(),
                    "fetched Notion database"
                );
                Ok(db)
            }
            DatabaseResponse::Error { status, message } => {
                Err(ImportError::Api { status, message })
            }
        }
    }

    /// Pull-based page sequence for one database.
    pub fn pages<'a>(&'a self, ctx: &'a RunContext, database_id: &'a str) -> PageFetcher<'a, T> {
        PageFetcher {
            transport: &self.transport,
            ctx,
            database_id,
            request: QueryRequest::new(ctx.page_size),
            done: false,
        }
    }

    /// Drain the page sequence into memory.
    pub async fn fetch_all_pages(
        &self,
        ctx: &RunContext,
        database_id: &str,
    ) -> Result<Vec<Page>> {
        let mut fetcher = self.pages(ctx, database_id);
        let mut pages = Vec::new();
        while let Some(batch) = fetcher.next_page().await? {
            pages.extend(batch);
        }
        tracing::info!(total = pages.len(), "fetched all Notion pages");
        Ok(pages)
    }
}

/// Finite, non-restartable page sequence. Backoff state lives inside each
/// `next_page` call; the continuation cursor lives in the fetcher.
pub struct PageFetcher<'a, T> {
    transport: &'a T,
    ctx: &'a RunContext,
    database_id: &'a str,
    request: QueryRequest,
    done: bool,
}

impl<T: NotionTransport> PageFetcher<'_, T> {
    /// Fetch the next page, or `None` once the upstream reports no more.
    ///
    /// The throttle delay is awaited before every request, retries
    /// included; the delay multiplies by the backoff factor after each
    /// failed attempt. Exhausting the attempt budget aborts with the last
    /// error.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Page>>> {
        if self.done {
            return Ok(None);
        }

        let t0 = Instant::now();
        let mut delay = self.ctx.throttle;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tokio::time::sleep(delay).await;
            match self.attempt_once().await {
                Ok((results, has_more, next_cursor)) => {
                    self.done = !has_more;
                    self.request.start_cursor = next_cursor;
                    tracing::info!(
                        pages = results.len(),
                        elapsed_secs = t0.elapsed().as_secs_f64(),
                        "fetched Notion pages"
                    );
                    return Ok(Some(results));
                }
                Err(e) if e.is_retryable() && attempt < self.ctx.retries => {
                    tracing::warn!(attempt, error = %e, "failed to fetch the next pages, retrying");
                    delay *= self.ctx.backoff;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_once(&self) -> Result<(Vec<Page>, bool, Option<String>)> {
        let body = self
            .transport
            .query(&self.ctx.token, self.database_id, &self.request)
            .await?;
        let response: QueryResponse =
            serde_json::from_str(&body).map_err(|e| ImportError::Malformed {
                message: e.to_string(),
            })?;
        match response {
            QueryResponse::List {
                results,
                has_more,
                next_cursor,
            } => Ok((results, has_more, next_cursor)),
            QueryResponse::Error { status, message } => {
                Err(ImportError::Api { status, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport double that replays a script of responses and records the
    /// cursor carried by each request.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<String>>>,
        cursors_seen: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                cursors_seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.cursors_seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotionTransport for ScriptedTransport {
        async fn get_database(&self, _token: &str, _database_id: &str) -> Result<String> {
            self.cursors_seen.lock().unwrap().push(None);
            self.script.lock().unwrap().pop_front().expect("script ran dry")
        }

        async fn query(
            &self,
            _token: &str,
            _database_id: &str,
            request: &QueryRequest,
        ) -> Result<String> {
            self.cursors_seen
                .lock()
                .unwrap()
                .push(request.start_cursor.clone());
            self.script.lock().unwrap().pop_front().expect("script ran dry")
        }
    }

    fn ctx() -> RunContext {
        RunContext::new("test-token")
    }

    fn page_body(ids: &[&str], next_cursor: Option<&str>) -> String {
        let results: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"id": id, "properties": {}}))
            .collect();
        serde_json::json!({
            "object": "list",
            "results": results,
            "has_more": next_cursor.is_some(),
            "next_cursor": next_cursor,
        })
        .to_string()
    }

    fn transport_err() -> ImportError {
        ImportError::Transport {
            message: "connection reset".into(),
        }
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_single_page_throttled_before_request() {
        let transport =
            ScriptedTransport::new(vec![Ok(page_body(&["p1", "p2"], None))]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let t0 = Instant::now();
        let pages = client.fetch_all_pages(&ctx, "db").await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, "p1");
        // Throttle applies even when the first attempt succeeds.
        assert!(t0.elapsed() >= Duration::from_secs(1));
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_threaded_between_pages() {
        let transport = ScriptedTransport::new(vec![
            Ok(page_body(&["p1"], Some("cur-2"))),
            Ok(page_body(&["p2", "p3"], None)),
        ]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let pages = client.fetch_all_pages(&ctx, "db").await.unwrap();
        let ids: Vec<_> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);

        let cursors = client.transport.cursors_seen.lock().unwrap().clone();
        assert_eq!(cursors, vec![None, Some("cur-2".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetcher_is_finite() {
        let transport = ScriptedTransport::new(vec![Ok(page_body(&["p1"], None))]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let mut fetcher = client.pages(&ctx, "db");
        assert!(fetcher.next_page().await.unwrap().is_some());
        assert!(fetcher.next_page().await.unwrap().is_none());
        assert!(fetcher.next_page().await.unwrap().is_none());
        assert_eq!(client.transport.calls(), 1);
    }

    // -----------------------------------------------------------------------
    // Retry and backoff
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_retry_with_exponential_backoff() {
        let transport = ScriptedTransport::new(vec![
            Err(transport_err()),
            Err(transport_err()),
            Ok(page_body(&["p1"], None)),
        ]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let t0 = Instant::now();
        let pages = client.fetch_all_pages(&ctx, "db").await.unwrap();
        // Exactly the successful page's records: no duplication, no loss.
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, "p1");
        assert_eq!(client.transport.calls(), 3);
        // Sleeps: 1s before attempt 1, 2s before attempt 2 (and 4s before
        // attempt 3); cumulative wait is at least base + base*factor.
        assert!(t0.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_retries() {
        let transport = ScriptedTransport::new(vec![
            Ok("not json at all".to_string()),
            Ok(page_body(&["p1"], None)),
        ]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let pages = client.fetch_all_pages(&ctx, "db").await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(client.transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_error_object_shares_retry_counter() {
        let error_body = serde_json::json!({
            "object": "error", "status": 502, "message": "bad gateway",
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![
            Ok(error_body),
            Err(transport_err()),
            Ok(page_body(&["p1"], None)),
        ]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let pages = client.fetch_all_pages(&ctx, "db").await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_aborts_with_last_error() {
        let mut ctx = ctx();
        ctx.retries = 3;
        let transport = ScriptedTransport::new(vec![
            Err(transport_err()),
            Err(transport_err()),
            Err(ImportError::Api {
                status: 503,
                message: "still down".into(),
            }),
        ]);
        let client = NotionClient::new(transport);

        let err = client.fetch_all_pages(&ctx, "db").await.unwrap_err();
        match err {
            ImportError::Api { status, .. } => assert_eq!(status, 503),
            other => panic!("expected the last error, got {other}"),
        }
        assert_eq!(client.transport.calls(), 3);
    }

    // -----------------------------------------------------------------------
    // Database metadata
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_get_database_error_object_is_fatal() {
        let error_body = serde_json::json!({
            "object": "error", "status": 404, "message": "not found",
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![Ok(error_body)]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let err = client.get_database(&ctx, "db").await.unwrap_err();
        assert!(matches!(err, ImportError::Api { status: 404, .. }));
        // No retry for metadata fetches.
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_database_parses_descriptors() {
        let body = serde_json::json!({
            "object": "database",
            "id": "db-1",
            "properties": {
                "Name": {"id": "t", "name": "Name", "type": "title", "title": {}},
                "Score": {"id": "n", "name": "Score", "type": "number", "number": {}},
            },
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![Ok(body)]);
        let ctx = ctx();
        let client = NotionClient::new(transport);

        let db = client.get_database(&ctx, "db-1").await.unwrap();
        assert_eq!(db.id, "db-1");
        assert_eq!(db.properties.len(), 2);
    }
}
