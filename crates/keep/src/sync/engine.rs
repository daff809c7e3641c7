//! Paginated fetch of the notes changes feed

use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::models::SessionToken;
use crate::remote::api::{
    CLIENT_PLATFORM, Capability, ChangesRequest, ChangesResponse, ClientVersion, RawNode,
    RequestHeader,
};
use crate::remote::{HttpRequest, HttpTransport};
use crate::util::{excerpt, random_u64};

/// Cursor value meaning "from the beginning"
pub const INITIAL_CURSOR: &str = "0";

/// Default upper bound on pages fetched in one run
pub const DEFAULT_MAX_PAGES: usize = 200;

const USER_AGENT: &str = concat!("keepsync/", env!("CARGO_PKG_VERSION"));

/// Why a sync run produced no batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Could not reach the notes service: {0}")]
    Transport(String),

    #[error("Notes service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Could not parse notes response: {message} (body: {excerpt})")]
    Parse { message: String, excerpt: String },

    #[error("Notes feed did not end after {pages} pages")]
    PaginationOverrun { pages: usize },
}

impl SyncError {
    /// Whether the service refused the session token
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401 | 403, .. })
    }
}

/// Every raw record from one complete pass over the feed
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    /// Records in the order the service returned them, across pages
    pub nodes: Vec<RawNode>,
    /// Last cursor the service handed out
    pub cursor: String,
    /// Number of pages fetched
    pub pages: usize,
}

/// What a page says about the rest of the feed
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageOutcome {
    /// Fetch again from this cursor
    More(String),
    /// Feed exhausted; carries the final cursor if one was given
    Last(Option<String>),
}

/// `toVersion` takes precedence over `nextPageToken` when both are present.
fn page_outcome(page: &ChangesResponse) -> PageOutcome {
    if let Some(version) = &page.to_version {
        return if page.truncated == Some(true) {
            PageOutcome::More(version.clone())
        } else {
            PageOutcome::Last(Some(version.clone()))
        };
    }
    match &page.next_page_token {
        Some(token) => PageOutcome::More(token.clone()),
        None => PageOutcome::Last(None),
    }
}

/// Drives the cursor loop against the changes endpoint
pub struct SyncEngine {
    transport: Arc<dyn HttpTransport>,
    notes_url: String,
    max_pages: usize,
}

impl SyncEngine {
    /// Production notes changes endpoint
    pub const DEFAULT_URL: &'static str = "https://www.googleapis.com/notes/v1/changes";

    pub fn new(transport: Arc<dyn HttpTransport>, notes_url: impl Into<String>) -> Self {
        Self {
            transport,
            notes_url: notes_url.into(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the page cap
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch the whole feed.
    ///
    /// Any failure discards what was accumulated so far; a partial batch is
    /// never returned.
    pub fn run(&self, token: &SessionToken) -> Result<SyncBatch, SyncError> {
        let mut nodes: Vec<RawNode> = Vec::new();
        let mut cursor = INITIAL_CURSOR.to_string();
        let mut pages = 0;

        loop {
            if pages >= self.max_pages {
                warn!("Notes feed still truncated after {} pages", pages);
                return Err(SyncError::PaginationOverrun { pages });
            }

            let page = self.fetch_page(token, &cursor)?;
            pages += 1;

            let outcome = page_outcome(&page);
            let page_nodes = decode_nodes(page.nodes.unwrap_or_default());
            debug!(
                "Page {} from cursor {}: {} nodes, {:?}",
                pages,
                cursor,
                page_nodes.len(),
                outcome
            );
            nodes.extend(page_nodes);

            match outcome {
                PageOutcome::More(next) => cursor = next,
                PageOutcome::Last(last) => {
                    if let Some(last) = last {
                        cursor = last;
                    }
                    break;
                }
            }
        }

        info!("Fetched {} nodes in {} page(s)", nodes.len(), pages);
        Ok(SyncBatch {
            nodes,
            cursor,
            pages,
        })
    }

    /// Fetch one page starting at `cursor`
    pub fn fetch_page(
        &self,
        token: &SessionToken,
        cursor: &str,
    ) -> Result<ChangesResponse, SyncError> {
        let body = serde_json::to_string(&changes_request(cursor)).map_err(|e| SyncError::Parse {
            message: format!("Failed to encode request: {}", e),
            excerpt: String::new(),
        })?;

        let request = HttpRequest::post(&self.notes_url, body)
            .header("Authorization", format!("OAuth {}", token.value))
            .header("Content-Type", "application/json")
            .header("Accept", "*/*")
            .header("User-Agent", USER_AGENT);

        let response = self
            .transport
            .post(request)
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !response.is_success() {
            warn!("Notes request failed with HTTP {}", response.status);
            return Err(SyncError::HttpStatus {
                status: response.status,
                body: excerpt(&response.body, 500),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| {
            warn!("Unparseable notes response: {}", excerpt(&response.body, 200));
            SyncError::Parse {
                message: e.to_string(),
                excerpt: excerpt(&response.body, 200),
            }
        })
    }
}

/// Typed nodes from a page; records that do not decode are skipped
fn decode_nodes(values: Vec<serde_json::Value>) -> Vec<RawNode> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawNode>(value.clone()) {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("Skipping unreadable node ({}): {}", e, excerpt(&value.to_string(), 200));
                None
            }
        })
        .collect()
}

/// Request body for one page; a fresh session id every time
fn changes_request(cursor: &str) -> ChangesRequest {
    let now = Utc::now();
    ChangesRequest {
        nodes: Vec::new(),
        client_timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        request_header: RequestHeader {
            client_session_id: format!("s--{}--{}", now.timestamp_millis(), random_u64() as u32),
            client_platform: CLIENT_PLATFORM.to_string(),
            client_version: ClientVersion::default(),
            capabilities: Capability::all(),
        },
        target_version: (cursor != INITIAL_CURSOR).then(|| cursor.to_string()),
    }
}
