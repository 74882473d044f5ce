//! Pagination types
//!
//! Declarative pagination specs plus the state the paginator carries from one
//! page to the next.

use serde::{Deserialize, Serialize};

// ============================================================================
// Signals and targets
// ============================================================================

/// Where a pagination signal is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Response header (case-insensitive)
    Header(String),
    /// Path into the response body
    Body(String),
}

/// Where a pagination value is written on the next request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamTarget {
    /// Query-string parameter
    Query(String),
    /// Request header
    Header(String),
    /// `{name}` placeholder in the suffix
    Path(String),
    /// Dotted field of a JSON request body
    Body(String),
}

/// A value to write on the next request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamWrite {
    pub target: ParamTarget,
    pub value: String,
}

impl ParamWrite {
    pub fn new(target: &ParamTarget, value: impl ToString) -> Self {
        Self {
            target: target.clone(),
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Pagination Spec
// ============================================================================

/// Pagination strategy of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationSpec {
    /// A single request
    #[default]
    None,

    /// Server reports the number of pages
    PageCount {
        /// Total page count
        total_pages: SignalSource,
        /// Page number target
        page: ParamTarget,
        /// First page is 0 instead of 1
        #[serde(default)]
        zero_based: bool,
        #[serde(default)]
        page_size: Option<PageSize>,
    },

    /// Server reports whether there is more and what comes next
    Iteration {
        /// Boolean "more pages" flag; without it, iteration continues while a
        /// next value is present
        #[serde(default)]
        has_next: Option<SignalSource>,
        /// Next cursor/offset value
        #[serde(default)]
        next: Option<SignalSource>,
        /// Where the next value is written
        target: ParamTarget,
        /// Compute the next offset locally by adding `page_size`
        #[serde(default)]
        increment_offset: bool,
        #[serde(default)]
        page_size: Option<u64>,
        #[serde(default)]
        page_size_param: Option<ParamTarget>,
    },

    /// Follow a link to the next page
    LinkIteration {
        /// Header or body field holding the link
        source: SignalSource,
        /// RFC 5988 relation to follow in a `Link` header
        #[serde(default)]
        rel: Option<String>,
    },

    /// Server reports the total number of records; pages are numbered
    TotalCount {
        total: SignalSource,
        page: ParamTarget,
        max_results_per_page: u64,
        #[serde(default)]
        zero_based: bool,
        #[serde(default)]
        page_size_param: Option<ParamTarget>,
    },

    /// Server reports the total number of records; pages are offsets
    TotalCountAndOffset {
        total: SignalSource,
        offset: ParamTarget,
        max_results_per_page: u64,
        #[serde(default)]
        page_size_param: Option<ParamTarget>,
    },
}

/// Fixed page size sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub target: ParamTarget,
    pub value: u64,
}

impl PaginationSpec {
    /// Check for the single-request strategy
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Every parameter target this spec writes to
    pub fn targets(&self) -> Vec<&ParamTarget> {
        match self {
            Self::None | Self::LinkIteration { .. } => Vec::new(),
            Self::PageCount {
                page, page_size, ..
            } => std::iter::once(page)
                .chain(page_size.as_ref().map(|p| &p.target))
                .collect(),
            Self::Iteration {
                target,
                page_size_param,
                ..
            } => std::iter::once(target).chain(page_size_param).collect(),
            Self::TotalCount {
                page,
                page_size_param,
                ..
            } => std::iter::once(page).chain(page_size_param).collect(),
            Self::TotalCountAndOffset {
                offset,
                page_size_param,
                ..
            } => std::iter::once(offset).chain(page_size_param).collect(),
        }
    }
}

// ============================================================================
// Paginator results and state
// ============================================================================

/// Overrides for the next request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Values to write into the request
    pub writes: Vec<ParamWrite>,
    /// Replacement URL (link iteration)
    pub url: Option<String>,
}

impl PageRequest {
    /// A request with the given writes
    pub fn with_writes(writes: Vec<ParamWrite>) -> Self {
        Self { writes, url: None }
    }

    /// A request to an explicit URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            writes: Vec::new(),
            url: Some(url.into()),
        }
    }

    /// Value written to `target`, if any
    pub fn value_for(&self, target: &ParamTarget) -> Option<&str> {
        self.writes
            .iter()
            .find(|w| &w.target == target)
            .map(|w| w.value.as_str())
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Another request follows
    Continue(PageRequest),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// What to do with a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Hand the body to the caller
    pub emit: bool,
    pub next: NextPage,
}

impl PageOutcome {
    /// Emit the page and stop
    pub fn last() -> Self {
        Self {
            emit: true,
            next: NextPage::Done,
        }
    }

    /// Emit the page and request another
    pub fn more(request: PageRequest) -> Self {
        Self {
            emit: true,
            next: NextPage::Continue(request),
        }
    }

    /// Drop the page and stop
    pub fn empty() -> Self {
        Self {
            emit: false,
            next: NextPage::Done,
        }
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Zero-based index of the page just fetched
    pub index: u64,
    /// Running offset
    pub offset: u64,
    /// Page count, once known
    pub total_pages: Option<u64>,
    /// Last cursor written
    pub cursor: Option<String>,
    /// Pages fetched so far
    pub pages_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}
