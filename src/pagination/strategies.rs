//! Pagination strategy implementations
//!
//! [`Paginator`] is a pure state machine: given the response to the current
//! request it decides whether the page is emitted and what the next request
//! looks like. Missing or malformed signals end pagination after the current
//! page instead of failing the query.

use super::types::{
    NextPage, PageOutcome, PageRequest, PaginationSpec, PaginationState, ParamTarget, ParamWrite,
    SignalSource,
};
use crate::http::RawResponse;
use crate::parse::{parse_document, query_node, Node, Scalar};
use crate::types::DataFormat;
use std::cell::OnceCell;
use tracing::debug;

// ============================================================================
// Signal reading
// ============================================================================

/// Reads pagination signals from one response, parsing the body at most once
pub struct PageSignals<'a> {
    response: &'a RawResponse,
    format: DataFormat,
    document: OnceCell<Option<Node>>,
}

impl<'a> PageSignals<'a> {
    pub fn new(response: &'a RawResponse, format: DataFormat) -> Self {
        Self {
            response,
            format,
            document: OnceCell::new(),
        }
    }

    fn document(&self) -> Option<&Node> {
        self.document
            .get_or_init(|| match parse_document(&self.response.body, self.format, None) {
                Ok((node, _)) => Some(node),
                Err(e) => {
                    debug!(error = %e, "Response body unreadable for pagination signals");
                    None
                }
            })
            .as_ref()
    }

    /// Read a signal as text; empty and null values count as absent
    pub fn read(&self, source: &SignalSource) -> Option<String> {
        let value = match source {
            SignalSource::Header(name) => self.response.header(name).map(str::to_string),
            SignalSource::Body(path) => {
                let node = query_node(self.document()?, path).ok()??;
                match node {
                    Node::Scalar(scalar) => scalar.as_param(),
                    Node::List(items) => items.first()?.as_scalar()?.as_param(),
                    Node::Composite(_) => None,
                }
            }
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Read a non-negative count
    pub fn read_u64(&self, source: &SignalSource) -> Option<u64> {
        let text = self.read(source)?;
        let text = text.trim();
        text.parse::<u64>().ok().or_else(|| {
            // Counts occasionally arrive as floats ("3.0")
            match Scalar::narrow(text) {
                Scalar::Number(n) => n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64),
                _ => None,
            }
        })
    }

    /// Read a boolean flag
    pub fn read_bool(&self, source: &SignalSource) -> Option<bool> {
        let text = self.read(source)?;
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// URL the response came from
    pub fn url(&self) -> &str {
        &self.response.url
    }
}

/// Parse a `Link` header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r.split_whitespace().any(|r| r == target_rel) {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Paginator
// ============================================================================

/// Drives one endpoint's pagination spec
#[derive(Debug, Clone)]
pub struct Paginator {
    spec: PaginationSpec,
    state: PaginationState,
}

impl Paginator {
    /// Create a paginator for a spec
    pub fn new(spec: PaginationSpec) -> Self {
        Self {
            spec,
            state: PaginationState::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Overrides for the first request
    pub fn first_request(&self) -> PageRequest {
        match &self.spec {
            PaginationSpec::None | PaginationSpec::LinkIteration { .. } => PageRequest::default(),
            PaginationSpec::PageCount {
                page,
                zero_based,
                page_size,
                ..
            } => {
                let mut writes = vec![ParamWrite::new(page, first_page(*zero_based))];
                if let Some(size) = page_size {
                    writes.push(ParamWrite::new(&size.target, size.value));
                }
                PageRequest::with_writes(writes)
            }
            PaginationSpec::Iteration {
                page_size,
                page_size_param,
                ..
            } => PageRequest::with_writes(page_size_write(page_size_param.as_ref(), *page_size)),
            PaginationSpec::TotalCount {
                page,
                zero_based,
                max_results_per_page,
                page_size_param,
                ..
            } => {
                let mut writes = vec![ParamWrite::new(page, first_page(*zero_based))];
                writes.extend(page_size_write(
                    page_size_param.as_ref(),
                    Some(*max_results_per_page),
                ));
                PageRequest::with_writes(writes)
            }
            PaginationSpec::TotalCountAndOffset {
                offset,
                max_results_per_page,
                page_size_param,
                ..
            } => {
                let mut writes = vec![ParamWrite::new(offset, 0)];
                writes.extend(page_size_write(
                    page_size_param.as_ref(),
                    Some(*max_results_per_page),
                ));
                PageRequest::with_writes(writes)
            }
        }
    }

    /// Process the response to the current request
    pub fn advance(&mut self, signals: &PageSignals<'_>) -> PageOutcome {
        self.state.pages_fetched += 1;
        let outcome = match self.spec.clone() {
            PaginationSpec::None => PageOutcome::last(),
            PaginationSpec::PageCount {
                total_pages,
                page,
                zero_based,
                page_size,
            } => {
                let size = page_size.as_ref().map(|s| (&s.target, s.value));
                self.advance_counted(
                    signals,
                    |signals| signals.read_u64(&total_pages),
                    |index| numbered(&page, index, zero_based, size),
                )
            }
            PaginationSpec::TotalCount {
                total,
                page,
                max_results_per_page,
                zero_based,
                page_size_param,
            } => {
                let per_page = max_results_per_page.max(1);
                let size = page_size_param.as_ref().map(|t| (t, per_page));
                self.advance_counted(
                    signals,
                    |signals| signals.read_u64(&total).map(|n| n.div_ceil(per_page)),
                    |index| numbered(&page, index, zero_based, size),
                )
            }
            PaginationSpec::TotalCountAndOffset {
                total,
                offset,
                max_results_per_page,
                page_size_param,
            } => {
                let per_page = max_results_per_page.max(1);
                self.advance_counted(
                    signals,
                    |signals| signals.read_u64(&total).map(|n| n.div_ceil(per_page)),
                    |index| {
                        let mut writes = vec![ParamWrite::new(&offset, index * per_page)];
                        writes.extend(page_size_write(page_size_param.as_ref(), Some(per_page)));
                        writes
                    },
                )
            }
            PaginationSpec::Iteration {
                has_next,
                next,
                target,
                increment_offset,
                page_size,
                page_size_param,
            } => {
                if let Some(flag) = &has_next {
                    if signals.read_bool(flag) != Some(true) {
                        return self.finish(PageOutcome::last());
                    }
                }

                let value = if increment_offset {
                    self.state.offset += page_size.unwrap_or(0);
                    Some(self.state.offset.to_string())
                } else {
                    next.as_ref().and_then(|source| signals.read(source))
                };

                match value {
                    Some(value) if self.state.cursor.as_deref() != Some(value.as_str()) => {
                        self.state.cursor = Some(value.clone());
                        self.state.index += 1;
                        let mut writes = vec![ParamWrite::new(&target, value)];
                        writes.extend(page_size_write(page_size_param.as_ref(), page_size));
                        PageOutcome::more(PageRequest::with_writes(writes))
                    }
                    Some(value) => {
                        debug!(cursor = %value, "Next value repeats the current one, stopping");
                        PageOutcome::last()
                    }
                    None => PageOutcome::last(),
                }
            }
            PaginationSpec::LinkIteration { source, rel } => {
                let link = match (&source, rel.as_deref()) {
                    (SignalSource::Header(name), Some(rel)) => signals
                        .response
                        .header(name)
                        .and_then(|h| parse_link_header(h, rel)),
                    _ => signals.read(&source),
                };

                match link.map(|l| absolutize(signals.url(), &l)) {
                    Some(url) if url != signals.url() => {
                        self.state.index += 1;
                        PageOutcome::more(PageRequest::with_url(url))
                    }
                    Some(_) => {
                        debug!(url = %signals.url(), "Next link repeats the current URL, stopping");
                        PageOutcome::last()
                    }
                    None => PageOutcome::last(),
                }
            }
        };
        self.finish(outcome)
    }

    /// Shared logic for strategies with a known page count
    fn advance_counted<T, W>(
        &mut self,
        signals: &PageSignals<'_>,
        total: T,
        writes: W,
    ) -> PageOutcome
    where
        T: Fn(&PageSignals<'_>) -> Option<u64>,
        W: Fn(u64) -> Vec<ParamWrite>,
    {
        let total_pages = match self.state.total_pages {
            Some(total) => total,
            None => match total(signals) {
                Some(total) => {
                    self.state.total_pages = Some(total);
                    total
                }
                None => {
                    debug!("Page count signal missing, stopping after this page");
                    return PageOutcome::last();
                }
            },
        };

        if total_pages <= self.state.index {
            return PageOutcome::empty();
        }

        self.state.index += 1;
        if self.state.index < total_pages {
            PageOutcome::more(PageRequest::with_writes(writes(self.state.index)))
        } else {
            PageOutcome::last()
        }
    }

    fn finish(&mut self, outcome: PageOutcome) -> PageOutcome {
        if outcome.next.is_done() {
            self.state.mark_done();
        }
        outcome
    }
}

fn first_page(zero_based: bool) -> u64 {
    u64::from(!zero_based)
}

fn numbered(
    page: &ParamTarget,
    index: u64,
    zero_based: bool,
    page_size: Option<(&ParamTarget, u64)>,
) -> Vec<ParamWrite> {
    let mut writes = vec![ParamWrite::new(page, index + first_page(zero_based))];
    if let Some((target, size)) = page_size {
        writes.push(ParamWrite::new(target, size));
    }
    writes
}

fn page_size_write(target: Option<&ParamTarget>, size: Option<u64>) -> Vec<ParamWrite> {
    match (target, size) {
        (Some(target), Some(size)) => vec![ParamWrite::new(target, size)],
        _ => Vec::new(),
    }
}

/// Resolve a possibly relative link against the URL it was found on
fn absolutize(current: &str, link: &str) -> String {
    match url::Url::parse(current).and_then(|base| base.join(link)) {
        Ok(url) => url.to_string(),
        Err(_) => link.to_string(),
    }
}

impl NextPage {
    /// The request a continuation carries
    pub fn request(&self) -> Option<&PageRequest> {
        match self {
            Self::Continue(request) => Some(request),
            Self::Done => None,
        }
    }
}
