//! Page fetching
//!
//! Builds the concrete request for each page of an endpoint and feeds the
//! responses through a [`Paginator`] until it reports completion.

use super::strategies::{PageSignals, Paginator};
use super::types::{NextPage, PageRequest, ParamTarget};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, RawResponse, Transport};
use crate::parse::Scalar;
use crate::query::{Parameters, Query};
use crate::registry::{EndpointDescriptor, ParamLocation};
use crate::template::{placeholders, substitute, Escape};
use futures::stream::{self, Stream};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

// ============================================================================
// Request building
// ============================================================================

/// Build the request for one page of `endpoint`
///
/// Parameters resolve as: query parameters, then declared defaults. Suffix
/// placeholders take pagination path writes first. Parameters not consumed
/// by the suffix or body template go to the query string (or headers, for
/// header parameters).
pub fn build_request(
    base_url: &str,
    endpoint: &EndpointDescriptor,
    query: &Query,
    page: &PageRequest,
) -> Result<HttpRequest> {
    let params = resolve_parameters(endpoint, query)?;

    let mut url = match &page.url {
        Some(next) => Url::parse(next)?,
        None => {
            let suffix = render_suffix(endpoint, &params, page)?;
            let mut url = Url::parse(&join_url(base_url, &suffix))?;

            let consumed = consumed_parameters(endpoint);
            {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in params.iter() {
                    if consumed.iter().any(|c| c == name) || is_header_param(endpoint, name) {
                        continue;
                    }
                    pairs.append_pair(name, value);
                }
                for (name, value) in query.additional_parameters().iter() {
                    pairs.append_pair(name, value);
                }
            }
            strip_empty_query(&mut url);
            url
        }
    };

    for write in &page.writes {
        if let ParamTarget::Query(name) = &write.target {
            set_query(&mut url, name, &write.value);
        }
    }

    let mut request = HttpRequest::new(endpoint.method, url.to_string());

    for param in endpoint
        .parameters
        .iter()
        .filter(|p| p.location == ParamLocation::Header)
    {
        if let Some(value) = params.get(&param.name) {
            request.set_header(param.name.as_str(), value);
        }
    }

    request.body = render_body(endpoint, &params, page)?;

    for write in &page.writes {
        if let ParamTarget::Header(name) = &write.target {
            request.set_header(name.as_str(), write.value.as_str());
        }
    }

    Ok(request)
}

/// Query parameters merged with declared defaults; fails on missing required ones
fn resolve_parameters(endpoint: &EndpointDescriptor, query: &Query) -> Result<Parameters> {
    let mut params = query.parameters().clone();
    for declared in &endpoint.parameters {
        if params.contains(&declared.name) {
            continue;
        }
        match &declared.default {
            Some(default) => params.set(declared.name.as_str(), default.as_str()),
            None if declared.required => {
                return Err(Error::missing_parameter(&endpoint.name, &declared.name))
            }
            None => {}
        }
    }
    Ok(params)
}

fn render_suffix(
    endpoint: &EndpointDescriptor,
    params: &Parameters,
    page: &PageRequest,
) -> Result<String> {
    let (suffix, missing) = substitute(&endpoint.suffix, Escape::Url, |name| {
        page.value_for(&ParamTarget::Path(name.to_string()))
            .or_else(|| params.get(name))
            .map(str::to_string)
    });
    match missing.first() {
        Some(name) => Err(Error::missing_parameter(&endpoint.name, name)),
        None => Ok(suffix),
    }
}

fn render_body(
    endpoint: &EndpointDescriptor,
    params: &Parameters,
    page: &PageRequest,
) -> Result<Option<String>> {
    let body_writes: Vec<_> = page
        .writes
        .iter()
        .filter_map(|w| match &w.target {
            ParamTarget::Body(field) => Some((field.as_str(), w.value.as_str())),
            _ => None,
        })
        .collect();

    let rendered = match &endpoint.body {
        Some(template) => {
            let (body, missing) = substitute(template, Escape::Raw, |name| {
                params.get(name).map(str::to_string)
            });
            if let Some(name) = missing.first() {
                return Err(Error::missing_parameter(&endpoint.name, name));
            }
            Some(body)
        }
        None => None,
    };

    if body_writes.is_empty() {
        return Ok(rendered);
    }

    let mut document = match &rendered {
        Some(body) => serde_json::from_str::<Value>(body).map_err(|e| {
            Error::config(format!(
                "Endpoint '{}' writes pagination values into a body that is not JSON: {e}",
                endpoint.name
            ))
        })?,
        None => Value::Object(Map::new()),
    };
    for (field, value) in body_writes {
        set_dotted(&mut document, field, Scalar::narrow(value).to_json());
    }
    Ok(Some(document.to_string()))
}

/// Names substituted into the suffix or body, which never reach the query string
fn consumed_parameters(endpoint: &EndpointDescriptor) -> Vec<String> {
    let mut names = placeholders(&endpoint.suffix);
    if let Some(body) = &endpoint.body {
        names.extend(placeholders(body));
    }
    names.extend(
        endpoint
            .parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
            .map(|p| p.name.clone()),
    );
    names
}

fn is_header_param(endpoint: &EndpointDescriptor, name: &str) -> bool {
    endpoint
        .parameter(name)
        .is_some_and(|p| p.location == ParamLocation::Header)
}

fn join_url(base_url: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}

/// Replace every value of `key` with a single `value`
fn set_query(url: &mut Url, key: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
}

fn strip_empty_query(url: &mut Url) {
    if url.query() == Some("") {
        url.set_query(None);
    }
}

fn set_dotted(document: &mut Value, path: &str, value: Value) {
    let mut current = document;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

// ============================================================================
// Page stream
// ============================================================================

/// Fetches the pages of one query, one at a time
#[derive(Debug)]
pub struct PageStream {
    transport: Transport,
    endpoint: EndpointDescriptor,
    query: Query,
    paginator: Paginator,
    pending: Option<PageRequest>,
    cancel: CancelToken,
}

impl PageStream {
    /// Prepare to fetch `query` from `endpoint`
    pub fn new(
        transport: Transport,
        endpoint: &EndpointDescriptor,
        query: &Query,
        cancel: CancelToken,
    ) -> Self {
        let paginator = Paginator::new(endpoint.pagination.clone());
        let pending = Some(paginator.first_request());
        Self {
            transport,
            endpoint: endpoint.clone(),
            query: query.clone(),
            paginator,
            pending,
            cancel,
        }
    }

    /// Fetch the next emitted page, or `None` once pagination is complete
    pub async fn next_page(&mut self) -> Result<Option<RawResponse>> {
        while let Some(page) = self.pending.take() {
            let request = build_request(
                self.transport.base_url(),
                &self.endpoint,
                &self.query,
                &page,
            )?;
            let response = self.transport.send(request, &self.cancel).await?;

            let outcome = {
                let signals = PageSignals::new(&response, self.endpoint.format);
                self.paginator.advance(&signals)
            };
            debug!(
                endpoint = %self.endpoint.name,
                page = self.paginator.state().pages_fetched,
                emit = outcome.emit,
                done = outcome.next.is_done(),
                "Page fetched"
            );

            self.pending = match outcome.next {
                NextPage::Continue(next) => Some(next),
                NextPage::Done => None,
            };
            if outcome.emit {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Requests sent so far
    pub fn pages_fetched(&self) -> u64 {
        self.paginator.state().pages_fetched
    }

    /// Adapt into a `Stream` of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<RawResponse>> + Send {
        stream::try_unfold(self, |mut pages| async move {
            Ok(pages.next_page().await?.map(|page| (page, pages)))
        })
    }
}

/// Fetch every page of a query
pub async fn paginate(
    transport: &Transport,
    endpoint: &EndpointDescriptor,
    query: &Query,
    cancel: &CancelToken,
) -> Result<Vec<RawResponse>> {
    let mut pages = PageStream::new(transport.clone(), endpoint, query, cancel.clone());
    let mut responses = Vec::new();
    while let Some(page) = pages.next_page().await? {
        responses.push(page);
    }
    Ok(responses)
}
