//! Pagination module
//!
//! Supports: Page Count, Iteration (cursor / offset), Link Iteration,
//! Total Count, Total Count + Offset
//!
//! # Overview
//!
//! Endpoints declare a [`PaginationSpec`]. A [`Paginator`] reads the signals
//! of each response (headers or body fields) and decides what the next
//! request writes and where: query string, header, suffix placeholder or
//! request body. [`PageStream`] drives the loop against a [`Transport`].
//!
//! [`Transport`]: crate::http::Transport

mod controller;
mod strategies;
mod types;

pub use controller::{build_request, paginate, PageStream};
pub use strategies::{parse_link_header, PageSignals, Paginator};
pub use types::{
    NextPage, PageOutcome, PageRequest, PageSize, PaginationSpec, PaginationState, ParamTarget,
    ParamWrite, SignalSource,
};
