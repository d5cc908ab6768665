//! Relay-style cursor pagination.
//!
//! Every connection in the order API (`ordersByAccountId`,
//! `OrderFulfillmentGroup.items`, `OrderItem.productTags`) is paginated by
//! [`paginate`], so they share one set of rules:
//!
//! 1. Nodes are sorted by the requested key, ties broken by `_id`, and the
//!    whole ordering is reversed for [`SortOrder::Desc`].
//! 2. `totalCount` counts every node before cursors are applied.
//! 3. `after`/`before` exclude the cursor node itself.
//! 4. `offset` skips nodes at the front of the remaining window.
//! 5. `first` keeps the leading N nodes, then `last` keeps the trailing N.
//!    Without either, at most [`DEFAULT_PAGE_SIZE`] nodes are returned.
//!
//! Cursors are the base64 encoding of the node `_id` and are opaque to clients.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when neither `first` nor `last` is given.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest accepted value for `first` / `last`.
pub const MAX_PAGE_SIZE: usize = 50;

/// Errors raised for malformed pagination arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// Cursor could not be decoded or points at no node in the result set.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// `first` or `last` outside `1..=MAX_PAGE_SIZE`.
    #[error("{field} must be between 1 and {MAX_PAGE_SIZE} (got {value})")]
    InvalidLimit {
        /// Argument name.
        field: &'static str,
        /// Rejected value.
        value: i32,
    },
    /// `offset` below zero.
    #[error("offset must not be negative (got {0})")]
    NegativeOffset(i32),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Pagination arguments as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub after: Option<String>,
    pub before: Option<String>,
    pub first: Option<i32>,
    pub last: Option<i32>,
    pub offset: Option<i32>,
}

/// Position of the returned page within the full ordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// A node with its cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

/// One page of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

impl<T> Page<T> {
    /// Transform every node while keeping cursors and page info.
    #[must_use]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }

    /// Iterate over the nodes in page order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Encode a node ID as an opaque cursor.
#[must_use]
pub fn encode_cursor(id: &str) -> String {
    STANDARD.encode(id.as_bytes())
}

/// Decode an opaque cursor back into a node ID.
///
/// # Errors
///
/// Returns [`PaginationError::InvalidCursor`] if the cursor is not valid
/// base64-encoded UTF-8.
pub fn decode_cursor(cursor: &str) -> Result<String, PaginationError> {
    let bytes = STANDARD
        .decode(cursor)
        .map_err(|_| PaginationError::InvalidCursor(cursor.to_owned()))?;
    String::from_utf8(bytes).map_err(|_| PaginationError::InvalidCursor(cursor.to_owned()))
}

fn validate_limit(field: &'static str, value: Option<i32>) -> Result<Option<usize>, PaginationError> {
    value
        .map(|v| match usize::try_from(v) {
            Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
            _ => Err(PaginationError::InvalidLimit { field, value: v }),
        })
        .transpose()
}

/// Sort `items` and cut out the page described by `request`.
///
/// `sort_key` extracts the field selected by the client's `sortBy`; `id_of`
/// extracts the node `_id`, used both as tie-breaker and as cursor.
///
/// # Errors
///
/// Returns a [`PaginationError`] for out-of-range limits, a negative offset,
/// or a cursor that does not identify a node in `items`.
pub fn paginate<T, K>(
    mut items: Vec<T>,
    sort_key: impl Fn(&T) -> K,
    id_of: impl Fn(&T) -> &str,
    order: SortOrder,
    request: &PageRequest,
) -> Result<Page<T>, PaginationError>
where
    K: Ord,
{
    let first = validate_limit("first", request.first)?;
    let last = validate_limit("last", request.last)?;
    let offset = match request.offset {
        Some(v) => usize::try_from(v).map_err(|_| PaginationError::NegativeOffset(v))?,
        None => 0,
    };

    items.sort_by(|a, b| {
        let ordering = sort_key(a)
            .cmp(&sort_key(b))
            .then_with(|| id_of(a).cmp(id_of(b)));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let total_count = items.len();
    let position_of = |cursor: &str| -> Result<usize, PaginationError> {
        let id = decode_cursor(cursor)?;
        items
            .iter()
            .position(|item| id_of(item) == id)
            .ok_or_else(|| PaginationError::InvalidCursor(cursor.to_owned()))
    };

    let mut start = 0;
    let mut end = total_count;
    if let Some(after) = &request.after {
        start = position_of(after)? + 1;
    }
    if let Some(before) = &request.before {
        end = end.min(position_of(before)?);
    }
    start = start.min(end);
    start = (start + offset).min(end);

    match (first, last) {
        (None, None) => end = end.min(start + DEFAULT_PAGE_SIZE),
        (first, last) => {
            if let Some(n) = first {
                end = end.min(start + n);
            }
            if let Some(n) = last {
                start = start.max(end.saturating_sub(n));
            }
        }
    }

    let edges: Vec<Edge<T>> = items
        .into_iter()
        .skip(start)
        .take(end - start)
        .map(|node| Edge {
            cursor: encode_cursor(id_of(&node)),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: end < total_count,
        has_previous_page: start > 0,
        start_cursor: edges.first().map(|edge| edge.cursor.clone()),
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
    };

    Ok(Page {
        edges,
        page_info,
        total_count,
    })
}
