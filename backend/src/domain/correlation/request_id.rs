//! Legacy hierarchical request ids.
//!
//! Older peers correlate with ids shaped like `|root.child_grandchild_`:
//! each hop appends a hex counter value and a `_` to the id it received.
//! Ids are capped at [`REQUEST_ID_MAX_LENGTH`] characters; an overflowing id
//! is cut back to a delimiter and closed with a random segment and `#`.

use std::sync::atomic::{AtomicU32, Ordering};

use super::traceparent::TraceId;

/// Maximum length of a hierarchical request id.
pub const REQUEST_ID_MAX_LENGTH: usize = 1024;

/// Room reserved for the overflow segment: eight hex digits and `#`.
const OVERFLOW_SUFFIX_LEN: usize = 9;
const CHILD_DELIMITER: char = '_';

/// Generates child request ids from a process-wide counter.
///
/// One generator is created by the composition root and shared by every
/// request, so ids minted concurrently never collide within a process.
///
/// # Examples
/// ```
/// use backend::domain::correlation::{RequestIdGenerator, root_id};
///
/// let ids = RequestIdGenerator::with_seed(0x0f);
/// assert_eq!(ids.generate_request_id("|abc."), "|abc.f_");
/// assert_eq!(ids.generate_request_id("abc"), "|abc.10_");
/// assert_eq!(root_id("|abc.10_"), "abc");
/// ```
#[derive(Debug)]
pub struct RequestIdGenerator {
    counter: AtomicU32,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdGenerator {
    /// Create a generator seeded with a random counter value.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a generator starting from `seed`.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self {
            counter: AtomicU32::new(seed),
        }
    }

    /// Derive a child id from `parent_id`.
    ///
    /// An empty parent starts a new root. Otherwise the parent is normalised
    /// to start with `|` and end with `.` before the counter suffix is
    /// appended.
    pub fn generate_request_id(&self, parent_id: &str) -> String {
        if parent_id.is_empty() {
            return generate_root_id();
        }
        let mut parent = if parent_id.starts_with('|') {
            parent_id.to_owned()
        } else {
            format!("|{parent_id}")
        };
        if !parent.ends_with('.') {
            parent.push('.');
        }
        let suffix = format!("{:x}", self.counter.fetch_add(1, Ordering::Relaxed));
        append_suffix(&parent, &suffix)
    }
}

/// Start a new hierarchical root `|<traceId>.`.
#[must_use]
pub fn generate_root_id() -> String {
    format!("|{}.", TraceId::random())
}

/// Extract the root of a hierarchical id: the text between an optional
/// leading `|` and the first `.`.
#[must_use]
pub fn root_id(id: &str) -> &str {
    let start = usize::from(id.starts_with('|'));
    let end = id.find('.').unwrap_or(id.len());
    id.get(start..end).unwrap_or_default()
}

fn append_suffix(parent: &str, suffix: &str) -> String {
    if parent.len() + suffix.len() < REQUEST_ID_MAX_LENGTH {
        return format!("{parent}{suffix}{CHILD_DELIMITER}");
    }

    let bytes = parent.as_bytes();
    let mut trim = REQUEST_ID_MAX_LENGTH - OVERFLOW_SUFFIX_LEN;
    if parent.len() > trim {
        while trim > 1 {
            match bytes.get(trim - 1) {
                Some(b'.' | b'_') => break,
                _ => trim -= 1,
            }
        }
    }
    if trim <= 1 {
        return generate_root_id();
    }

    match parent.get(..trim) {
        Some(kept) => format!("{kept}{:08x}#", rand::random::<u32>()),
        None => generate_root_id(),
    }
}
