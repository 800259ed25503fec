//! W3C `traceparent` codec.
//!
//! A traceparent header is `version-traceid-spanid-flags`, all lower-case
//! hex. Parsing is lenient at the call site: [`TraceParent::parse_or_generate`]
//! never fails, so every request ends up with a usable trace.

use std::fmt;

const TRACE_ID_HEX_LEN: usize = 32;
const SPAN_ID_HEX_LEN: usize = 16;
const DEFAULT_VERSION: u8 = 0x00;
const INVALID_VERSION: u8 = 0xff;
const SAMPLED_FLAG: u8 = 0x01;

/// 16-byte trace identifier shared by every span of one distributed trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Generate a random, non-zero trace id.
    #[must_use]
    pub fn random() -> Self {
        loop {
            let bytes: [u8; 16] = rand::random();
            if bytes != [0; 16] {
                return Self(bytes);
            }
        }
    }

    /// Decode a trace id from its 32-character hex form.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        if !is_valid_trace_id(value) {
            return None;
        }
        let mut bytes = [0_u8; 16];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 8-byte identifier of one span within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Generate a random, non-zero span id.
    #[must_use]
    pub fn random() -> Self {
        loop {
            let bytes: [u8; 8] = rand::random();
            if bytes != [0; 8] {
                return Self(bytes);
            }
        }
    }

    /// Decode a span id from its 16-character hex form.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        if !is_valid_span_id(value) {
            return None;
        }
        let mut bytes = [0_u8; 8];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Parsed W3C trace context for one hop.
///
/// # Examples
/// ```
/// use backend::domain::correlation::TraceParent;
///
/// let header = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
/// let parsed = TraceParent::parse(header).expect("valid traceparent");
/// assert_eq!(parsed.to_string(), header);
/// assert_eq!(
///     parsed.legacy_request_id(),
///     "|0af7651916cd43dd8448eb211c80319c.b7ad6b7169203331."
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParent {
    version: u8,
    trace_id: TraceId,
    span_id: SpanId,
    flags: u8,
}

impl TraceParent {
    /// Start a new sampled trace.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            version: DEFAULT_VERSION,
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            flags: SAMPLED_FLAG,
        }
    }

    /// Parse a `traceparent` header value.
    ///
    /// When the header carries several comma-joined values only the first is
    /// considered. Version `ff` and all-zero ids are rejected.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let first = header.split(',').next()?.trim();
        let mut parts = first.split('-');
        let version = parse_hex_byte(parts.next()?)?;
        let trace_id = TraceId::from_hex(parts.next()?)?;
        let span_id = SpanId::from_hex(parts.next()?)?;
        let flags = parse_hex_byte(parts.next()?)?;
        if version == INVALID_VERSION {
            return None;
        }
        // Version 00 has exactly four fields; later versions may append more.
        if version == DEFAULT_VERSION && parts.next().is_some() {
            return None;
        }
        Some(Self {
            version,
            trace_id,
            span_id,
            flags,
        })
    }

    /// Parse the header when present and valid, otherwise start a new trace.
    #[must_use]
    pub fn parse_or_generate(header: Option<&str>) -> Self {
        header.and_then(Self::parse).unwrap_or_else(Self::generate)
    }

    /// Continue a legacy hierarchical trace.
    ///
    /// The root id becomes the trace id when it is a valid one, so peers that
    /// only speak the legacy protocol still share a trace with W3C peers.
    #[must_use]
    pub fn from_legacy_root(root_id: &str) -> Self {
        let mut trace = Self::generate();
        if let Some(trace_id) = TraceId::from_hex(root_id) {
            trace.trace_id = trace_id;
        }
        trace
    }

    /// Same trace, fresh span id.
    #[must_use]
    pub fn with_new_span(&self) -> Self {
        Self {
            span_id: SpanId::random(),
            ..*self
        }
    }

    /// Trace identifier.
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Span identifier.
    #[must_use]
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Trace flags byte.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Format version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Render the header value.
    #[must_use]
    pub fn to_header_string(&self) -> String {
        self.to_string()
    }

    /// Back-compat hierarchical id `|traceId.spanId.` for legacy peers.
    #[must_use]
    pub fn legacy_request_id(&self) -> String {
        format!("|{}.{}.", self.trace_id, self.span_id)
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}-{}-{}-{:02x}",
            self.version, self.trace_id, self.span_id, self.flags
        )
    }
}

/// Whether `id` is 32 lower-case hex characters and not all zeros.
#[must_use]
pub fn is_valid_trace_id(id: &str) -> bool {
    is_lower_hex_of_len(id, TRACE_ID_HEX_LEN)
}

/// Whether `id` is 16 lower-case hex characters and not all zeros.
#[must_use]
pub fn is_valid_span_id(id: &str) -> bool {
    is_lower_hex_of_len(id, SPAN_ID_HEX_LEN)
}

fn is_lower_hex_of_len(id: &str, len: usize) -> bool {
    id.len() == len
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        && id.bytes().any(|b| b != b'0')
}

fn parse_hex_byte(field: &str) -> Option<u8> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(field, 16).ok()
}
