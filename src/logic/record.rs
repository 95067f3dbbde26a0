//! Route Record Decoder
//!
//! Turns one raw routing update into a normalized `RouteRecord`.
//!
//! Raw updates arrive in the pipe-delimited form emitted by MRT dump tools:
//! `TYPE|unix_ts|FLAG|peer_ip|peer_as|prefix|as_path[|...]`.
//! Byte-level MRT decoding happens upstream of this module.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Autonomous System number (4-byte)
pub type Asn = u32;

// ============================================================================
// ERRORS
// ============================================================================

/// One malformed update. Recovered locally by skipping and counting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("unknown update flag '{0}'")]
    UnknownFlag(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid prefix '{0}'")]
    InvalidPrefix(String),

    #[error("invalid AS number '{0}'")]
    InvalidAsn(String),

    #[error("empty AS path")]
    EmptyPath,
}

impl DecodeError {
    /// Stable key used when counting skipped records by reason
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::MissingField(_) => "missing_field",
            DecodeError::UnknownFlag(_) => "unknown_flag",
            DecodeError::InvalidTimestamp(_) => "invalid_timestamp",
            DecodeError::InvalidPrefix(_) => "invalid_prefix",
            DecodeError::InvalidAsn(_) => "invalid_asn",
            DecodeError::EmptyPath => "empty_path",
        }
    }
}

// ============================================================================
// RAW UPDATE
// ============================================================================

/// Update as produced by the external dump decoder, fields still textual
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUpdate {
    pub kind: String,
    pub timestamp: String,
    pub flag: String,
    pub peer_ip: String,
    pub peer_as: String,
    pub prefix: String,
    pub as_path: String,
}

impl RawUpdate {
    /// Split one dump line into its fields. Trailing attributes are ignored.
    pub fn parse_line(line: &str) -> Result<Self, DecodeError> {
        let mut fields = line.trim_end_matches(&['\r', '\n'][..]).split('|');

        let mut next = |name: &'static str| -> Result<String, DecodeError> {
            fields
                .next()
                .map(|f| f.trim().to_string())
                .ok_or(DecodeError::MissingField(name))
        };

        let kind = next("type")?;
        let timestamp = next("timestamp")?;
        let flag = next("flag")?;
        let peer_ip = next("peer_ip")?;
        let peer_as = next("peer_as")?;
        let prefix = next("prefix")?;
        // Withdrawals carry no path in dump output
        let as_path = next("as_path").unwrap_or_default();

        Ok(Self {
            kind,
            timestamp,
            flag,
            peer_ip,
            peer_as,
            prefix,
            as_path,
        })
    }
}

// ============================================================================
// ROUTE RECORD
// ============================================================================

/// One position in an AS path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathHop {
    /// Ordinary AS_SEQUENCE member
    As(Asn),
    /// Aggregated segment (AS_SET or confederation). Members are unordered.
    Set(Vec<Asn>),
}

impl PathHop {
    pub fn asn(&self) -> Option<Asn> {
        match self {
            PathHop::As(asn) => Some(*asn),
            PathHop::Set(_) => None,
        }
    }

    pub fn members(&self) -> &[Asn] {
        match self {
            PathHop::As(asn) => std::slice::from_ref(asn),
            PathHop::Set(members) => members,
        }
    }
}

/// Normalized routing update. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    origin_as: Asn,
    as_path: Vec<PathHop>,
    prefix: String,
    withdrawn: bool,
    timestamp: DateTime<Utc>,
}

impl RouteRecord {
    pub fn new(
        as_path: Vec<PathHop>,
        prefix: &str,
        withdrawn: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DecodeError> {
        let origin_as = as_path
            .iter()
            .rev()
            .find_map(PathHop::asn)
            .ok_or(DecodeError::EmptyPath)?;

        Ok(Self {
            origin_as,
            as_path,
            prefix: normalize_prefix(prefix)?,
            withdrawn,
            timestamp,
        })
    }

    /// Decode a raw update
    pub fn decode(raw: &RawUpdate) -> Result<Self, DecodeError> {
        let withdrawn = match raw.flag.as_str() {
            "B" | "A" => false,
            "W" => true,
            other => return Err(DecodeError::UnknownFlag(other.to_string())),
        };

        let secs: i64 = raw
            .timestamp
            .parse()
            .map_err(|_| DecodeError::InvalidTimestamp(raw.timestamp.clone()))?;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| DecodeError::InvalidTimestamp(raw.timestamp.clone()))?;

        let as_path = parse_as_path(&raw.as_path)?;

        Self::new(as_path, &raw.prefix, withdrawn, timestamp)
    }

    /// Decode a dump line in one step
    pub fn from_line(line: &str) -> Result<Self, DecodeError> {
        Self::decode(&RawUpdate::parse_line(line)?)
    }

    /// Last concrete AS in the path
    pub fn origin_as(&self) -> Asn {
        self.origin_as
    }

    pub fn as_path(&self) -> &[PathHop] {
        &self.as_path
    }

    /// Hop count, prepends and aggregated segments included
    pub fn path_len(&self) -> usize {
        self.as_path.len()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn withdrawn(&self) -> bool {
        self.withdrawn
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self
            .as_path
            .iter()
            .map(|hop| match hop {
                PathHop::As(asn) => asn.to_string(),
                PathHop::Set(members) => {
                    let inner: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                    format!("{{{}}}", inner.join(","))
                }
            })
            .collect();
        let flag = if self.withdrawn { "W" } else { "A" };
        write!(f, "{} {} [{}]", flag, self.prefix, path.join(" "))
    }
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

/// Parse a plain (`65001`) or asdot (`1.10`) AS number
pub fn parse_asn(token: &str) -> Result<Asn, DecodeError> {
    let invalid = || DecodeError::InvalidAsn(token.to_string());

    match token.split_once('.') {
        Some((high, low)) => {
            let high: u16 = high.parse().map_err(|_| invalid())?;
            let low: u16 = low.parse().map_err(|_| invalid())?;
            Ok(((high as u32) << 16) | low as u32)
        }
        None => token.parse().map_err(|_| invalid()),
    }
}

/// Parse a textual AS path into hops.
///
/// `{a,b}` is an AS_SET, `(a b)` a confederation sequence and `[a,b]` a
/// confederation set. All three collapse to a single aggregated hop.
pub fn parse_as_path(text: &str) -> Result<Vec<PathHop>, DecodeError> {
    let mut hops = Vec::new();
    let mut tokens = text.split_whitespace();

    while let Some(token) = tokens.next() {
        let close = match token.chars().next() {
            Some('{') => Some('}'),
            Some('(') => Some(')'),
            Some('[') => Some(']'),
            _ => None,
        };

        let Some(close) = close else {
            hops.push(PathHop::As(parse_asn(token)?));
            continue;
        };

        // Confederation sequences span several whitespace tokens
        let mut segment = token[1..].to_string();
        while !segment.ends_with(close) {
            match tokens.next() {
                Some(more) => {
                    segment.push(',');
                    segment.push_str(more);
                }
                None => return Err(DecodeError::InvalidAsn(token.to_string())),
            }
        }
        segment.pop();

        let members = segment
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|m| !m.is_empty())
            .map(parse_asn)
            .collect::<Result<Vec<_>, _>>()?;

        // An empty segment would silently shorten the path
        if members.is_empty() {
            return Err(DecodeError::InvalidAsn(format!("{}{}", &token[..1], close)));
        }
        hops.push(PathHop::Set(members));
    }

    Ok(hops)
}

/// Validate `address/length` and return it in canonical textual form
fn normalize_prefix(prefix: &str) -> Result<String, DecodeError> {
    let invalid = || DecodeError::InvalidPrefix(prefix.to_string());

    let (addr, len) = prefix.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let len: u8 = len.parse().map_err(|_| invalid())?;

    let max_len = if addr.is_ipv4() { 32 } else { 128 };
    if len > max_len {
        return Err(invalid());
    }

    Ok(format!("{}/{}", addr, len))
}

/// True for IPv4 prefixes in canonical form
pub fn is_ipv4_prefix(prefix: &str) -> bool {
    prefix
        .split_once('/')
        .and_then(|(addr, _)| addr.parse::<IpAddr>().ok())
        .map(|addr| addr.is_ipv4())
        .unwrap_or(false)
}

// ============================================================================
// TESTS
// ============================================================================
