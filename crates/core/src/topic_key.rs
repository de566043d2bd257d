//! Mapping between dump URIs and the two lookup keys of a topic.

use std::fmt;

use crate::{MAX_MID_SIZE, MAX_VARCHAR_SIZE};

/// Namespace every Freebase dump IRI lives under.
pub const NAMESPACE: &str = "http://rdf.freebase.com/ns";

const MID_PREFIXES: [&str; 2] = ["/m/", "/g/"];

/// The key a topic is looked up (and lazily created) by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicKey {
    Mid(String),
    TextId(String),
}

impl TopicKey {
    /// Map a dump IRI to its key: strip the namespace, turn `.` back into
    /// `/`, then classify by prefix. Returns `None` for IRIs outside the
    /// namespace, empty paths, and values too long for their column.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let path = uri.strip_prefix(NAMESPACE)?;
        Self::from_path(&path.replace('.', "/"))
    }

    /// Classify an already hierarchical path (`/m/02mjmr`, `/en/foo`).
    pub fn from_path(path: &str) -> Option<Self> {
        if path.len() < 2 || !path.starts_with('/') {
            return None;
        }
        if MID_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            if path.chars().count() > MAX_MID_SIZE {
                return None;
            }
            Some(Self::Mid(path.to_string()))
        } else {
            if path.chars().count() >= MAX_VARCHAR_SIZE {
                return None;
            }
            Some(Self::TextId(path.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mid(mid) => mid,
            Self::TextId(textid) => textid,
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mid(mid) => write!(f, "mid {mid}"),
            Self::TextId(textid) => write!(f, "textid {textid}"),
        }
    }
}
