//! Wire types for the incremental patch stream.
//!
//! Paths arrive either as JSON Pointer strings (`"/logs/FindDocs/final_output"`)
//! or as arrays of keys and indices (`["logs", "FindDocs", 0]`). Both decode to
//! the same [`JsonPath`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// The `-` token: one past the end of an array.
    Append,
}

impl PathSegment {
    fn from_token(token: &str) -> Self {
        if token == "-" {
            return PathSegment::Append;
        }
        match parse_index(token) {
            Some(i) => PathSegment::Index(i),
            None => PathSegment::Key(token.to_string()),
        }
    }

    /// Whether a container created for this segment should be an array.
    pub fn addresses_array(&self) -> bool {
        matches!(self, PathSegment::Index(_) | PathSegment::Append)
    }

    /// The array position this segment names, if any. Keys must follow the
    /// same strict index form as pointer tokens, so `01` and `+1` are not
    /// positions.
    pub fn array_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(k) => parse_index(k),
            PathSegment::Append => None,
        }
    }
}

/// Array index per RFC 6901: `0` or digits without a leading zero.
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k.replace('~', "~0").replace('/', "~1")),
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Append => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPath", into = "String")]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn parse_pointer(pointer: &str) -> Result<Self> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(Error::MalformedPatch {
                op: "parse".to_string(),
                path: pointer.to_string(),
                reason: "pointer must be empty or start with '/'".to_string(),
            });
        };
        let segments = rest
            .split('/')
            .map(|token| PathSegment::from_token(&token.replace("~1", "/").replace("~0", "~")))
            .collect();
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent path segments and the final segment, or `None` for the root.
    pub fn split_last(&self) -> Option<(&[PathSegment], &PathSegment)> {
        self.0.split_last().map(|(last, parent)| (parent, last))
    }
}

impl From<Vec<PathSegment>> for JsonPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl From<JsonPath> for String {
    fn from(path: JsonPath) -> Self {
        path.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSegment {
    Index(usize),
    Key(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Pointer(String),
    Segments(Vec<RawSegment>),
}

impl TryFrom<RawPath> for JsonPath {
    type Error = Error;

    fn try_from(raw: RawPath) -> Result<Self> {
        match raw {
            RawPath::Pointer(p) => Self::parse_pointer(&p),
            RawPath::Segments(segs) => Ok(Self(
                segs.into_iter()
                    .map(|s| match s {
                        RawSegment::Index(i) => PathSegment::Index(i),
                        RawSegment::Key(k) => PathSegment::Key(k),
                    })
                    .collect(),
            )),
        }
    }
}

/// One incremental instruction against the streamed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add {
        path: JsonPath,
        #[serde(default)]
        value: Value,
    },
    Replace {
        path: JsonPath,
        #[serde(default)]
        value: Value,
    },
    Remove { path: JsonPath },
}

impl PatchOp {
    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::Add { .. } => "add",
            PatchOp::Replace { .. } => "replace",
            PatchOp::Remove { .. } => "remove",
        }
    }

    pub fn path(&self) -> &JsonPath {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Replace { path, .. } | PatchOp::Remove { path } => path,
        }
    }
}

/// One element of the transport stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchChunk {
    pub ops: Vec<PatchOp>,
}

impl PatchChunk {
    pub fn from_json_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
