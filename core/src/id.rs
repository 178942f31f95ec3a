//! Instance identifiers.
//!
//! Every element instance is named after its tag plus a per-tag counter, the
//! same way the browser reports `tagName`: `X-COUNTER__0`, `X-COUNTER__1`, ...
//! Identifiers are embedded verbatim in dispatch markup, so they never contain
//! quotes or whitespace.

use std::{borrow::Borrow, collections::HashMap, fmt, sync::Arc};

/// Unique name of one element instance inside a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(Arc<str>);

impl InstanceId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the tag part of the identifier (upper-cased tag name).
    #[must_use]
    pub fn tag(&self) -> &str {
        self.0.rsplit_once("__").map_or(&self.0, |(tag, _)| tag)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for InstanceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out identifiers, one counter per tag name.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    counters: HashMap<String, u64>,
}

impl IdAllocator {
    /// Allocates the next identifier for `tag_name`.
    pub(crate) fn next(&mut self, tag_name: &str) -> InstanceId {
        let tag = sanitize_tag(tag_name);
        let counter = self.counters.entry(tag.clone()).or_default();
        let id = InstanceId(Arc::from(format!("{tag}__{counter}")));
        *counter += 1;
        id
    }
}

fn sanitize_tag(tag_name: &str) -> String {
    let tag: String = tag_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '-'
            }
        })
        .collect();
    if tag.is_empty() {
        "ELEMENT".to_string()
    } else {
        tag
    }
}
