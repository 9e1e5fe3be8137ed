//! Response header map and raw header-line parsing.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// Response headers keyed by lower-cased name. Repeated headers are joined
/// with `", "` in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: BTreeMap<String, String>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header value, joining it onto any earlier value of the same name.
    pub fn append(&mut self, name: &str, value: &str) {
        let value = value.trim();
        match self.entries.entry(name.trim().to_ascii_lowercase()) {
            btree_map::Entry::Vacant(e) => {
                e.insert(value.to_string());
            }
            btree_map::Entry::Occupied(mut e) => {
                let joined = e.get_mut();
                joined.push_str(", ");
                joined.push_str(value);
            }
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `Content-Encoding` lists the `gzip` token (any case).
    pub fn is_gzip(&self) -> bool {
        self.get("content-encoding").is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("gzip"))
        })
    }

    /// Parse header lines as delivered by libcurl's header callback.
    ///
    /// Each status line (`HTTP/...`) starts a new response block, so headers
    /// of redirects and `100 Continue` responses are discarded. Returns the
    /// reason phrase of the final status line along with its headers.
    pub(crate) fn parse_lines<S: AsRef<str>>(lines: &[S]) -> (Option<String>, Self) {
        let mut reason = None;
        let mut headers = Self::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("HTTP/") {
                reason = line
                    .splitn(3, ' ')
                    .nth(2)
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string);
                headers = Self::new();
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.append(name, value);
            }
        }
        (reason, headers)
    }
}

impl<'a> IntoIterator for &'a ResponseHeaders {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Standard reason phrase for servers that omit one (HTTP/2 never sends it).
pub fn canonical_reason(status: i32) -> &'static str {
    u16::try_from(status)
        .ok()
        .and_then(|code| http::StatusCode::from_u16(code).ok())
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}
