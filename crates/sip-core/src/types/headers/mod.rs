//! Ordered SIP header storage.

mod access;
mod header_name;

pub use access::HeaderAccess;
pub use header_name::HeaderName;

use std::fmt;

/// A single `name: value` header field. The value is kept as received,
/// without leading/trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Header fields in wire order. Multiple fields with the same name are kept
/// as separate entries, so the first Via is always the top-most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// First value for `name`
    pub fn get(&self, name: &HeaderName) -> Option<&str> {
        self.0
            .iter()
            .find(|h| &h.name == name)
            .map(|h| h.value.as_str())
    }

    /// All values for `name`, in order
    pub fn get_all<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |h| &h.name == name)
            .map(|h| h.value.as_str())
    }

    /// First field named `name`, for in-place edits
    pub fn first_mut(&mut self, name: &HeaderName) -> Option<&mut Header> {
        self.0.iter_mut().find(|h| &h.name == name)
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.0.iter().any(|h| &h.name == name)
    }

    pub fn push(&mut self, header: Header) {
        self.0.push(header);
    }

    /// Inserts before every other header (used for the top Via)
    pub fn push_front(&mut self, header: Header) {
        self.0.insert(0, header);
    }

    /// Replaces all fields named `name` with a single field
    pub fn set(&mut self, name: HeaderName, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter().position(|h| h.name == name) {
            Some(idx) => {
                self.0[idx].value = value;
                let mut seen = 0usize;
                self.0.retain(|h| {
                    if h.name == name {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.0.push(Header::new(name, value)),
        }
    }

    pub fn remove(&mut self, name: &HeaderName) {
        self.0.retain(|h| &h.name != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_collapses_duplicates() {
        let mut headers = Headers::new();
        headers.push(Header::new(HeaderName::Via, "SIP/2.0/UDP a"));
        headers.push(Header::new(HeaderName::CallId, "x"));
        headers.push(Header::new(HeaderName::Via, "SIP/2.0/UDP b"));

        assert_eq!(headers.get_all(&HeaderName::Via).count(), 2);
        headers.set(HeaderName::Via, "SIP/2.0/UDP c");
        assert_eq!(headers.get_all(&HeaderName::Via).collect::<Vec<_>>(), vec!["SIP/2.0/UDP c"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_push_front_becomes_top() {
        let mut headers = Headers::new();
        headers.push(Header::new(HeaderName::Via, "SIP/2.0/UDP old"));
        headers.push_front(Header::new(HeaderName::Via, "SIP/2.0/UDP new"));
        assert_eq!(headers.get(&HeaderName::Via), Some("SIP/2.0/UDP new"));
    }
}
