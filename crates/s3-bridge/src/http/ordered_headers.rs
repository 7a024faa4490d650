//! Ordered headers

use hyper::HeaderMap;
use hyper::header::ToStrError;

/// Immutable http header container.
///
/// Names are lowercase and ascending; repeated headers are joined with `,`
/// so every name is unique.
#[derive(Debug, Default, Clone)]
pub struct OrderedHeaders {
    headers: Vec<(String, String)>,
}

impl OrderedHeaders {
    /// Constructs [`OrderedHeaders`] from name/value pairs.
    ///
    /// Names are lowercased here; duplicate names are joined with `,` in
    /// input order.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut headers: Vec<(String, String)> = Vec::new();
        for (name, value) in pairs {
            headers.push((name.to_ascii_lowercase(), value));
        }
        headers.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        headers.dedup_by(|next, prev| {
            if next.0 == prev.0 {
                prev.1.push(',');
                prev.1.push_str(&next.1);
                true
            } else {
                false
            }
        });
        Self { headers }
    }

    /// Constructs [`OrderedHeaders`] from a header map
    ///
    /// # Errors
    /// Returns [`ToStrError`] if a header value cannot be converted to a
    /// string slice
    pub fn from_headers(map: &HeaderMap) -> Result<Self, ToStrError> {
        let mut headers = Vec::with_capacity(map.keys_len());
        for name in map.keys() {
            let mut joined = String::new();
            for value in map.get_all(name) {
                let value = value.to_str()?;
                if !joined.is_empty() {
                    joined.push(',');
                }
                joined.push_str(value);
            }
            headers.push((name.as_str().to_owned(), joined));
        }
        headers.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        Ok(Self { headers })
    }

    /// Gets a header value by lowercase name. Time `O(logn)`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let slice = self.headers.as_slice();
        let idx = slice.binary_search_by(|(n, _)| n.as_str().cmp(name)).ok()?;
        Some(slice[idx].1.as_str())
    }

    /// Returns an iterator over ascending (name, value) pairs
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
