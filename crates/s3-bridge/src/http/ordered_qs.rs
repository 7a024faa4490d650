//! Ordered query strings

/// Immutable query string container, ascending by key.
#[derive(Debug, Default, Clone)]
pub struct OrderedQs {
    pairs: Vec<(String, String)>,
}

impl OrderedQs {
    /// Parses a raw (still percent-encoded) query string.
    ///
    /// A bare key such as `acl` parses to an empty value.
    ///
    /// # Errors
    /// Returns an error if the query string is not well-formed urlencoded data
    pub fn parse(query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let mut pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
        pairs.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        Ok(Self { pairs })
    }

    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut pairs: Vec<(String, String)> = pairs.into_iter().collect();
        pairs.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        Self { pairs }
    }

    /// Gets the first value of a key. Time `O(logn)`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let slice = self.pairs.as_slice();
        let lower_bound = slice.partition_point(|x| x.0.as_str() < name);
        let pair = slice.get(lower_bound)?;
        (pair.0 == name).then_some(pair.1.as_str())
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns an iterator over ascending (key, value) pairs
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
