use std::{borrow::Borrow, collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Identifier of an image, shared by reconstructions and passages.
///
/// The identifier is the run of digits preceding the `.jpg` extension of the
/// image file name, e.g. `ios_0042.jpg` -> `0042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Create an identifier from an already extracted string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ImageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Extract the image identifier from an image file name.
///
/// Matches the pattern `[_]?(\d+)\.jpg` case-insensitively and returns the
/// captured digits of the leftmost match.
///
/// # Arguments
///
/// * `name` - The image file name, optionally with a directory prefix.
///
/// # Returns
///
/// The extracted identifier or `FilterError::ParseError` when nothing matches.
///
/// Example:
///
/// ```
/// use camfilter_core::id::extract_identifier;
///
/// let id = extract_identifier("passage/ios_0042.JPG").unwrap();
/// assert_eq!(id.as_str(), "0042");
/// ```
pub fn extract_identifier(name: &str) -> Result<ImageId, FilterError> {
    const EXTENSION: &[u8] = b".jpg";

    let bytes = name.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }

        // a maximal digit run: any match starting inside it would need the same suffix
        let end = bytes[start..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |offset| start + offset);

        let has_extension = bytes
            .get(end..end + EXTENSION.len())
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(EXTENSION));

        if has_extension {
            return Ok(ImageId::new(&name[start..end]));
        }
        start = end;
    }

    Err(FilterError::ParseError(name.to_string()))
}

/// A map keyed by image identifier that remembers insertion order.
///
/// Iteration follows the order in which identifiers were first inserted, which
/// keeps every derived map aligned with the order of its pose collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IdMap<V> {
    entries: Vec<(ImageId, V)>,
    index: HashMap<ImageId, usize>,
}

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> IdMap<V> {
    /// Create an empty map with room for `capacity` identifiers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a value, returning the previous value for the identifier if any.
    ///
    /// Replacing a value keeps the original position of the identifier.
    pub fn insert(&mut self, id: ImageId, value: V) -> Option<V> {
        match self.index.get(&id) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, value));
                None
            }
        }
    }

    /// Get the value stored for an identifier.
    pub fn get(&self, id: &str) -> Option<&V> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }

    /// Check whether the identifier is present.
    pub fn contains_key(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the number of identifiers in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ImageId, &V)> {
        self.entries.iter().map(|(id, value)| (id, value))
    }

    /// Iterate over the identifiers in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &ImageId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Iterate over the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<V> FromIterator<(ImageId, V)> for IdMap<V> {
    fn from_iter<I: IntoIterator<Item = (ImageId, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (id, value) in iter {
            map.insert(id, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_identifier() -> Result<(), FilterError> {
        assert_eq!(extract_identifier("ios_123.jpg")?.as_str(), "123");
        assert_eq!(extract_identifier("frame42.JPG")?.as_str(), "42");
        assert_eq!(extract_identifier("images/a12_0034.jpg")?.as_str(), "0034");
        assert_eq!(extract_identifier("7.jpg_8.jpg")?.as_str(), "7");
        Ok(())
    }

    #[test]
    fn test_extract_identifier_no_match() {
        for name in ["ios_.jpg", "ios_123.png", "123jpg", "", "ios_123.jp"] {
            assert!(
                matches!(extract_identifier(name), Err(FilterError::ParseError(_))),
                "{name} should not match"
            );
        }
    }

    #[test]
    fn test_id_map_keeps_insertion_order() {
        let mut map = IdMap::default();
        map.insert(ImageId::from("3"), 'a');
        map.insert(ImageId::from("1"), 'b');
        map.insert(ImageId::from("2"), 'c');
        assert_eq!(map.insert(ImageId::from("1"), 'd'), Some('b'));

        let keys = map.keys().map(ImageId::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["3", "1", "2"]);
        assert_eq!(map.get("1"), Some(&'d'));
        assert!(!map.contains_key("4"));
        assert_eq!(map.len(), 3);
    }
}
