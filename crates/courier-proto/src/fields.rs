//! Ordered key/value field sets.
//!
//! [`MessageFields`] is the serialized form of a message: an insertion
//! ordered map from field name to value. Order is preserved so that encoded
//! output is stable, but it carries no meaning; duplicate keys are rejected.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

use crate::errors::{ProtocolError, Result};

/// Per-field overhead counted by [`MessageFields::wire_size`], standing in
/// for the `=` and `&` separators.
pub const FIELD_OVERHEAD: usize = 2;

/// Ordered map of wire field names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageFields {
    inner: IndexMap<String, String>,
}

impl MessageFields {
    /// Create an empty field set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, rejecting duplicate keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        for (key, value) in pairs {
            fields.insert(key, value)?;
        }
        Ok(fields)
    }

    /// Add a field that must not already be present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.inner.contains_key(&key) {
            return Err(ProtocolError::DuplicateField(key));
        }
        self.inner.insert(key, value.into());
        Ok(())
    }

    /// Add or overwrite a field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner.insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.shift_remove(key)
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Value of a field that must be present.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| ProtocolError::MissingField(key.to_string()))
    }

    /// True if the field is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Copy of this set with fields sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut inner = self.inner.clone();
        inner.sort_keys();
        Self { inner }
    }

    /// Approximate encoded size: `Σ(key.len() + value.len() + 2)`.
    ///
    /// The constant stands in for the `=` and `&` around each pair. Percent
    /// escaping is not counted, so the value is independent of the encoding
    /// eventually chosen. Lengths are UTF-8 bytes, not characters or UTF-16
    /// units: `"é"` counts 2. URL limits are limits on bytes, so non-ASCII
    /// payloads reach the form POST threshold sooner than a character count
    /// would suggest.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        self.inner.iter().map(|(k, v)| k.len() + v.len() + FIELD_OVERHEAD).sum()
    }

    /// Parse an `application/x-www-form-urlencoded` body or query string.
    pub fn from_urlencoded(input: &str) -> Result<Self> {
        Self::from_pairs(form_urlencoded::parse(input.as_bytes()))
    }

    /// Parse the query component of a URL. A URL without a query yields an
    /// empty set.
    pub fn from_url_query(url: &Url) -> Result<Self> {
        Self::from_pairs(url.query_pairs())
    }

    /// Encode as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.iter()).finish()
    }

    /// `url` with every field appended to its query string. Existing query
    /// parameters are kept ahead of the appended ones.
    #[must_use]
    pub fn append_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        if !self.is_empty() {
            url.query_pairs_mut().extend_pairs(self.iter());
        }
        url
    }
}

impl<'a> IntoIterator for &'a MessageFields {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicates() {
        let mut fields = MessageFields::new();
        fields.insert("openid.mode", "checkid_setup").unwrap();
        let err = fields.insert("openid.mode", "id_res").unwrap_err();
        assert_eq!(err, ProtocolError::DuplicateField("openid.mode".to_string()));
        assert_eq!(fields.get("openid.mode"), Some("checkid_setup"));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut fields = MessageFields::from_pairs([("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(fields.set("a", "3"), Some("1".to_string()));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn remove_keeps_order() {
        let mut fields = MessageFields::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        fields.remove("a");
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn wire_size_counts_overhead() {
        let fields =
            MessageFields::from_pairs((0..10).map(|i| (format!("{i}"), "v".to_string()))).unwrap();
        assert_eq!(fields.wire_size(), 40);
        assert_eq!(MessageFields::new().wire_size(), 0);
    }

    #[test]
    fn wire_size_counts_utf8_bytes() {
        let fields = MessageFields::from_pairs([("name", "Zoë"), ("city", "東京")]).unwrap();
        // "Zoë" is 4 bytes, "東京" is 6.
        assert_eq!(fields.wire_size(), (4 + 4 + 2) + (4 + 6 + 2));
    }

    #[test]
    fn urlencoded_parse_rejects_duplicate_keys() {
        let err = MessageFields::from_urlencoded("a=1&b=2&a=3").unwrap_err();
        assert_eq!(err, ProtocolError::DuplicateField("a".to_string()));
    }

    #[test]
    fn urlencoded_escapes_reserved_characters() {
        let fields = MessageFields::from_pairs([("return_to", "https://rp.example/?a=1&b=2")])
            .unwrap();
        let encoded = fields.to_urlencoded();
        assert_eq!(encoded, "return_to=https%3A%2F%2Frp.example%2F%3Fa%3D1%26b%3D2");
        assert_eq!(MessageFields::from_urlencoded(&encoded).unwrap(), fields);
    }

    #[test]
    fn append_to_url_keeps_existing_query() {
        let url = Url::parse("https://op.example/auth?lang=en").unwrap();
        let fields = MessageFields::from_pairs([("mode", "setup")]).unwrap();
        let located = fields.append_to_url(&url);
        assert_eq!(located.as_str(), "https://op.example/auth?lang=en&mode=setup");
    }

    #[test]
    fn append_nothing_leaves_url_untouched() {
        let url = Url::parse("https://op.example/auth").unwrap();
        assert_eq!(MessageFields::new().append_to_url(&url), url);
    }

    #[test]
    fn require_names_missing_field() {
        let fields = MessageFields::new();
        assert_eq!(
            fields.require("oauth_token").unwrap_err(),
            ProtocolError::MissingField("oauth_token".to_string())
        );
    }

    #[test]
    fn sorted_orders_by_key() {
        let fields = MessageFields::from_pairs([("b", "2"), ("a", "1")]).unwrap();
        assert_eq!(fields.sorted().keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
