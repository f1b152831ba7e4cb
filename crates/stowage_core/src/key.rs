//! Key validation.
//!
//! Keys are checked before any I/O. A [`Key`] can only be obtained through
//! validation, so code holding one never needs to re-check it.
//!
//! ## Grammar
//!
//! | Keyspace   | Accepted characters                                      |
//! |------------|----------------------------------------------------------|
//! | `Default`  | ASCII letters, digits, and ``` `!"#$%&'()+,-.<=>?@[]^_{}~ ``` |
//! | `Extended` | everything above, plus `/` (separator) and space         |
//!
//! In the extended keyspace a key may not start or end with `/` and may not
//! contain an empty segment (`//`). Keys are compared byte for byte; no
//! normalization is applied.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use crate::error::{StoreError, StoreResult};

/// Punctuation accepted by the default keyspace.
pub const DEFAULT_PUNCTUATION: &str = "`!\"#$%&'()+,-.<=>?@[]^_{}~";

/// Path separator accepted by the extended keyspace.
pub const SEPARATOR: char = '/';

/// Which key grammar is in force.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Keyspace {
    /// Letters, digits, and a fixed punctuation set.
    #[default]
    Default,
    /// The default grammar plus `/` separators and spaces.
    Extended,
}

impl Keyspace {
    /// Returns whether `c` may appear in a key of this keyspace.
    #[must_use]
    pub fn permits(self, c: char) -> bool {
        if c.is_ascii_alphanumeric() || DEFAULT_PUNCTUATION.contains(c) {
            return true;
        }
        self == Self::Extended && (c == SEPARATOR || c == ' ')
    }

    /// Validates `raw` against this keyspace and a maximum byte length.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] naming the first rule violated.
    pub fn validate(self, raw: &str, max_len: usize) -> StoreResult<Key> {
        if raw.is_empty() {
            return Err(StoreError::invalid_key(raw, "key must not be empty"));
        }
        if raw.len() > max_len {
            return Err(StoreError::invalid_key(
                raw,
                format!(
                    "key is {} bytes long, the maximum is {}",
                    raw.len(),
                    max_len
                ),
            ));
        }
        if let Some(bad) = raw.chars().find(|c| !self.permits(*c)) {
            return Err(StoreError::invalid_key(
                raw,
                format!("illegal character {bad:?}"),
            ));
        }
        if self == Self::Extended {
            if raw.starts_with(SEPARATOR) || raw.ends_with(SEPARATOR) {
                return Err(StoreError::invalid_key(
                    raw,
                    "key must not start or end with '/'",
                ));
            }
            if raw.split(SEPARATOR).any(str::is_empty) {
                return Err(StoreError::invalid_key(raw, "empty path segment"));
            }
        }
        Ok(Key(raw.to_string()))
    }
}

/// A key that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if `raw` is not a valid key.
    pub fn parse(raw: &str, keyspace: Keyspace, max_len: usize) -> StoreResult<Self> {
        keyspace.validate(raw, max_len)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Key {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    const MAX: usize = 250;

    fn reject_reason(keyspace: Keyspace, raw: &str) -> String {
        match keyspace.validate(raw, MAX) {
            Err(StoreError::InvalidKey { reason, .. }) => reason,
            other => panic!("expected {raw:?} to be rejected, got {other:?}"),
        }
    }

    #[test]
    fn default_accepts_letters_digits_punctuation() {
        for raw in ["key1", "KEY", "0", "a.b-c_d", "!\"#$%&'()+,-.<=>?@[]^_{}~`", "x@y"] {
            let key = Keyspace::Default.validate(raw, MAX).unwrap();
            assert_eq!(key.as_str(), raw);
        }
    }

    #[test]
    fn default_rejects_separator_and_space() {
        assert!(reject_reason(Keyspace::Default, "a/b").contains("'/'"));
        assert!(reject_reason(Keyspace::Default, "a b").contains("' '"));
    }

    #[test]
    fn default_rejects_other_characters() {
        for raw in ["a*b", "a:b", "a;b", "a|b", "a\\b", "tab\t", "ümlaut", "new\nline"] {
            assert!(
                Keyspace::Default.validate(raw, MAX).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn empty_key_rejected_in_both_keyspaces() {
        for keyspace in [Keyspace::Default, Keyspace::Extended] {
            assert_eq!(reject_reason(keyspace, ""), "key must not be empty");
        }
    }

    #[test]
    fn length_limit_is_inclusive() {
        let at_limit = "a".repeat(MAX);
        let over = "a".repeat(MAX + 1);
        assert!(Keyspace::Default.validate(&at_limit, MAX).is_ok());
        let err = Keyspace::Default.validate(&over, MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
        assert!(err.to_string().contains("maximum is 250"));
    }

    #[test]
    fn extended_accepts_separators_and_spaces() {
        for raw in ["a/b", "a/b/c", "dir/file name.txt", "a b"] {
            assert!(Keyspace::Extended.validate(raw, MAX).is_ok(), "{raw:?}");
        }
    }

    #[test]
    fn extended_rejects_bad_separators() {
        for raw in ["/a", "a/", "/", "a//b", "//"] {
            assert!(
                Keyspace::Extended.validate(raw, MAX).is_err(),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(reject_reason(Keyspace::Extended, "a//b"), "empty path segment");
        assert!(reject_reason(Keyspace::Extended, "/a").contains("start or end"));
    }

    #[test]
    fn extended_still_rejects_other_characters() {
        assert!(Keyspace::Extended.validate("a*b", MAX).is_err());
        assert!(Keyspace::Extended.validate("a\\b", MAX).is_err());
    }

    #[test]
    fn keys_are_not_normalized() {
        let lower = Key::parse("abc", Keyspace::Default, MAX).unwrap();
        let upper = Key::parse("ABC", Keyspace::Default, MAX).unwrap();
        assert_ne!(lower, upper);
        assert_eq!(lower, "abc");
    }

    #[test]
    fn key_conversions() {
        let key = Key::parse("k.1", Keyspace::Default, MAX).unwrap();
        assert_eq!(key.to_string(), "k.1");
        assert_eq!(key.len(), 3);
        assert_eq!(String::from(key.clone()), "k.1");
        assert_eq!(key.into_string(), "k.1");
    }

    proptest! {
        #[test]
        fn default_grammar_keys_validate(raw in "[a-zA-Z0-9_.~-]{1,64}") {
            prop_assert!(Keyspace::Default.validate(&raw, MAX).is_ok());
            prop_assert!(Keyspace::Extended.validate(&raw, MAX).is_ok());
        }

        #[test]
        fn extended_accepts_joined_segments(
            segments in prop::collection::vec("[a-z0-9]{1,8}", 1..6)
        ) {
            let raw = segments.join("/");
            prop_assert!(Keyspace::Extended.validate(&raw, MAX).is_ok());
            prop_assert_eq!(Keyspace::Default.validate(&raw, MAX).is_ok(), segments.len() == 1);
        }

        #[test]
        fn validation_is_deterministic(raw in ".{0,40}") {
            let first = Keyspace::Default.validate(&raw, MAX).is_ok();
            let second = Keyspace::Default.validate(&raw, MAX).is_ok();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn accepted_keys_only_use_permitted_chars(raw in ".{1,40}") {
            if let Ok(key) = Keyspace::Extended.validate(&raw, MAX) {
                prop_assert!(key.chars().all(|c| Keyspace::Extended.permits(c)));
            }
        }
    }
}
