//! Identifier validation and path building.
//!
//! Every value interpolated into a request path passes through
//! [`Identifier::parse`] first. Validation happens at the moment of
//! interpolation and its result is never cached.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::error::ValidationError;

/// Maximum identifier length, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// String forms that indicate a missing value was stringified upstream.
const SENTINELS: &[&str] = &["undefined", "null"];

/// Marker of a stringified object (`"[object Object]"`).
const OBJECT_MARKER: &str = "[object";

// ============================================================================
// Raw Identifier Sources
// ============================================================================

/// A value that may be used as a raw identifier.
///
/// `None` means "no identifier was supplied"; it always fails validation.
pub trait RawId {
    /// Returns the string form of this value, or `None` if it is absent.
    fn raw_id(&self) -> Option<Cow<'_, str>>;
}

impl RawId for str {
    fn raw_id(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl RawId for String {
    fn raw_id(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl<T: RawId + ?Sized> RawId for &T {
    fn raw_id(&self) -> Option<Cow<'_, str>> {
        (**self).raw_id()
    }
}

impl<T: RawId> RawId for Option<T> {
    fn raw_id(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(RawId::raw_id)
    }
}

impl RawId for Identifier {
    fn raw_id(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.0))
    }
}

macro_rules! impl_raw_id_for_int {
    ($($t:ty),*) => {
        $(impl RawId for $t {
            fn raw_id(&self) -> Option<Cow<'_, str>> {
                Some(Cow::Owned(self.to_string()))
            }
        })*
    };
}

impl_raw_id_for_int!(u32, u64, i32, i64, usize);

// ============================================================================
// Identifier
// ============================================================================

/// A validated, trimmed external-resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Validates a raw value and returns the trimmed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value is absent, empty after
    /// trimming, a stringified placeholder, a stringified object, or longer
    /// than [`MAX_IDENTIFIER_LEN`] characters.
    pub fn parse<R: RawId + ?Sized>(raw: &R) -> Result<Self, ValidationError> {
        let Some(raw) = raw.raw_id() else {
            return Err(ValidationError::Missing);
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }
        if SENTINELS.contains(&trimmed) {
            return Err(ValidationError::Sentinel(trimmed.to_string()));
        }
        if raw.contains(OBJECT_MARKER) {
            return Err(ValidationError::ObjectLike(truncate(&raw)));
        }

        let len = raw.chars().count();
        if len > MAX_IDENTIFIER_LEN {
            return Err(ValidationError::TooLong {
                len,
                max: MAX_IDENTIFIER_LEN,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keeps error messages bounded when the offending value is huge.
fn truncate(raw: &str) -> String {
    raw.chars().take(32).collect()
}

// ============================================================================
// Path Building
// ============================================================================

/// Builds `"{base}/{id}"`, or `"{base}/{id}/{sub_path}"` when a sub-path is given.
///
/// The identifier is validated before anything is composed. Separators are
/// normalized so the result never contains `//` at the joins.
///
/// # Errors
///
/// Returns [`ValidationError`] if `raw` fails [`Identifier::parse`].
pub fn build_path<R: RawId + ?Sized>(
    base: &str,
    raw: &R,
    sub_path: Option<&str>,
) -> Result<String, ValidationError> {
    let id = Identifier::parse(raw)?;
    Ok(join_path(base, &id, sub_path))
}

/// Joins an already validated identifier onto a base path.
pub fn join_path(base: &str, id: &Identifier, sub_path: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let mut path = String::with_capacity(base.len() + id.0.len() + 16);
    path.push_str(base);
    path.push('/');
    path.push_str(&id.0);

    if let Some(sub) = sub_path.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(sub);
    }

    path
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = Identifier::parse("  abc123 ").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_parse_rejects_placeholders() {
        assert_eq!(Identifier::parse(""), Err(ValidationError::Empty));
        assert_eq!(Identifier::parse("   "), Err(ValidationError::Empty));
        assert!(matches!(
            Identifier::parse("null"),
            Err(ValidationError::Sentinel(_))
        ));
        assert!(matches!(
            Identifier::parse("undefined"),
            Err(ValidationError::Sentinel(_))
        ));
        assert!(matches!(
            Identifier::parse(" null "),
            Err(ValidationError::Sentinel(_))
        ));
    }

    #[test]
    fn test_parse_rejects_object_strings() {
        assert!(matches!(
            Identifier::parse("[object Object]"),
            Err(ValidationError::ObjectLike(_))
        ));
        assert!(matches!(
            Identifier::parse("abc[object Promise]"),
            Err(ValidationError::ObjectLike(_))
        ));
    }

    #[test]
    fn test_parse_length_boundary() {
        let ok = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(Identifier::parse(&ok).is_ok());

        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert_eq!(
            Identifier::parse(&long),
            Err(ValidationError::TooLong {
                len: MAX_IDENTIFIER_LEN + 1,
                max: MAX_IDENTIFIER_LEN
            })
        );
    }

    #[test]
    fn test_parse_missing_and_numeric() {
        let none: Option<&str> = None;
        assert_eq!(Identifier::parse(&none), Err(ValidationError::Missing));
        assert_eq!(Identifier::parse(&Some("x1")).unwrap().as_str(), "x1");
        assert_eq!(Identifier::parse(&42_u64).unwrap().as_str(), "42");
    }

    #[test]
    fn test_build_path() {
        assert_eq!(build_path("/cards", "abc123", None).unwrap(), "/cards/abc123");
        assert_eq!(build_path("/cards/", "abc123", None).unwrap(), "/cards/abc123");
        assert_eq!(
            build_path("/sales", "s-9", Some("mark-sold")).unwrap(),
            "/sales/s-9/mark-sold"
        );
        assert_eq!(
            build_path("/sales", "s-9", Some("/mark-sold")).unwrap(),
            "/sales/s-9/mark-sold"
        );
        assert!(build_path("/cards", "", None).is_err());
    }
}
