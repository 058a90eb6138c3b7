//! Secret reference parsing
//!
//! A reference addresses one field of one item inside a container:
//!
//! ```text
//! op://container/item/field
//! op://container/item/section/field
//! ```
//!
//! Components containing `/` or other reserved characters are
//! percent-encoded. Validation happens entirely offline so that a batch can
//! reject bad input before any remote call is made.

use crate::constants::{DEFAULT_REFERENCE_SCHEME, MAX_REFERENCE_LENGTH};
use crate::errors::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;

/// Characters that must be escaped when a component is written back out
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Scheme and length rules for reference strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSyntax {
    scheme: String,
    prefix: String,
    max_length: usize,
}

impl Default for ReferenceSyntax {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_SCHEME)
    }
}

impl ReferenceSyntax {
    /// Create a syntax for the given scheme (without `://`)
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        let scheme = scheme.into().to_ascii_lowercase();
        let prefix = format!("{scheme}://");
        Self {
            scheme,
            prefix,
            max_length: MAX_REFERENCE_LENGTH,
        }
    }

    /// Override the maximum accepted length in characters
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Cheap test for whether a value claims to be a reference.
    ///
    /// A value that matches must still parse; a configuration value written
    /// with the scheme prefix is never silently treated as plain text.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.strip_scheme(value).is_some()
    }

    fn strip_scheme<'a>(&self, value: &'a str) -> Option<&'a str> {
        let head = value.get(..self.prefix.len())?;
        if head.eq_ignore_ascii_case(&self.prefix) {
            Some(&value[self.prefix.len()..])
        } else {
            None
        }
    }

    /// Parse and validate a reference string
    pub fn parse(&self, raw: &str) -> Result<SecretReference> {
        if raw.is_empty() {
            return Err(Error::malformed_reference(raw, "reference is empty"));
        }

        let length = raw.chars().count();
        if length > self.max_length {
            // Truncated so an oversized input does not flood the logs
            let shown: String = raw.chars().take(64).collect();
            return Err(Error::malformed_reference(
                format!("{shown}..."),
                format!(
                    "reference is {length} characters, exceeding the maximum of {}",
                    self.max_length
                ),
            ));
        }

        let path = self.strip_scheme(raw).ok_or_else(|| {
            Error::malformed_reference(raw, format!("must start with '{}'", self.prefix))
        })?;

        let mut decoded = Vec::with_capacity(4);
        for (index, segment) in path.split('/').enumerate() {
            let value = percent_decode_str(segment).decode_utf8().map_err(|_| {
                Error::malformed_reference(
                    raw,
                    format!("segment {} is not valid UTF-8 after decoding", index + 1),
                )
            })?;
            if value.is_empty() {
                return Err(Error::malformed_reference(
                    raw,
                    format!("segment {} is empty", index + 1),
                ));
            }
            decoded.push(value.into_owned());
        }

        let (container, item, section, field) = match decoded.as_slice() {
            [container, item, field] => (container, item, None, field),
            [container, item, section, field] => (container, item, Some(section), field),
            other => {
                return Err(Error::malformed_reference(
                    raw,
                    format!(
                        "expected 3 or 4 path segments (container/item/[section/]field), found {}",
                        other.len()
                    ),
                ))
            }
        };

        Ok(SecretReference {
            scheme: self.scheme.clone(),
            container: container.clone(),
            item: item.clone(),
            section: section.cloned(),
            field: field.clone(),
            raw: raw.to_string(),
        })
    }
}

/// A validated pointer to one field of one remote item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretReference {
    scheme: String,
    container: String,
    item: String,
    section: Option<String>,
    field: String,
    raw: String,
}

impl SecretReference {
    /// Parse using the default `op://` syntax
    pub fn parse(raw: &str) -> Result<Self> {
        ReferenceSyntax::default().parse(raw)
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    #[must_use]
    pub fn item(&self) -> &str {
        &self.item
    }

    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The exact string this reference was parsed from
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Re-encode the decoded components into a canonical reference string
    #[must_use]
    pub fn to_uri(&self) -> String {
        let encode = |s: &str| utf8_percent_encode(s, COMPONENT).to_string();
        let mut uri = format!(
            "{}://{}/{}/",
            self.scheme,
            encode(&self.container),
            encode(&self.item)
        );
        if let Some(section) = &self.section {
            uri.push_str(&encode(section));
            uri.push('/');
        }
        uri.push_str(&encode(&self.field));
        uri
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
