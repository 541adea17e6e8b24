//! Post content rules.

use chirp_api_types::MAX_POST_LEN;

use super::error::DomainError;

/// Post body that satisfied the length bounds.
///
/// Length is measured in UTF-16 code units, so a character outside the Basic
/// Multilingual Plane counts twice. The input is stored as given; surrounding
/// whitespace counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent(String);

impl PostContent {
    pub const MAX_LEN: usize = MAX_POST_LEN;

    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let actual = raw.encode_utf16().count();
        if actual == 0 {
            return Err(DomainError::EmptyContent);
        }
        if actual > Self::MAX_LEN {
            return Err(DomainError::ContentTooLong {
                actual,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
