use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("post content must not be empty")]
    EmptyContent,
    #[error("post content is {actual} UTF-16 units long; the limit is {max}")]
    ContentTooLong { actual: usize, max: usize },
}
