use thiserror::Error;

/// Input rejected before it touches the store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A user cannot swipe on or match with themselves")]
    InvalidSwipe,

    #[error("Message needs text or an image")]
    EmptyMessage,
}
