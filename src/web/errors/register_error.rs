use std::error::Error;

use crate::web::errors::PatternError;

/// Errors raised while registering handlers on the router.
#[derive(Debug)]
pub enum RegisterError {
    /// A verb helper was called with no handlers at all.
    EmptyHandlerList,
    /// The route pattern did not compile.
    Pattern(PatternError),
}

impl From<PatternError> for RegisterError {
    fn from(error: PatternError) -> Self {
        RegisterError::Pattern(error)
    }
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::EmptyHandlerList => {
                write!(f, "at least one handler is required")
            }
            RegisterError::Pattern(pattern_error) => write!(f, "{pattern_error}"),
        }
    }
}

impl Error for RegisterError {}
