pub mod pattern_error;
pub mod register_error;

pub use self::{
    pattern_error::{PatternError, PatternErrorType},
    register_error::RegisterError,
};
