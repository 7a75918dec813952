use std::error::Error;

/// # Pattern error
///
/// Raised while compiling a route pattern. Carries the offending pattern and
/// the structural reason it was rejected.
#[derive(Debug)]
pub struct PatternError {
    /// The pattern as it was handed to the parser.
    pub pattern: String,
    pub error_type: PatternErrorType,
}

/// The structural reasons a pattern can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternErrorType {
    /// The pattern did not begin with '/'.
    NotAbsolute,
    /// The pattern began with a parameter instead of a literal.
    LeadingParameter,
    /// ':' was not followed by a parameter name.
    EmptyParameterName,
    /// Two parameters sat next to each other and the left one had no regex,
    /// so there is nothing to bound the left capture.
    AdjacentParameters,
    /// '$' was not followed by an integer stage.
    InvalidStage,
    /// A parameter regex was opened but its closing parenthesis never came.
    UnterminatedRegex,
    /// A parameter regex was empty.
    EmptyRegex,
    /// A parameter regex did not compile.
    InvalidRegex(String),
    /// A '\' escape at the end of the pattern with nothing to escape.
    DanglingEscape,
    /// A multi parameter without a regex must be the last segment.
    MultiNotLast,
}

impl PatternError {
    pub fn new(pattern: &str, error_type: PatternErrorType) -> Self {
        Self {
            pattern: pattern.to_string(),
            error_type,
        }
    }
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match &self.error_type {
            PatternErrorType::NotAbsolute => "the pattern must start with '/'".to_string(),
            PatternErrorType::LeadingParameter => {
                "the pattern cannot start with a parameter".to_string()
            }
            PatternErrorType::EmptyParameterName => {
                "':' must be followed by a parameter name".to_string()
            }
            PatternErrorType::AdjacentParameters => {
                "a parameter directly after another requires the left one to have a regex"
                    .to_string()
            }
            PatternErrorType::InvalidStage => "'$' must be followed by an integer".to_string(),
            PatternErrorType::UnterminatedRegex => {
                "the parameter regex was never closed".to_string()
            }
            PatternErrorType::EmptyRegex => "the parameter regex was empty".to_string(),
            PatternErrorType::InvalidRegex(compile_error) => {
                format!("the parameter regex did not compile: {compile_error}")
            }
            PatternErrorType::DanglingEscape => {
                "the pattern ended with a '\\' and nothing to escape".to_string()
            }
            PatternErrorType::MultiNotLast => {
                "a multi parameter without a regex must end the pattern".to_string()
            }
        };

        write!(f, "invalid pattern '{}': {reason}", self.pattern)
    }
}

impl Error for PatternError {}
