use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;

use crate::web::errors::{PatternError, PatternErrorType};

/// Everything before the captured regex source in a compiled parameter regex.
pub(crate) const ANCHOR_OPEN: &str = "^(?:";
/// Everything after it.
pub(crate) const ANCHOR_CLOSE: &str = ")";

/// One compiled piece of a route pattern.
///
/// ```text
/// pattern  := segment+
/// segment  := literal | parameter
/// literal  := ( escaped | non-special-char )+
/// escaped  := '\' any-char
/// parameter:= ':' name ( '$' signed-int )? ( '(' balanced-regex ')' )? '*'?
/// name     := [A-Za-z0-9_]+
/// ```
#[derive(Debug, Clone)]
pub enum Segment {
    /// Raw path text, escapes already resolved.
    Literal { text: String },
    /// A capture. The regex, when present, is compiled anchored to the start
    /// of whatever substring it is applied to. `multi` lets the capture span
    /// '/' characters. `stage` orders the capture against sibling captures.
    Parameter {
        name: String,
        regex: Option<Regex>,
        multi: bool,
        stage: i32,
    },
}

/// Wrap a parameter regex source so it can only match at the start of its
/// input, then compile it.
pub(crate) fn compile_anchored(source: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("{ANCHOR_OPEN}{source}{ANCHOR_CLOSE}"))
}

/// Recover the written source of an anchored parameter regex.
pub(crate) fn anchored_source(regex: &Regex) -> &str {
    let wrapped = regex.as_str();
    &wrapped[ANCHOR_OPEN.len()..wrapped.len() - ANCHOR_CLOSE.len()]
}

/// Compile a route pattern into its segments.
///
/// The structural rules are checked here so the router never has to: patterns
/// are absolute, never open on a parameter, never chain an unbounded
/// parameter into another one, and never continue past an unbounded multi
/// parameter.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    if pattern.starts_with(':') {
        return Err(PatternError::new(
            pattern,
            PatternErrorType::LeadingParameter,
        ));
    }

    if !pattern.starts_with('/') {
        return Err(PatternError::new(pattern, PatternErrorType::NotAbsolute));
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(&next_char) = chars.peek() {
        // an unbounded multi parameter consumes the rest of the path, so
        // nothing may follow it
        if let Some(Segment::Parameter {
            multi: true,
            regex: None,
            ..
        }) = segments.last()
        {
            return Err(PatternError::new(pattern, PatternErrorType::MultiNotLast));
        }

        if next_char == ':' {
            chars.next();

            if let Some(Segment::Parameter { regex: None, .. }) = segments.last() {
                return Err(PatternError::new(
                    pattern,
                    PatternErrorType::AdjacentParameters,
                ));
            }

            segments.push(parse_parameter(pattern, &mut chars)?);
        } else {
            segments.push(parse_literal(pattern, &mut chars)?);
        }
    }

    Ok(segments)
}

/// Consume literal text up to the next parameter marker, resolving escapes.
fn parse_literal(
    pattern: &str,
    chars: &mut Peekable<Chars<'_>>,
) -> Result<Segment, PatternError> {
    let mut text = String::new();

    while let Some(&next_char) = chars.peek() {
        match next_char {
            ':' => break,
            '\\' => {
                chars.next();

                match chars.next() {
                    Some(escaped) => text.push(escaped),
                    None => {
                        return Err(PatternError::new(
                            pattern,
                            PatternErrorType::DanglingEscape,
                        ));
                    }
                }
            }
            _ => {
                text.push(next_char);
                chars.next();
            }
        }
    }

    Ok(Segment::Literal { text })
}

/// Consume a parameter. The ':' has already been taken.
fn parse_parameter(
    pattern: &str,
    chars: &mut Peekable<Chars<'_>>,
) -> Result<Segment, PatternError> {
    let mut name = String::new();

    while let Some(&next_char) = chars.peek() {
        if next_char.is_ascii_alphanumeric() || next_char == '_' {
            name.push(next_char);
            chars.next();
        } else {
            break;
        }
    }

    if name.is_empty() {
        return Err(PatternError::new(
            pattern,
            PatternErrorType::EmptyParameterName,
        ));
    }

    let mut stage = 0;

    if chars.peek() == Some(&'$') {
        chars.next();

        let mut digits = String::new();

        if chars.peek() == Some(&'-') {
            digits.push('-');
            chars.next();
        }

        while let Some(&next_char) = chars.peek() {
            if next_char.is_ascii_digit() {
                digits.push(next_char);
                chars.next();
            } else {
                break;
            }
        }

        stage = digits
            .parse()
            .map_err(|_| PatternError::new(pattern, PatternErrorType::InvalidStage))?;
    }

    let mut regex = None;

    if chars.peek() == Some(&'(') {
        chars.next();

        let source = read_balanced_regex(pattern, chars)?;

        if source.is_empty() {
            return Err(PatternError::new(pattern, PatternErrorType::EmptyRegex));
        }

        let compiled = compile_anchored(&source).map_err(|compile_error| {
            PatternError::new(
                pattern,
                PatternErrorType::InvalidRegex(compile_error.to_string()),
            )
        })?;

        regex = Some(compiled);
    }

    let mut multi = false;

    if chars.peek() == Some(&'*') {
        chars.next();
        multi = true;
    }

    Ok(Segment::Parameter {
        name,
        regex,
        multi,
        stage,
    })
}

/// Read the regex source between balanced parentheses. The opening '(' has
/// already been taken; the matching ')' is consumed but not captured.
fn read_balanced_regex(
    pattern: &str,
    chars: &mut Peekable<Chars<'_>>,
) -> Result<String, PatternError> {
    let mut source = String::new();
    let mut depth = 1;

    loop {
        let next_char = chars.next().ok_or_else(|| {
            PatternError::new(pattern, PatternErrorType::UnterminatedRegex)
        })?;

        match next_char {
            '\\' => {
                source.push('\\');

                let escaped = chars.next().ok_or_else(|| {
                    PatternError::new(pattern, PatternErrorType::UnterminatedRegex)
                })?;

                source.push(escaped);
            }
            '(' => {
                depth += 1;
                source.push('(');
            }
            ')' => {
                depth -= 1;

                if depth == 0 {
                    return Ok(source);
                }

                source.push(')');
            }
            _ => source.push(next_char),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Segment, anchored_source, parse_pattern};
    use crate::web::errors::PatternErrorType;

    fn error_type(pattern: &str) -> PatternErrorType {
        parse_pattern(pattern).unwrap_err().error_type
    }

    #[test]
    fn plain_literal_is_one_segment() {
        let segments = parse_pattern("/about/us").unwrap();

        assert_eq!(segments.len(), 1);
        assert!(
            matches!(&segments[0], Segment::Literal { text } if text == "/about/us")
        );
    }

    #[test]
    fn escapes_resolve_into_the_literal() {
        let segments = parse_pattern("/\\:x/\\\\y").unwrap();

        assert!(
            matches!(&segments[0], Segment::Literal { text } if text == "/:x/\\y")
        );
    }

    #[test]
    fn full_parameter_syntax() {
        let segments = parse_pattern("/user/:id$-10(\\d+)*").unwrap();

        assert_eq!(segments.len(), 2);

        match &segments[1] {
            Segment::Parameter {
                name,
                regex,
                multi,
                stage,
            } => {
                assert_eq!(name, "id");
                assert_eq!(*stage, -10);
                assert!(*multi);
                assert_eq!(anchored_source(regex.as_ref().unwrap()), "\\d+");
            }
            Segment::Literal { .. } => panic!("expected a parameter"),
        }
    }

    #[test]
    fn nested_and_escaped_parens_stay_balanced() {
        let segments = parse_pattern("/x/:v((a|b)+\\))").unwrap();

        match &segments[1] {
            Segment::Parameter { regex, .. } => {
                assert_eq!(anchored_source(regex.as_ref().unwrap()), "(a|b)+\\)");
            }
            Segment::Literal { .. } => panic!("expected a parameter"),
        }
    }

    #[test]
    fn adjacent_parameters_need_a_left_regex() {
        let segments = parse_pattern("/user/:short(\\d{1,2}):rest").unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(error_type("/user/:a:b"), PatternErrorType::AdjacentParameters);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(error_type("about"), PatternErrorType::NotAbsolute);
        assert_eq!(error_type(":id"), PatternErrorType::LeadingParameter);
        assert_eq!(error_type("/:"), PatternErrorType::EmptyParameterName);
        assert_eq!(error_type("/x/:id$x"), PatternErrorType::InvalidStage);
        assert_eq!(error_type("/x/:id(\\d+"), PatternErrorType::UnterminatedRegex);
        assert_eq!(error_type("/x/:id()"), PatternErrorType::EmptyRegex);
        assert_eq!(error_type("/x\\"), PatternErrorType::DanglingEscape);
        assert_eq!(error_type("/x/:rest*/more"), PatternErrorType::MultiNotLast);
        assert!(matches!(
            error_type("/x/:id([)"),
            PatternErrorType::InvalidRegex(_)
        ));
    }

    #[test]
    fn multi_with_regex_may_continue() {
        let segments = parse_pattern("/x/:p([\\w/]{1,3})*/tail").unwrap();

        assert_eq!(segments.len(), 3);
    }
}
