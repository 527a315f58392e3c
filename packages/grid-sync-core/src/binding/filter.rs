//! Option filtering for searchable selection controls.

use regex::Regex;
use serde_json::Value;

use super::column::SelectOption;

/// Compiled filter over select options.
///
/// Matching is case-sensitive and tested against both the option label and
/// its value; either match accepts the option. Input that is not a valid
/// regular expression is matched as a literal substring.
#[derive(Debug, Clone)]
pub enum OptionFilter {
    All,
    Pattern(Regex),
    Literal(String),
}

impl OptionFilter {
    pub fn new(input: &str) -> Self {
        if input.is_empty() {
            return Self::All;
        }
        match Regex::new(input) {
            Ok(re) => Self::Pattern(re),
            Err(e) => {
                tracing::trace!("Filter '{}' is not a pattern ({}), matching literally", input, e);
                Self::Literal(input.to_string())
            }
        }
    }

    fn test(&self, text: &str) -> bool {
        match self {
            Self::All => true,
            Self::Pattern(re) => re.is_match(text),
            Self::Literal(needle) => text.contains(needle.as_str()),
        }
    }

    pub fn matches(&self, option: &SelectOption) -> bool {
        self.test(&option.label) || self.test(&value_text(&option.value))
    }
}

/// Returns true if `option` passes the filter typed as `input`.
pub fn option_matches(input: &str, option: &SelectOption) -> bool {
    OptionFilter::new(input).matches(option)
}

/// Text form of an option value: strings unquoted, everything else as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[test]
    #[timeout(1000)]
    fn test_empty_matches_everything() {
        assert!(option_matches("", &SelectOption::new("Alpha", "a")));
    }

    #[test]
    #[timeout(1000)]
    fn test_label_or_value() {
        let option = SelectOption::new("Alpha", "code-17");
        assert!(option_matches("lph", &option));
        assert!(option_matches("17", &option));
        assert!(!option_matches("beta", &option));
    }

    #[test]
    #[timeout(1000)]
    fn test_case_sensitive() {
        let option = SelectOption::new("Alpha", "a");
        assert!(!option_matches("ALPHA", &option));
    }

    #[test]
    #[timeout(1000)]
    fn test_regex_and_numeric_values() {
        let option = SelectOption::new("Open", 42);
        assert!(option_matches("^O", &option));
        assert!(option_matches("4[0-9]", &option));
    }

    #[test]
    #[timeout(1000)]
    fn test_invalid_pattern_is_literal() {
        let option = SelectOption::new("f(x", "fx");
        assert!(option_matches("f(", &option));
        assert!(!option_matches("g(", &option));
    }
}
