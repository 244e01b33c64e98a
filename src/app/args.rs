//! Free-form engine argument parsing
//!
//! Users can pass extra engine options as a single string
//! (e.g. `--no-warnings --max-downloads 5 --rate-limit 1M`). The parser is
//! deliberately forgiving: malformed input never errors, stray tokens are
//! skipped, and the worst case is an empty mapping. Parsed overrides are
//! merged into the engine options last, so explicit user intent always wins.

use std::collections::BTreeMap;

/// A typed override value parsed from the argument string
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Bare flag or explicit true/false
    Flag(bool),
    /// Decimal integer
    Int(i64),
    /// Anything else, kept verbatim
    Text(String),
}

impl ArgValue {
    fn coerce(token: &str) -> Self {
        if token.eq_ignore_ascii_case("true") {
            ArgValue::Flag(true)
        } else if token.eq_ignore_ascii_case("false") {
            ArgValue::Flag(false)
        } else if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            match token.parse() {
                Ok(n) => ArgValue::Int(n),
                Err(_) => ArgValue::Text(token.to_string()),
            }
        } else {
            ArgValue::Text(token.to_string())
        }
    }
}

/// Parse a free-form argument string into a canonical key → value mapping
///
/// Keys are the `--`-stripped option names with `-` converted to `_`. A key
/// followed by a non-option token consumes it as its value; a key followed by
/// another option (or nothing) is recorded as a `true` flag. Empty or
/// whitespace-only input yields an empty mapping.
pub fn parse(args: &str) -> BTreeMap<String, ArgValue> {
    let mut opts = BTreeMap::new();
    let tokens: Vec<&str> = args.split_whitespace().collect();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if let Some(name) = token.strip_prefix("--") {
            if name.is_empty() {
                i += 1;
                continue;
            }
            let key = name.replace('-', "_");
            match tokens.get(i + 1) {
                Some(next) if !next.starts_with("--") => {
                    opts.insert(key, ArgValue::coerce(next));
                    i += 2;
                }
                _ => {
                    opts.insert(key, ArgValue::Flag(true));
                    i += 1;
                }
            }
        } else {
            // Stray value token with no preceding key
            i += 1;
        }
    }

    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_typed_values() {
        let opts = parse("--no-warnings --max-downloads 5 --rate-limit 1M");
        assert_eq!(opts.len(), 3);
        assert_eq!(opts["no_warnings"], ArgValue::Flag(true));
        assert_eq!(opts["max_downloads"], ArgValue::Int(5));
        assert_eq!(opts["rate_limit"], ArgValue::Text("1M".to_string()));
    }

    #[test]
    fn coerces_booleans_case_insensitively() {
        let opts = parse("--quiet TRUE --check-formats False");
        assert_eq!(opts["quiet"], ArgValue::Flag(true));
        assert_eq!(opts["check_formats"], ArgValue::Flag(false));
    }

    #[test]
    fn trailing_flag_without_value() {
        let opts = parse("--retries 3 --ignore-errors");
        assert_eq!(opts["retries"], ArgValue::Int(3));
        assert_eq!(opts["ignore_errors"], ArgValue::Flag(true));
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(parse("").is_empty());
        assert!(parse("   \t  ").is_empty());
    }

    #[test]
    fn stray_tokens_are_skipped() {
        let opts = parse("loose words --real-key value more");
        assert_eq!(opts.len(), 1);
        assert_eq!(opts["real_key"], ArgValue::Text("value".to_string()));
    }

    #[test]
    fn bare_double_dash_is_ignored() {
        let opts = parse("-- --after 1");
        assert_eq!(opts.len(), 1);
        assert_eq!(opts["after"], ArgValue::Int(1));
    }
}
