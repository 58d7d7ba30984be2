//! Manifest header clause parsing
//!
//! A header value is a comma separated list of clauses. Each clause holds one
//! or more paths followed by `key=value` attributes and `key:=value`
//! directives, all separated by semicolons:
//!
//! ```text
//! com.acme.api;com.acme.spi;version="1.2";uses:="com.acme.util", com.acme.impl
//! ```

use indexmap::IndexMap;

use crate::error::ParseError;
use super::parameters::Parameters;

/// One clause of a manifest header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    pub paths: Vec<String>,
    pub parameters: Parameters,
}

/// Parse a header value into clauses. An empty value yields no clauses.
pub fn parse_header(header: &str, value: &str) -> Result<Vec<Clause>, ParseError> {
    let invalid = |reason: String| ParseError::InvalidHeader {
        header: header.to_string(),
        reason,
    };

    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = Vec::new();
    for raw_clause in split_unquoted(value, ',').map_err(invalid)? {
        let mut clause = Clause::default();
        let mut attributes = IndexMap::new();
        let mut directives = IndexMap::new();

        for part in split_unquoted(raw_clause, ';').map_err(invalid)? {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid(format!("empty element in clause \"{}\"", raw_clause.trim())));
            }

            match find_unquoted(part, '=') {
                None => {
                    if !attributes.is_empty() || !directives.is_empty() {
                        return Err(invalid(format!("path \"{}\" follows a parameter", part)));
                    }
                    clause.paths.push(unquote(part).to_string());
                }
                Some(pos) => {
                    let (key, is_directive) = match part[..pos].strip_suffix(':') {
                        Some(key) => (key.trim(), true),
                        None => (part[..pos].trim(), false),
                    };
                    if key.is_empty() || key.contains(char::is_whitespace) {
                        return Err(invalid(format!("invalid parameter name in \"{}\"", part)));
                    }
                    let value = unquote(part[pos + 1..].trim()).to_string();
                    let target = if is_directive { &mut directives } else { &mut attributes };
                    if target.insert(key.to_string(), value).is_some() {
                        return Err(invalid(format!("duplicate parameter \"{}\"", key)));
                    }
                }
            }
        }

        if clause.paths.is_empty() {
            return Err(invalid(format!("clause \"{}\" names no path", raw_clause.trim())));
        }
        clause.parameters = Parameters::new(attributes, directives);
        clauses.push(clause);
    }

    Ok(clauses)
}

/// Split a comma separated directive value such as `uses:="a,b"`
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_unquoted(input: &str, separator: char) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == separator && !in_quotes {
            parts.push(&input[start..idx]);
            start = idx + ch.len_utf8();
        }
    }

    if in_quotes {
        return Err(format!("unterminated quote in \"{}\"", input.trim()));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn find_unquoted(input: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in input.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == needle && !in_quotes {
            return Some(idx);
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_clause() {
        let clauses = parse_header("Export-Package", "com.acme.api;version=1.2").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].paths, vec!["com.acme.api"]);
        assert_eq!(clauses[0].parameters.attribute("version"), Some("1.2"));
    }

    #[test]
    fn test_parse_multiple_paths_and_clauses() {
        let clauses = parse_header(
            "Export-Package",
            "a;b;version=\"1.0\";uses:=\"c,d\", e ; mandatory:=vendor;vendor=acme",
        )
        .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].paths, vec!["a", "b"]);
        assert_eq!(clauses[0].parameters.directive("uses"), Some("c,d"));
        assert_eq!(clauses[1].paths, vec!["e"]);
        assert_eq!(clauses[1].parameters.directive("mandatory"), Some("vendor"));
        assert_eq!(clauses[1].parameters.attribute("vendor"), Some("acme"));
    }

    #[test]
    fn test_quoted_separators_are_literal() {
        let clauses = parse_header("Import-Package", "p;version=\"[1.0,2.0)\";note=\"x;y\"").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].parameters.attribute("version"), Some("[1.0,2.0)"));
        assert_eq!(clauses[0].parameters.attribute("note"), Some("x;y"));
    }

    #[test]
    fn test_empty_header() {
        assert!(parse_header("Import-Package", "  ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_headers() {
        for value in [
            "p;version=\"1.0",
            "p;;q",
            "version=1.0",
            "p;version=1.0;q",
            "p;=1",
            "p;version=1;version=2",
            "p,,q",
        ] {
            assert!(
                matches!(parse_header("Import-Package", value), Err(ParseError::InvalidHeader { .. })),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
