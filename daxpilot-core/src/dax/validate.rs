//! Surface-level sanity checks on DAX text
//!
//! These checks never block execution; the service is the real parser.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One problem found in a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaxIssue {
    Empty,
    MissingEvaluate,
    UnbalancedBrackets { open: usize, close: usize },
    UnbalancedParentheses { open: usize, close: usize },
}

impl fmt::Display for DaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "DAX query is empty"),
            Self::MissingEvaluate => write!(f, "DAX query must contain EVALUATE"),
            Self::UnbalancedBrackets { open, close } => {
                write!(f, "Unmatched brackets in DAX query ({} '[' vs {} ']')", open, close)
            }
            Self::UnbalancedParentheses { open, close } => write!(
                f,
                "Unmatched parentheses in DAX query ({} '(' vs {} ')')",
                open, close
            ),
        }
    }
}

/// Outcome of [`validate_dax`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaxValidation {
    pub issues: Vec<DaxIssue>,
}

impl DaxValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Default)]
struct Balance {
    open: usize,
    close: usize,
    depth: isize,
    underflow: bool,
}

impl Balance {
    fn push(&mut self) {
        self.open += 1;
        self.depth += 1;
    }

    fn pop(&mut self) {
        self.close += 1;
        self.depth -= 1;
        if self.depth < 0 {
            self.underflow = true;
        }
    }

    fn is_balanced(&self) -> bool {
        self.depth == 0 && !self.underflow
    }
}

/// Check a query and collect every issue found.
///
/// An empty query reports only [`DaxIssue::Empty`]. Characters inside
/// double-quoted string literals are not counted.
pub fn validate_dax(query: &str) -> DaxValidation {
    if query.trim().is_empty() {
        return DaxValidation {
            issues: vec![DaxIssue::Empty],
        };
    }

    let mut issues = Vec::new();
    if !query.to_uppercase().contains("EVALUATE") {
        issues.push(DaxIssue::MissingEvaluate);
    }

    let mut brackets = Balance::default();
    let mut parens = Balance::default();
    let mut in_string = false;

    // "" inside a literal toggles twice and so stays inside
    for c in query.chars() {
        match c {
            '"' => in_string = !in_string,
            _ if in_string => {}
            '[' => brackets.push(),
            ']' => brackets.pop(),
            '(' => parens.push(),
            ')' => parens.pop(),
            _ => {}
        }
    }

    if !brackets.is_balanced() {
        issues.push(DaxIssue::UnbalancedBrackets {
            open: brackets.open,
            close: brackets.close,
        });
    }
    if !parens.is_balanced() {
        issues.push(DaxIssue::UnbalancedParentheses {
            open: parens.open,
            close: parens.close,
        });
    }

    DaxValidation { issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("EVALUATE ROW(\"Total\", [Total Revenue])" ; "row with measure")]
    #[test_case("evaluate Sales" ; "lowercase keyword")]
    #[test_case("EVALUATE ROW(\"a)b\", 1)" ; "paren inside string")]
    #[test_case("EVALUATE ROW(\"say \"\"[hi\"\"\", 1)" ; "escaped quotes")]
    fn test_valid(query: &str) {
        assert!(validate_dax(query).is_valid(), "{query}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(validate_dax("   ").issues, vec![DaxIssue::Empty]);
    }

    #[test]
    fn test_missing_evaluate() {
        assert_eq!(
            validate_dax("SUM(Sales[Amount])").issues,
            vec![DaxIssue::MissingEvaluate]
        );
    }

    #[test]
    fn test_all_issues_collected() {
        let result = validate_dax("SUMMARIZE(Sales[Amount");
        assert_eq!(
            result.issues,
            vec![
                DaxIssue::MissingEvaluate,
                DaxIssue::UnbalancedBrackets { open: 1, close: 0 },
                DaxIssue::UnbalancedParentheses { open: 1, close: 0 },
            ]
        );
    }

    #[test]
    fn test_closing_before_opening() {
        let result = validate_dax("EVALUATE ROW)(");
        assert_eq!(
            result.issues,
            vec![DaxIssue::UnbalancedParentheses { open: 1, close: 1 }]
        );
    }

    #[test]
    fn test_issue_messages() {
        assert_eq!(DaxIssue::Empty.to_string(), "DAX query is empty");
        assert!(DaxIssue::UnbalancedBrackets { open: 2, close: 1 }
            .to_string()
            .starts_with("Unmatched brackets"));
    }
}
