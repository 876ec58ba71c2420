//! Score explanations.

use std::fmt;

use serde::Serialize;

/// A node in a score breakdown tree.
///
/// Produced when a search runs with explanations enabled; serializes to
/// JSON for display alongside results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// The value this node contributed.
    pub value: f64,
    /// What the value is.
    pub message: String,
    /// Sub-contributions, for compound values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Explanation>,
}

impl Explanation {
    /// Create a leaf explanation.
    pub fn new<M: Into<String>>(value: f64, message: M) -> Self {
        Explanation {
            value,
            message: message.into(),
            children: Vec::new(),
        }
    }

    /// Create an explanation with sub-contributions.
    pub fn with_children<M: Into<String>>(
        value: f64,
        message: M,
        children: Vec<Explanation>,
    ) -> Self {
        Explanation {
            value,
            message: message.into(),
            children,
        }
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(
            node: &Explanation,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            writeln!(f, "{}{} - {}", "  ".repeat(depth), node.value, node.message)?;
            for child in &node.children {
                render(child, depth + 1, f)?;
            }
            Ok(())
        }
        render(self, 0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_to_json() {
        let expl = Explanation::with_children(
            6.0,
            "sum of:",
            vec![Explanation::new(2.0, "a"), Explanation::new(4.0, "b")],
        );
        let json = serde_json::to_value(&expl).unwrap();
        assert_eq!(json["value"], 6.0);
        assert_eq!(json["children"][1]["message"], "b");
        // leaves omit the empty children array
        assert!(json["children"][0].get("children").is_none());
    }
}
