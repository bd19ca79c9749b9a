// src/import/nested.rs
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Literal a user may type to mark a group as "no restriction".
const EMPTY_GROUP: &str = "[]";

/// Per-adset targeting groups: an ordered list of ordered string lists.
/// An empty group means "no restriction" for that adset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NestedList(pub Vec<Vec<String>>);

impl NestedList {
    /// `[[]]`: a single unrestricted group. Every failed decode lands here.
    pub fn unrestricted() -> Self {
        NestedList(vec![Vec::new()])
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.0
    }
}

impl fmt::Display for NestedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl<S: Into<String>> From<Vec<Vec<S>>> for NestedList {
    fn from(groups: Vec<Vec<S>>) -> Self {
        NestedList(
            groups
                .into_iter()
                .map(|g| g.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// How a cell encodes its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `A, B / / C`: groups split on `/`, items on `,`.
    #[default]
    SlashComma,
    /// `[["A","B"],[],["C"]]`: a JSON literal, as older sheets stored it.
    JsonLiteral,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON literal: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an array of string arrays, got {0}")]
    Shape(String),
}

/// Decode one cell. Never fails: blank input and any decode error both
/// produce [`NestedList::unrestricted`].
pub fn decode(input: &str, dialect: Dialect) -> NestedList {
    if input.trim().is_empty() {
        return NestedList::unrestricted();
    }
    match try_decode(input, dialect) {
        Ok(list) => list,
        Err(e) => {
            debug!(input, error = %e, "falling back to unrestricted list");
            NestedList::unrestricted()
        }
    }
}

pub fn try_decode(input: &str, dialect: Dialect) -> Result<NestedList, DecodeError> {
    match dialect {
        Dialect::SlashComma => Ok(decode_slash_comma(input)),
        Dialect::JsonLiteral => decode_json_literal(input),
    }
}

fn decode_slash_comma(input: &str) -> NestedList {
    let groups = input
        .split('/')
        .map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() || segment == EMPTY_GROUP {
                Vec::new()
            } else {
                segment.split(',').map(|item| item.trim().to_string()).collect()
            }
        })
        .collect();
    NestedList(groups)
}

fn decode_json_literal(input: &str) -> Result<NestedList, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(input.trim())?;
    let outer = value
        .as_array()
        .ok_or_else(|| DecodeError::Shape(value.to_string()))?;

    // a flat list of strings is one group
    if !outer.is_empty() && outer.iter().all(|v| v.is_string()) {
        let group = outer
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        return Ok(NestedList(vec![group]));
    }

    let mut groups = Vec::with_capacity(outer.len());
    for inner in outer {
        let items = inner
            .as_array()
            .ok_or_else(|| DecodeError::Shape(inner.to_string()))?;
        let mut group = Vec::with_capacity(items.len());
        for item in items {
            let s = item
                .as_str()
                .ok_or_else(|| DecodeError::Shape(item.to_string()))?;
            group.push(s.to_string());
        }
        groups.push(group);
    }
    Ok(NestedList(groups))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(groups: Vec<Vec<&str>>) -> NestedList {
        NestedList::from(groups)
    }

    #[test]
    fn blank_input_is_unrestricted() {
        assert_eq!(decode("", Dialect::SlashComma), NestedList::unrestricted());
        assert_eq!(decode("   \t", Dialect::SlashComma), NestedList::unrestricted());
        assert_eq!(decode("", Dialect::JsonLiteral), NestedList::unrestricted());
    }

    #[test]
    fn slash_separates_groups_and_blank_segments_are_empty() {
        assert_eq!(
            decode("A, B / / C", Dialect::SlashComma),
            list(vec![vec!["A", "B"], vec![], vec!["C"]])
        );
    }

    #[test]
    fn no_slash_gives_a_single_group() {
        assert_eq!(decode("A, B", Dialect::SlashComma), list(vec![vec!["A", "B"]]));
        assert_eq!(
            decode("Davao, Mimaropa, Calabrzon", Dialect::SlashComma),
            list(vec![vec!["Davao", "Mimaropa", "Calabrzon"]])
        );
    }

    #[test]
    fn bracket_literal_marks_an_empty_group() {
        assert_eq!(
            decode("[]/A,B", Dialect::SlashComma),
            list(vec![vec![], vec!["A", "B"]])
        );
        assert_eq!(
            decode("[] / Interest1, Interest2 / Interest3", Dialect::SlashComma),
            list(vec![vec![], vec!["Interest1", "Interest2"], vec!["Interest3"]])
        );
    }

    #[test]
    fn blank_items_are_kept() {
        assert_eq!(
            decode("A, ,B", Dialect::SlashComma),
            list(vec![vec!["A", "", "B"]])
        );
        assert_eq!(
            decode("A,B/", Dialect::SlashComma),
            list(vec![vec!["A", "B"], vec![]])
        );
    }

    #[test]
    fn json_literal_decodes_nested_arrays() {
        assert_eq!(
            decode(r#"[["A","B"],[],["C"]]"#, Dialect::JsonLiteral),
            list(vec![vec!["A", "B"], vec![], vec!["C"]])
        );
        assert_eq!(
            decode(r#"["A","B"]"#, Dialect::JsonLiteral),
            list(vec![vec!["A", "B"]])
        );
        assert_eq!(decode("[]", Dialect::JsonLiteral), NestedList(vec![]));
    }

    #[test]
    fn malformed_json_falls_back() {
        assert!(try_decode("[[\"A\"", Dialect::JsonLiteral).is_err());
        assert!(matches!(
            try_decode(r#"[["A", 1]]"#, Dialect::JsonLiteral),
            Err(DecodeError::Shape(_))
        ));
        assert_eq!(decode("A, B", Dialect::JsonLiteral), NestedList::unrestricted());
        assert_eq!(decode(r#"{"a":1}"#, Dialect::JsonLiteral), NestedList::unrestricted());
    }

    #[test]
    fn display_is_compact_json() {
        let l = list(vec![vec![], vec!["A", "B"]]);
        assert_eq!(l.to_string(), r#"[[],["A","B"]]"#);
    }
}
