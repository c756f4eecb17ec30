//! Textual dependency-graph format.
//!
//! One node per line, children indented by two spaces relative to their
//! parent, an artificial root rendered as `*`. A node line is the
//! coordinate with the scope appended:
//!
//! ```text
//! gid:aid:ext:version[:scope]
//! gid:aid:ext:classifier:version:scope
//! ```
//!
//! Five fields always read as version-plus-scope; a classifier therefore
//! forces the six-field form, with a trailing empty scope when none is set.
//! The format captures coordinates and scopes, which is exactly the
//! structural identity of a graph; reparsing serialized output yields a
//! structurally equal graph.

use std::collections::BTreeMap;
use thiserror::Error;

use quarry_core::{Coordinate, Dependency};

use crate::graph::{DependencyGraph, Node, NodeId};

/// Failures while parsing the textual graph format.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("empty graph text")]
    Empty,
}

impl ParseError {
    fn at(line: usize, message: impl Into<String>) -> Self {
        ParseError::Line {
            line: line + 1,
            message: message.into(),
        }
    }
}

impl DependencyGraph {
    /// Render the graph in the line-per-node text format.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(self.root(), 0)];
        while let Some((id, level)) = stack.pop() {
            let node = self.node(id);
            for _ in 0..level {
                out.push_str("  ");
            }
            out.push_str(&render_line(node.dependency()));
            out.push('\n');
            for &child in node.children().iter().rev() {
                stack.push((child, level + 1));
            }
        }
        out
    }
}

fn render_line(dependency: Option<&Dependency>) -> String {
    let Some(dependency) = dependency else {
        return "*".to_string();
    };
    let c = &dependency.coordinate;
    let scope = &dependency.scope;
    if c.classifier.is_empty() {
        if scope.is_empty() {
            format!("{}:{}:{}:{}", c.group_id, c.artifact_id, c.extension, c.version)
        } else {
            format!(
                "{}:{}:{}:{}:{}",
                c.group_id, c.artifact_id, c.extension, c.version, scope
            )
        }
    } else {
        format!(
            "{}:{}:{}:{}:{}:{}",
            c.group_id, c.artifact_id, c.extension, c.classifier, c.version, scope
        )
    }
}

/// Parse the text format back into a graph.
///
/// # Errors
///
/// Fails on malformed node lines, inconsistent indentation or empty input.
pub fn parse_text(text: &str) -> Result<DependencyGraph, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((first_index, first_line)) = lines.next() else {
        return Err(ParseError::Empty);
    };
    if indent_of(first_line, first_index)? != 0 {
        return Err(ParseError::at(first_index, "root must not be indented"));
    }
    let mut graph = DependencyGraph::new(Node::new(parse_line(
        first_line.trim_start(),
        first_index,
    )?));

    // (node, level) of the open ancestors, innermost last
    let mut ancestry: Vec<(NodeId, usize)> = vec![(graph.root(), 0)];

    for (index, line) in lines {
        let level = indent_of(line, index)?;
        if level == 0 {
            return Err(ParseError::at(index, "multiple roots"));
        }
        while ancestry.last().is_some_and(|&(_, l)| l >= level) {
            ancestry.pop();
        }
        let Some(&(parent, parent_level)) = ancestry.last() else {
            return Err(ParseError::at(index, "indentation without a parent"));
        };
        if level != parent_level + 1 {
            return Err(ParseError::at(index, "indentation jumps more than one level"));
        }
        let dependency = parse_line(line.trim_start(), index)?;
        let id = graph.add_child(parent, Node::new(dependency));
        ancestry.push((id, level));
    }

    Ok(graph)
}

fn indent_of(line: &str, index: usize) -> Result<usize, ParseError> {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    if spaces % 2 != 0 {
        return Err(ParseError::at(index, "indentation must be a multiple of two spaces"));
    }
    Ok(spaces / 2)
}

fn parse_line(line: &str, index: usize) -> Result<Option<Dependency>, ParseError> {
    if line == "*" {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(':').collect();
    let (group, artifact, extension, classifier, version, scope) = match fields.as_slice() {
        [g, a, v] => (*g, *a, "jar", "", *v, ""),
        [g, a, e, v] => (*g, *a, *e, "", *v, ""),
        [g, a, e, v, s] => (*g, *a, *e, "", *v, *s),
        [g, a, e, c, v, s] => (*g, *a, *e, *c, *v, *s),
        _ => return Err(ParseError::at(index, format!("malformed node line '{line}'"))),
    };
    if group.is_empty() || artifact.is_empty() || version.is_empty() {
        return Err(ParseError::at(index, format!("malformed node line '{line}'")));
    }
    let coordinate = Coordinate {
        group_id: group.to_string(),
        artifact_id: artifact.to_string(),
        extension: extension.to_string(),
        classifier: classifier.to_string(),
        version: version.to_string(),
        properties: BTreeMap::new(),
    };
    Ok(Some(Dependency::new(coordinate).with_scope(scope)))
}
