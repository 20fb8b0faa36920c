//! DOT export of timed automata
//!
//! Only available with the `dot` feature. The produced graphs can be
//! rendered with Graphviz or any tool understanding the DOT language.

use std::fmt;

use vigil_display_utils::{comma_joined, indented};

use crate::ta::TimedAutomaton;

/// Graph-level attributes shared by all exported graphs.
const GRAPH_ATTRIBUTES: &str =
    "rankdir=LR fontname=\"Helvetica,Arial,sans-serif\" node [fontname=\"Helvetica,Arial,sans-serif\"];";

/// Types that can be rendered as a DOT graph.
pub trait ToDot {
    /// Render the object as a DOT digraph.
    fn to_dot(&self) -> String;
}

impl<L, A> ToDot for TimedAutomaton<L, A>
where
    L: Clone + Ord + fmt::Debug + fmt::Display,
    A: Clone + Ord + fmt::Debug + fmt::Display,
{
    fn to_dot(&self) -> String {
        let mut body = String::new();
        body.push_str(GRAPH_ATTRIBUTES);
        body.push('\n');
        for location in self.locations() {
            let shape = if self.is_final_location(location) {
                "doublecircle"
            } else {
                "circle"
            };
            body.push_str(&format!("\"{location}\" [shape = {shape}];\n"));
        }
        body.push_str(&format!(
            "init [shape = point]; init -> \"{}\";\n",
            self.initial_location()
        ));
        for transition in self.transitions() {
            let guards = comma_joined(
                transition.guards.iter().map(|(c, g)| format!("{c} {g}")),
                " && ",
            );
            let resets = comma_joined(transition.resets.iter().map(|c| format!("{c} := 0")), ", ");
            let mut label = transition.symbol.to_string();
            if !guards.is_empty() {
                label.push_str(&format!("\\n{guards}"));
            }
            if !resets.is_empty() {
                label.push_str(&format!("\\n{resets}"));
            }
            body.push_str(&format!(
                "\"{}\" -> \"{}\" [label = \"{label}\"];\n",
                transition.source, transition.target
            ));
        }
        format!("digraph {{\n{}}}\n", indented(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ta::Transition;

    #[test]
    fn dot_output_contains_all_components() {
        let mut ta = TimedAutomaton::new(
            ["a".to_string()],
            "s0".to_string(),
            ["s1".to_string()],
        );
        ta.add_clock("x");
        ta.add_transition(Transition::unguarded(
            "s0".to_string(),
            "a".to_string(),
            "s1".to_string(),
        ))
        .unwrap();
        let dot = ta.to_dot();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"s0\" -> \"s1\""));
        assert!(dot.contains("doublecircle"));
    }
}
