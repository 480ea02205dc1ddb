/* Textual views of the automata: a per state summary for DFAs and a Graphviz DOT rendering for
 * any FA. Edges between the same pair of states are merged into one labelled edge. */

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use color_eyre::eyre::Result;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::alphabet::format_symbol_set;
use crate::dfa::DFA;
use crate::fa::{Symbol, FA};

#[derive(Debug, PartialEq, Eq)]
pub enum InspectError {
    /// The state index is not a state of the automaton
    InvalidState(usize),
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectError::InvalidState(state) => {
                write!(f, "Error: State {} does not exist in the automaton!", state)
            }
        }
    }
}

impl std::error::Error for InspectError {}

/// Symbols on the edges leaving `state`, grouped by destination
fn group_transitions<T: FA>(fa: &T, state: usize) -> BTreeMap<usize, (bool, Vec<u8>)> {
    let mut grouped: BTreeMap<usize, (bool, Vec<u8>)> = BTreeMap::new();

    for (symbol, target) in fa.get_state_transitions(state) {
        let entry = grouped.entry(target).or_default();
        match symbol {
            Symbol::Epsilon => entry.0 = true,
            Symbol::Char(ch) => entry.1.push(ch),
        }
    }
    grouped
}

fn edge_label(has_epsilon: bool, symbols: Vec<u8>) -> String {
    let label = format_symbol_set(symbols);

    match (has_epsilon, label.is_empty()) {
        (false, _) => label,
        (true, true) => "ε".to_string(),
        (true, false) => format!("ε,{}", label),
    }
}

/// Describe a DFA state: whether it starts or accepts, which NFA states it stands for and where
/// each of its symbols leads.
pub fn describe_state(dfa: &DFA, state_id: usize) -> Result<String, InspectError> {
    let state = dfa
        .get_state(state_id)
        .ok_or(InspectError::InvalidState(state_id))?;

    let mut info = format!("State {}", state_id);

    if state_id == dfa.get_start_state() {
        info.push_str(" (start)");
    }
    if dfa.is_accepting(state_id) {
        info.push_str(" (accept)");
    }
    info.push('\n');

    let nfa_states: Vec<String> = state
        .get_nfa_states()
        .iter_ones()
        .map(|nfa_state| nfa_state.to_string())
        .collect();
    info.push_str(&format!("NFA set: {{ {} }}\n", nfa_states.join(", ")));

    info.push_str("Outgoing:\n");
    for (target, (has_epsilon, symbols)) in group_transitions(dfa, state_id) {
        info.push_str(&format!(" -> {}: {}\n", target, edge_label(has_epsilon, symbols)));
    }

    Ok(info)
}

/// Render the automaton in Graphviz DOT format
pub fn to_dot<T: FA>(fa: &T) -> String {
    let mut graph: DiGraph<String, String> = DiGraph::new();

    let num_states = fa.get_num_states();

    for state_idx in 0..num_states {
        let mut node_label = format!("State {}", state_idx);

        if fa.is_accepting(state_idx) {
            node_label = format!("Accept\n{}", node_label);
        }
        if state_idx == fa.get_start_state() {
            node_label = format!("Start\n{}", node_label);
        }
        graph.add_node(node_label);
    }

    for state_idx in 0..num_states {
        for (target, (has_epsilon, symbols)) in group_transitions(fa, state_idx) {
            graph.add_edge(
                NodeIndex::new(state_idx),
                NodeIndex::new(target),
                edge_label(has_epsilon, symbols),
            );
        }
    }

    Dot::new(&graph).to_string()
}

/// Write the DOT rendering of the automaton to `file_name`
pub fn save_dot<T: FA, P: AsRef<Path>>(fa: &T, file_name: P) -> Result<()> {
    let mut dot_file = File::create(file_name.as_ref())?;

    dot_file.write_all(to_dot(fa).as_bytes())?;

    tracing::info!(path = %file_name.as_ref().display(), "saved automaton graph");
    Ok(())
}

#[cfg(test)]
mod inspect_tests {
    use super::*;
    use crate::dfa::construct_dfa;
    use crate::grammar::{construct_identifier_nfa, construct_number_nfa};

    #[test]
    fn test_describe_identifier_state() {
        let dfa = construct_dfa(&construct_identifier_nfa());

        let info = describe_state(&dfa, 1).unwrap();

        assert_eq!(
            info,
            "State 1 (accept)\nNFA set: { 1, 2, 4, 5 }\nOutgoing:\n -> 2: 0-9,A-Z,_,a-z\n"
        );
    }

    #[test]
    fn test_describe_start_state() {
        let dfa = construct_dfa(&construct_number_nfa());

        let info = describe_state(&dfa, 0).unwrap();

        assert!(info.starts_with("State 0 (start)\n"));
        assert!(info.contains(" -> 1: 0-9\n"));
    }

    #[test]
    fn test_describe_invalid_state() {
        let dfa = construct_dfa(&construct_number_nfa());

        assert_eq!(
            describe_state(&dfa, 42),
            Err(InspectError::InvalidState(42))
        );
    }

    #[test]
    fn test_dot_merges_edges() {
        let dfa = construct_dfa(&construct_identifier_nfa());

        let dot = to_dot(&dfa);

        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("State 2"));
        // one edge per (from, to) pair: 0->1, 1->2, 2->2
        assert_eq!(dot.matches("->").count(), 3);
        assert!(dot.contains("0-9,A-Z,_,a-z"));
    }

    #[test]
    fn test_dot_for_nfa_shows_epsilon() {
        let nfa = construct_number_nfa();

        let dot = to_dot(&nfa);

        assert!(dot.contains("ε"));
        assert!(dot.contains("0-9"));
    }
}
