/* The two lexical categories recognised through automata. Each builder assembles the category
 * from Thompson combinators; a new category means a new builder here. */

use std::fmt;

use crate::alphabet::{digit_symbols, identifier_start_symbols, identifier_symbols};
use crate::fa::Symbol;
use crate::nfa::NFA;

/// Lexical categories which are backed by an automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Identifier,
    /// `[0-9]+(\.[0-9]+)?`
    Number,
}

impl Grammar {
    pub const ALL: [Grammar; 2] = [Grammar::Identifier, Grammar::Number];

    pub fn construct_nfa(self) -> NFA {
        match self {
            Grammar::Identifier => construct_identifier_nfa(),
            Grammar::Number => construct_number_nfa(),
        }
    }

    /// Lower case name, used for file names and log fields
    pub fn name(self) -> &'static str {
        match self {
            Grammar::Identifier => "identifier",
            Grammar::Number => "number",
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build the NFA for `[A-Za-z_][A-Za-z0-9_]*`
pub fn construct_identifier_nfa() -> NFA {
    let mut nfa = NFA::new();

    let first = nfa.char_class(identifier_start_symbols());
    let rest = nfa.char_class(identifier_symbols());
    let rest = nfa.star(rest);
    let identifier = nfa.concatenate(first, rest);

    nfa.finish(identifier);
    nfa
}

/// Build the NFA for `[0-9]+(\.[0-9]+)?`. The integer and fractional digit runs are separate
/// fragments, so at most one fractional part is accepted.
pub fn construct_number_nfa() -> NFA {
    let mut nfa = NFA::new();

    let integer_digit = nfa.char_class(digit_symbols());
    let integer = nfa.plus(integer_digit);

    let point = nfa.literal(Symbol::Char(b'.'));
    let fraction_digit = nfa.char_class(digit_symbols());
    let fraction_digits = nfa.plus(fraction_digit);
    let fraction = nfa.concatenate(point, fraction_digits);
    let fraction = nfa.optional(fraction);

    let number = nfa.concatenate(integer, fraction);

    nfa.finish(number);
    nfa
}

#[cfg(test)]
mod grammar_tests {
    use super::*;
    use crate::fa::FA;

    #[test]
    fn test_identifier_nfa_shape() {
        let nfa = construct_identifier_nfa();

        // two classes of two states each, plus the star wrapper
        assert_eq!(nfa.get_num_states(), 6);
        assert_eq!(nfa.get_acceptor_states().count_ones(), 1);

        let start = nfa.get_state(nfa.get_start_state()).unwrap();
        assert!(start.get_targets(b'_').len() == 1);
        assert!(start.get_targets(b'7').is_empty());
    }

    #[test]
    fn test_number_nfa_shape() {
        let nfa = construct_number_nfa();

        assert_eq!(nfa.get_acceptor_states().count_ones(), 1);
        let start = nfa.get_state(nfa.get_start_state()).unwrap();
        assert!(start.get_targets(b'.').is_empty());
        assert_eq!(start.get_targets(b'0').len(), 1);

        // exactly one '.' edge in the whole automaton
        let point_edges = (0..nfa.get_num_states())
            .flat_map(|state| nfa.get_state_transitions(state))
            .filter(|(symbol, _)| *symbol == Symbol::Char(b'.'))
            .count();
        assert_eq!(point_edges, 1);
    }

    #[test]
    fn test_grammar_dispatch() {
        assert_eq!(
            Grammar::Identifier.construct_nfa().get_num_states(),
            construct_identifier_nfa().get_num_states()
        );
        assert_eq!(Grammar::Number.to_string(), "number");
        assert_eq!(Grammar::ALL.len(), 2);
    }
}
