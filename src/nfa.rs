/* Thompson construction. An NFA is grown in place by the combinators below, each of which
 * consumes one or two fragments of the NFA and returns a new fragment. States are only ever
 * appended, so a state id stays valid for the lifetime of the NFA. */

use bitvec::prelude::*;
use std::collections::BTreeSet;

use crate::alphabet::{in_alphabet, ALPHABET_SIZE};
use crate::fa::{Symbol, FA};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NFAState {
    id: usize,
    transitions: [BTreeSet<usize>; ALPHABET_SIZE], // Indexed by the input symbol
    epsilon: BTreeSet<usize>,
}

#[derive(Debug, Clone)]
pub struct NFA {
    states: Vec<NFAState>,
    start_state: usize,
    accept_states: BitVec<u8>,
}

/// A sub-automaton under construction. The entry has no incoming edges and the exit has no
/// outgoing edges until a combinator links them to something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    entry: usize,
    exit: usize,
}

impl Fragment {
    pub fn get_entry(&self) -> usize {
        self.entry
    }

    pub fn get_exit(&self) -> usize {
        self.exit
    }
}

impl FA for NFA {
    fn get_num_states(&self) -> usize {
        self.states.len()
    }

    fn get_start_state(&self) -> usize {
        self.start_state
    }

    fn get_acceptor_states(&self) -> &BitVec<u8> {
        &self.accept_states
    }

    fn get_state_transitions(&self, state_id: usize) -> Vec<(Symbol, usize)> {
        let state = &self.states[state_id];
        let mut transition_list: Vec<(Symbol, usize)> = state
            .epsilon
            .iter()
            .map(|target| (Symbol::Epsilon, *target))
            .collect();

        for (symbol, targets) in state.transitions.iter().enumerate() {
            for target in targets {
                transition_list.push((Symbol::Char(symbol as u8), *target));
            }
        }
        transition_list
    }
}

impl NFAState {
    fn new(id: usize) -> Self {
        NFAState {
            id,
            transitions: std::array::from_fn(|_| BTreeSet::new()),
            epsilon: BTreeSet::new(),
        }
    }

    fn add_transition(&mut self, symbol: Symbol, to: usize) {
        match symbol {
            Symbol::Epsilon => {
                self.epsilon.insert(to);
            }
            Symbol::Char(ch) if in_alphabet(ch) => {
                self.transitions[ch as usize].insert(to);
            }
            Symbol::Char(_) => {} // Outside the alphabet, this edge could never be taken
        }
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    /// Destinations reachable by consuming `symbol`. Empty for symbols outside the alphabet.
    pub fn get_targets(&self, symbol: u8) -> &BTreeSet<usize> {
        static NO_TARGETS: BTreeSet<usize> = BTreeSet::new();

        self.transitions
            .get(symbol as usize)
            .unwrap_or(&NO_TARGETS)
    }

    pub fn get_epsilon_targets(&self) -> &BTreeSet<usize> {
        &self.epsilon
    }
}

impl Default for NFA {
    fn default() -> Self {
        Self::new()
    }
}

impl NFA {
    pub fn new() -> Self {
        NFA {
            states: Vec::new(),
            start_state: 0,
            accept_states: BitVec::new(),
        }
    }

    fn add_state(&mut self) -> usize {
        let state_id = self.states.len();
        self.states.push(NFAState::new(state_id));
        self.accept_states.push(false);
        state_id
    }

    fn add_transition(&mut self, from: usize, symbol: Symbol, to: usize) {
        self.states[from].add_transition(symbol, to);
    }

    /// Returns the state with the provided id, if there is one
    pub fn get_state(&self, id: usize) -> Option<&NFAState> {
        self.states.get(id)
    }

    pub fn get_states(&self) -> &[NFAState] {
        &self.states
    }

    /// Two new states joined by a single edge labelled `symbol`. `Symbol::Epsilon` yields a no-op
    /// fragment.
    pub fn literal(&mut self, symbol: Symbol) -> Fragment {
        let entry = self.add_state();
        let exit = self.add_state();
        self.add_transition(entry, symbol, exit);
        Fragment { entry, exit }
    }

    /// Two new states with one edge per symbol in `symbols`, all into the same exit. An empty set
    /// gives a fragment whose exit can never be reached.
    pub fn char_class<I>(&mut self, symbols: I) -> Fragment
    where
        I: IntoIterator<Item = u8>,
    {
        let entry = self.add_state();
        let exit = self.add_state();

        for symbol in symbols {
            self.add_transition(entry, Symbol::Char(symbol), exit);
        }
        Fragment { entry, exit }
    }

    /// `a` followed by `b`
    pub fn concatenate(&mut self, a: Fragment, b: Fragment) -> Fragment {
        self.add_transition(a.exit, Symbol::Epsilon, b.entry);
        Fragment {
            entry: a.entry,
            exit: b.exit,
        }
    }

    /// `a | b`
    pub fn alternation(&mut self, a: Fragment, b: Fragment) -> Fragment {
        let entry = self.add_state();
        let exit = self.add_state();

        self.add_transition(entry, Symbol::Epsilon, a.entry);
        self.add_transition(entry, Symbol::Epsilon, b.entry);
        self.add_transition(a.exit, Symbol::Epsilon, exit);
        self.add_transition(b.exit, Symbol::Epsilon, exit);
        Fragment { entry, exit }
    }

    /// `a*`
    pub fn star(&mut self, a: Fragment) -> Fragment {
        let entry = self.add_state();
        let exit = self.add_state();

        self.add_transition(entry, Symbol::Epsilon, a.entry);
        self.add_transition(entry, Symbol::Epsilon, exit); // Zero repetitions
        self.add_transition(a.exit, Symbol::Epsilon, a.entry); // Loop back
        self.add_transition(a.exit, Symbol::Epsilon, exit);
        Fragment { entry, exit }
    }

    /// `a+`, built as `a a*` over the same states of `a`. The repetition is carried by epsilon
    /// edges only, no symbol edge is duplicated.
    pub fn plus(&mut self, a: Fragment) -> Fragment {
        let repeated = self.star(a);
        self.concatenate(a, repeated)
    }

    /// `a?`
    pub fn optional(&mut self, a: Fragment) -> Fragment {
        let entry = self.add_state();
        let exit = self.add_state();

        self.add_transition(entry, Symbol::Epsilon, a.entry);
        self.add_transition(entry, Symbol::Epsilon, exit);
        self.add_transition(a.exit, Symbol::Epsilon, exit);
        Fragment { entry, exit }
    }

    /// Make the fragment the whole automaton: its entry becomes the start state and its exit the
    /// only accepting state.
    pub fn finish(&mut self, fragment: Fragment) {
        self.accept_states.fill(false);
        self.start_state = fragment.entry;
        self.accept_states.set(fragment.exit, true);

        tracing::debug!(
            states = self.states.len(),
            start = self.start_state,
            accept = fragment.exit,
            "finished NFA"
        );
    }
}
