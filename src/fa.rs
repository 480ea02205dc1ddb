use bitvec::prelude::BitVec;

/// Label of an automaton edge. `Char` holds an ASCII code point, `Epsilon` consumes no input.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Symbol {
    Epsilon,
    Char(u8),
}

/// Read only view over a finite automaton, shared by the NFA and the DFA so that they can be
/// inspected and exported the same way.
pub trait FA {
    fn get_num_states(&self) -> usize;
    fn get_start_state(&self) -> usize;
    fn get_acceptor_states(&self) -> &BitVec<u8>;
    /// Every outgoing edge of a state as (label, destination) pairs, ordered by label.
    fn get_state_transitions(&self, state_id: usize) -> Vec<(Symbol, usize)>;

    fn is_accepting(&self, state_id: usize) -> bool {
        self.get_acceptor_states()
            .get(state_id)
            .map(|bit| *bit)
            .unwrap_or(false)
    }
}
