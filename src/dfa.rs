/* Perform subset construction to convert an NFA into a DFA, then drop every DFA state which
 * cannot be reached from the start state and renumber the survivors densely. */

use crate::alphabet::{in_alphabet, ALPHABET_SIZE};
use crate::fa::{Symbol, FA};
use crate::nfa::NFA;
use bitvec::prelude::*;
use color_eyre::eyre::{Report, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::fs::File;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{BufReader, Write};
use std::path::Path;

/// A struct which is a bitvec and its hash stored together to ease fetching the hash of the bitvec
/// quickly instead of calculating it each time.

#[derive(Clone)]
struct HashedBitVec {
    bv: BitVec<u8>,
    hash: u64,
}

impl HashedBitVec {
    fn new(bv: BitVec<u8>) -> Self {
        let mut hasher = DefaultHasher::new();
        bv.hash(&mut hasher);
        let hash = hasher.finish();
        Self { bv, hash }
    }
}

impl Hash for HashedBitVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for HashedBitVec {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bv == other.bv
    }
}

impl Eq for HashedBitVec {}

/// List of possible errors when loading a saved DFA
#[derive(Debug, PartialEq, Eq)]
pub enum DFAError {
    /// The DFA has no states at all
    NoStates,
    /// The start state is not state 0
    InvalidStartState(usize),
    /// The state cannot be reached from the start state
    UnreachableState(usize),
    /// A transition points outside the DFA
    InvalidTransition {
        state: usize,
        symbol: u8,
        target: usize,
    },
    /// The accept state bit-set does not cover exactly the DFA's states
    AcceptStatesMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for DFAError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DFAError::NoStates => write!(f, "Error: The DFA does not contain any states!"),
            DFAError::InvalidStartState(start) => {
                write!(f, "Error: Start state {} is not the first state of the DFA!", start)
            }
            DFAError::UnreachableState(state) => {
                write!(f, "Error: State {} cannot be reached from the start state!", state)
            }
            DFAError::InvalidTransition {
                state,
                symbol,
                target,
            } => write!(
                f,
                "Error: Transition from state {} on symbol {} leads to missing state {}!",
                state, symbol, target
            ),
            DFAError::AcceptStatesMismatch { expected, found } => write!(
                f,
                "Error: Expected accept flags for {} states but found {}!",
                expected, found
            ),
        }
    }
}

impl std::error::Error for DFAError {}

fn serialize_transitions<S>(
    transitions: &[Option<usize>; ALPHABET_SIZE],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeMap;

    let num_transitions = transitions.iter().flatten().count();
    let mut ser_map = serializer.serialize_map(Some(num_transitions))?;

    for (symbol, target) in transitions.iter().enumerate() {
        if let Some(target) = target {
            ser_map.serialize_entry(&(symbol as u8), target)?;
        }
    }
    ser_map.end()
}

fn deserialize_transitions<'de, D>(
    deserializer: D,
) -> Result<[Option<usize>; ALPHABET_SIZE], D::Error>
where
    D: Deserializer<'de>,
{
    let transition_table: BTreeMap<u8, usize> = BTreeMap::deserialize(deserializer)?;

    let mut transitions = [None; ALPHABET_SIZE];

    for (symbol, target) in transition_table {
        if !in_alphabet(symbol) {
            return Err(serde::de::Error::custom(format!(
                "Invalid transition symbol {} outside the ASCII alphabet",
                symbol
            )));
        }
        transitions[symbol as usize] = Some(target);
    }

    Ok(transitions)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DFA {
    states: Vec<DFAState>,
    start_state: usize,
    accept_states: BitVec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DFAState {
    #[serde(
        serialize_with = "serialize_transitions",
        deserialize_with = "deserialize_transitions"
    )]
    transitions: [Option<usize>; ALPHABET_SIZE], // At most one destination per symbol
    nfa_states: BitVec<u8>, // The NFA states this DFA state stands for
}

impl FA for DFA {
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
        self.states[state_id]
            .get_transitions()
            .map(|(symbol, target)| (Symbol::Char(symbol), target))
            .collect()
    }
}

impl DFAState {
    fn new(nfa_states: BitVec<u8>) -> Self {
        DFAState {
            transitions: [None; ALPHABET_SIZE],
            nfa_states,
        }
    }

    /// The destination on `symbol`, if this state has one
    pub fn get_transition(&self, symbol: u8) -> Option<usize> {
        self.transitions.get(symbol as usize).copied().flatten()
    }

    /// All outgoing transitions as (symbol, destination), ordered by symbol
    pub fn get_transitions(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.transitions
            .iter()
            .enumerate()
            .filter_map(|(symbol, target)| target.map(|target| (symbol as u8, target)))
    }

    /// The set of NFA states this DFA state was built from
    pub fn get_nfa_states(&self) -> &BitVec<u8> {
        &self.nfa_states
    }
}

impl DFA {
    fn new() -> Self {
        DFA {
            states: Vec::new(),
            start_state: 0,
            accept_states: BitVec::new(),
        }
    }

    fn add_state(&mut self, nfa_states: BitVec<u8>) -> usize {
        let state_id = self.states.len();
        self.states.push(DFAState::new(nfa_states));
        self.accept_states.push(false);
        state_id
    }

    /// Returns a reference to the DFA state whose id is provided
    pub fn get_state(&self, id: usize) -> Option<&DFAState> {
        self.states.get(id)
    }

    /// Returns a list of all states present in the DFA
    pub fn get_states(&self) -> &[DFAState] {
        &self.states
    }

    /// Follow the transition out of `state` on `symbol`
    #[inline]
    pub fn next_state(&self, state: usize, symbol: u8) -> Option<usize> {
        self.states.get(state)?.get_transition(symbol)
    }

    /// Save the DFA as pretty printed JSON
    pub fn save<P: AsRef<Path>>(&self, file_name: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;

        let mut file = File::create(file_name)?;

        writeln!(file, "{}", json_string)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), DFAError> {
        let num_states = self.states.len();

        if num_states == 0 {
            return Err(DFAError::NoStates);
        }

        if self.start_state != 0 {
            return Err(DFAError::InvalidStartState(self.start_state));
        }

        if self.accept_states.len() != num_states {
            return Err(DFAError::AcceptStatesMismatch {
                expected: num_states,
                found: self.accept_states.len(),
            });
        }

        for (state_id, state) in self.states.iter().enumerate() {
            for (symbol, target) in state.get_transitions() {
                if target >= num_states {
                    return Err(DFAError::InvalidTransition {
                        state: state_id,
                        symbol,
                        target,
                    });
                }
            }
        }

        let mut visited: BitVec<u8> = BitVec::repeat(false, num_states);
        let mut queue: VecDeque<usize> = VecDeque::from([self.start_state]);
        visited.set(self.start_state, true);

        while let Some(state_id) = queue.pop_front() {
            for (_, target) in self.states[state_id].get_transitions() {
                if !visited[target] {
                    visited.set(target, true);
                    queue.push_back(target);
                }
            }
        }

        match visited.first_zero() {
            Some(orphan) => Err(DFAError::UnreachableState(orphan)),
            None => Ok(()),
        }
    }
}

/// Load a DFA from a JSON file written by [`DFA::save`]. The loaded DFA is checked to be well
/// formed before it is returned.
pub fn load_dfa<P: AsRef<Path>>(file_name: P) -> Result<DFA> {
    let file = File::open(file_name)?;

    let buf_reader = BufReader::new(file);

    let dfa: DFA = serde_json::from_reader(buf_reader)?;

    if let Err(err) = dfa.validate() {
        return Err(Report::new(err));
    }
    Ok(dfa)
}

/// Returns the smallest superset of `nfa_states` which is closed under epsilon transitions
pub fn epsilon_closure(nfa: &NFA, nfa_states: &BitVec<u8>) -> BitVec<u8> {
    let num_states = nfa.get_num_states();

    let mut closure: BitVec<u8> = BitVec::repeat(false, num_states);
    let mut work_list: Vec<usize> = Vec::new();

    for state in nfa_states.iter_ones().filter(|state| *state < num_states) {
        closure.set(state, true);
        work_list.push(state);
    }

    while let Some(state) = work_list.pop() {
        let Some(state) = nfa.get_state(state) else {
            continue;
        };

        for &target in state.get_epsilon_targets() {
            if !closure[target] {
                closure.set(target, true);
                work_list.push(target);
            }
        }
    }

    closure
}

/// Returns the set of states reachable from `nfa_states` by consuming exactly `symbol`. Epsilon
/// edges are not followed.
pub fn delta(nfa: &NFA, nfa_states: &BitVec<u8>, symbol: u8) -> BitVec<u8> {
    let mut result = BitVec::repeat(false, nfa.get_num_states());

    for node in nfa_states.iter_ones() {
        let Some(nfa_state) = nfa.get_state(node) else {
            continue;
        };

        for &target in nfa_state.get_targets(symbol) {
            result.set(target, true);
        }
    }
    result
}

fn is_accepting_set(nfa: &NFA, nfa_states: &BitVec<u8>) -> bool {
    nfa_states.iter_ones().any(|state| nfa.is_accepting(state))
}

/// Keep only the states reachable from the start state and renumber them 0..k in their original
/// relative order.
fn prune_unreachable(dfa: DFA) -> DFA {
    let num_states = dfa.states.len();
    let mut visited: BitVec<u8> = BitVec::repeat(false, num_states);
    let mut queue: VecDeque<usize> = VecDeque::new();

    if dfa.start_state < num_states {
        visited.set(dfa.start_state, true);
        queue.push_back(dfa.start_state);
    }

    while let Some(state_id) = queue.pop_front() {
        for (_, target) in dfa.states[state_id].get_transitions() {
            if !visited[target] {
                visited.set(target, true);
                queue.push_back(target);
            }
        }
    }

    let reorder_map: HashMap<usize, usize> = visited
        .iter_ones()
        .enumerate()
        .map(|(new_id, old_id)| (old_id, new_id))
        .collect();

    let mut result = DFA::new();

    for (old_id, state) in dfa.states.into_iter().enumerate() {
        if !visited[old_id] {
            continue;
        }

        let new_id = result.add_state(state.nfa_states);

        for (symbol, target) in state.transitions.iter().enumerate() {
            if let Some(target) = target {
                result.states[new_id].transitions[symbol] = reorder_map.get(target).copied();
            }
        }

        if dfa.accept_states[old_id] {
            result.accept_states.set(new_id, true);
        }
    }

    result.start_state = reorder_map.get(&dfa.start_state).copied().unwrap_or(0);

    if num_states != result.states.len() {
        tracing::debug!(
            removed = num_states - result.states.len(),
            "pruned unreachable DFA states"
        );
    }

    result
}

///  Apply the subset construction algorithm on an NFA to build a DFA over the ASCII alphabet.
///  DFA states are numbered in the order they are discovered, starting with the epsilon closure
///  of the NFA's start state as state 0.
pub fn construct_dfa(nfa: &NFA) -> DFA {
    let mut result = DFA::new();

    let mut q_list: HashMap<HashedBitVec, usize> = HashMap::new(); // Mapping from nfa state set to DFA state

    let mut nfa_states = BitVec::repeat(false, nfa.get_num_states());
    if nfa.get_start_state() < nfa.get_num_states() {
        nfa_states.set(nfa.get_start_state(), true);
    }

    let q0 = HashedBitVec::new(epsilon_closure(nfa, &nfa_states));
    let d0 = result.add_state(q0.bv.clone());
    result.start_state = d0;
    if is_accepting_set(nfa, &q0.bv) {
        result.accept_states.set(d0, true);
    }
    q_list.insert(q0, d0);

    // Every state below `next` has had all its transitions computed, the states from `next`
    // onwards form the work list.
    let mut next = 0;

    while next < result.states.len() {
        for symbol in 0..ALPHABET_SIZE as u8 {
            let end_states = delta(nfa, &result.states[next].nfa_states, symbol);
            if end_states.not_any() {
                continue;
            }

            let t = HashedBitVec::new(epsilon_closure(nfa, &end_states));

            let di = if let Some(&existing_di) = q_list.get(&t) {
                existing_di
            } else {
                let di = result.add_state(t.bv.clone());

                if is_accepting_set(nfa, &t.bv) {
                    result.accept_states.set(di, true);
                }
                q_list.insert(t, di);
                di
            };

            result.states[next].transitions[symbol as usize] = Some(di);
        }
        next += 1;
    }

    tracing::debug!(
        nfa_states = nfa.get_num_states(),
        dfa_states = result.states.len(),
        "subset construction finished"
    );

    prune_unreachable(result)
}


#[cfg(test)]
mod dfa_tests {
    use super::dfa_test_helpers::{all_reachable, assert_isomorphic};
    use super::*;
    use crate::grammar::{construct_identifier_nfa, construct_number_nfa};

    fn set_of(num_states: usize, states: &[usize]) -> BitVec<u8> {
        let mut bv = BitVec::repeat(false, num_states);
        for state in states {
            bv.set(*state, true);
        }
        bv
    }

    #[test]
    fn test_epsilon_closure() {
        let nfa = construct_identifier_nfa();
        let n = nfa.get_num_states();

        // start state has no epsilon edges
        let closure = epsilon_closure(&nfa, &set_of(n, &[0]));
        assert_eq!(closure.iter_ones().collect::<Vec<_>>(), vec![0]);

        // exit of the first class flows into the star wrapper
        let closure = epsilon_closure(&nfa, &set_of(n, &[1]));
        assert_eq!(closure.iter_ones().collect::<Vec<_>>(), vec![1, 2, 4, 5]);

        let closure = epsilon_closure(&nfa, &set_of(n, &[]));
        assert!(closure.not_any());
    }

    #[test]
    fn test_delta_ignores_epsilon() {
        let nfa = construct_identifier_nfa();
        let n = nfa.get_num_states();

        let moved = delta(&nfa, &set_of(n, &[0]), b'x');
        assert_eq!(moved.iter_ones().collect::<Vec<_>>(), vec![1]);

        let moved = delta(&nfa, &set_of(n, &[1]), b'x');
        assert!(moved.not_any());

        let moved = delta(&nfa, &set_of(n, &[0, 2]), b'7');
        assert_eq!(moved.iter_ones().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_identifier_dfa() {
        let dfa = construct_dfa(&construct_identifier_nfa());

        assert_eq!(dfa.get_num_states(), 3);
        assert_eq!(dfa.get_start_state(), 0);
        assert_eq!(
            dfa.get_acceptor_states().iter_ones().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(dfa.next_state(0, b'a'), Some(1));
        assert_eq!(dfa.next_state(0, b'1'), None);
        assert_eq!(dfa.next_state(1, b'1'), Some(2));
        assert_eq!(dfa.next_state(2, b'_'), Some(2));
        assert_eq!(dfa.next_state(2, 200), None);
        assert_eq!(
            dfa.get_state(0)
                .unwrap()
                .get_nfa_states()
                .iter_ones()
                .collect::<Vec<_>>(),
            vec![0]
        );
    }

    #[test]
    fn test_number_dfa() {
        let dfa = construct_dfa(&construct_number_nfa());

        assert_eq!(dfa.get_num_states(), 4);
        assert_eq!(
            dfa.get_acceptor_states().iter_ones().collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(dfa.next_state(0, b'.'), None);
        assert_eq!(dfa.next_state(0, b'4'), Some(1));
        assert_eq!(dfa.next_state(1, b'4'), Some(1));
        assert_eq!(dfa.next_state(1, b'.'), Some(2));
        assert_eq!(dfa.next_state(2, b'.'), None);
        assert_eq!(dfa.next_state(2, b'0'), Some(3));
        assert_eq!(dfa.next_state(3, b'.'), None);
        assert!(all_reachable(&dfa));
    }

    #[test]
    fn test_overlapping_classes_stay_deterministic() {
        let mut nfa = NFA::new();
        let low = nfa.char_class(b'a'..=b'm');
        let high = nfa.char_class(b'h'..=b'z');
        let either = nfa.alternation(low, high);
        let many = nfa.star(either);
        let tail = nfa.char_class(b'k'..=b'p');
        let full = nfa.concatenate(many, tail);
        nfa.finish(full);

        let dfa = construct_dfa(&nfa);

        for state in 0..dfa.get_num_states() {
            let transitions = dfa.get_state_transitions(state);
            let mut symbols: Vec<Symbol> = transitions.iter().map(|(s, _)| *s).collect();
            symbols.dedup();
            assert_eq!(symbols.len(), transitions.len());
        }
        assert!(all_reachable(&dfa));
        assert!(dfa.get_acceptor_states().any());
    }

    #[test]
    fn test_empty_class_never_matches() {
        let mut nfa = NFA::new();
        let empty = nfa.char_class(std::iter::empty());
        nfa.finish(empty);

        let dfa = construct_dfa(&nfa);

        assert_eq!(dfa.get_num_states(), 1);
        assert!(dfa.get_acceptor_states().not_any());
        assert_eq!(dfa.get_state(0).unwrap().get_transitions().count(), 0);
    }

    #[test]
    fn test_empty_nfa() {
        let dfa = construct_dfa(&NFA::new());

        assert_eq!(dfa.get_num_states(), 1);
        assert!(dfa.get_acceptor_states().not_any());
    }

    #[test]
    fn test_prune_unreachable() {
        let mut dfa = DFA::new();
        let s0 = dfa.add_state(BitVec::new());
        let s1 = dfa.add_state(BitVec::new()); // unreachable
        let s2 = dfa.add_state(BitVec::new());
        let s3 = dfa.add_state(BitVec::new());

        dfa.states[s0].transitions[b'a' as usize] = Some(s2);
        dfa.states[s1].transitions[b'b' as usize] = Some(s3);
        dfa.states[s2].transitions[b'b' as usize] = Some(s3);
        dfa.states[s3].transitions[b'c' as usize] = Some(s0);
        dfa.accept_states.set(s1, true);
        dfa.accept_states.set(s3, true);

        let pruned = prune_unreachable(dfa);

        assert_eq!(pruned.get_num_states(), 3);
        assert_eq!(pruned.next_state(0, b'a'), Some(1));
        assert_eq!(pruned.next_state(1, b'b'), Some(2));
        assert_eq!(pruned.next_state(2, b'c'), Some(0));
        assert_eq!(
            pruned.get_acceptor_states().iter_ones().collect::<Vec<_>>(),
            vec![2]
        );
    }

    #[test]
    fn test_determinize_twice_is_isomorphic() {
        let nfa = construct_number_nfa();
        let first = construct_dfa(&nfa);
        let second = construct_dfa(&nfa);

        assert_isomorphic(&first, &second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_and_load() {
        let dfa = construct_dfa(&construct_identifier_nfa());
        let path = std::env::temp_dir().join(format!("lexsim_dfa_{}.json", std::process::id()));

        assert!(dfa.save(&path).is_ok());

        let loaded = load_dfa(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.unwrap(), dfa);
    }

    #[test]
    fn test_load_rejects_dangling_transition() {
        let mut dfa = construct_dfa(&construct_identifier_nfa());
        dfa.states[1].transitions[b'z' as usize] = Some(9);

        assert_eq!(
            dfa.validate(),
            Err(DFAError::InvalidTransition {
                state: 1,
                symbol: b'z',
                target: 9
            })
        );

        let path = std::env::temp_dir().join(format!("lexsim_bad_{}.json", std::process::id()));
        dfa.save(&path).unwrap();

        let loaded = load_dfa(&path);
        std::fs::remove_file(&path).unwrap();

        let err = loaded.unwrap_err();
        match err.downcast_ref() {
            Some(DFAError::InvalidTransition { .. }) => {}
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_load_rejects_orphan_state() {
        let mut dfa = construct_dfa(&construct_identifier_nfa());
        let orphan = dfa.states[2].clone();
        dfa.states.push(orphan);
        dfa.accept_states.push(true);

        assert_eq!(dfa.validate(), Err(DFAError::UnreachableState(3)));

        let path = std::env::temp_dir().join(format!("lexsim_orphan_{}.json", std::process::id()));
        dfa.save(&path).unwrap();

        let loaded = load_dfa(&path);
        std::fs::remove_file(&path).unwrap();

        let err = loaded.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DFAError>(),
            Some(&DFAError::UnreachableState(3))
        );
    }

    #[test]
    fn test_load_rejects_nonzero_start() {
        let mut dfa = construct_dfa(&construct_number_nfa());
        dfa.start_state = 1;

        assert_eq!(dfa.validate(), Err(DFAError::InvalidStartState(1)));

        dfa.start_state = 7;
        assert_eq!(dfa.validate(), Err(DFAError::InvalidStartState(7)));
    }

    #[test]
    fn test_constructed_dfas_validate() {
        assert_eq!(construct_dfa(&construct_identifier_nfa()).validate(), Ok(()));
        assert_eq!(construct_dfa(&construct_number_nfa()).validate(), Ok(()));
        assert_eq!(construct_dfa(&NFA::new()).validate(), Ok(()));
    }

    #[test]
    fn test_load_rejects_non_ascii_symbol() {
        let dfa = construct_dfa(&construct_identifier_nfa());
        let mut json = serde_json::to_value(&dfa).unwrap();

        json["states"][0]["transitions"]["200"] = serde_json::json!(1);

        let result: Result<DFA, serde_json::Error> = serde_json::from_value(json);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("outside the ASCII alphabet"));
    }
}
