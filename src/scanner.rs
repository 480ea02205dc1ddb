/* Implementation of the maximal munch scan over a single DFA. Starting at a given offset the DFA
 * is run until it has no transition for the next byte or the text ends, remembering the last
 * position at which it was in an accept state. */

use crate::dfa::DFA;
use crate::fa::FA;

/// Drive the DFA over `text` from `offset`, reporting every state it enters (the start state
/// included) to `on_state`. Returns the length of the longest accepted prefix.
#[inline]
fn run_dfa<F>(dfa: &DFA, text: &[u8], offset: usize, mut on_state: F) -> usize
where
    F: FnMut(usize),
{
    let mut state = dfa.get_start_state();
    let mut last_accept_len = 0;

    on_state(state);

    for (consumed, &symbol) in text.iter().skip(offset).enumerate() {
        let Some(next_state) = dfa.next_state(state, symbol) else {
            break;
        };

        state = next_state;
        on_state(state);

        if dfa.is_accepting(state) {
            last_accept_len = consumed + 1;
        }
    }

    last_accept_len
}

/// Length of the longest prefix of `text[offset..]` accepted by the DFA, or 0 if no prefix is
/// accepted. Offsets past the end of the text match nothing.
pub fn longest_match<T>(dfa: &DFA, text: &T, offset: usize) -> usize
where
    T: AsRef<[u8]> + ?Sized,
{
    run_dfa(dfa, text.as_ref(), offset, |_| {})
}

/// Same as [`longest_match`], but also returns every DFA state visited: the start state followed
/// by one state per consumed byte, up to the point where the DFA stopped. The path may run past
/// the last accepting state.
pub fn longest_match_with_trace<T>(dfa: &DFA, text: &T, offset: usize) -> (usize, Vec<usize>)
where
    T: AsRef<[u8]> + ?Sized,
{
    let mut path = Vec::new();
    let matched_len = run_dfa(dfa, text.as_ref(), offset, |state| path.push(state));
    (matched_len, path)
}

/// A recorded DFA execution with a cursor for stepping through the visited states one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    path: Vec<usize>,
    matched_len: usize,
    step: usize,
}

impl Trace {
    /// Run the DFA over `text` from `offset` and record the path it takes
    pub fn record<T>(dfa: &DFA, text: &T, offset: usize) -> Self
    where
        T: AsRef<[u8]> + ?Sized,
    {
        let (matched_len, path) = longest_match_with_trace(dfa, text, offset);
        Trace {
            path,
            matched_len,
            step: 0,
        }
    }

    /// The states visited, in order
    pub fn get_states(&self) -> &[usize] {
        &self.path
    }

    pub fn get_matched_len(&self) -> usize {
        self.matched_len
    }

    /// Number of bytes the DFA consumed before it stopped, accepted or not
    pub fn get_consumed_len(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn get_step(&self) -> usize {
        self.step
    }

    /// The state under the cursor
    pub fn current(&self) -> Option<usize> {
        self.path.get(self.step).copied()
    }

    /// Move the cursor one state forward, stopping at the last state. Returns the new current
    /// state.
    pub fn step_forward(&mut self) -> Option<usize> {
        if self.step + 1 < self.path.len() {
            self.step += 1;
        }
        self.current()
    }

    /// Move the cursor one state back, stopping at the start state
    pub fn step_back(&mut self) -> Option<usize> {
        self.step = self.step.saturating_sub(1);
        self.current()
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// The edge the cursor last moved along, as (from, to)
    pub fn current_edge(&self) -> Option<(usize, usize)> {
        if self.step == 0 {
            return None;
        }
        Some((self.path[self.step - 1], self.path[self.step]))
    }
}
