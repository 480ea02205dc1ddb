/* Pushdown recognizer for balanced delimiters. Only the three bracket pairs take part, every other
 * byte is ignored. */

/// Stack machine over `(`, `{` and `[`. Once a close bracket fails to match, the machine stays
/// rejected for the rest of its input.
#[derive(Debug, Clone, Default)]
pub struct DelimiterStack {
    stack: Vec<u8>,
    rejected: bool,
}

fn opening_for(close: u8) -> Option<u8> {
    match close {
        b')' => Some(b'('),
        b'}' => Some(b'{'),
        b']' => Some(b'['),
        _ => None,
    }
}

impl DelimiterStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns false as soon as the input can no longer be balanced.
    pub fn push_symbol(&mut self, symbol: u8) -> bool {
        if self.rejected {
            return false;
        }

        match symbol {
            b'(' | b'{' | b'[' => self.stack.push(symbol),
            _ => {
                if let Some(open) = opening_for(symbol) {
                    if self.stack.pop() != Some(open) {
                        self.rejected = true;
                    }
                }
            }
        }
        !self.rejected
    }

    /// Number of brackets still waiting to be closed
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True if everything fed so far is balanced
    pub fn is_accepted(&self) -> bool {
        !self.rejected && self.stack.is_empty()
    }
}

/// Returns true if every bracket in `text` is closed by the matching kind in the right order
pub fn check_balanced<T>(text: &T) -> bool
where
    T: AsRef<[u8]> + ?Sized,
{
    let mut pda = DelimiterStack::new();

    for &symbol in text.as_ref() {
        if !pda.push_symbol(symbol) {
            return false;
        }
    }
    pda.is_accepted()
}
