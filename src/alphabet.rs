/* Classification of the 7 bit ASCII alphabet shared by the automata and the tokenizer. Every
 * symbol outside 0..ALPHABET_SIZE is treated as "never matches" by the rest of the crate. */

use std::collections::BTreeSet;

/// Number of symbols the automata consider. Symbols are the ASCII code points 0..128.
pub const ALPHABET_SIZE: usize = 128;

/// Labels longer than this are truncated by [`format_symbol_set`]
const MAX_LABEL_LEN: usize = 80;

pub fn is_letter(symbol: u8) -> bool {
    symbol.is_ascii_alphabetic()
}

pub fn is_digit(symbol: u8) -> bool {
    symbol.is_ascii_digit()
}

pub fn is_identifier_char(symbol: u8) -> bool {
    is_letter(symbol) || is_digit(symbol) || symbol == b'_'
}

/// Space, horizontal tab, line feed, carriage return, form feed and vertical tab.
pub fn is_whitespace(symbol: u8) -> bool {
    matches!(symbol, b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x0B)
}

pub fn is_printable(symbol: u8) -> bool {
    (32..127).contains(&symbol)
}

/// Returns true if the symbol is part of the alphabet the automata are built over
pub fn in_alphabet(symbol: u8) -> bool {
    (symbol as usize) < ALPHABET_SIZE
}

/// Symbols that may start an identifier: `[A-Za-z_]`
pub fn identifier_start_symbols() -> Vec<u8> {
    (0..ALPHABET_SIZE as u8)
        .filter(|&symbol| is_letter(symbol) || symbol == b'_')
        .collect()
}

/// Symbols that may continue an identifier: `[A-Za-z0-9_]`
pub fn identifier_symbols() -> Vec<u8> {
    (0..ALPHABET_SIZE as u8)
        .filter(|&symbol| is_identifier_char(symbol))
        .collect()
}

/// The decimal digits `[0-9]`
pub fn digit_symbols() -> Vec<u8> {
    (b'0'..=b'9').collect()
}

/// Render a set of symbols as a compact edge label. Runs of consecutive printable symbols are
/// collapsed into ranges (`a-z`), runs of two are listed (`a,b`), and non printable symbols are
/// written in hex (`0x0A`) after all printable ones.
pub fn format_symbol_set<I>(symbols: I) -> String
where
    I: IntoIterator<Item = u8>,
{
    let mut printable = BTreeSet::new();
    let mut non_printable = BTreeSet::new();

    for symbol in symbols {
        if is_printable(symbol) {
            printable.insert(symbol);
        } else {
            non_printable.insert(symbol);
        }
    }

    let printable: Vec<u8> = printable.into_iter().collect();
    let mut parts: Vec<String> = Vec::new();

    let mut idx = 0;
    while idx < printable.len() {
        let run_start = printable[idx];
        let mut run_end = run_start;
        let mut next = idx + 1;

        while next < printable.len() && printable[next] == run_end + 1 {
            run_end = printable[next];
            next += 1;
        }

        let label = if run_start == run_end {
            format!("{}", run_start as char)
        } else if run_end == run_start + 1 {
            format!("{},{}", run_start as char, run_end as char)
        } else {
            format!("{}-{}", run_start as char, run_end as char)
        };
        parts.push(label);
        idx = next;
    }

    for symbol in non_printable {
        parts.push(format!("0x{:02X}", symbol));
    }

    let label = parts.join(",");

    if label.len() > MAX_LABEL_LEN {
        format!("{}...", &label[..MAX_LABEL_LEN - 3])
    } else {
        label
    }
}
