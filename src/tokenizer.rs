/* Greedy left to right tokenizer. Single character operators and delimiters are recognised
 * directly, identifiers/keywords and numbers through their DFAs, and any byte nothing claims
 * becomes a one byte Unknown token so the scan always makes progress. */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::alphabet::is_whitespace;
use crate::dfa::{construct_dfa, DFA};
use crate::grammar::Grammar;
use crate::scanner::{longest_match, Trace};

pub const KEYWORDS: [&str; 9] = [
    "int", "float", "if", "else", "while", "for", "break", "continue", "return",
];

pub const OPERATORS: &[u8] = b"+-*/=<>!&|%";

pub const DELIMITERS: &[u8] = b"(){}[],;:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    Operator,
    Delimiter,
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Keyword => "Keyword",
            TokenKind::Identifier => "Identifier",
            TokenKind::Number => "Number",
            TokenKind::Operator => "Operator",
            TokenKind::Delimiter => "Delimiter",
            TokenKind::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

fn serialize_lexeme<S>(lexeme: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(lexeme))
}

fn deserialize_lexeme<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    Ok(text.into_bytes())
}

/// A classified lexeme. The raw bytes are kept as they appeared in the input; JSON output
/// renders them as text, replacing bytes which are not valid UTF-8 with U+FFFD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    kind: TokenKind,
    #[serde(
        rename = "text",
        serialize_with = "serialize_lexeme",
        deserialize_with = "deserialize_lexeme"
    )]
    lexeme: Vec<u8>,
    line: usize,
    column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Vec<u8>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }

    pub fn get_kind(&self) -> TokenKind {
        self.kind
    }

    /// The exact bytes the token was built from
    pub fn get_bytes(&self) -> &[u8] {
        &self.lexeme
    }

    /// The token's bytes as text. Borrowed unless a byte is not valid UTF-8.
    pub fn get_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.lexeme)
    }

    /// 1-based line of the token's first character
    pub fn get_line(&self) -> usize {
        self.line
    }

    /// 1-based column of the token's first character
    pub fn get_column(&self) -> usize {
        self.column
    }
}

/// Position in the input, tracking 1-based line and column
struct Cursor {
    offset: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn new() -> Self {
        Cursor {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, symbol: u8) {
        match symbol {
            b'\n' => {
                self.line += 1;
                self.column = 1;
            }
            b'\r' => self.column = 1, // A lone CR returns to the start of the line
            _ => self.column += 1,
        }
        self.offset += 1;
    }

    fn advance_over(&mut self, text: &[u8], len: usize) {
        for &symbol in &text[self.offset..self.offset + len] {
            self.advance(symbol);
        }
    }
}

fn classify_word(word: &[u8]) -> TokenKind {
    if KEYWORDS.iter().any(|keyword| keyword.as_bytes() == word) {
        TokenKind::Keyword
    } else {
        TokenKind::Identifier
    }
}

/// Split `text` into tokens using the identifier and number DFAs. Whitespace separates tokens and
/// is never emitted. When both DFAs match, the identifier wins ties.
pub fn tokenize<T>(text: &T, identifier_dfa: &DFA, number_dfa: &DFA) -> Vec<Token>
where
    T: AsRef<[u8]> + ?Sized,
{
    let text = text.as_ref();
    let mut token_list: Vec<Token> = Vec::new();
    let mut cursor = Cursor::new();

    while cursor.offset < text.len() {
        let symbol = text[cursor.offset];

        if is_whitespace(symbol) {
            cursor.advance(symbol);
            continue;
        }

        let (kind, len) = if OPERATORS.contains(&symbol) {
            (TokenKind::Operator, 1)
        } else if DELIMITERS.contains(&symbol) {
            (TokenKind::Delimiter, 1)
        } else {
            let identifier_len = longest_match(identifier_dfa, text, cursor.offset);
            let number_len = longest_match(number_dfa, text, cursor.offset);

            if identifier_len == 0 && number_len == 0 {
                (TokenKind::Unknown, 1)
            } else if identifier_len >= number_len {
                (TokenKind::Identifier, identifier_len)
            } else {
                (TokenKind::Number, number_len)
            }
        };

        let lexeme = &text[cursor.offset..cursor.offset + len];
        let kind = match kind {
            TokenKind::Identifier => classify_word(lexeme),
            _ => kind,
        };
        let token = Token::new(kind, lexeme.to_vec(), cursor.line, cursor.column);

        tracing::trace!(
            kind = %token.kind,
            text = %token.get_text(),
            line = token.line,
            column = token.column,
            "token"
        );

        token_list.push(token);
        cursor.advance_over(text, len);
    }

    tracing::debug!(tokens = token_list.len(), bytes = text.len(), "tokenized input");

    token_list
}

/// Owns the identifier and number DFAs so they are built once and reused for every input.
#[derive(Debug, Clone)]
pub struct Lexer {
    identifier_dfa: DFA,
    number_dfa: DFA,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    /// Construct both DFAs from their grammars
    pub fn new() -> Self {
        Lexer {
            identifier_dfa: construct_dfa(&Grammar::Identifier.construct_nfa()),
            number_dfa: construct_dfa(&Grammar::Number.construct_nfa()),
        }
    }

    /// Use previously built (or loaded) DFAs
    pub fn from_dfas(identifier_dfa: DFA, number_dfa: DFA) -> Self {
        Lexer {
            identifier_dfa,
            number_dfa,
        }
    }

    pub fn get_dfa(&self, grammar: Grammar) -> &DFA {
        match grammar {
            Grammar::Identifier => &self.identifier_dfa,
            Grammar::Number => &self.number_dfa,
        }
    }

    pub fn tokenize<T>(&self, text: &T) -> Vec<Token>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        tokenize(text, &self.identifier_dfa, &self.number_dfa)
    }

    /// Trace the DFA run at the first non-whitespace byte of `text`. The identifier DFA is traced
    /// unless it cannot consume anything there, in which case the number DFA is. Returns None for
    /// blank input and when neither DFA can consume the first byte.
    pub fn trace_first_token<T>(&self, text: &T) -> Option<(Grammar, Trace)>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        let text = text.as_ref();
        let offset = text.iter().position(|symbol| !is_whitespace(*symbol))?;

        let trace = Trace::record(&self.identifier_dfa, text, offset);
        if trace.get_consumed_len() > 0 {
            return Some((Grammar::Identifier, trace));
        }

        let trace = Trace::record(&self.number_dfa, text, offset);
        if trace.get_consumed_len() > 0 {
            return Some((Grammar::Number, trace));
        }
        None
    }
}
