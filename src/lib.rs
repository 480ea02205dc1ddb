//! # lexsim
//!
//! A small lexical analysis simulator for teaching finite automata.
//!
//! This library provides functionality to:
//! - Build NFAs for identifiers and numbers using Thompson Construction
//! - Convert NFAs to DFAs using Subset Construction, keeping only reachable states
//! - Find the longest match of a DFA, optionally recording the states it visits
//! - Tokenize source text with the identifier and number DFAs
//! - Check delimiters for balance with a pushdown recognizer
//! - Describe and export the automata for inspection

pub mod alphabet;
pub mod dfa;
pub mod fa;
pub mod grammar;
pub mod inspect;
pub mod nfa;
pub mod pda;
pub mod scanner;
pub mod tokenizer;

// Re-export commonly used functions for convenience
pub use dfa::{construct_dfa, load_dfa};
pub use grammar::{construct_identifier_nfa, construct_number_nfa, Grammar};
pub use pda::check_balanced;
pub use scanner::{longest_match, longest_match_with_trace, Trace};
pub use tokenizer::{tokenize, Lexer, Token, TokenKind};
