//! Compact regular expressions for `MATCH` predicates.
//!
//! Supported syntax: `.`, `*`, `+`, `?`, `^`, `$`, the classes `\d \D \w \W
//! \s \S`, bracket classes `[abc]`, `[a-z]`, `[^abc]`, and escaped literals.
//! Matching is unanchored unless `^`/`$` are given.
//!
//! ```
//! use trellis_core::pattern_match::Pattern;
//! let p = Pattern::compile("^[a-z]+\\d+$").unwrap();
//! assert!(p.is_match("abc123"));
//! assert!(!p.is_match("123abc"));
//! ```

use crate::error::{Error, Result};
use alloc::string::String;
use alloc::vec::Vec;

#[derive(Clone, Debug, PartialEq)]
enum Class {
    Any,
    Literal(char),
    Digit(bool),
    Word(bool),
    Space(bool),
    Set {
        negate: bool,
        items: Vec<(char, char)>,
    },
}

impl Class {
    fn matches(&self, c: char) -> bool {
        match self {
            Class::Any => true,
            Class::Literal(l) => *l == c,
            Class::Digit(neg) => c.is_ascii_digit() != *neg,
            Class::Word(neg) => (c.is_alphanumeric() || c == '_') != *neg,
            Class::Space(neg) => c.is_whitespace() != *neg,
            Class::Set { negate, items } => {
                items.iter().any(|(lo, hi)| *lo <= c && c <= *hi) != *negate
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Repeat {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
    class: Class,
    repeat: Repeat,
}

/// A compiled pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
    anchored_start: bool,
    anchored_end: bool,
}

impl Pattern {
    /// Compiles `source`, rejecting unclosed bracket classes and dangling
    /// quantifiers.
    pub fn compile(source: &str) -> Result<Self> {
        let chars: Vec<char> = source.chars().collect();
        let mut i = 0;
        let mut end = chars.len();
        let anchored_start = chars.first() == Some(&'^');
        if anchored_start {
            i = 1;
        }
        let anchored_end =
            end > i && chars[end - 1] == '$' && !(end >= 2 && chars[end - 2] == '\\');
        if anchored_end {
            end -= 1;
        }

        let mut tokens = Vec::new();
        while i < end {
            let class = match chars[i] {
                '.' => {
                    i += 1;
                    Class::Any
                }
                '\\' if i + 1 < end => {
                    let c = chars[i + 1];
                    i += 2;
                    match c {
                        'd' => Class::Digit(false),
                        'D' => Class::Digit(true),
                        'w' => Class::Word(false),
                        'W' => Class::Word(true),
                        's' => Class::Space(false),
                        'S' => Class::Space(true),
                        other => Class::Literal(other),
                    }
                }
                '[' => {
                    let negate = i + 1 < end && chars[i + 1] == '^';
                    let mut j = if negate { i + 2 } else { i + 1 };
                    let mut items = Vec::new();
                    while j < end && chars[j] != ']' {
                        if j + 2 < end && chars[j + 1] == '-' && chars[j + 2] != ']' {
                            items.push((chars[j], chars[j + 2]));
                            j += 3;
                        } else {
                            items.push((chars[j], chars[j]));
                            j += 1;
                        }
                    }
                    if j >= end {
                        return Err(Error::invalid_query("unclosed bracket in pattern"));
                    }
                    i = j + 1;
                    Class::Set { negate, items }
                }
                '*' | '+' | '?' => {
                    return Err(Error::invalid_query("quantifier without operand"));
                }
                c => {
                    i += 1;
                    Class::Literal(c)
                }
            };
            let repeat = match chars.get(i).filter(|_| i < end) {
                Some('*') => Repeat::ZeroOrMore,
                Some('+') => Repeat::OneOrMore,
                Some('?') => Repeat::ZeroOrOne,
                _ => Repeat::One,
            };
            if repeat != Repeat::One {
                i += 1;
            }
            tokens.push(Token { class, repeat });
        }

        Ok(Self {
            source: source.into(),
            tokens,
            anchored_start,
            anchored_end,
        })
    }

    /// Returns the pattern text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tests whether `value` matches.
    pub fn is_match(&self, value: &str) -> bool {
        let chars: Vec<char> = value.chars().collect();
        let last_start = if self.anchored_start { 0 } else { chars.len() };
        (0..=last_start).any(|start| self.match_here(&chars, start, 0))
    }

    fn match_here(&self, chars: &[char], ci: usize, ti: usize) -> bool {
        let Some(token) = self.tokens.get(ti) else {
            return !self.anchored_end || ci == chars.len();
        };
        let hit = |at: usize| at < chars.len() && token.class.matches(chars[at]);
        match token.repeat {
            Repeat::One => hit(ci) && self.match_here(chars, ci + 1, ti + 1),
            Repeat::ZeroOrOne => {
                (hit(ci) && self.match_here(chars, ci + 1, ti + 1))
                    || self.match_here(chars, ci, ti + 1)
            }
            Repeat::ZeroOrMore | Repeat::OneOrMore => {
                let min = if token.repeat == Repeat::OneOrMore { 1 } else { 0 };
                let mut run = 0;
                while hit(ci + run) {
                    run += 1;
                }
                // greedy, then backtrack
                (min..=run)
                    .rev()
                    .any(|n| self.match_here(chars, ci + n, ti + 1))
            }
        }
    }
}

/// One-shot helper: compiles `pattern` and matches `value`.
/// An invalid pattern matches nothing.
pub fn regex(value: &str, pattern: &str) -> bool {
    Pattern::compile(pattern)
        .map(|p| p.is_match(value))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_class() {
        assert!(regex("abc123", "\\d+"));
        assert!(!regex("abcdef", "\\d+"));
    }

    #[test]
    fn anchors() {
        assert!(!regex("abc123", "^\\d+$"));
        assert!(regex("abc123", "^[a-z]+\\d+$"));
        assert!(regex("hello world", "^hello"));
        assert!(regex("hello world", "world$"));
        assert!(!regex("hello world", "^world"));
    }

    #[test]
    fn dot_and_optional() {
        assert!(regex("abc", "a.c"));
        assert!(!regex("ac", "^a.c$"));
        assert!(regex("ac", "^ab?c$"));
        assert!(!regex("abbc", "^ab?c$"));
    }

    #[test]
    fn bracket_classes() {
        assert!(regex("cat", "^[cb]at$"));
        assert!(!regex("hat", "^[cb]at$"));
        assert!(regex("hat", "^[^cb]at$"));
        assert!(regex("5", "^[0-9]$"));
        assert!(!regex("M", "^[a-z]$"));
    }

    #[test]
    fn escapes_and_empty() {
        assert!(regex("a.b", "^a\\.b$"));
        assert!(!regex("axb", "^a\\.b$"));
        assert!(regex("", ""));
        assert!(regex("", "^$"));
        assert!(!regex("", "^a+$"));
    }

    #[test]
    fn invalid_patterns() {
        assert!(Pattern::compile("[abc").is_err());
        assert!(Pattern::compile("*a").is_err());
        assert!(!regex("abc", "[abc"));
    }
}
