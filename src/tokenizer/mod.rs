//! A small character-stream tokenizer (spec.md §4.5), demonstrating the
//! ordered containers elsewhere in this crate: keyword lookup is backed
//! by a [`BPlusTree`](crate::collections::bplus_tree::BPlusTree) rather
//! than a `match` on string literals.
//!
//! `halo` has no tokenizer of its own; the overall scan-loop/buffering
//! shape here is an idiom borrowed from
//! `examples/pro-grammer-SD-axiom/axiom/src/lexer.rs` (character-at-a-time
//! scanning, a `Token` enum, one state machine per literal kind) with no
//! code, names, or the donor language's own token set carried over —
//! spec.md explicitly scopes that language's tokenizer out as a feature,
//! this module exists only to exercise the crate's own data structures.

use crate::collections::bplus_tree::BPlusTree;
use crate::gc::error::ParseError;

/// A single recognized lexical unit. Numeric, symbol, and string tokens
/// retain their original source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(String),
    Float(String),
    String(String),
    Symbol(String),
    Keyword(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LAngle,
    RAngle,
    Comma,
    Semicolon,
    Colon,
    Equals,
}

fn is_punctuation(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | ',' | ';' | ':' | '=')
}

fn punctuation_token(c: char) -> Token {
    match c {
        '(' => Token::LParen,
        ')' => Token::RParen,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '{' => Token::LBrace,
        '}' => Token::RBrace,
        '<' => Token::LAngle,
        '>' => Token::RAngle,
        ',' => Token::Comma,
        ';' => Token::Semicolon,
        ':' => Token::Colon,
        '=' => Token::Equals,
        _ => unreachable!(),
    }
}

/// A symbol character: alphanumerics plus `-`, `+`, `.`, `_`. `-`/`+`/`.`
/// are deliberately *not* punctuation (spec.md §9): they may start a
/// numeric literal, so `a-b` tokenizes as the single symbol `a-b` rather
/// than `a`, `-`, `b`. This is preserved literally, not "fixed".
fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '+' | '.' | '_')
}

fn keyword_table() -> BPlusTree<String, ()> {
    let mut t = BPlusTree::with_order_statistics(false);
    for kw in ["type", "def", "lambda", "if", "let", "in", "end"] {
        t.insert(kw.to_string(), ());
    }
    t
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Symbol,
    String,
}

/// Scans `Token`s out of a stream fed incrementally via
/// [`Tokenizer::feed`]. A scan that ends mid-identifier or mid-string
/// buffers the partial text and prepends it to the next `feed` call;
/// [`Tokenizer::finish`] resolves whatever is buffered into a final token.
pub struct Tokenizer {
    keywords: BPlusTree<String, ()>,
    pending: String,
    pending_kind: Option<PendingKind>,
    position: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Creates a tokenizer with no buffered state.
    pub fn new() -> Self {
        Self {
            keywords: keyword_table(),
            pending: String::new(),
            pending_kind: None,
            position: 0,
        }
    }

    /// Scans `chunk`, returning every complete token found. Partial
    /// trailing text (an incomplete symbol or unterminated string) is
    /// retained internally and prepended to the next call.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Token>, ParseError> {
        let mut input = String::new();
        if let Some(PendingKind::Symbol) = self.pending_kind {
            input.push_str(&std::mem::take(&mut self.pending));
            self.pending_kind = None;
        }
        input.push_str(chunk);

        let mut tokens = Vec::new();
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        if let Some(PendingKind::String) = self.pending_kind {
            let mut buf = std::mem::take(&mut self.pending);
            self.pending_kind = None;
            match self.scan_string_body(&chars, &mut i, &mut buf)? {
                Some(s) => tokens.push(Token::String(s)),
                None => {
                    self.pending = buf;
                    self.pending_kind = Some(PendingKind::String);
                    self.position += chars.len();
                    return Ok(tokens);
                }
            }
        }

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '"' {
                i += 1;
                let mut buf = String::new();
                match self.scan_string_body(&chars, &mut i, &mut buf)? {
                    Some(s) => tokens.push(Token::String(s)),
                    None => {
                        self.pending = buf;
                        self.pending_kind = Some(PendingKind::String);
                        self.position += chars.len();
                        return Ok(tokens);
                    }
                }
                continue;
            }
            if is_punctuation(c) {
                tokens.push(punctuation_token(c));
                i += 1;
                continue;
            }
            if c.is_ascii_digit() {
                let (tok, consumed) = self.scan_number(&chars[i..])?;
                i += consumed;
                tokens.push(tok);
                continue;
            }
            if is_symbol_char(c) {
                let start = i;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if i == chars.len() {
                    // Could still be extended by the next feed() call.
                    self.pending = text;
                    self.pending_kind = Some(PendingKind::Symbol);
                    self.position += i;
                    return Ok(tokens);
                }
                tokens.push(self.classify_word(text));
                continue;
            }
            return Err(ParseError {
                position: self.position + i,
                offending: Some(c),
                message: format!("illegal character '{c}'"),
            });
        }

        self.position += chars.len();
        Ok(tokens)
    }

    fn classify_word(&self, text: String) -> Token {
        if self.keywords.contains_key(&text) {
            let kw = ["type", "def", "lambda", "if", "let", "in", "end"]
                .into_iter()
                .find(|&kw| kw == text)
                .expect("membership already checked");
            return Token::Keyword(kw);
        }
        Token::Symbol(text)
    }

    /// One-pass numeric state machine: an integer, optionally followed by
    /// a fractional part and a signed exponent.
    fn scan_number(&self, chars: &[char]) -> Result<(Token, usize), ParseError> {
        let mut i = 0;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let mut is_float = false;

        if i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }

        if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
            let mut j = i + 1;
            if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                j += 1;
            }
            if j < chars.len() && chars[j].is_ascii_digit() {
                is_float = true;
                i = j;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }

        let text: String = chars[..i].iter().collect();
        if is_float {
            Ok((Token::Float(text), i))
        } else {
            Ok((Token::Integer(text), i))
        }
    }

    /// Scans a string body (the opening `"` already consumed) up to and
    /// including the closing `"`. Returns `Ok(None)` if the input ends
    /// without a closing quote, in which case `buf` holds the partial
    /// (already-unescaped) text to resume from on the next `feed`.
    fn scan_string_body(
        &self,
        chars: &[char],
        i: &mut usize,
        buf: &mut String,
    ) -> Result<Option<String>, ParseError> {
        while *i < chars.len() {
            let c = chars[*i];
            if c == '"' {
                *i += 1;
                return Ok(Some(std::mem::take(buf)));
            }
            if c == '\\' {
                *i += 1;
                let Some(&esc) = chars.get(*i) else {
                    return Ok(None);
                };
                let resolved = match esc {
                    '\\' => '\\',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '"' => '"',
                    other => {
                        return Err(ParseError {
                            position: self.position + *i,
                            offending: Some(other),
                            message: format!("unknown escape '\\{other}'"),
                        })
                    }
                };
                buf.push(resolved);
                *i += 1;
                continue;
            }
            buf.push(c);
            *i += 1;
        }
        Ok(None)
    }

    /// Resolves any buffered partial token at end-of-input. An
    /// unterminated string is a [`ParseError`]; a trailing symbol is
    /// emitted as a final token.
    pub fn finish(mut self) -> Result<Option<Token>, ParseError> {
        match self.pending_kind.take() {
            None => Ok(None),
            Some(PendingKind::Symbol) => {
                let pending = std::mem::take(&mut self.pending);
                Ok(Some(self.classify_word(pending)))
            }
            Some(PendingKind::String) => Err(ParseError {
                position: self.position,
                offending: None,
                message: "unterminated string literal at end of input".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<Token> {
        let mut t = Tokenizer::new();
        let mut out = t.feed(input).unwrap();
        if let Some(tok) = t.finish().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn recognizes_integers_and_floats() {
        assert_eq!(scan_all("42"), vec![Token::Integer("42".into())]);
        assert_eq!(scan_all("3.14"), vec![Token::Float("3.14".into())]);
        assert_eq!(scan_all("1e10"), vec![Token::Float("1e10".into())]);
        assert_eq!(scan_all("1e-10"), vec![Token::Float("1e-10".into())]);
    }

    #[test]
    fn recognizes_keywords_and_symbols() {
        assert_eq!(scan_all("let"), vec![Token::Keyword("let")]);
        assert_eq!(scan_all("letx"), vec![Token::Symbol("letx".into())]);
    }

    #[test]
    fn minus_and_plus_and_dot_are_not_punctuation() {
        // Preserved literally per spec.md §9: `a-b` is one symbol.
        assert_eq!(scan_all("a-b"), vec![Token::Symbol("a-b".into())]);
    }

    #[test]
    fn parses_strings_with_escapes() {
        assert_eq!(
            scan_all(r#""hello\nworld""#),
            vec![Token::String("hello\nworld".into())]
        );
    }

    #[test]
    fn mid_input_buffering_reassembles_split_tokens() {
        let mut t = Tokenizer::new();
        let mut out = t.feed("foo").unwrap();
        out.extend(t.feed("bar 1").unwrap());
        if let Some(tok) = t.finish().unwrap() {
            out.push(tok);
        }
        assert_eq!(out, vec![Token::Symbol("foobar".into()), Token::Integer("1".into())]);
    }

    #[test]
    fn unterminated_string_is_a_parse_error_at_end_of_input() {
        let mut t = Tokenizer::new();
        t.feed("\"oops").unwrap();
        assert!(t.finish().is_err());
    }

    #[test]
    fn illegal_character_is_reported_with_position() {
        let mut t = Tokenizer::new();
        let err = t.feed("1 + #").unwrap_err();
        assert_eq!(err.offending, Some('#'));
    }
}
