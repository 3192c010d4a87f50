//! PromQL tokenizer
//!
//! Produces a flat token vector consumed by the Pratt parser. Durations
//! (`5m`, `1h30m`) are lexed as their own token kind so the parser does not
//! have to disambiguate them from numbers.

use super::{parse_duration_secs, ParseError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Metric/label identifier; may contain `:` for recording rules.
    Ident(String),
    Number(f64),
    Str(String),
    /// Duration in seconds.
    Duration(f64),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,

    Eq,       // =
    EqEq,     // ==
    Ne,       // !=
    EqRegex,  // =~
    NeRegex,  // !~
    Gt,
    Lt,
    Ge,
    Le,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn is_duration_unit(c: char) -> bool {
    matches!(c, 's' | 'm' | 'h' | 'd' | 'w' | 'y')
}

/// Tokenize a PromQL expression string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' if !peek_ident_ahead(&chars, i) => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '@' => {
                // `@ <timestamp>` modifier: consume and ignore, the analyzer
                // has no use for pinned evaluation times.
                i += 1;
                while i < chars.len() && (chars[i] == ' ' || chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else if chars.get(i + 1) == Some(&'~') {
                    tokens.push(Token::EqRegex);
                    i += 2;
                } else {
                    tokens.push(Token::Eq);
                    i += 1;
                }
            }
            '!' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Ne);
                    i += 2;
                }
                Some('~') => {
                    tokens.push(Token::NeRegex);
                    i += 2;
                }
                _ => return Err(ParseError::UnexpectedChar('!')),
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ParseError::UnterminatedString),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            // Keep escapes verbatim minus the backslash for
                            // quote/backslash; regex escapes stay intact so
                            // metacharacter checks still see them.
                            match chars.get(i + 1) {
                                Some(&next) if next == quote || next == '\\' => {
                                    value.push(next);
                                    i += 2;
                                }
                                Some(&next) => {
                                    value.push('\\');
                                    value.push(next);
                                    i += 2;
                                }
                                None => return Err(ParseError::UnterminatedString),
                            }
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            _ if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // A unit suffix makes this a duration: 5m, 1h30m, 90s.
                if i < chars.len() && is_duration_unit(chars[i]) && !chars[start..i].contains(&'.') {
                    while i < chars.len() && (chars[i].is_ascii_digit() || is_duration_unit(chars[i])) {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    let secs = parse_duration_secs(&text)
                        .ok_or_else(|| ParseError::BadDuration(text.clone()))?;
                    tokens.push(Token::Duration(secs));
                } else {
                    let text: String = chars[start..i].iter().collect();
                    let n: f64 = text
                        .parse()
                        .map_err(|_| ParseError::BadNumber(text.clone()))?;
                    tokens.push(Token::Number(n));
                }
            }
            _ if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.as_str() {
                    "Inf" | "inf" => tokens.push(Token::Number(f64::INFINITY)),
                    "NaN" | "nan" => tokens.push(Token::Number(f64::NAN)),
                    _ => tokens.push(Token::Ident(text)),
                }
            }
            _ => return Err(ParseError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}

/// Disambiguates `:` inside a subquery bracket (`[1h:5m]`) from `:` inside
/// a recording-rule identifier (`job:foo:rate5m`). An identifier colon is
/// always followed by an identifier character and preceded by one; the
/// lexer only reaches here when `:` starts a token, so a following ident
/// char means it opens a recording-rule name.
fn peek_ident_ahead(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|&c| is_ident_start(c) && c != ':')
}
