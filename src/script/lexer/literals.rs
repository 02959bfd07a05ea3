//! Literal scanning implementations
//! Handles number and string literals

use super::tokenizer::Lexer;
use crate::script::lexer::tokens::*;

/// Scan a number literal (decimal integer or float)
pub fn scan_number(
    lexer: &mut Lexer<'_>,
    first_char: char,
) -> Result<Token, LexError> {
    let mut value = String::new();
    value.push(first_char);
    let mut is_float = false;

    consume_digits(lexer, &mut value);

    // Fraction: only when a digit follows the dot, so `1.real` stays an attribute access
    if lexer.peek() == Some(&'.') && lexer.peek_next().map(is_digit).unwrap_or(false) {
        is_float = true;
        value.push('.');
        lexer.advance();
        consume_digits(lexer, &mut value);
    }

    if matches!(lexer.peek(), Some(&'e') | Some(&'E')) {
        let mut lookahead = lexer.chars_clone();
        lookahead.next();
        let next = lookahead.next();
        let exponent_follows = match next {
            Some(c) if is_digit(c) => true,
            Some('+') | Some('-') => lookahead.next().map(is_digit).unwrap_or(false),
            _ => false,
        };
        if exponent_follows {
            is_float = true;
            value.push('e');
            lexer.advance();
            if let Some(&sign) = lexer.peek() {
                if sign == '+' || sign == '-' {
                    value.push(sign);
                    lexer.advance();
                }
            }
            consume_digits(lexer, &mut value);
        }
    }

    let kind = if is_float {
        value
            .parse::<f64>()
            .map(TokenKind::FloatLiteral)
            .map_err(|_| LexError::InvalidNumber {
                literal: value.clone(),
                position: lexer.start_position(),
            })?
    } else {
        value
            .parse::<i64>()
            .map(TokenKind::IntLiteral)
            .map_err(|_| LexError::InvalidNumber {
                literal: value.clone(),
                position: lexer.start_position(),
            })?
    };
    Ok(lexer.make_token(kind))
}

fn consume_digits(
    lexer: &mut Lexer<'_>,
    value: &mut String,
) {
    while let Some(&c) = lexer.peek() {
        if is_digit(c) {
            value.push(c);
            lexer.advance();
        } else if c == '_' && lexer.peek_next().map(is_digit).unwrap_or(false) {
            lexer.advance();
        } else {
            break;
        }
    }
}

/// Scan a string literal; the opening quote has already been consumed
pub fn scan_string(
    lexer: &mut Lexer<'_>,
    quote: char,
) -> Result<Token, LexError> {
    let start = lexer.start_position();

    // Triple-quoted strings may span lines
    let triple = lexer.peek() == Some(&quote) && lexer.peek_next() == Some(quote);
    if triple {
        lexer.advance();
        lexer.advance();
    }

    let mut value = String::new();
    loop {
        let c = match lexer.advance() {
            Some(c) => c,
            None => return Err(LexError::UnterminatedString { position: start }),
        };
        match c {
            c if c == quote => {
                if !triple {
                    break;
                }
                if lexer.peek() == Some(&quote) && lexer.peek_next() == Some(quote) {
                    lexer.advance();
                    lexer.advance();
                    break;
                }
                value.push(c);
            }
            '\n' if !triple => {
                return Err(LexError::UnterminatedString { position: start });
            }
            '\\' => scan_escape(lexer, &mut value)?,
            c => value.push(c),
        }
    }

    Ok(lexer.make_token(TokenKind::StringLiteral(value)))
}

/// Decode one escape sequence after a backslash
fn scan_escape(
    lexer: &mut Lexer<'_>,
    value: &mut String,
) -> Result<(), LexError> {
    let position = lexer.position();
    let escaped = match lexer.advance() {
        Some(c) => c,
        None => {
            return Err(LexError::UnterminatedString {
                position: lexer.start_position(),
            })
        }
    };
    match escaped {
        'n' => value.push('\n'),
        't' => value.push('\t'),
        'r' => value.push('\r'),
        '0' => value.push('\0'),
        '\\' => value.push('\\'),
        '"' => value.push('"'),
        '\'' => value.push('\''),
        // Escaped line break continues the string
        '\n' => {}
        'x' => {
            let mut hex = String::new();
            for _ in 0..2 {
                match lexer.peek() {
                    Some(&hc) if hc.is_ascii_hexdigit() => {
                        hex.push(hc);
                        lexer.advance();
                    }
                    _ => break,
                }
            }
            let decoded = u8::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 2)
                .map(char::from);
            match decoded {
                Some(ch) => value.push(ch),
                None => {
                    return Err(LexError::InvalidEscape {
                        sequence: format!("\\x{}", hex),
                        position,
                    })
                }
            }
        }
        'u' => {
            if lexer.peek() != Some(&'{') {
                return Err(LexError::InvalidEscape {
                    sequence: "\\u".to_string(),
                    position,
                });
            }
            lexer.advance();
            let mut hex = String::new();
            while let Some(&hc) = lexer.peek() {
                if hc.is_ascii_hexdigit() {
                    hex.push(hc);
                    lexer.advance();
                } else {
                    break;
                }
            }
            let closed = lexer.peek() == Some(&'}');
            if closed {
                lexer.advance();
            }
            let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
            match decoded {
                Some(ch) if closed => value.push(ch),
                _ => {
                    return Err(LexError::InvalidEscape {
                        sequence: format!("\\u{{{}", hex),
                        position,
                    })
                }
            }
        }
        // Unknown escapes are kept verbatim
        other => {
            value.push('\\');
            value.push(other);
        }
    }
    Ok(())
}

/// Check if character is valid identifier start
pub fn is_identifier_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Check if character is valid identifier continuation
pub fn is_identifier_char(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Check if character is a digit
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}
