use std::iter::Peekable;
use std::str::CharIndices;

use super::{Error, Span, Token, TokenKind::{self, *}};

/// Tokenizes the clause part of a single domain line. Positions are reported
/// relative to the whole file, so the caller passes the line number and the
/// column the text starts at.
pub struct Lexer<'a> {
    text: &'a str,
    it: Peekable<CharIndices<'a>>,
    line: usize,
    col: usize, // column of the next unread character
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, line: usize, col: usize) -> Self {
        Self {
            text,
            it: text.char_indices().peekable(),
            line,
            col,
        }
    }

    /// Position just past the last character, used for "unexpected end of line" errors.
    pub fn end_position(&self) -> (usize, usize) {
        (self.line, self.col + self.it.clone().count())
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        let next = self.it.next();
        if next.is_some() {
            self.col += 1;
        }
        next
    }

    fn identifier(&mut self, start: usize, first: char) -> Token<'a> {
        let col = self.col - 1;
        let mut end = start + first.len_utf8();
        while let Some((offset, c)) = self.it.peek().copied() {
            if c.is_alphanumeric() || c == '_' {
                self.next_char();
                end = offset + c.len_utf8();
            } else {
                break;
            }
        }
        let slice = &self.text[start..end];
        Token { span: Span::new(self.line, col, slice.chars().count()), kind: Identifier(slice) }
    }

    fn single(&self, kind: TokenKind<'a>) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token { span: Span::new(self.line, self.col - 1, 1), kind }))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (offset, c) = self.next_char()?;
            return match c {
                c if c.is_whitespace() => continue,
                '(' => self.single(OpenParenthesis),
                ')' => self.single(CloseParenthesis),
                ',' => self.single(Comma),
                '!' => self.single(Bang),
                c if c.is_alphanumeric() || c == '_' => Some(Ok(self.identifier(offset, c))),
                c => Some(Err(Error::new(self.line, self.col - 1, format!("Unexpected character '{}'.", c)))),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Lexer, Span, Token, TokenKind::*};

    #[test]
    fn test_clause() {
        let mut l = Lexer::new("On(A, Table)", 1, 1);
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 1, 2), kind: Identifier("On") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 3, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 4, 1), kind: Identifier("A") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 5, 1), kind: Comma })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 7, 5), kind: Identifier("Table") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 12, 1), kind: CloseParenthesis })));
        assert_eq!(l.next(), None);
    }

    #[test]
    fn test_negation_and_offset() {
        let mut l = Lexer::new(" !Clear( b_2 )", 4, 6);
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(4, 7, 1), kind: Bang })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(4, 8, 5), kind: Identifier("Clear") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(4, 13, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(4, 15, 3), kind: Identifier("b_2") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(4, 19, 1), kind: CloseParenthesis })));
        assert_eq!(l.next(), None);
        assert_eq!(l.end_position(), (4, 20));
    }

    #[test]
    fn test_multibyte_identifiers() {
        let mut l = Lexer::new("P(é, πr)", 1, 1);
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 1, 1), kind: Identifier("P") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 2, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 3, 1), kind: Identifier("é") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 4, 1), kind: Comma })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 6, 2), kind: Identifier("πr") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 8, 1), kind: CloseParenthesis })));
        assert_eq!(l.next(), None);
        assert_eq!(l.end_position(), (1, 9));
    }

    #[test]
    fn test_unexpected_character() {
        let mut l = Lexer::new("On(A; B)", 2, 1);
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 1, 2), kind: Identifier("On") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 3, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 4, 1), kind: Identifier("A") })));
        assert_eq!(l.next(), Some(Err(Error::new(2, 5, "Unexpected character ';'.".to_owned()))));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 7, 1), kind: Identifier("B") })));
    }
}
