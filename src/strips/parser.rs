//! Line-oriented reader for the domain text format.
//!
//! ```text
//! Initial state: On(A, Table), On(B, Table), Clear(A), Clear(B)
//! Goal state: On(A, B)
//! Actions:
//!     // comments and blank lines are skipped anywhere
//!     Stack(X, Y)
//!     Preconditions: Clear(X), Clear(Y)
//!     Postconditions: On(X, Y), !Clear(Y)
//! ```
//!
//! Clauses on a line are separated by a comma or by whitespace alone
//! (`!P(a) Q(b)` reads like `!P(a), Q(b)`); two commas in a row are an error.
//!
//! The reader only checks syntax and produces borrowed clauses; building the
//! [`World`](super::world::World) from them happens in `world.rs`.

use std::fmt;
use std::iter::Peekable;

use thiserror::Error;

mod lexer;
use lexer::Lexer;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("line:{line} col:{col} {message}")]
pub struct Error {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl Error {
    pub fn new(line: usize, col: usize, message: String) -> Self {
        Self { line, col, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub len: usize,
}

impl Span {
    pub fn new(line: usize, col: usize, len: usize) -> Self {
        Self { line, col, len }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Bang,
    OpenParenthesis,
    CloseParenthesis,
    Comma,
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::OpenParenthesis => write!(f, "("),
            TokenKind::CloseParenthesis => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub span: Span,
    pub kind: TokenKind<'a>,
}

/// `Name(Arg1, Arg2)` or `!Name(Arg1)` as written in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause<'a> {
    pub span: Span,
    pub negated: bool,
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDecl<'a> {
    pub declaration: Clause<'a>,
    pub pre: Vec<Clause<'a>>,
    pub post: Vec<Clause<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainText<'a> {
    pub init: Vec<Clause<'a>>,
    pub goal: Vec<Clause<'a>>,
    pub actions: Vec<ActionDecl<'a>>,
}

const INIT_HEADERS: &[&str] = &["initial state:", "init:"];
const GOAL_HEADERS: &[&str] = &["goal state:", "goal:"];
const ACTIONS_HEADERS: &[&str] = &["actions:"];
const PRE_HEADERS: &[&str] = &["preconditions:", "pre:"];
const POST_HEADERS: &[&str] = &["postconditions:", "post:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Initial,
    Goal,
    Actions,
    ActionDeclaration,
    ActionPre,
    ActionPost,
}

impl ParseState {
    fn expected(&self) -> &'static str {
        match self {
            ParseState::Initial => "Initial state not specified correctly. Line should start with 'Initial state:' or 'init:'",
            ParseState::Goal => "Goal state not specified correctly. Line should start with 'Goal state:' or 'goal:'",
            ParseState::Actions => "Actions not specified correctly. Line should be 'Actions:'",
            ParseState::ActionDeclaration => "Action not specified correctly. Expected action declaration in form Name(Param1, ...)",
            ParseState::ActionPre => "Preconditions not specified correctly. Line should start with 'Preconditions:' or 'pre:'",
            ParseState::ActionPost => "Postconditions not specified correctly. Line should start with 'Postconditions:' or 'post:'",
        }
    }
}

/// Case-insensitive match of one of `headers` at the start of `line`.
/// Returns the remaining text and its 1-based column.
fn strip_header<'a>(line: &'a str, col: usize, headers: &[&str]) -> Option<(&'a str, usize)> {
    headers.iter().find_map(|header| {
        let prefix = line.get(..header.len())?;
        if prefix.eq_ignore_ascii_case(header) {
            Some((&line[header.len()..], col + prefix.chars().count()))
        } else {
            None
        }
    })
}

/// Reads a comma or whitespace separated list of clauses until the end of the line.
fn parse_clauses<'a>(text: &'a str, line: usize, col: usize) -> Result<Vec<Clause<'a>>, Error> {
    let mut tokens = Lexer::new(text, line, col).peekable();
    let end = Lexer::new(text, line, col).end_position();
    let mut clauses = Vec::new();
    loop {
        match tokens.peek() {
            None => break,
            Some(Ok(Token { kind: TokenKind::Comma, .. })) if !clauses.is_empty() => {
                tokens.next();
                if let Some(Ok(token @ Token { kind: TokenKind::Comma, .. })) = tokens.peek() {
                    return Err(unexpected(token, "a clause"));
                }
            }
            Some(_) => clauses.push(parse_clause(&mut tokens, end)?),
        }
    }
    Ok(clauses)
}

fn next_token<'a, I>(tokens: &mut Peekable<I>, end: (usize, usize), wanted: &str) -> Result<Token<'a>, Error>
where
    I: Iterator<Item = Result<Token<'a>, Error>>,
{
    match tokens.next() {
        Some(token) => token,
        None => Err(Error::new(end.0, end.1, format!("Unexpected end of line, expected {}.", wanted))),
    }
}

fn unexpected(token: &Token, wanted: &str) -> Error {
    Error::new(token.span.line, token.span.col, format!("Unexpected '{}', expected {}.", token.kind, wanted))
}

fn parse_clause<'a, I>(tokens: &mut Peekable<I>, end: (usize, usize)) -> Result<Clause<'a>, Error>
where
    I: Iterator<Item = Result<Token<'a>, Error>>,
{
    let mut first = next_token(tokens, end, "a clause")?;
    let negated = first.kind == TokenKind::Bang;
    let span = first.span;
    if negated {
        first = next_token(tokens, end, "a predicate name")?;
    }
    let name = match first.kind {
        TokenKind::Identifier(name) if name.starts_with(|c: char| c.is_alphabetic()) => name,
        _ => return Err(unexpected(&first, "a predicate name")),
    };
    let open = next_token(tokens, end, "'('")?;
    if open.kind != TokenKind::OpenParenthesis {
        return Err(unexpected(&open, "'('"));
    }
    let mut args = Vec::new();
    loop {
        let token = next_token(tokens, end, "an argument or ')'")?;
        match token.kind {
            TokenKind::CloseParenthesis if args.is_empty() => break,
            TokenKind::Identifier(arg) => args.push(arg),
            _ => return Err(unexpected(&token, "an argument")),
        }
        let separator = next_token(tokens, end, "',' or ')'")?;
        match separator.kind {
            TokenKind::Comma => continue,
            TokenKind::CloseParenthesis => break,
            _ => return Err(unexpected(&separator, "',' or ')'")),
        }
    }
    Ok(Clause { span, negated, name, args })
}

/// Splits domain text into its sections. Fails on the first malformed line.
pub fn parse(text: &str) -> Result<DomainText<'_>, Error> {
    let mut domain = DomainText::default();
    let mut state = ParseState::Initial;
    let mut current: Option<ActionDecl> = None;
    let mut last_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let content = raw.trim_start();
        let col = raw.chars().count() - content.chars().count() + 1;
        let content = content.trim_end();
        let mismatch = || Error::new(line, col, format!("{} but was: {}", state.expected(), trimmed));

        match state {
            ParseState::Initial => {
                let (rest, rest_col) = strip_header(content, col, INIT_HEADERS).ok_or_else(mismatch)?;
                domain.init = parse_clauses(rest, line, rest_col)?;
                state = ParseState::Goal;
            }
            ParseState::Goal => {
                let (rest, rest_col) = strip_header(content, col, GOAL_HEADERS).ok_or_else(mismatch)?;
                domain.goal = parse_clauses(rest, line, rest_col)?;
                state = ParseState::Actions;
            }
            ParseState::Actions => {
                match strip_header(content, col, ACTIONS_HEADERS) {
                    Some((rest, _)) if rest.trim().is_empty() => (),
                    _ => return Err(mismatch()),
                }
                state = ParseState::ActionDeclaration;
            }
            ParseState::ActionDeclaration => {
                let mut clauses = parse_clauses(content, line, col).map_err(|e| Error::new(e.line, e.col, format!("{} ({})", state.expected(), e.message)))?;
                if clauses.len() != 1 || clauses[0].negated {
                    return Err(mismatch());
                }
                let declaration = clauses.remove(0);
                current = Some(ActionDecl { declaration, pre: Vec::new(), post: Vec::new() });
                state = ParseState::ActionPre;
            }
            ParseState::ActionPre => {
                let (rest, rest_col) = strip_header(content, col, PRE_HEADERS).ok_or_else(mismatch)?;
                if let Some(ref mut action) = current {
                    action.pre = parse_clauses(rest, line, rest_col)?;
                }
                state = ParseState::ActionPost;
            }
            ParseState::ActionPost => {
                let (rest, rest_col) = strip_header(content, col, POST_HEADERS).ok_or_else(mismatch)?;
                if let Some(mut action) = current.take() {
                    action.post = parse_clauses(rest, line, rest_col)?;
                    domain.actions.push(action);
                }
                state = ParseState::ActionDeclaration;
            }
        }
    }

    match state {
        ParseState::Actions | ParseState::ActionDeclaration => Ok(domain),
        _ => Err(Error::new(last_line + 1, 1, format!("Unexpected end of input. {}", state.expected()))),
    }
}
