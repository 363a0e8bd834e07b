//! Tokenizer (spec §4.A, component A).
//!
//! Turns a byte slice into a token stream. Processing is byte-oriented;
//! UTF-8 text passes through untouched because we never split a byte
//! sequence except on ASCII shell metacharacters.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Operator,
    Keyword,
    Redirection,
    Newline,
    Comment,
    /// Raw `((...))` text, captured whole because the bash arithmetic
    /// grammar inside it (`i<n`, `;`) would otherwise collide with the
    /// generic operator/redirection tokenizer (spec §4.D / §4.B
    /// C-style-for sugar).
    ArithGroup,
    Eof,
}

/// Operators recognized by the tokenizer (spec §4.A rule 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Pipe,       // |
    PipeAmp,    // |&
    AndAnd,     // &&
    OrOr,       // ||
    Amp,        // &
    Semi,       // ;
    DSemi,      // ;;
    SemiAnd,    // ;&
    SemiSemiAnd, // ;;&
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
}

/// Redirection operators (spec §4.A rule 2 + §3 RedirectionNode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirOp {
    Less, Great, DGreat, GreatAnd, LessAnd, LessGreat,
    Clobber, AndGreat, AndDGreat, TLess, DLess, DLessDash,
}

/// One quote/escape segment of a word, preserved past tokenization so
/// expansion can decide which segments undergo parameter substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Unquoted(String),
    SingleQuoted(String),
    DoubleQuoted(String),
    /// An unquoted backslash escape of a single byte/char.
    Escaped(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub raw: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Word(WordToken),
    Op(Op),
    Redir { op: RedirOp, fd: Option<i32>, fd_variable: Option<String> },
    Keyword(String),
    HereDocBody { delimiter: String, strip_tabs: bool, quoted: bool, body: String },
    /// Inner text of a bare `((...))` group, delimiters stripped.
    ArithGroup(String),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}:{}", self.kind, self.line, self.column)
    }
}

pub const RESERVED_WORDS: &[&str] = &[
    "if", "then", "elif", "else", "fi", "while", "until", "do", "done",
    "for", "in", "case", "esac", "select", "function", "{", "}",
    "[[", "]]", "time", "!", "def",
];

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("unexpected EOF while looking for matching `{quote}'")]
    UnterminatedQuote { quote: char, line: usize },
    #[error("unexpected EOF while looking for matching delimiter `{delimiter}'")]
    UnterminatedHereDoc { delimiter: String, line: usize },
    #[error("unexpected EOF while looking for matching `)'")]
    UnterminatedSubstitution { line: usize },
}

struct PendingHereDoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
    slot: usize,
}

/// Byte-oriented tokenizer. One `Lexer` consumes one logical input
/// (a full script, or one line fed incrementally by the line editor).
pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    /// True only directly after a command-starting position (start of
    /// script, after `;`/`|`/`&&`/`||`/newline/`(`/`{`/keyword), so
    /// reserved words are recognized only there (spec §4.A rule 4).
    command_start: bool,
    pending_heredocs: Vec<PendingHereDoc>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            command_start: true,
            pending_heredocs: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.bytes.get(self.pos + off).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    /// Tokenize the entire input. Returns `Incomplete` semantics are
    /// the parser's job: the lexer always finishes or returns a
    /// `TokenError`; the parser decides whether an error means
    /// "genuinely malformed" or "needs more input".
    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenError> {
        loop {
            self.skip_inline_whitespace();

            if !self.pending_heredocs.is_empty() && self.peek_is_newline_or_eof() {
                self.consume_heredocs()?;
                continue;
            }

            let (line, column) = (self.line, self.column);
            match self.peek() {
                None => {
                    if !self.pending_heredocs.is_empty() {
                        return Err(TokenError::UnterminatedHereDoc {
                            delimiter: self.pending_heredocs[0].delimiter.clone(),
                            line,
                        });
                    }
                    self.tokens.push(Token { kind: TokenKind::Eof, value: TokenValue::None, line, column });
                    break;
                }
                Some(b'#') if self.command_start || self.last_was_whitespace_boundary() => {
                    self.skip_comment();
                }
                Some(b'\n') => {
                    self.advance();
                    self.tokens.push(Token { kind: TokenKind::Newline, value: TokenValue::None, line, column });
                    self.command_start = true;
                }
                Some(b) if is_operator_start(b) => {
                    self.lex_operator(line, column)?;
                }
                _ => {
                    self.lex_word(line, column)?;
                }
            }
        }
        Ok(self.tokens)
    }

    fn last_was_whitespace_boundary(&self) -> bool {
        matches!(self.tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. }))
    }

    fn peek_is_newline_or_eof(&self) -> bool {
        matches!(self.peek(), None | Some(b'\n'))
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
    }

    fn consume_heredocs(&mut self) -> Result<(), TokenError> {
        // Skip the newline that ends the command line starting the heredocs.
        if self.peek() == Some(b'\n') {
            self.advance();
        }
        let pending = std::mem::take(&mut self.pending_heredocs);
        for p in pending {
            let mut body = String::new();
            loop {
                if self.peek().is_none() {
                    return Err(TokenError::UnterminatedHereDoc { delimiter: p.delimiter.clone(), line: self.line });
                }
                let line_start = self.pos;
                while matches!(self.peek(), Some(b) if b != b'\n') {
                    self.advance();
                }
                let mut line_bytes = &self.bytes[line_start..self.pos];
                if self.peek() == Some(b'\n') {
                    self.advance();
                }
                let mut check = line_bytes;
                if p.strip_tabs {
                    while check.first() == Some(&b'\t') {
                        check = &check[1..];
                    }
                }
                if check == p.delimiter.as_bytes() {
                    break;
                }
                if p.strip_tabs {
                    while line_bytes.first() == Some(&b'\t') {
                        line_bytes = &line_bytes[1..];
                    }
                }
                body.push_str(&String::from_utf8_lossy(line_bytes));
                body.push('\n');
            }
            self.tokens.push(Token {
                kind: TokenKind::Word,
                value: TokenValue::HereDocBody {
                    delimiter: p.delimiter,
                    strip_tabs: p.strip_tabs,
                    quoted: p.quoted,
                    body,
                },
                line: self.line,
                column: 1,
            });
            let _ = p.slot;
        }
        Ok(())
    }

    fn lex_operator(&mut self, line: usize, column: usize) -> Result<(), TokenError> {
        macro_rules! emit_op {
            ($len:expr, $op:expr) => {{
                for _ in 0..$len { self.advance(); }
                self.tokens.push(Token { kind: TokenKind::Operator, value: TokenValue::Op($op), line, column });
            }};
        }
        macro_rules! emit_redir {
            ($len:expr, $op:expr) => {{
                for _ in 0..$len { self.advance(); }
                self.tokens.push(Token {
                    kind: TokenKind::Redirection,
                    value: TokenValue::Redir { op: $op, fd: None, fd_variable: None },
                    line, column,
                });
            }};
        }

        if self.starts_with("<<<") { emit_redir!(3, RedirOp::TLess); self.command_start = false; return Ok(()); }
        if self.starts_with("<<-") {
            emit_redir!(3, RedirOp::DLessDash);
            self.register_pending_heredoc(true)?;
            self.command_start = false;
            return Ok(());
        }
        if self.starts_with("<<") {
            emit_redir!(2, RedirOp::DLess);
            self.register_pending_heredoc(false)?;
            self.command_start = false;
            return Ok(());
        }
        if self.starts_with("<&") { emit_redir!(2, RedirOp::LessAnd); self.command_start = false; return Ok(()); }
        if self.starts_with("<>") { emit_redir!(2, RedirOp::LessGreat); self.command_start = false; return Ok(()); }
        if self.starts_with(">>") { emit_redir!(2, RedirOp::DGreat); self.command_start = false; return Ok(()); }
        if self.starts_with(">&") { emit_redir!(2, RedirOp::GreatAnd); self.command_start = false; return Ok(()); }
        if self.starts_with(">|") { emit_redir!(2, RedirOp::Clobber); self.command_start = false; return Ok(()); }
        if self.starts_with("&>>") { emit_redir!(3, RedirOp::AndDGreat); self.command_start = false; return Ok(()); }
        if self.starts_with("&>") { emit_redir!(2, RedirOp::AndGreat); self.command_start = false; return Ok(()); }
        if self.starts_with("<") { emit_redir!(1, RedirOp::Less); self.command_start = false; return Ok(()); }
        if self.starts_with(">") { emit_redir!(1, RedirOp::Great); self.command_start = false; return Ok(()); }

        if self.starts_with("&&") { emit_op!(2, Op::AndAnd); self.command_start = true; return Ok(()); }
        if self.starts_with("||") { emit_op!(2, Op::OrOr); self.command_start = true; return Ok(()); }
        if self.starts_with("|&") { emit_op!(2, Op::PipeAmp); self.command_start = true; return Ok(()); }
        if self.starts_with("|") { emit_op!(1, Op::Pipe); self.command_start = true; return Ok(()); }
        if self.starts_with(";;&") { emit_op!(3, Op::SemiSemiAnd); self.command_start = true; return Ok(()); }
        if self.starts_with(";&") { emit_op!(2, Op::SemiAnd); self.command_start = true; return Ok(()); }
        if self.starts_with(";;") { emit_op!(2, Op::DSemi); self.command_start = true; return Ok(()); }
        if self.starts_with(";") { emit_op!(1, Op::Semi); self.command_start = true; return Ok(()); }
        if self.starts_with("&") { emit_op!(1, Op::Amp); self.command_start = true; return Ok(()); }
        if self.starts_with("((") {
            let (line0, column0) = (self.line, self.column);
            let text = self.consume_balanced("((", "))")?;
            let inner = text[2..text.len() - 2].to_string();
            self.tokens.push(Token {
                kind: TokenKind::ArithGroup,
                value: TokenValue::ArithGroup(inner),
                line: line0,
                column: column0,
            });
            self.command_start = false;
            return Ok(());
        }
        if self.starts_with("(") { emit_op!(1, Op::LParen); self.command_start = true; return Ok(()); }
        if self.starts_with(")") { emit_op!(1, Op::RParen); self.command_start = false; return Ok(()); }
        if self.starts_with("{") { emit_op!(1, Op::LBrace); self.command_start = true; return Ok(()); }
        if self.starts_with("}") { emit_op!(1, Op::RBrace); self.command_start = false; return Ok(()); }

        // Fallback: shouldn't happen given is_operator_start, but treat as a word byte.
        self.lex_word(line, column)
    }

    fn register_pending_heredoc(&mut self, strip_tabs: bool) -> Result<(), TokenError> {
        self.skip_inline_whitespace();
        let mut quoted = false;
        let quote_char = match self.peek() {
            Some(b'\'') | Some(b'"') => {
                quoted = true;
                self.advance()
            }
            _ => None,
        };
        let mut delim = String::new();
        if let Some(q) = quote_char {
            while let Some(b) = self.peek() {
                if b == q {
                    self.advance();
                    break;
                }
                delim.push(self.advance().unwrap() as char);
            }
        } else {
            while let Some(b) = self.peek() {
                if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                    delim.push(self.advance().unwrap() as char);
                } else {
                    break;
                }
            }
        }
        let slot = self.pending_heredocs.len();
        self.pending_heredocs.push(PendingHereDoc { delimiter: delim, strip_tabs, quoted, slot });
        Ok(())
    }

    /// Lex a word (and, when at command-start, recognize reserved
    /// words) with full quote/escape tracking (spec §4.A rule 1).
    fn lex_word(&mut self, line: usize, column: usize) -> Result<(), TokenError> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut raw = String::new();
        let mut current_unquoted = String::new();

        // Numeric prefix immediately followed by a redirection operator
        // becomes the fd, e.g. `2>&1`.
        if self.peek().map_or(false, |b| b.is_ascii_digit()) {
            let start = self.pos;
            let mut digits = String::new();
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                digits.push(self.advance().unwrap() as char);
            }
            if matches!(self.peek(), Some(b'<') | Some(b'>')) {
                return self.lex_fd_redirection(line, column, digits.parse().ok());
            }
            self.pos = start;
        }
        if self.peek() == Some(b'{') {
            // Possible {varname}> fd-variable redirection.
            let start = self.pos;
            let save_line = self.line;
            let save_col = self.column;
            self.advance();
            let mut name = String::new();
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                name.push(self.advance().unwrap() as char);
            }
            if !name.is_empty() && self.peek() == Some(b'}') && matches!(self.peek_at(1), Some(b'<') | Some(b'>')) {
                self.advance();
                return self.lex_fd_variable_redirection(line, column, name);
            }
            self.pos = start;
            self.line = save_line;
            self.column = save_col;
        }

        loop {
            match self.peek() {
                None => break,
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => break,
                Some(b) if is_operator_start(b) => break,
                Some(b'#') if raw.is_empty() => break,
                Some(b'\'') => {
                    if !current_unquoted.is_empty() {
                        segments.push(Segment::Unquoted(std::mem::take(&mut current_unquoted)));
                    }
                    raw.push('\'');
                    self.advance();
                    let mut s = String::new();
                    loop {
                        match self.advance() {
                            None => return Err(TokenError::UnterminatedQuote { quote: '\'', line }),
                            Some(b'\'') => break,
                            Some(b) => s.push(b as char),
                        }
                    }
                    raw.push_str(&s);
                    raw.push('\'');
                    segments.push(Segment::SingleQuoted(s));
                }
                Some(b'"') => {
                    if !current_unquoted.is_empty() {
                        segments.push(Segment::Unquoted(std::mem::take(&mut current_unquoted)));
                    }
                    raw.push('"');
                    self.advance();
                    let mut s = String::new();
                    loop {
                        match self.peek() {
                            None => return Err(TokenError::UnterminatedQuote { quote: '"', line }),
                            Some(b'"') => {
                                self.advance();
                                break;
                            }
                            Some(b'\\') => {
                                let next = self.peek_at(1);
                                if matches!(next, Some(b'$') | Some(b'`') | Some(b'"') | Some(b'\\') | Some(b'\n')) {
                                    self.advance();
                                    let n = self.advance().unwrap();
                                    if n != b'\n' {
                                        s.push('\\');
                                        s.push(n as char);
                                    }
                                } else {
                                    s.push(self.advance().unwrap() as char);
                                }
                            }
                            Some(b) => {
                                s.push(self.advance().unwrap() as char);
                                let _ = b;
                            }
                        }
                    }
                    raw.push_str(&s);
                    raw.push('"');
                    segments.push(Segment::DoubleQuoted(s));
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        None => return Err(TokenError::UnterminatedQuote { quote: '\\', line }),
                        Some(b'\n') => {
                            // Line continuation: produces nothing.
                        }
                        Some(b) => {
                            if !current_unquoted.is_empty() {
                                segments.push(Segment::Unquoted(std::mem::take(&mut current_unquoted)));
                            }
                            raw.push('\\');
                            raw.push(b as char);
                            segments.push(Segment::Escaped(b as char));
                        }
                    }
                }
                Some(b'$') if self.peek_at(1) == Some(b'(') && self.peek_at(2) == Some(b'(') => {
                    let text = self.consume_balanced("$((", "))")?;
                    raw.push_str(&text);
                    current_unquoted.push_str(&text);
                }
                Some(b'$') if self.peek_at(1) == Some(b'(') => {
                    let text = self.consume_balanced_parens("$(")?;
                    raw.push_str(&text);
                    current_unquoted.push_str(&text);
                }
                Some(b'`') => {
                    let text = self.consume_backtick()?;
                    raw.push_str(&text);
                    current_unquoted.push_str(&text);
                }
                Some(b'<') | Some(b'>') if self.peek_at(1) == Some(b'(') => {
                    let text = self.consume_balanced_parens(if self.peek() == Some(b'<') { "<(" } else { ">(" })?;
                    raw.push_str(&text);
                    current_unquoted.push_str(&text);
                }
                Some(b) => {
                    current_unquoted.push(b as char);
                    raw.push(b as char);
                    self.advance();
                }
            }
        }
        if !current_unquoted.is_empty() {
            segments.push(Segment::Unquoted(current_unquoted));
        }

        if raw.is_empty() {
            // Shouldn't happen (caller only calls when there's a byte to consume).
            return Ok(());
        }

        if self.command_start && RESERVED_WORDS.contains(&raw.as_str()) && segments.iter().all(|s| matches!(s, Segment::Unquoted(_))) {
            self.tokens.push(Token { kind: TokenKind::Keyword, value: TokenValue::Keyword(raw), line, column });
            self.command_start = matches!(self.tokens.last().unwrap().value, TokenValue::Keyword(ref k) if k != "}" && k != "]]" );
            return Ok(());
        }

        self.command_start = false;
        self.tokens.push(Token { kind: TokenKind::Word, value: TokenValue::Word(WordToken { raw, segments }), line, column });
        Ok(())
    }

    fn lex_fd_redirection(&mut self, line: usize, column: usize, fd: Option<i32>) -> Result<(), TokenError> {
        macro_rules! emit {
            ($len:expr, $op:expr) => {{
                for _ in 0..$len { self.advance(); }
                self.tokens.push(Token {
                    kind: TokenKind::Redirection,
                    value: TokenValue::Redir { op: $op, fd, fd_variable: None },
                    line, column,
                });
                self.command_start = false;
                return Ok(());
            }};
        }
        if self.starts_with("<<<") { emit!(3, RedirOp::TLess); }
        if self.starts_with("<<-") { emit!(3, RedirOp::DLessDash); self.register_pending_heredoc(true)?; return Ok(()); }
        if self.starts_with("<<") { emit!(2, RedirOp::DLess); self.register_pending_heredoc(false)?; return Ok(()); }
        if self.starts_with("<&") { emit!(2, RedirOp::LessAnd); }
        if self.starts_with("<>") { emit!(2, RedirOp::LessGreat); }
        if self.starts_with(">>") { emit!(2, RedirOp::DGreat); }
        if self.starts_with(">&") { emit!(2, RedirOp::GreatAnd); }
        if self.starts_with(">|") { emit!(2, RedirOp::Clobber); }
        if self.starts_with("<") { emit!(1, RedirOp::Less); }
        if self.starts_with(">") { emit!(1, RedirOp::Great); }
        unreachable!("caller only invokes when peek is < or >")
    }

    fn lex_fd_variable_redirection(&mut self, line: usize, column: usize, var: String) -> Result<(), TokenError> {
        macro_rules! emit {
            ($len:expr, $op:expr) => {{
                for _ in 0..$len { self.advance(); }
                self.tokens.push(Token {
                    kind: TokenKind::Redirection,
                    value: TokenValue::Redir { op: $op, fd: None, fd_variable: Some(var) },
                    line, column,
                });
                self.command_start = false;
                return Ok(());
            }};
        }
        if self.starts_with(">>") { emit!(2, RedirOp::DGreat); }
        if self.starts_with(">") { emit!(1, RedirOp::Great); }
        if self.starts_with("<") { emit!(1, RedirOp::Less); }
        unreachable!("caller only invokes when peek is < or >")
    }

    /// Consume balanced `open`..`close` text verbatim (used for `$(...)`,
    /// `$((...))`, `<(...)`, `>(...)`), tracking quotes so an embedded
    /// `)` inside a string doesn't close early.
    fn consume_balanced_parens(&mut self, open: &str) -> Result<String, TokenError> {
        let line = self.line;
        let mut out = String::new();
        for _ in 0..open.len() { out.push(self.advance().unwrap() as char); }
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => return Err(TokenError::UnterminatedSubstitution { line }),
                Some(b'(') => { depth += 1; out.push(self.advance().unwrap() as char); }
                Some(b')') => {
                    depth -= 1;
                    out.push(self.advance().unwrap() as char);
                    if depth == 0 {
                        break;
                    }
                }
                Some(b'\'') => {
                    out.push(self.advance().unwrap() as char);
                    loop {
                        match self.advance() {
                            None => return Err(TokenError::UnterminatedQuote { quote: '\'', line }),
                            Some(b'\'') => { out.push('\''); break; }
                            Some(b) => out.push(b as char),
                        }
                    }
                }
                Some(b'"') => {
                    out.push(self.advance().unwrap() as char);
                    loop {
                        match self.peek() {
                            None => return Err(TokenError::UnterminatedQuote { quote: '"', line }),
                            Some(b'"') => { out.push(self.advance().unwrap() as char); break; }
                            Some(b'\\') => { out.push(self.advance().unwrap() as char); if let Some(b) = self.advance() { out.push(b as char); } }
                            Some(_) => out.push(self.advance().unwrap() as char),
                        }
                    }
                }
                Some(_) => out.push(self.advance().unwrap() as char),
            }
        }
        Ok(out)
    }

    fn consume_balanced(&mut self, open: &str, close: &str) -> Result<String, TokenError> {
        let line = self.line;
        let mut out = String::new();
        for _ in 0..open.len() { out.push(self.advance().unwrap() as char); }
        loop {
            if self.starts_with(close) {
                for _ in 0..close.len() { out.push(self.advance().unwrap() as char); }
                break;
            }
            match self.advance() {
                None => return Err(TokenError::UnterminatedSubstitution { line }),
                Some(b) => out.push(b as char),
            }
        }
        Ok(out)
    }

    fn consume_backtick(&mut self) -> Result<String, TokenError> {
        let line = self.line;
        let mut out = String::new();
        out.push(self.advance().unwrap() as char); // opening `
        loop {
            match self.peek() {
                None => return Err(TokenError::UnterminatedSubstitution { line }),
                Some(b'`') => { out.push(self.advance().unwrap() as char); break; }
                Some(b'\\') => {
                    out.push(self.advance().unwrap() as char);
                    if let Some(b) = self.advance() { out.push(b as char); }
                }
                Some(_) => out.push(self.advance().unwrap() as char),
            }
        }
        Ok(out)
    }
}

fn is_operator_start(b: u8) -> bool {
    matches!(b, b'|' | b'&' | b';' | b'(' | b')' | b'{' | b'}' | b'<' | b'>')
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<String> {
        tokens.iter().filter_map(|t| match &t.value {
            TokenValue::Word(w) => Some(w.raw.clone()),
            _ => None,
        }).collect()
    }

    #[test]
    fn simple_command() {
        let tokens = tokenize("echo hello world").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn operators() {
        let tokens = tokenize("a && b || c ; d &").unwrap();
        let ops: Vec<Op> = tokens.iter().filter_map(|t| match &t.value {
            TokenValue::Op(o) => Some(*o),
            _ => None,
        }).collect();
        assert_eq!(ops, vec![Op::AndAnd, Op::OrOr, Op::Semi, Op::Amp]);
    }

    #[test]
    fn single_quote_is_literal() {
        let tokens = tokenize("echo '$HOME'").unwrap();
        match &tokens[1].value {
            TokenValue::Word(w) => assert_eq!(w.segments, vec![Segment::SingleQuoted("$HOME".to_string())]),
            _ => panic!("expected word"),
        }
    }

    #[test]
    fn unterminated_quote_errors() {
        let err = tokenize("echo 'unterminated").unwrap_err();
        assert!(matches!(err, TokenError::UnterminatedQuote { quote: '\'', .. }));
    }

    #[test]
    fn heredoc_body_captured() {
        let tokens = tokenize("cat <<EOF\nhello\nEOF\n").unwrap();
        let body = tokens.iter().find_map(|t| match &t.value {
            TokenValue::HereDocBody { body, .. } => Some(body.clone()),
            _ => None,
        }).unwrap();
        assert_eq!(body, "hello\n");
    }

    #[test]
    fn heredoc_dash_strips_tabs() {
        let tokens = tokenize("cat <<-EOF\n\t\thello\n\tEOF\n").unwrap();
        let body = tokens.iter().find_map(|t| match &t.value {
            TokenValue::HereDocBody { body, .. } => Some(body.clone()),
            _ => None,
        }).unwrap();
        assert_eq!(body, "hello\n");
    }

    #[test]
    fn fd_redirection_number() {
        let tokens = tokenize("cmd 2>&1").unwrap();
        let redir = tokens.iter().find_map(|t| match &t.value {
            TokenValue::Redir { op, fd, .. } => Some((*op, *fd)),
            _ => None,
        }).unwrap();
        assert_eq!(redir, (RedirOp::GreatAnd, Some(2)));
    }

    #[test]
    fn reserved_word_only_at_command_start() {
        let tokens = tokenize("if true; then echo if; fi").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Keyword);
        // `if` as an argument to echo is a plain word, not a keyword.
        let echo_if_is_word = tokens.iter().any(|t| matches!(&t.value, TokenValue::Word(w) if w.raw == "if"));
        assert!(echo_if_is_word);
    }

    #[test]
    fn command_substitution_kept_balanced() {
        let tokens = tokenize("echo $(echo $(echo nested))").unwrap();
        let word = tokens.iter().find_map(|t| match &t.value {
            TokenValue::Word(w) if w.raw.starts_with("$(") => Some(w.raw.clone()),
            _ => None,
        }).unwrap();
        assert_eq!(word, "$(echo $(echo nested))");
    }
}
