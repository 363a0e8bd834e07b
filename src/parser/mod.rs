//! Parser (spec §4.B, component B).
//!
//! Recursive-descent, top-down, with the chain-level precedence climb
//! spec §4.B prescribes: `Background` > `Semicolon` > `AndIf`/`OrIf`
//! (equal, left-assoc) > `Pipe`. Compound statements are parsed in
//! place and folded into a `CommandNode::Compound` leaf so the chain
//! shape stays uniform for the executor.

pub mod conditional_parser;
pub mod lexer;
pub mod word_parser;

use crate::ast::*;
use lexer::{Lexer, Op, RedirOp, Segment, Token, TokenKind, TokenValue, TokenError};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    #[allow(dead_code)]
    UnexpectedToken { found: String, expected: String, line: usize },
    EmptyCommand { line: usize },
    InvalidRedirection { message: String },
    UnmatchedParen { context: String },
    InvalidSubstitution { message: String },
    Token(TokenError),
    /// Input ended while a quote, here-doc, or compound block was still
    /// open; the caller should buffer more input and re-feed (spec
    /// §4.B "Multi-line input").
    Incomplete,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected, line } => {
                write!(f, "line {line}: unexpected token `{found}`, expected {expected}")
            }
            Self::EmptyCommand { line } => write!(f, "line {line}: syntax error near unexpected token"),
            Self::InvalidRedirection { message } => write!(f, "{message}"),
            Self::UnmatchedParen { context } => write!(f, "unexpected EOF while looking for matching `{context}'"),
            Self::InvalidSubstitution { message } => write!(f, "bad substitution: {message}"),
            Self::Token(e) => write!(f, "{e}"),
            Self::Incomplete => write!(f, "unexpected EOF"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<TokenError> for ParseError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Result of feeding one logical chunk of input to the parser (spec
/// §4.B "Multi-line input").
pub enum ParseOutcome {
    Complete(ScriptNode),
    Incomplete,
    Error(ParseError),
}

/// Parse a complete script/block, failing rather than asking for more
/// input. Used for `$(...)`, `source`, `-c CMD`, and anywhere the
/// caller already knows the text is a whole unit.
pub fn parse_script(input: &str) -> ParseResult<ScriptNode> {
    match parse_input(input) {
        ParseOutcome::Complete(s) => Ok(s),
        ParseOutcome::Incomplete => Err(ParseError::Incomplete),
        ParseOutcome::Error(e) => Err(e),
    }
}

/// Entry point for the line editor / script reader: tokenizes and
/// parses `input`, reporting `Incomplete` rather than an error when
/// more text is needed (unterminated quote/heredoc/compound block).
pub fn parse_input(input: &str) -> ParseOutcome {
    let tokens = match Lexer::new(input).tokenize() {
        Ok(t) => t,
        Err(TokenError::UnterminatedQuote { .. })
        | Err(TokenError::UnterminatedHereDoc { .. })
        | Err(TokenError::UnterminatedSubstitution { .. }) => return ParseOutcome::Incomplete,
    };
    let mut parser = Parser::new(tokens);
    match parser.parse_script() {
        Ok(script) => {
            if parser.at_eof() {
                ParseOutcome::Complete(script)
            } else {
                ParseOutcome::Error(ParseError::UnexpectedToken {
                    found: parser.describe_current(),
                    expected: "end of input".to_string(),
                    line: parser.current_line(),
                })
            }
        }
        Err(ParseError::Incomplete) => ParseOutcome::Incomplete,
        Err(e) => ParseOutcome::Error(e),
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Reserved words recognized only structurally (spec §4.A rule 4): the
/// lexer's `command_start` heuristic already classifies most of these
/// as `Keyword`, but a few (`in`, `do`, `done`, `then`, `elif`, `else`,
/// `fi`, `esac`) land as plain `Word` tokens whenever they appear
/// somewhere the lexer doesn't consider command-start (e.g. `in` right
/// after `for i`). The parser treats a plain, fully-unquoted word with
/// matching text the same as the keyword token at the specific grammar
/// points that expect it.
impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_line(&self) -> usize {
        self.peek().line
    }

    fn describe_current(&self) -> String {
        match &self.peek().value {
            TokenValue::Word(w) => w.raw.clone(),
            TokenValue::Keyword(k) => k.clone(),
            TokenValue::Op(_) => "operator".to_string(),
            TokenValue::Redir { .. } => "redirection".to_string(),
            TokenValue::ArithGroup(_) => "((...))".to_string(),
            TokenValue::HereDocBody { .. } => "here-doc".to_string(),
            TokenValue::None => "newline/EOF".to_string(),
        }
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn is_op(&self, op: Op) -> bool {
        matches!(&self.peek().value, TokenValue::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.is_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// True if the current token is the keyword `kw`, whether the
    /// lexer classified it as `Keyword` or as a plain unquoted `Word`
    /// (see struct docs).
    fn matches_kw(&self, kw: &str) -> bool {
        match &self.peek().value {
            TokenValue::Keyword(k) => k == kw,
            TokenValue::Word(w) if w.segments.len() == 1 => {
                matches!(&w.segments[0], Segment::Unquoted(s) if s == kw)
            }
            _ => false,
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.matches_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> ParseResult<()> {
        if self.at_eof() {
            return Err(ParseError::Incomplete);
        }
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: self.describe_current(),
                expected: format!("`{kw}`"),
                line: self.current_line(),
            })
        }
    }

    fn is_separator(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
            || self.is_op(Op::Semi)
            || self.is_op(Op::Amp)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skip `;`/newline statement separators between list items.
    fn skip_separators(&mut self) {
        loop {
            if matches!(self.peek().kind, TokenKind::Newline) || self.is_op(Op::Semi) {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Script / statement list
    // ------------------------------------------------------------------

    pub fn parse_script(&mut self) -> ParseResult<ScriptNode> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(ScriptNode { statements })
    }

    /// Parse statements until the current token is one of `stops`
    /// (checked with `matches_kw`), or `)` for subshell bodies handled
    /// by the caller. Returns `Incomplete` if EOF is hit first.
    fn parse_statement_list_until(&mut self, stops: &[&str]) -> ParseResult<Vec<StatementNode>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !stops.iter().any(|kw| self.matches_kw(kw)) {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<StatementNode> {
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();
        loop {
            if self.eat_op(Op::AndAnd) {
                self.skip_newlines();
                operators.push(StatementOperator::And);
                pipelines.push(self.parse_pipeline()?);
            } else if self.eat_op(Op::OrOr) {
                self.skip_newlines();
                operators.push(StatementOperator::Or);
                pipelines.push(self.parse_pipeline()?);
            } else {
                break;
            }
        }
        let background = self.eat_op(Op::Amp);
        Ok(StatementNode { pipelines, operators, background })
    }

    fn parse_pipeline(&mut self) -> ParseResult<PipelineNode> {
        let mut timed = false;
        let mut time_posix = false;
        if self.eat_kw("time") {
            timed = true;
            if let TokenValue::Word(w) = &self.peek().value {
                if w.raw == "-p" {
                    time_posix = true;
                    self.advance();
                }
            }
        }
        let negated = self.eat_kw("!");
        let mut commands = vec![self.parse_command()?];
        let mut pipe_stderr = Vec::new();
        loop {
            if self.eat_op(Op::Pipe) {
                pipe_stderr.push(false);
                self.skip_newlines();
                commands.push(self.parse_command()?);
            } else if self.eat_op(Op::PipeAmp) {
                pipe_stderr.push(true);
                self.skip_newlines();
                commands.push(self.parse_command()?);
            } else {
                break;
            }
        }
        Ok(PipelineNode { commands, negated, timed, time_posix, pipe_stderr })
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn parse_command(&mut self) -> ParseResult<CommandNode> {
        if self.matches_kw("if") {
            return Ok(CommandNode::Compound(self.parse_if()?));
        }
        if self.matches_kw("while") {
            return Ok(CommandNode::Compound(self.parse_while()?));
        }
        if self.matches_kw("until") {
            return Ok(CommandNode::Compound(self.parse_until()?));
        }
        if self.matches_kw("for") {
            return Ok(CommandNode::Compound(self.parse_for()?));
        }
        if self.matches_kw("case") {
            return Ok(CommandNode::Compound(self.parse_case()?));
        }
        if self.matches_kw("select") {
            return Ok(CommandNode::Compound(self.parse_select()?));
        }
        if self.matches_kw("function") {
            return Ok(CommandNode::FunctionDef(self.parse_function_keyword()?));
        }
        if self.matches_kw("def") {
            return Ok(CommandNode::FunctionDef(self.parse_def_function()?));
        }
        if self.is_op(Op::LBrace) {
            return Ok(CommandNode::Compound(self.parse_group()?));
        }
        if self.is_op(Op::LParen) {
            return Ok(CommandNode::Compound(self.parse_subshell()?));
        }
        if matches!(self.peek().kind, TokenKind::ArithGroup) {
            return Ok(CommandNode::Compound(self.parse_arithmetic_command()?));
        }
        if self.matches_kw("[[") {
            return Ok(CommandNode::Compound(self.parse_conditional_command()?));
        }
        // `name() { ... }` shorthand function definition.
        if matches!(self.peek().kind, TokenKind::Word) && self.is_shorthand_function_def() {
            return Ok(CommandNode::FunctionDef(self.parse_shorthand_function()?));
        }
        Ok(CommandNode::Simple(self.parse_simple_command()?))
    }

    fn is_shorthand_function_def(&self) -> bool {
        matches!(self.peek_at(1), Some(t) if matches!(&t.value, TokenValue::Op(Op::LParen)))
            && matches!(self.peek_at(2), Some(t) if matches!(&t.value, TokenValue::Op(Op::RParen)))
    }

    fn plain_word_text(&mut self) -> Option<String> {
        match &self.peek().value {
            TokenValue::Word(w) if w.segments.len() == 1 => match &w.segments[0] {
                Segment::Unquoted(s) => Some(s.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Simple commands
    // ------------------------------------------------------------------

    fn parse_simple_command(&mut self) -> ParseResult<SimpleCommandNode> {
        let line = self.current_line();
        let mut node = SimpleCommandNode { line: Some(line), ..Default::default() };
        let mut seen_name = false;

        loop {
            match &self.peek().value {
                TokenValue::Redir { .. } => {
                    node.redirections.push(self.parse_redirection()?);
                }
                TokenValue::HereDocBody { .. } => {
                    // A stray heredoc body with no preceding `<<` token
                    // shouldn't occur; skip defensively.
                    self.advance();
                }
                TokenValue::Word(w) => {
                    if !seen_name {
                        if let Some(assignment) = self.try_parse_assignment(w)? {
                            node.assignments.push(assignment);
                            continue;
                        }
                    }
                    let word_text = w.raw.clone();
                    let word = word_parser::parse_word(&w.segments)?;
                    self.advance();
                    if !seen_name {
                        node.name = Some(word);
                        seen_name = true;
                    } else {
                        node.args.push(word);
                    }
                    let _ = word_text;
                }
                _ => break,
            }
        }

        if node.name.is_none() && node.assignments.is_empty() && node.redirections.is_empty() {
            return Err(ParseError::EmptyCommand { line });
        }
        Ok(node)
    }

    /// `NAME=value`, `NAME+=value`, `NAME=(...)`, `NAME[i]=value` — only
    /// recognized in assignment-prefix position (before the command
    /// name is seen), per spec §3 `AssignmentNode`.
    fn try_parse_assignment(&mut self, w: &lexer::WordToken) -> ParseResult<Option<AssignmentNode>> {
        if w.segments.len() != 1 {
            return Ok(None);
        }
        let text = match &w.segments[0] {
            Segment::Unquoted(s) => s.clone(),
            _ => return Ok(None),
        };
        let name_end = {
            let bytes = text.as_bytes();
            let mut i = 0;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            i
        };
        if name_end == 0 || text.as_bytes()[0].is_ascii_digit() {
            return Ok(None);
        }
        let name = text[..name_end].to_string();
        let rest = &text[name_end..];
        let (subscript_text, rest) = if let Some(stripped) = rest.strip_prefix('[') {
            match stripped.find(']') {
                Some(end) => (Some(stripped[..end].to_string()), &stripped[end + 1..]),
                None => return Ok(None),
            }
        } else {
            (None, rest)
        };
        let (append, rest) = if let Some(r) = rest.strip_prefix("+=") {
            (true, r)
        } else if let Some(r) = rest.strip_prefix('=') {
            (false, r)
        } else {
            return Ok(None);
        };

        self.advance();
        let subscript = match subscript_text {
            Some(s) => Some(word_parser::parse_word_from_str(&s)?),
            None => None,
        };

        if rest.trim_start().starts_with('(') && rest.trim_start().len() == rest.len().min(rest.trim_start().len()) {
            // `VAR=(...)` array literal: only valid when `rest` begins
            // the token right after `=` with `(` and closes it — but an
            // array literal is actually its own set of following
            // tokens (`(` `word`* `)`), so re-check via the live token
            // stream rather than the text already consumed.
        }
        if rest.is_empty() && self.is_op(Op::LParen) {
            let array = self.parse_array_literal()?;
            return Ok(Some(AssignmentNode { name, subscript, value: None, append, array: Some(array) }));
        }
        let value = if rest.is_empty() {
            None
        } else {
            Some(word_parser::parse_word_from_str(rest)?)
        };
        Ok(Some(AssignmentNode { name, subscript, value, append, array: None }))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Vec<ArrayElementNode>> {
        self.eat_op(Op::LParen);
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.is_op(Op::RParen) {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            let w = match &self.peek().value {
                TokenValue::Word(w) => w.clone(),
                _ => return Err(ParseError::InvalidRedirection { message: "expected `)` in array literal".to_string() }),
            };
            self.advance();
            if w.segments.len() == 1 {
                if let Segment::Unquoted(s) = &w.segments[0] {
                    if let Some(stripped) = s.strip_prefix('[') {
                        if let Some(end) = stripped.find(']') {
                            if let Some(value_text) = stripped[end + 1..].strip_prefix('=') {
                                let key = word_parser::parse_word_from_str(&stripped[..end])?;
                                let value = word_parser::parse_word_from_str(value_text)?;
                                items.push(ArrayElementNode { key: Some(key), value });
                                self.skip_newlines();
                                continue;
                            }
                        }
                    }
                }
            }
            let value = word_parser::parse_word(&w.segments)?;
            items.push(ArrayElementNode { key: None, value });
            self.skip_newlines();
        }
        self.eat_op(Op::RParen);
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Redirections
    // ------------------------------------------------------------------

    fn parse_redirection(&mut self) -> ParseResult<RedirectionNode> {
        let (op, fd, fd_variable) = match &self.peek().value {
            TokenValue::Redir { op, fd, fd_variable } => (*op, *fd, fd_variable.clone()),
            _ => unreachable!("caller checked TokenValue::Redir"),
        };
        self.advance();
        let operator = match op {
            RedirOp::Less => RedirectionOperator::Less,
            RedirOp::Great => RedirectionOperator::Great,
            RedirOp::DGreat => RedirectionOperator::DGreat,
            RedirOp::GreatAnd => RedirectionOperator::GreatAnd,
            RedirOp::LessAnd => RedirectionOperator::LessAnd,
            RedirOp::LessGreat => RedirectionOperator::LessGreat,
            RedirOp::Clobber => RedirectionOperator::Clobber,
            RedirOp::AndGreat => RedirectionOperator::AndGreat,
            RedirOp::AndDGreat => RedirectionOperator::AndDGreat,
            RedirOp::TLess => RedirectionOperator::TLess,
            RedirOp::DLess => RedirectionOperator::DLess,
            RedirOp::DLessDash => RedirectionOperator::DLessDash,
        };
        let target = if matches!(op, RedirOp::DLess | RedirOp::DLessDash) {
            // The lexer already captured the heredoc body as the very
            // next token (spec §4.A rule 3).
            match &self.peek().value {
                TokenValue::HereDocBody { delimiter, strip_tabs, quoted, body } => {
                    let content = word_parser::parse_word_from_str(body)?;
                    let node = HereDocNode {
                        delimiter: delimiter.clone(),
                        content,
                        strip_tabs: *strip_tabs,
                        quoted: *quoted,
                    };
                    self.advance();
                    RedirectionTarget::HereDoc(node)
                }
                _ => {
                    return Err(ParseError::InvalidRedirection { message: "missing here-doc body".to_string() });
                }
            }
        } else {
            match &self.peek().value {
                TokenValue::Word(w) => {
                    let word = word_parser::parse_word(&w.segments)?;
                    self.advance();
                    RedirectionTarget::Word(word)
                }
                _ => {
                    return Err(ParseError::InvalidRedirection {
                        message: format!("{operator}: ambiguous redirect"),
                    });
                }
            }
        };
        Ok(RedirectionNode { fd, fd_variable, operator, target })
    }

    fn parse_trailing_redirections(&mut self) -> ParseResult<Vec<RedirectionNode>> {
        let mut redirs = Vec::new();
        while matches!(self.peek().value, TokenValue::Redir { .. }) {
            redirs.push(self.parse_redirection()?);
        }
        Ok(redirs)
    }

    // ------------------------------------------------------------------
    // Compound commands
    // ------------------------------------------------------------------

    fn parse_if(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("if")?;
        let mut clauses = Vec::new();
        loop {
            let condition = self.parse_statement_list_until(&["then"])?;
            self.expect_kw("then")?;
            let body = self.parse_statement_list_until(&["elif", "else", "fi"])?;
            clauses.push(IfClause { condition, body });
            if self.eat_kw("elif") {
                continue;
            }
            break;
        }
        let else_body = if self.eat_kw("else") {
            Some(self.parse_statement_list_until(&["fi"])?)
        } else {
            None
        };
        self.expect_kw("fi")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::If(IfNode { clauses, else_body, redirections }))
    }

    fn parse_while(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("while")?;
        let condition = self.parse_statement_list_until(&["do"])?;
        self.expect_kw("do")?;
        let body = self.parse_statement_list_until(&["done"])?;
        self.expect_kw("done")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::While(WhileNode { condition, body, redirections }))
    }

    fn parse_until(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("until")?;
        let condition = self.parse_statement_list_until(&["do"])?;
        self.expect_kw("do")?;
        let body = self.parse_statement_list_until(&["done"])?;
        self.expect_kw("done")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Until(UntilNode { condition, body, redirections }))
    }

    fn parse_for(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("for")?;
        if matches!(self.peek().kind, TokenKind::ArithGroup) {
            let inner = match self.advance().value {
                TokenValue::ArithGroup(s) => s,
                _ => unreachable!(),
            };
            let (init, cond, update) = parse_cstyle_clauses(&inner)?;
            self.skip_newlines();
            self.eat_op(Op::Semi);
            self.skip_separators();
            self.expect_kw("do")?;
            let body = self.parse_statement_list_until(&["done"])?;
            self.expect_kw("done")?;
            let redirections = self.parse_trailing_redirections()?;
            return Ok(CompoundCommandNode::CStyleFor(CStyleForNode { init, condition: cond, update, body, redirections }));
        }
        let variable = self.plain_word_text().ok_or_else(|| ParseError::UnexpectedToken {
            found: self.describe_current(),
            expected: "loop variable name".to_string(),
            line: self.current_line(),
        })?;
        self.advance();
        self.skip_newlines();
        let words = if self.eat_kw("in") {
            let mut ws = Vec::new();
            while let TokenValue::Word(w) = &self.peek().value {
                ws.push(word_parser::parse_word(&w.segments)?);
                self.advance();
            }
            Some(ws)
        } else {
            None
        };
        self.skip_separators();
        self.expect_kw("do")?;
        let body = self.parse_statement_list_until(&["done"])?;
        self.expect_kw("done")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::For(ForNode { variable, words, body, redirections }))
    }

    fn parse_case(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("case")?;
        let word = match &self.peek().value {
            TokenValue::Word(w) => {
                let word = word_parser::parse_word(&w.segments)?;
                self.advance();
                word
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: self.describe_current(),
                    expected: "word".to_string(),
                    line: self.current_line(),
                })
            }
        };
        self.skip_newlines();
        self.expect_kw("in")?;
        self.skip_separators();
        let mut items = Vec::new();
        while !self.matches_kw("esac") {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            self.eat_op(Op::LParen);
            let mut patterns = vec![self.parse_case_pattern()?];
            while self.eat_op(Op::Pipe) {
                patterns.push(self.parse_case_pattern()?);
            }
            if !self.eat_op(Op::RParen) {
                return Err(ParseError::UnexpectedToken {
                    found: self.describe_current(),
                    expected: "`)`".to_string(),
                    line: self.current_line(),
                });
            }
            self.skip_separators();
            let body = self.parse_statement_list_until_case_terminator()?;
            self.skip_separators();
            let terminator = if self.eat_op(Op::DSemi) {
                CaseTerminator::DoubleSemi
            } else if self.eat_op(Op::SemiSemiAnd) {
                CaseTerminator::SemiSemiAnd
            } else if self.eat_op(Op::SemiAnd) {
                CaseTerminator::SemiAnd
            } else {
                CaseTerminator::DoubleSemi
            };
            items.push(CaseItemNode { patterns, body, terminator });
            self.skip_separators();
        }
        self.expect_kw("esac")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Case(CaseNode { word, items, redirections }))
    }

    fn parse_case_pattern(&mut self) -> ParseResult<WordNode> {
        self.skip_newlines();
        match &self.peek().value {
            TokenValue::Word(w) => {
                let word = word_parser::parse_word(&w.segments)?;
                self.advance();
                Ok(word)
            }
            _ => Err(ParseError::UnexpectedToken {
                found: self.describe_current(),
                expected: "case pattern".to_string(),
                line: self.current_line(),
            }),
        }
    }

    fn parse_statement_list_until_case_terminator(&mut self) -> ParseResult<Vec<StatementNode>> {
        let mut statements = Vec::new();
        self.skip_separators();
        loop {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            if self.matches_kw("esac") || self.is_op(Op::DSemi) || self.is_op(Op::SemiAnd) || self.is_op(Op::SemiSemiAnd) {
                break;
            }
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    fn parse_select(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("select")?;
        let variable = self.plain_word_text().ok_or_else(|| ParseError::UnexpectedToken {
            found: self.describe_current(),
            expected: "loop variable name".to_string(),
            line: self.current_line(),
        })?;
        self.advance();
        self.skip_newlines();
        let words = if self.eat_kw("in") {
            let mut ws = Vec::new();
            while let TokenValue::Word(w) = &self.peek().value {
                ws.push(word_parser::parse_word(&w.segments)?);
                self.advance();
            }
            Some(ws)
        } else {
            None
        };
        self.skip_separators();
        self.expect_kw("do")?;
        let body = self.parse_statement_list_until(&["done"])?;
        self.expect_kw("done")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Select(SelectNode { variable, words, body, redirections }))
    }

    fn parse_group(&mut self) -> ParseResult<CompoundCommandNode> {
        if !self.eat_op(Op::LBrace) {
            unreachable!("caller checked Op::LBrace");
        }
        let body = self.parse_statement_list_brace_body()?;
        if !self.eat_op(Op::RBrace) {
            return Err(ParseError::Incomplete);
        }
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Group(GroupNode { body, redirections }))
    }

    /// `{ ... }` bodies require `}` itself to be a separate word (bash
    /// requires whitespace before it); our lexer already tokenizes `}`
    /// as its own operator regardless, so this is just a statement list
    /// until `}`.
    fn parse_statement_list_brace_body(&mut self) -> ParseResult<Vec<StatementNode>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.is_op(Op::RBrace) {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    fn parse_subshell(&mut self) -> ParseResult<CompoundCommandNode> {
        if !self.eat_op(Op::LParen) {
            unreachable!("caller checked Op::LParen");
        }
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.is_op(Op::RParen) {
            if self.at_eof() {
                return Err(ParseError::Incomplete);
            }
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        if !self.eat_op(Op::RParen) {
            return Err(ParseError::Incomplete);
        }
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Subshell(SubshellNode { body: statements, redirections }))
    }

    fn parse_arithmetic_command(&mut self) -> ParseResult<CompoundCommandNode> {
        let inner = match self.advance().value {
            TokenValue::ArithGroup(s) => s,
            _ => unreachable!("caller checked ArithGroup"),
        };
        let expr = crate::arithmetic::parse(&inner).map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::ArithmeticCommand(ArithmeticCommandNode {
            expression: ArithmeticExpressionNode { expression: expr },
            redirections,
        }))
    }

    fn parse_conditional_command(&mut self) -> ParseResult<CompoundCommandNode> {
        self.expect_kw("[[")?;
        let expression = conditional_parser::parse_conditional_expression(self)?;
        self.expect_kw("]]")?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::ConditionalCommand(ConditionalCommandNode { expression, redirections }))
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn parse_shorthand_function(&mut self) -> ParseResult<FunctionDefNode> {
        let name = self.plain_word_text().unwrap_or_default();
        self.advance(); // name
        self.eat_op(Op::LParen);
        self.eat_op(Op::RParen);
        self.skip_newlines();
        let body = self.parse_function_body()?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(FunctionDefNode { name, body: Box::new(body), redirections, typed_params: None, return_type: None, source_file: None })
    }

    fn parse_function_keyword(&mut self) -> ParseResult<FunctionDefNode> {
        self.expect_kw("function")?;
        let name = self.plain_word_text().ok_or_else(|| ParseError::UnexpectedToken {
            found: self.describe_current(),
            expected: "function name".to_string(),
            line: self.current_line(),
        })?;
        self.advance();
        self.eat_op(Op::LParen);
        self.eat_op(Op::RParen);
        self.skip_newlines();
        let body = self.parse_function_body()?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(FunctionDefNode { name, body: Box::new(body), redirections, typed_params: None, return_type: None, source_file: None })
    }

    /// `def name [params] -> type { ... }` — Den's typed-function
    /// extension (spec §4.B).
    fn parse_def_function(&mut self) -> ParseResult<FunctionDefNode> {
        self.expect_kw("def")?;
        let name = self.plain_word_text().ok_or_else(|| ParseError::UnexpectedToken {
            found: self.describe_current(),
            expected: "function name".to_string(),
            line: self.current_line(),
        })?;
        self.advance();
        let mut typed_params = Vec::new();
        if self.plain_word_text().as_deref() == Some("[") || self.matches_literal_bracket() {
            self.advance();
            loop {
                match self.plain_word_text() {
                    Some(s) if s == "]" => {
                        self.advance();
                        break;
                    }
                    Some(s) => {
                        self.advance();
                        let (pname, ptype) = match s.split_once(':') {
                            Some((n, t)) => (n.to_string(), Some(t.to_string())),
                            None => (s, None),
                        };
                        typed_params.push(TypedParam { name: pname, type_name: ptype });
                    }
                    None => break,
                }
            }
        }
        let mut return_type = None;
        if self.plain_word_text().as_deref() == Some("->") {
            self.advance();
            return_type = self.plain_word_text();
            if return_type.is_some() {
                self.advance();
            }
        }
        self.skip_newlines();
        let body = self.parse_function_body()?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(FunctionDefNode {
            name,
            body: Box::new(body),
            redirections,
            typed_params: if typed_params.is_empty() { None } else { Some(typed_params) },
            return_type,
            source_file: None,
        })
    }

    fn matches_literal_bracket(&self) -> bool {
        self.plain_word_text().as_deref() == Some("[")
    }

    /// A function body is any compound command; `{ ... }` is by far
    /// the common case but bash also allows e.g. `f() ( subshell )`.
    fn parse_function_body(&mut self) -> ParseResult<CompoundCommandNode> {
        if self.is_op(Op::LBrace) {
            self.parse_group()
        } else if self.is_op(Op::LParen) {
            self.parse_subshell()
        } else if self.matches_kw("if") {
            self.parse_if()
        } else if self.matches_kw("while") {
            self.parse_while()
        } else if self.matches_kw("until") {
            self.parse_until()
        } else if self.matches_kw("for") {
            self.parse_for()
        } else if self.matches_kw("case") {
            self.parse_case()
        } else {
            Err(ParseError::UnexpectedToken {
                found: self.describe_current(),
                expected: "function body".to_string(),
                line: self.current_line(),
            })
        }
    }
}

/// Split `init;cond;update` arithmetic-clause text for C-style `for`
/// (spec §4.B "Single-line compound sugar"). Each clause may be empty.
fn parse_cstyle_clauses(
    text: &str,
) -> ParseResult<(Option<ArithmeticExpressionNode>, Option<ArithmeticExpressionNode>, Option<ArithmeticExpressionNode>)> {
    let parts: Vec<&str> = split_top_level_semicolons(text);
    if parts.len() != 3 {
        return Err(ParseError::InvalidSubstitution { message: "malformed C-style for clauses".to_string() });
    }
    let parse_clause = |s: &str| -> ParseResult<Option<ArithmeticExpressionNode>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        let expr = crate::arithmetic::parse(s).map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?;
        Ok(Some(ArithmeticExpressionNode { expression: expr }))
    };
    Ok((parse_clause(parts[0])?, parse_clause(parts[1])?, parse_clause(parts[2])?))
}

fn split_top_level_semicolons(text: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut start = 0;
    let mut out = Vec::new();
    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth == 0 => {
                out.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ScriptNode {
        parse_script(s).unwrap()
    }

    #[test]
    fn simple_pipeline() {
        let script = parse("echo hi | wc -l");
        assert_eq!(script.statements.len(), 1);
        assert_eq!(script.statements[0].pipelines[0].commands.len(), 2);
    }

    #[test]
    fn and_or_sequencing() {
        let script = parse("true && echo yes || echo no");
        let stmt = &script.statements[0];
        assert_eq!(stmt.pipelines.len(), 3);
        assert_eq!(stmt.operators, vec![StatementOperator::And, StatementOperator::Or]);
    }

    #[test]
    fn if_then_else_fi() {
        let script = parse("if true; then echo a; else echo b; fi");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::If(node)) => {
                assert_eq!(node.clauses.len(), 1);
                assert!(node.else_body.is_some());
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn for_in_loop() {
        let script = parse("for i in 1 2 3; do echo $i; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::For(node)) => {
                assert_eq!(node.variable, "i");
                assert_eq!(node.words.as_ref().unwrap().len(), 3);
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn cstyle_for_loop() {
        let script = parse("for ((i=0;i<3;i++)); do echo $i; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::CStyleFor(node)) => {
                assert!(node.init.is_some());
                assert!(node.condition.is_some());
                assert!(node.update.is_some());
            }
            other => panic!("expected cstyle for, got {other:?}"),
        }
    }

    #[test]
    fn case_statement() {
        let script = parse("case foo in f*) echo one;; *) echo other;; esac");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::Case(node)) => assert_eq!(node.items.len(), 2),
            other => panic!("expected case, got {other:?}"),
        }
    }

    #[test]
    fn function_def_shorthand() {
        let script = parse("f(){ echo hi; }");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::FunctionDef(f) => assert_eq!(f.name, "f"),
            other => panic!("expected function def, got {other:?}"),
        }
    }

    #[test]
    fn assignment_prefix() {
        let script = parse("x=5 echo hi");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Simple(cmd) => {
                assert_eq!(cmd.assignments.len(), 1);
                assert_eq!(cmd.assignments[0].name, "x");
            }
            other => panic!("expected simple, got {other:?}"),
        }
    }

    #[test]
    fn array_literal_assignment() {
        let script = parse("arr=(x y z)");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Simple(cmd) => {
                assert_eq!(cmd.assignments[0].array.as_ref().unwrap().len(), 3);
            }
            other => panic!("expected simple, got {other:?}"),
        }
    }

    #[test]
    fn redirection_parsed() {
        let script = parse("echo hi > out.txt");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Simple(cmd) => assert_eq!(cmd.redirections.len(), 1),
            other => panic!("expected simple, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_if_requests_more_input() {
        match parse_input("if true; then echo a") {
            ParseOutcome::Incomplete => {}
            _ => panic!("expected Incomplete"),
        }
    }

    #[test]
    fn group_and_subshell() {
        let script = parse("{ echo a; }");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Group(_))
        ));
        let script = parse("(echo a)");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Subshell(_))
        ));
    }

    #[test]
    fn conditional_command() {
        let script = parse("[[ -f foo && -n $x ]]");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::ConditionalCommand(_))
        ));
    }
}
