//! `[[ ... ]]` conditional expression grammar (spec §3 `ConditionalExpressionNode`).
//!
//! Precedence, loosest to tightest: `||` > `&&` > `!` > primary. A
//! primary is a parenthesized sub-expression, a unary test applied to
//! a word, a binary test between two words, or a bare word (non-empty
//! string test).

use super::{ParseError, ParseResult, Parser};
use crate::ast::*;
use crate::parser::lexer::{Op, RedirOp, Segment, TokenValue};

pub fn parse_conditional_expression(p: &mut Parser) -> ParseResult<ConditionalExpressionNode> {
    parse_or(p)
}

fn parse_or(p: &mut Parser) -> ParseResult<ConditionalExpressionNode> {
    let mut left = parse_and(p)?;
    while p.eat_op(Op::OrOr) || eat_word(p, "-o") {
        let right = parse_and(p)?;
        left = ConditionalExpressionNode::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(p: &mut Parser) -> ParseResult<ConditionalExpressionNode> {
    let mut left = parse_not(p)?;
    while p.eat_op(Op::AndAnd) || eat_word(p, "-a") {
        let right = parse_not(p)?;
        left = ConditionalExpressionNode::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_not(p: &mut Parser) -> ParseResult<ConditionalExpressionNode> {
    if eat_word(p, "!") {
        return Ok(ConditionalExpressionNode::Not(Box::new(parse_not(p)?)));
    }
    parse_primary(p)
}

fn parse_primary(p: &mut Parser) -> ParseResult<ConditionalExpressionNode> {
    if p.eat_op(Op::LParen) {
        let inner = parse_or(p)?;
        if !p.eat_op(Op::RParen) {
            return Err(ParseError::UnmatchedParen { context: "(".to_string() });
        }
        return Ok(ConditionalExpressionNode::Group(Box::new(inner)));
    }

    if let Some(op) = peek_unary_operator(p) {
        p.advance();
        let operand = take_word(p)?;
        return Ok(ConditionalExpressionNode::Unary(CondUnaryNode { operator: op, operand }));
    }

    let left = take_word(p)?;

    if let Some(op) = peek_binary_operator(p) {
        p.advance();
        let right = take_word(p)?;
        return Ok(ConditionalExpressionNode::Binary(CondBinaryNode { operator: op, left, right }));
    }

    Ok(ConditionalExpressionNode::Word(left))
}

/// Consume the current token as a plain word, regardless of whether
/// the lexer happened to classify it as `Word` or a reserved
/// `Keyword` (e.g. `in`, `time` can appear as bare strings here).
fn take_word(p: &mut Parser) -> ParseResult<WordNode> {
    match p.peek().value.clone() {
        TokenValue::Word(w) => {
            let word = super::word_parser::parse_word(&w.segments)?;
            p.advance();
            Ok(word)
        }
        TokenValue::Keyword(k) => {
            p.advance();
            Ok(WordNode::literal(&k))
        }
        _ => Err(ParseError::UnexpectedToken {
            found: "".to_string(),
            expected: "word".to_string(),
            line: p.peek().line,
        }),
    }
}

fn word_text(p: &Parser) -> Option<String> {
    match &p.peek().value {
        TokenValue::Word(w) if w.segments.len() == 1 => match &w.segments[0] {
            Segment::Unquoted(s) => Some(s.clone()),
            _ => None,
        },
        TokenValue::Keyword(k) => Some(k.clone()),
        _ => None,
    }
}

fn eat_word(p: &mut Parser, text: &str) -> bool {
    if word_text(p).as_deref() == Some(text) {
        p.advance();
        true
    } else {
        false
    }
}

fn peek_unary_operator(p: &Parser) -> Option<CondUnaryOperator> {
    use CondUnaryOperator::*;
    let text = word_text(p)?;
    Some(match text.as_str() {
        "-e" => ExistsAny,
        "-f" => RegularFile,
        "-d" => Directory,
        "-L" | "-h" => Symlink,
        "-r" => Readable,
        "-w" => Writable,
        "-x" => Executable,
        "-s" => NonEmpty,
        "-S" => Socket,
        "-p" => Pipe,
        "-b" => BlockSpecial,
        "-c" => CharSpecial,
        "-u" => SetUid,
        "-g" => SetGid,
        "-k" => Sticky,
        "-t" => Terminal,
        "-z" => StringEmpty,
        "-n" => StringNonEmpty,
        "-o" => OptionSet,
        "-v" => VarSet,
        "-R" => NameRef,
        _ => return None,
    })
}

/// Binary operator in the next position: either a plain word (`==`,
/// `-eq`, ...) or a lexer `Redirection` token for bare `<`/`>`, which
/// inside `[[ ]]` mean string comparison rather than a real redirect
/// (spec §3 `ConditionalExpressionNode` design note).
fn peek_binary_operator(p: &Parser) -> Option<CondBinaryOperator> {
    use CondBinaryOperator::*;
    if let TokenValue::Redir { op, fd: None, fd_variable: None } = &p.peek().value {
        return match op {
            RedirOp::Less => Some(Lt),
            RedirOp::Great => Some(Gt),
            _ => None,
        };
    }
    let text = word_text(p)?;
    Some(match text.as_str() {
        "==" | "=" => Eq,
        "!=" => Ne,
        "=~" => Match,
        "-eq" => NumEq,
        "-ne" => NumNe,
        "-lt" => NumLt,
        "-le" => NumLe,
        "-gt" => NumGt,
        "-ge" => NumGe,
        "-nt" => Nt,
        "-ot" => Ot,
        "-ef" => Ef,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_script;

    fn cond_of(script: &str) -> ConditionalExpressionNode {
        let s = parse_script(script).unwrap();
        match &s.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::ConditionalCommand(c)) => c.expression.clone(),
            other => panic!("not a conditional command: {other:?}"),
        }
    }

    #[test]
    fn unary_file_test() {
        match cond_of("[[ -f foo.txt ]]") {
            ConditionalExpressionNode::Unary(u) => assert_eq!(u.operator, CondUnaryOperator::RegularFile),
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn string_equality() {
        match cond_of("[[ $a == $b ]]") {
            ConditionalExpressionNode::Binary(b) => assert_eq!(b.operator, CondBinaryOperator::Eq),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn logical_and_or() {
        match cond_of("[[ -f a && -d b || -z c ]]") {
            ConditionalExpressionNode::Or(_, _) => {}
            other => panic!("expected or at top, got {other:?}"),
        }
    }

    #[test]
    fn negation() {
        match cond_of("[[ ! -e a ]]") {
            ConditionalExpressionNode::Not(_) => {}
            other => panic!("expected not, got {other:?}"),
        }
    }

    #[test]
    fn bare_word_nonempty_test() {
        match cond_of("[[ $x ]]") {
            ConditionalExpressionNode::Word(_) => {}
            other => panic!("expected word, got {other:?}"),
        }
    }

    #[test]
    fn grouped_expression() {
        match cond_of("[[ ( -f a ) ]]") {
            ConditionalExpressionNode::Group(_) => {}
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn lt_redirection_token_as_comparison() {
        match cond_of("[[ $a < $b ]]") {
            ConditionalExpressionNode::Binary(b) => assert_eq!(b.operator, CondBinaryOperator::Lt),
            other => panic!("expected binary lt, got {other:?}"),
        }
    }
}
