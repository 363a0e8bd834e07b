//! Arithmetic Evaluator (spec §4.D, component D).
//!
//! Parses and evaluates the bash arithmetic grammar used by
//! `$((...))`, `((...))`, `let`, `declare -i`, and C-style `for`
//! components. Parsing and evaluation are split (`parse` builds an
//! `ArithExpr` once; `eval` walks it against whatever variable store
//! the caller provides) so the same parsed tree can be re-evaluated
//! every loop iteration without re-lexing.

use crate::ast::{
    ArithAssignmentNode, ArithAssignmentOperator, ArithBinaryNode, ArithBinaryOperator, ArithExpr,
    ArithTernaryNode, ArithUnaryNode, ArithUnaryOperator, ScriptNode,
};
use crate::errors::{ExpansionError, ShellError};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ArithParseError {
    #[error("{0}: syntax error in expression")]
    Syntax(String),
    #[error("unexpected end of arithmetic expression")]
    UnexpectedEof,
}

/// Narrow interface the evaluator needs from shell state; implemented
/// by `ShellState` via an adapter in `expansion`, keeping this module
/// free of a dependency on the state store's concrete shape.
pub trait ArithContext {
    fn get_var(&mut self, name: &str) -> i64;
    fn get_array_elem(&mut self, array: &str, index: i64) -> i64;
    fn set_var(&mut self, name: &str, value: i64) -> Result<(), ShellError>;
    fn set_array_elem(&mut self, array: &str, index: i64, value: i64) -> Result<(), ShellError>;
    fn run_command_substitution(&mut self, body: &ScriptNode) -> Result<String, ShellError>;
}

pub fn parse(input: &str) -> Result<ArithExpr, ArithParseError> {
    let mut p = ArithParser { bytes: input.as_bytes(), pos: 0 };
    p.skip_ws();
    let expr = p.parse_sequence()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return Err(ArithParseError::Syntax(format!(
            "trailing input: {}",
            String::from_utf8_lossy(&p.bytes[p.pos..])
        )));
    }
    Ok(expr)
}

/// Parse a decimal/hex/octal/`base#digits` integer literal standalone
/// (used by `declare -i` coercion and numeric comparisons).
pub fn parse_integer_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (neg, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some((base, digits)) = text.split_once('#') {
        let base: u32 = base.parse().ok()?;
        if !(2..=64).contains(&base) {
            return None;
        }
        i64::from_str_radix(digits, base).ok()?
    } else if text.len() > 1 && text.starts_with('0') && text.bytes().all(|b| b.is_ascii_digit()) {
        i64::from_str_radix(text, 8).ok()?
    } else {
        text.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

struct ArithParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ArithParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n')) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn eat(&mut self, s: &str) -> bool {
        self.skip_ws();
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn peek_str(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    // sequence -> assignment (',' assignment)*
    fn parse_sequence(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut items = vec![self.parse_assignment()?];
        loop {
            self.skip_ws();
            if self.peek() == Some(b',') {
                self.pos += 1;
                items.push(self.parse_assignment()?);
            } else {
                break;
            }
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            Ok(ArithExpr::Sequence(items))
        }
    }

    // assignment -> ternary | lvalue assign-op assignment
    fn parse_assignment(&mut self) -> Result<ArithExpr, ArithParseError> {
        let start = self.pos;
        if let Some((name, subscript)) = self.try_parse_lvalue()? {
            self.skip_ws();
            let op = [
                ("<<=", ArithAssignmentOperator::LShiftAssign),
                (">>=", ArithAssignmentOperator::RShiftAssign),
                ("+=", ArithAssignmentOperator::AddAssign),
                ("-=", ArithAssignmentOperator::SubAssign),
                ("*=", ArithAssignmentOperator::MulAssign),
                ("/=", ArithAssignmentOperator::DivAssign),
                ("%=", ArithAssignmentOperator::ModAssign),
                ("&=", ArithAssignmentOperator::AndAssign),
                ("|=", ArithAssignmentOperator::OrAssign),
                ("^=", ArithAssignmentOperator::XorAssign),
            ]
            .into_iter()
            .find(|(tok, _)| self.peek_str(tok) && !self.peek_str(&format!("{tok}=")));
            if let Some((tok, operator)) = op {
                self.pos += tok.len();
                let value = self.parse_assignment()?;
                return Ok(ArithExpr::Assignment(Box::new(ArithAssignmentNode {
                    operator,
                    variable: name,
                    subscript: subscript.map(Box::new),
                    value,
                })));
            }
            if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=') {
                self.pos += 1;
                let value = self.parse_assignment()?;
                return Ok(ArithExpr::Assignment(Box::new(ArithAssignmentNode {
                    operator: ArithAssignmentOperator::Assign,
                    variable: name,
                    subscript: subscript.map(Box::new),
                    value,
                })));
            }
        }
        self.pos = start;
        self.parse_ternary()
    }

    /// Tentatively parse `NAME` or `NAME[expr]` as an lvalue; restores
    /// position and returns `None` if what follows isn't an assignment
    /// operator, so the caller falls back to the general expression
    /// parse (bash lvalues are ambiguous with bare variable reads).
    fn try_parse_lvalue(&mut self) -> Result<Option<(String, Option<ArithExpr>)>, ArithParseError> {
        let start = self.pos;
        self.skip_ws();
        let name_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        if self.pos == name_start || self.bytes[name_start].is_ascii_digit() {
            self.pos = start;
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&self.bytes[name_start..self.pos]).into_owned();
        let mut subscript = None;
        if self.peek() == Some(b'[') {
            self.pos += 1;
            subscript = Some(self.parse_sequence()?);
            if self.peek() != Some(b']') {
                self.pos = start;
                return Ok(None);
            }
            self.pos += 1;
        }
        let end = self.pos;
        self.skip_ws();
        let is_assign_op = self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=')
            || ["<<=", ">>=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^="]
                .iter()
                .any(|op| self.peek_str(op));
        if !is_assign_op {
            self.pos = start;
            return Ok(None);
        }
        self.pos = end;
        Ok(Some((name, subscript)))
    }

    fn parse_ternary(&mut self) -> Result<ArithExpr, ArithParseError> {
        let cond = self.parse_logical_or()?;
        self.skip_ws();
        if self.peek() == Some(b'?') {
            self.pos += 1;
            let consequent = self.parse_assignment()?;
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err(ArithParseError::Syntax("expected `:` in ternary".to_string()));
            }
            self.pos += 1;
            let alternate = self.parse_assignment()?;
            return Ok(ArithExpr::Ternary(Box::new(ArithTernaryNode { condition: cond, consequent, alternate })));
        }
        Ok(cond)
    }

    fn parse_logical_or(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_logical_and()?;
        while self.eat("||") {
            let right = self.parse_logical_and()?;
            left = binary(ArithBinaryOperator::LogOr, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_bit_or()?;
        while self.eat("&&") {
            let right = self.parse_bit_or()?;
            left = binary(ArithBinaryOperator::LogAnd, left, right);
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_bit_xor()?;
        loop {
            self.skip_ws();
            if self.peek() == Some(b'|') && self.peek_at(1) != Some(b'|') {
                self.pos += 1;
                let right = self.parse_bit_xor()?;
                left = binary(ArithBinaryOperator::BitOr, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_bit_and()?;
        loop {
            self.skip_ws();
            if self.peek() == Some(b'^') {
                self.pos += 1;
                let right = self.parse_bit_and()?;
                left = binary(ArithBinaryOperator::BitXor, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_equality()?;
        loop {
            self.skip_ws();
            if self.peek() == Some(b'&') && self.peek_at(1) != Some(b'&') {
                self.pos += 1;
                let right = self.parse_equality()?;
                left = binary(ArithBinaryOperator::BitAnd, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_relational()?;
        loop {
            if self.eat("==") {
                let right = self.parse_relational()?;
                left = binary(ArithBinaryOperator::Eq, left, right);
            } else if self.eat("!=") {
                let right = self.parse_relational()?;
                left = binary(ArithBinaryOperator::Ne, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_shift()?;
        loop {
            if self.eat("<=") {
                let right = self.parse_shift()?;
                left = binary(ArithBinaryOperator::Le, left, right);
            } else if self.eat(">=") {
                let right = self.parse_shift()?;
                left = binary(ArithBinaryOperator::Ge, left, right);
            } else if self.peek_str("<<") {
                break;
            } else if self.peek() == Some(b'<') {
                self.pos += 1;
                let right = self.parse_shift()?;
                left = binary(ArithBinaryOperator::Lt, left, right);
            } else if self.peek_str(">>") {
                break;
            } else if self.peek() == Some(b'>') {
                self.pos += 1;
                let right = self.parse_shift()?;
                left = binary(ArithBinaryOperator::Gt, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_additive()?;
        loop {
            if self.eat("<<") {
                let right = self.parse_additive()?;
                left = binary(ArithBinaryOperator::LShift, left, right);
            } else if self.eat(">>") {
                let right = self.parse_additive()?;
                left = binary(ArithBinaryOperator::RShift, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') if self.peek_at(1) != Some(b'+') => {
                    self.pos += 1;
                    let right = self.parse_multiplicative()?;
                    left = binary(ArithBinaryOperator::Add, left, right);
                }
                Some(b'-') if self.peek_at(1) != Some(b'-') => {
                    self.pos += 1;
                    let right = self.parse_multiplicative()?;
                    left = binary(ArithBinaryOperator::Sub, left, right);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<ArithExpr, ArithParseError> {
        let mut left = self.parse_power()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'*') if self.peek_at(1) != Some(b'*') => {
                    self.pos += 1;
                    let right = self.parse_power()?;
                    left = binary(ArithBinaryOperator::Mul, left, right);
                }
                Some(b'/') => {
                    self.pos += 1;
                    let right = self.parse_power()?;
                    left = binary(ArithBinaryOperator::Div, left, right);
                }
                Some(b'%') => {
                    self.pos += 1;
                    let right = self.parse_power()?;
                    left = binary(ArithBinaryOperator::Mod, left, right);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<ArithExpr, ArithParseError> {
        let left = self.parse_unary()?;
        self.skip_ws();
        if self.eat("**") {
            let right = self.parse_power()?; // right-associative
            return Ok(binary(ArithBinaryOperator::Pow, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ArithExpr, ArithParseError> {
        self.skip_ws();
        if self.eat("++") {
            let operand = self.parse_unary()?;
            return Ok(unary(ArithUnaryOperator::PreInc, operand));
        }
        if self.eat("--") {
            let operand = self.parse_unary()?;
            return Ok(unary(ArithUnaryOperator::PreDec, operand));
        }
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(unary(ArithUnaryOperator::Neg, self.parse_unary()?))
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(unary(ArithUnaryOperator::Pos, self.parse_unary()?))
            }
            Some(b'!') => {
                self.pos += 1;
                Ok(unary(ArithUnaryOperator::Not, self.parse_unary()?))
            }
            Some(b'~') => {
                self.pos += 1;
                Ok(unary(ArithUnaryOperator::BitNot, self.parse_unary()?))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ArithExpr, ArithParseError> {
        let primary = self.parse_primary()?;
        self.skip_ws();
        if self.eat("++") {
            return Ok(unary(ArithUnaryOperator::PostInc, primary));
        }
        if self.eat("--") {
            return Ok(unary(ArithUnaryOperator::PostDec, primary));
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<ArithExpr, ArithParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ArithParseError::UnexpectedEof),
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_sequence()?;
                self.skip_ws();
                if self.peek() != Some(b')') {
                    return Err(ArithParseError::Syntax("expected `)`".to_string()));
                }
                self.pos += 1;
                Ok(ArithExpr::Group(Box::new(inner)))
            }
            Some(b) if b.is_ascii_digit() => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                    self.pos += 1;
                }
                let name = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
                self.skip_ws();
                if self.peek() == Some(b'[') {
                    self.pos += 1;
                    let index = self.parse_sequence()?;
                    self.skip_ws();
                    if self.peek() != Some(b']') {
                        return Err(ArithParseError::Syntax("expected `]`".to_string()));
                    }
                    self.pos += 1;
                    return Ok(ArithExpr::ArrayElement { array: name, index: Box::new(index) });
                }
                Ok(ArithExpr::Variable(name))
            }
            Some(b) => Err(ArithParseError::Syntax(format!("unexpected character `{}`", b as char))),
        }
    }

    fn parse_number(&mut self) -> Result<ArithExpr, ArithParseError> {
        let start = self.pos;
        // base#digits, 0x.., 0NNN, or decimal — scan greedily then
        // hand off to parse_integer_literal for the actual radix logic.
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'#') {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        match parse_integer_literal(&text) {
            Some(n) => Ok(ArithExpr::Number(n)),
            None => Err(ArithParseError::Syntax(format!("invalid number `{text}`"))),
        }
    }
}

fn binary(op: ArithBinaryOperator, left: ArithExpr, right: ArithExpr) -> ArithExpr {
    ArithExpr::Binary(Box::new(ArithBinaryNode { operator: op, left, right }))
}

fn unary(op: ArithUnaryOperator, operand: ArithExpr) -> ArithExpr {
    ArithExpr::Unary(Box::new(ArithUnaryNode { operator: op, operand }))
}

// ============================================================================
// Evaluation
// ============================================================================

pub fn eval(expr: &ArithExpr, ctx: &mut dyn ArithContext) -> Result<i64, ShellError> {
    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Variable(name) => Ok(ctx.get_var(name)),
        ArithExpr::ArrayElement { array, index } => {
            let idx = eval(index, ctx)?;
            Ok(ctx.get_array_elem(array, idx))
        }
        ArithExpr::Group(inner) => eval(inner, ctx),
        ArithExpr::Sequence(items) => {
            let mut last = 0;
            for item in items {
                last = eval(item, ctx)?;
            }
            Ok(last)
        }
        ArithExpr::CommandSubst(body) => {
            let out = ctx.run_command_substitution(body)?;
            Ok(parse_integer_literal(out.trim()).unwrap_or(0))
        }
        ArithExpr::Unary(node) => eval_unary(node, ctx),
        ArithExpr::Binary(node) => eval_binary(node, ctx),
        ArithExpr::Ternary(node) => {
            if eval(&node.condition, ctx)? != 0 {
                eval(&node.consequent, ctx)
            } else {
                eval(&node.alternate, ctx)
            }
        }
        ArithExpr::Assignment(node) => eval_assignment(node, ctx),
    }
}

fn eval_unary(node: &ArithUnaryNode, ctx: &mut dyn ArithContext) -> Result<i64, ShellError> {
    use ArithUnaryOperator::*;
    match node.operator {
        Neg => Ok(eval(&node.operand, ctx)?.wrapping_neg()),
        Pos => eval(&node.operand, ctx),
        Not => Ok(if eval(&node.operand, ctx)? == 0 { 1 } else { 0 }),
        BitNot => Ok(!eval(&node.operand, ctx)?),
        PreInc | PreDec | PostInc | PostDec => {
            let (name, index) = lvalue_of(&node.operand)?;
            let index_val = match &index {
                Some(idx) => Some(eval(idx, ctx)?),
                None => None,
            };
            let current = match index_val {
                Some(i) => ctx.get_array_elem(&name, i),
                None => ctx.get_var(&name),
            };
            let delta = if matches!(node.operator, PreInc | PostInc) { 1 } else { -1 };
            let new_value = current.wrapping_add(delta);
            match index_val {
                Some(i) => ctx.set_array_elem(&name, i, new_value)?,
                None => ctx.set_var(&name, new_value)?,
            }
            Ok(if matches!(node.operator, PreInc | PreDec) { new_value } else { current })
        }
    }
}

fn eval_binary(node: &ArithBinaryNode, ctx: &mut dyn ArithContext) -> Result<i64, ShellError> {
    use ArithBinaryOperator::*;
    // Short-circuit operators evaluate the right side conditionally.
    match node.operator {
        LogAnd => {
            let l = eval(&node.left, ctx)?;
            if l == 0 {
                return Ok(0);
            }
            return Ok(if eval(&node.right, ctx)? != 0 { 1 } else { 0 });
        }
        LogOr => {
            let l = eval(&node.left, ctx)?;
            if l != 0 {
                return Ok(1);
            }
            return Ok(if eval(&node.right, ctx)? != 0 { 1 } else { 0 });
        }
        _ => {}
    }
    let left = eval(&node.left, ctx)?;
    let right = eval(&node.right, ctx)?;
    match node.operator {
        Add => Ok(left.wrapping_add(right)),
        Sub => Ok(left.wrapping_sub(right)),
        Mul => Ok(left.wrapping_mul(right)),
        Div => {
            if right == 0 {
                Err(ExpansionError::AssertionFailed("division by 0".to_string()).into())
            } else {
                Ok(left.wrapping_div(right))
            }
        }
        Mod => {
            if right == 0 {
                Err(ExpansionError::AssertionFailed("division by 0".to_string()).into())
            } else {
                Ok(left.wrapping_rem(right))
            }
        }
        Pow => {
            if right < 0 {
                Err(ExpansionError::AssertionFailed("exponent less than 0".to_string()).into())
            } else {
                Ok(left.wrapping_pow(right as u32))
            }
        }
        LShift => Ok(left.wrapping_shl(right as u32)),
        RShift => Ok(left.wrapping_shr(right as u32)),
        Lt => Ok((left < right) as i64),
        Le => Ok((left <= right) as i64),
        Gt => Ok((left > right) as i64),
        Ge => Ok((left >= right) as i64),
        Eq => Ok((left == right) as i64),
        Ne => Ok((left != right) as i64),
        BitAnd => Ok(left & right),
        BitOr => Ok(left | right),
        BitXor => Ok(left ^ right),
        LogAnd | LogOr => unreachable!("handled above"),
    }
}

fn eval_assignment(node: &ArithAssignmentNode, ctx: &mut dyn ArithContext) -> Result<i64, ShellError> {
    let index_val = match &node.subscript {
        Some(idx) => Some(eval(idx, ctx)?),
        None => None,
    };
    let rhs = eval(&node.value, ctx)?;
    let current = match index_val {
        Some(i) => ctx.get_array_elem(&node.variable, i),
        None => ctx.get_var(&node.variable),
    };
    use ArithAssignmentOperator::*;
    let new_value = match node.operator {
        Assign => rhs,
        AddAssign => current.wrapping_add(rhs),
        SubAssign => current.wrapping_sub(rhs),
        MulAssign => current.wrapping_mul(rhs),
        DivAssign => {
            if rhs == 0 {
                return Err(ExpansionError::AssertionFailed("division by 0".to_string()).into());
            }
            current.wrapping_div(rhs)
        }
        ModAssign => {
            if rhs == 0 {
                return Err(ExpansionError::AssertionFailed("division by 0".to_string()).into());
            }
            current.wrapping_rem(rhs)
        }
        LShiftAssign => current.wrapping_shl(rhs as u32),
        RShiftAssign => current.wrapping_shr(rhs as u32),
        AndAssign => current & rhs,
        OrAssign => current | rhs,
        XorAssign => current ^ rhs,
    };
    match index_val {
        Some(i) => ctx.set_array_elem(&node.variable, i, new_value)?,
        None => ctx.set_var(&node.variable, new_value)?,
    }
    Ok(new_value)
}

fn lvalue_of(expr: &ArithExpr) -> Result<(String, Option<ArithExpr>), ShellError> {
    match expr {
        ArithExpr::Variable(name) => Ok((name.clone(), None)),
        ArithExpr::ArrayElement { array, index } => Ok((array.clone(), Some((**index).clone()))),
        _ => Err(ExpansionError::AssertionFailed("not an lvalue".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestCtx(HashMap<String, i64>);
    impl ArithContext for TestCtx {
        fn get_var(&mut self, name: &str) -> i64 {
            *self.0.get(name).unwrap_or(&0)
        }
        fn get_array_elem(&mut self, array: &str, index: i64) -> i64 {
            *self.0.get(&format!("{array}[{index}]")).unwrap_or(&0)
        }
        fn set_var(&mut self, name: &str, value: i64) -> Result<(), ShellError> {
            self.0.insert(name.to_string(), value);
            Ok(())
        }
        fn set_array_elem(&mut self, array: &str, index: i64, value: i64) -> Result<(), ShellError> {
            self.0.insert(format!("{array}[{index}]"), value);
            Ok(())
        }
        fn run_command_substitution(&mut self, _body: &ScriptNode) -> Result<String, ShellError> {
            Ok(String::new())
        }
    }

    fn eval_str(s: &str) -> i64 {
        let expr = parse(s).unwrap();
        let mut ctx = TestCtx(HashMap::new());
        eval(&expr, &mut ctx).unwrap()
    }

    #[test]
    fn basic_precedence() {
        assert_eq!(eval_str("1+2*3"), 7);
        assert_eq!(eval_str("(1+2)*3"), 9);
    }

    #[test]
    fn ternary_and_comparison() {
        assert_eq!(eval_str("1 < 2 ? 10 : 20"), 10);
    }

    #[test]
    fn assignment_and_increment() {
        let expr = parse("x = 5, x++ , x").unwrap();
        let mut ctx = TestCtx(HashMap::new());
        assert_eq!(eval(&expr, &mut ctx).unwrap(), 6);
    }

    #[test]
    fn division_by_zero_errors() {
        let expr = parse("1/0").unwrap();
        let mut ctx = TestCtx(HashMap::new());
        assert!(eval(&expr, &mut ctx).is_err());
    }

    #[test]
    fn hex_and_octal_literals() {
        assert_eq!(parse_integer_literal("0x1F"), Some(31));
        assert_eq!(parse_integer_literal("017"), Some(15));
        assert_eq!(parse_integer_literal("2#101"), Some(5));
    }
}
