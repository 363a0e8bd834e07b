//! Builds `WordNode`s (the AST's quoted-aware word representation)
//! out of the lexer's `WordToken` segments (spec §4.C E2/E3, the
//! "second phase" of word parsing hinted at in spec §4.B).
//!
//! Quoted-ness lives on `Segment` already; this module's job is to
//! find the `$`, backtick, `~`, and `{...}` sigils inside the
//! *unquoted* and *double-quoted* segments and turn them into the
//! structured parts expansion needs, while single-quoted and escaped
//! segments pass through untouched.

use crate::ast::*;
use crate::parser::lexer::Segment;
use crate::parser::{ParseError, ParseResult};

/// Parse a lexer `WordToken` into an AST `WordNode`.
pub fn parse_word(raw_segments: &[Segment]) -> ParseResult<WordNode> {
    let mut parts = Vec::new();
    let mut at_word_start = true;
    for seg in raw_segments {
        match seg {
            Segment::SingleQuoted(s) => {
                parts.push(WordPart::SingleQuoted(SingleQuotedPart { value: s.clone() }));
                at_word_start = false;
            }
            Segment::Escaped(c) => {
                parts.push(WordPart::Escaped(EscapedPart { value: c.to_string() }));
                at_word_start = false;
            }
            Segment::DoubleQuoted(s) => {
                let inner = parse_dollar_sigils(s, false)?;
                parts.push(WordPart::DoubleQuoted(DoubleQuotedPart { parts: inner }));
                at_word_start = false;
            }
            Segment::Unquoted(s) => {
                let mut more = parse_unquoted(s, at_word_start)?;
                at_word_start = false;
                parts.append(&mut more);
            }
        }
    }
    Ok(WordNode::new(parts))
}

/// Parse a word directly from already-decoded text (used for
/// re-parsing expansion results, e.g. glob patterns inside `${NAME#P}`).
pub fn parse_word_from_str(text: &str) -> ParseResult<WordNode> {
    Ok(WordNode::new(parse_unquoted(text, true)?))
}

/// An unquoted run: brace expansion, tilde expansion, and `$`-sigils
/// are all active (spec §4.C E2/E3).
fn parse_unquoted(text: &str, at_word_start: bool) -> ParseResult<Vec<WordPart>> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    if at_word_start && !chars.is_empty() && chars[0] == '~' {
        let end = tilde_end(&chars, 0);
        let user = chars[1..end].iter().collect::<String>();
        parts.push(WordPart::TildeExpansion(TildeExpansionPart {
            user: if user.is_empty() { None } else { Some(user) },
        }));
        i = end;
    }

    while i < chars.len() {
        match chars[i] {
            '{' => {
                if let Some((item, consumed)) = try_parse_brace_group(&chars, i)? {
                    flush_literal(&mut literal, &mut parts);
                    parts.push(WordPart::BraceExpansion(item));
                    i += consumed;
                    continue;
                }
                literal.push('{');
                i += 1;
            }
            '$' => {
                if let Some((part, consumed)) = try_parse_dollar(&chars, i)? {
                    flush_literal(&mut literal, &mut parts);
                    parts.push(part);
                    i += consumed;
                    continue;
                }
                literal.push('$');
                i += 1;
            }
            '`' => {
                let (part, consumed) = parse_backtick(&chars, i)?;
                flush_literal(&mut literal, &mut parts);
                parts.push(part);
                i += consumed;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush_literal(&mut literal, &mut parts);
    Ok(parts)
}

/// A double-quoted run: `$`/backtick sigils are active, but `~`, glob
/// metacharacters, and brace expansion are not (spec §4.C E3/E5).
fn parse_dollar_sigils(text: &str, _unused: bool) -> ParseResult<Vec<WordPart>> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '$' => {
                if let Some((part, consumed)) = try_parse_dollar(&chars, i)? {
                    flush_literal(&mut literal, &mut parts);
                    parts.push(part);
                    i += consumed;
                    continue;
                }
                literal.push('$');
                i += 1;
            }
            '`' => {
                let (part, consumed) = parse_backtick(&chars, i)?;
                flush_literal(&mut literal, &mut parts);
                parts.push(part);
                i += consumed;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush_literal(&mut literal, &mut parts);
    Ok(parts)
}

fn flush_literal(literal: &mut String, parts: &mut Vec<WordPart>) {
    if !literal.is_empty() {
        parts.push(WordPart::Literal(LiteralPart { value: std::mem::take(literal) }));
    }
}

fn tilde_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-' || chars[i] == '/') {
        if chars[i] == '/' {
            break;
        }
        i += 1;
    }
    i
}

fn parse_backtick(chars: &[char], start: usize) -> ParseResult<(WordPart, usize)> {
    let mut i = start + 1;
    let mut body = String::new();
    loop {
        if i >= chars.len() {
            return Err(ParseError::UnmatchedParen { context: "`...`".to_string() });
        }
        if chars[i] == '`' {
            i += 1;
            break;
        }
        if chars[i] == '\\' && i + 1 < chars.len() {
            body.push(chars[i + 1]);
            i += 2;
            continue;
        }
        body.push(chars[i]);
        i += 1;
    }
    let script = crate::parser::parse_script(&body)?;
    Ok((WordPart::CommandSubstitution(CommandSubstitutionPart { body: script, legacy: true }), i - start))
}

/// Returns `Some((part, bytes_consumed))` for any `$...` form, or
/// `None` if `$` should be treated as a literal dollar sign (e.g. `$`
/// followed by whitespace or end of word).
fn try_parse_dollar(chars: &[char], start: usize) -> ParseResult<Option<(WordPart, usize)>> {
    let next = chars.get(start + 1).copied();
    match next {
        Some('(') if chars.get(start + 2) == Some(&'(') => {
            let (expr_text, consumed) = extract_balanced(chars, start + 3, "((", "))")?;
            let expr = crate::arithmetic::parse(&expr_text)
                .map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?;
            Ok(Some((
                WordPart::ArithmeticExpansion(ArithmeticExpansionPart {
                    expression: ArithmeticExpressionNode { expression: expr },
                }),
                consumed + 3,
            )))
        }
        Some('(') => {
            let (body_text, consumed) = extract_balanced_parens(chars, start + 2)?;
            let script = crate::parser::parse_script(&body_text)?;
            Ok(Some((
                WordPart::CommandSubstitution(CommandSubstitutionPart { body: script, legacy: false }),
                consumed + 2,
            )))
        }
        Some('{') => {
            let (body_text, consumed) = extract_balanced(chars, start + 2, "{", "}")?;
            let part = parse_param_expansion(&body_text)?;
            Ok(Some((WordPart::ParameterExpansion(part), consumed + 2)))
        }
        Some(c) if is_special_param_char(c) => {
            Ok(Some((
                WordPart::ParameterExpansion(ParameterExpansionPart {
                    parameter: c.to_string(),
                    index: None,
                    operation: None,
                }),
                2,
            )))
        }
        Some(c) if c.is_ascii_digit() => {
            Ok(Some((
                WordPart::ParameterExpansion(ParameterExpansionPart {
                    parameter: c.to_string(),
                    index: None,
                    operation: None,
                }),
                2,
            )))
        }
        Some(c) if c.is_alphabetic() || c == '_' => {
            let mut end = start + 1;
            while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            let name: String = chars[start + 1..end].iter().collect();
            Ok(Some((
                WordPart::ParameterExpansion(ParameterExpansionPart { parameter: name, index: None, operation: None }),
                end - start,
            )))
        }
        _ => Ok(None),
    }
}

fn is_special_param_char(c: char) -> bool {
    matches!(c, '$' | '?' | '!' | '#' | '@' | '*' | '-')
}

/// Consume `chars[from..]` up to (and including) a matching `close`
/// delimiter, tracking nested `open`/`close` pairs and quotes so an
/// embedded `)`/`}` inside a string doesn't close early. Returns the
/// inner text (without delimiters) and total characters consumed
/// including the opening delimiter length already skipped by caller.
fn extract_balanced(chars: &[char], from: usize, open: &str, close: &str) -> ParseResult<(String, usize)> {
    let open_c = open.chars().next().unwrap();
    let close_c = close.chars().next().unwrap();
    let mut depth = 1usize;
    let mut i = from;
    let mut out = String::new();
    loop {
        if i >= chars.len() {
            return Err(ParseError::UnmatchedParen { context: open.to_string() });
        }
        if chars[i] == open_c {
            depth += 1;
            out.push(chars[i]);
            i += 1;
        } else if chars[i] == close_c {
            depth -= 1;
            if depth == 0 {
                i += 1;
                break;
            }
            out.push(chars[i]);
            i += 1;
        } else if chars[i] == '\'' || chars[i] == '"' {
            let q = chars[i];
            out.push(chars[i]);
            i += 1;
            while i < chars.len() && chars[i] != q {
                out.push(chars[i]);
                i += 1;
            }
            if i < chars.len() {
                out.push(chars[i]);
                i += 1;
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    Ok((out, i - from))
}

fn extract_balanced_parens(chars: &[char], from: usize) -> ParseResult<(String, usize)> {
    let mut depth = 1usize;
    let mut i = from;
    let mut out = String::new();
    loop {
        if i >= chars.len() {
            return Err(ParseError::UnmatchedParen { context: "$(".to_string() });
        }
        match chars[i] {
            '(' => {
                depth += 1;
                out.push('(');
                i += 1;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    i += 1;
                    break;
                }
                out.push(')');
                i += 1;
            }
            q @ ('\'' | '"') => {
                out.push(q);
                i += 1;
                while i < chars.len() && chars[i] != q {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok((out, i - from))
}

// ============================================================================
// `${...}` parameter expansion operator parsing (spec §4.C E2 table)
// ============================================================================

fn parse_param_expansion(body: &str) -> ParseResult<ParameterExpansionPart> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;

    if chars.first() == Some(&'#') && chars.len() > 1 && !matches!(chars.get(1), Some('#')) {
        // `${#NAME}` / `${#arr[@]}` length, distinguished from `${##}` (positional count op `##`).
        if !(chars.len() == 1) {
            let rest: String = chars[1..].iter().collect();
            if is_plain_length_target(&rest) {
                let (param, index) = parse_name_and_index(&rest)?;
                return Ok(ParameterExpansionPart {
                    parameter: param,
                    index,
                    operation: Some(ParameterOperation::Length(LengthOp)),
                });
            }
        }
    }

    if chars.first() == Some(&'!') {
        let rest: String = chars[1..].iter().collect();
        if let Some(prefix) = rest.strip_suffix('*').or_else(|| rest.strip_suffix('@')) {
            if prefix.chars().all(|c| c.is_alphanumeric() || c == '_') && !prefix.is_empty() {
                return Ok(ParameterExpansionPart {
                    parameter: "!".to_string(),
                    index: None,
                    operation: Some(ParameterOperation::VarNamePrefix(VarNamePrefixOp {
                        prefix: prefix.to_string(),
                        star: rest.ends_with('*'),
                    })),
                });
            }
        }
        if let Some((name, idx)) = rest.strip_suffix("[@]").map(|n| (n, true)).or_else(|| rest.strip_suffix("[*]").map(|n| (n, false))) {
            return Ok(ParameterExpansionPart {
                parameter: "!".to_string(),
                index: None,
                operation: Some(ParameterOperation::ArrayKeys(ArrayKeysOp { array: name.to_string(), star: !idx })),
            });
        }
        if rest.chars().all(|c| c.is_alphanumeric() || c == '_') && !rest.is_empty() {
            return Ok(ParameterExpansionPart {
                parameter: rest,
                index: None,
                operation: Some(ParameterOperation::Indirection(IndirectionOp)),
            });
        }
    }

    // Plain `${NAME}` / `${NAME[idx]}` with no operation.
    let name_end = scan_name_and_index_end(&chars, i);
    let name_part: String = chars[i..name_end].iter().collect();
    i = name_end;
    if i == chars.len() {
        let (param, index) = parse_name_and_index(&name_part)?;
        return Ok(ParameterExpansionPart { parameter: param, index, operation: None });
    }

    let (param, index) = parse_name_and_index(&name_part)?;
    let op_text: String = chars[i..].iter().collect();
    let operation = parse_operation(&op_text)?;
    Ok(ParameterExpansionPart { parameter: param, index, operation: Some(operation) })
}

fn is_plain_length_target(text: &str) -> bool {
    let t = text.strip_suffix("[@]").or_else(|| text.strip_suffix("[*]")).unwrap_or(text);
    !t.is_empty() && t.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '[' || c == ']' || c == '@' || c == '*')
}

fn scan_name_and_index_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i < chars.len() && chars[i] == '[' {
        let mut depth = 1;
        i += 1;
        while i < chars.len() && depth > 0 {
            match chars[i] {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
    }
    i
}

fn parse_name_and_index(text: &str) -> ParseResult<(String, Option<ParameterIndex>)> {
    if let Some(bracket) = text.find('[') {
        if text.ends_with(']') {
            let name = text[..bracket].to_string();
            let inner = &text[bracket + 1..text.len() - 1];
            let index = match inner {
                "@" => ParameterIndex::All,
                "*" => ParameterIndex::Joined,
                expr => {
                    let parsed = crate::arithmetic::parse(expr)
                        .map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?;
                    ParameterIndex::Expr(Box::new(parsed))
                }
            };
            return Ok((name, Some(index)));
        }
    }
    Ok((text.to_string(), None))
}

fn parse_operation(op_text: &str) -> ParseResult<ParameterOperation> {
    let chars: Vec<char> = op_text.chars().collect();
    match chars[0] {
        ':' => {
            if chars.get(1) == Some(&'-') {
                Ok(ParameterOperation::DefaultValue(DefaultValueOp { word: parse_word_from_str(&op_text[2..])?, check_empty: true }))
            } else if chars.get(1) == Some(&'=') {
                Ok(ParameterOperation::AssignDefault(AssignDefaultOp { word: parse_word_from_str(&op_text[2..])?, check_empty: true }))
            } else if chars.get(1) == Some(&'?') {
                let w = &op_text[2..];
                Ok(ParameterOperation::ErrorIfUnset(ErrorIfUnsetOp {
                    word: if w.is_empty() { None } else { Some(parse_word_from_str(w)?) },
                    check_empty: true,
                }))
            } else if chars.get(1) == Some(&'+') {
                Ok(ParameterOperation::UseAlternative(UseAlternativeOp { word: parse_word_from_str(&op_text[2..])?, check_empty: true }))
            } else {
                // `${NAME:offset}` / `${NAME:offset:length}`
                let rest = &op_text[1..];
                let (offset_text, length_text) = split_top_level(rest, ':');
                let offset = crate::arithmetic::parse(offset_text.trim())
                    .map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?;
                let length = match length_text {
                    Some(t) => Some(ArithmeticExpressionNode {
                        expression: crate::arithmetic::parse(t.trim())
                            .map_err(|e| ParseError::InvalidSubstitution { message: e.to_string() })?,
                    }),
                    None => None,
                };
                Ok(ParameterOperation::Substring(SubstringOp {
                    offset: ArithmeticExpressionNode { expression: offset },
                    length,
                }))
            }
        }
        '-' => Ok(ParameterOperation::DefaultValue(DefaultValueOp { word: parse_word_from_str(&op_text[1..])?, check_empty: false })),
        '=' => Ok(ParameterOperation::AssignDefault(AssignDefaultOp { word: parse_word_from_str(&op_text[1..])?, check_empty: false })),
        '?' => {
            let w = &op_text[1..];
            Ok(ParameterOperation::ErrorIfUnset(ErrorIfUnsetOp { word: if w.is_empty() { None } else { Some(parse_word_from_str(w)?) }, check_empty: false }))
        }
        '+' => Ok(ParameterOperation::UseAlternative(UseAlternativeOp { word: parse_word_from_str(&op_text[1..])?, check_empty: false })),
        '#' => {
            let greedy = chars.get(1) == Some(&'#');
            let pat = if greedy { &op_text[2..] } else { &op_text[1..] };
            Ok(ParameterOperation::PatternRemoval(PatternRemovalOp { pattern: parse_word_from_str(pat)?, side: PatternRemovalSide::Prefix, greedy }))
        }
        '%' => {
            let greedy = chars.get(1) == Some(&'%');
            let pat = if greedy { &op_text[2..] } else { &op_text[1..] };
            Ok(ParameterOperation::PatternRemoval(PatternRemovalOp { pattern: parse_word_from_str(pat)?, side: PatternRemovalSide::Suffix, greedy }))
        }
        '/' => {
            let all = chars.get(1) == Some(&'/');
            let rest = if all { &op_text[2..] } else { &op_text[1..] };
            let (anchor, rest) = match rest.chars().next() {
                Some('#') => (Some(PatternAnchor::Start), &rest[1..]),
                Some('%') => (Some(PatternAnchor::End), &rest[1..]),
                _ => (None, rest),
            };
            let (pattern_text, replacement_text) = split_top_level(rest, '/');
            Ok(ParameterOperation::PatternReplacement(PatternReplacementOp {
                pattern: parse_word_from_str(pattern_text)?,
                replacement: match replacement_text {
                    Some(t) => Some(parse_word_from_str(t)?),
                    None => None,
                },
                all,
                anchor,
            }))
        }
        '^' => {
            let all = chars.get(1) == Some(&'^');
            let pat = if all { &op_text[2..] } else { &op_text[1..] };
            Ok(ParameterOperation::CaseModification(CaseModificationOp {
                direction: CaseDirection::Upper,
                all,
                pattern: if pat.is_empty() { None } else { Some(parse_word_from_str(pat)?) },
            }))
        }
        ',' => {
            let all = chars.get(1) == Some(&',');
            let pat = if all { &op_text[2..] } else { &op_text[1..] };
            Ok(ParameterOperation::CaseModification(CaseModificationOp {
                direction: CaseDirection::Lower,
                all,
                pattern: if pat.is_empty() { None } else { Some(parse_word_from_str(pat)?) },
            }))
        }
        '@' => {
            let op = chars.get(1).copied().ok_or_else(|| ParseError::InvalidSubstitution { message: "${@...}".to_string() })?;
            let operator = match op {
                'Q' => TransformOperator::Q,
                'P' => TransformOperator::P,
                'A' => TransformOperator::A,
                'K' => TransformOperator::K,
                'E' => TransformOperator::E,
                'U' => TransformOperator::U,
                'L' => TransformOperator::L,
                other => return Err(ParseError::InvalidSubstitution { message: format!("${{@{other}}}") }),
            };
            Ok(ParameterOperation::Transform(TransformOp { operator }))
        }
        other => Err(ParseError::InvalidSubstitution { message: format!("unsupported parameter operation `{other}`") }),
    }
}

/// Split `text` on the first unescaped/unnested occurrence of `sep`,
/// used by `${NAME:off:len}` and `${NAME/pat/rep}` which both have an
/// optional second field.
fn split_top_level(text: &str, sep: char) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '\\' => {
                chars.next();
            }
            c if c == sep && depth == 0 => {
                return (&text[..idx], Some(&text[idx + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    let _ = bytes;
    (text, None)
}

// ============================================================================
// Brace expansion (spec §4.C E3)
// ============================================================================

fn try_parse_brace_group(chars: &[char], start: usize) -> ParseResult<Option<(BraceExpansionPart, usize)>> {
    let close = match find_matching_brace(chars, start) {
        Some(c) => c,
        None => return Ok(None),
    };
    let inner: String = chars[start + 1..close].iter().collect();
    if inner.is_empty() {
        return Ok(None);
    }
    if let Some(range) = try_parse_range(&inner)? {
        return Ok(Some((BraceExpansionPart { items: vec![range] }, close - start + 1)));
    }
    let branches = split_top_level_commas(&inner);
    if branches.len() < 2 {
        return Ok(None);
    }
    let mut items = Vec::with_capacity(branches.len());
    for branch in branches {
        items.push(BraceItem::Word(parse_word_from_str(branch)?));
    }
    Ok(Some((BraceExpansionPart { items }, close - start + 1)))
}

fn find_matching_brace(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut start = 0;
    let mut out = Vec::new();
    for (idx, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ',' if depth == 0 => {
                out.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

fn try_parse_range(inner: &str) -> ParseResult<Option<BraceItem>> {
    let parts: Vec<&str> = inner.splitn(3, "..").collect();
    if parts.len() < 2 {
        return Ok(None);
    }
    let step = if parts.len() == 3 { parts[2].parse::<i64>().ok() } else { None };
    if parts.len() == 3 && step.is_none() {
        return Ok(None);
    }
    let start = parse_range_endpoint(parts[0]);
    let end = parse_range_endpoint(parts[1]);
    match (start, end) {
        (Some(s), Some(e)) => Ok(Some(BraceItem::Range { start: s, end: e, step })),
        _ => Ok(None),
    }
}

fn parse_range_endpoint(text: &str) -> Option<BraceRangeValue> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(BraceRangeValue::Number(n));
    }
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_none() && c.is_ascii_alphabetic() {
        return Some(BraceRangeValue::Char(c));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Segment;

    fn word(segs: Vec<Segment>) -> WordNode {
        parse_word(&segs).unwrap()
    }

    #[test]
    fn simple_variable() {
        let w = word(vec![Segment::Unquoted("$HOME".to_string())]);
        assert_eq!(w.parts.len(), 1);
        assert!(matches!(&w.parts[0], WordPart::ParameterExpansion(p) if p.parameter == "HOME"));
    }

    #[test]
    fn default_value_operator() {
        let w = word(vec![Segment::Unquoted("${X:-foo}".to_string())]);
        match &w.parts[0] {
            WordPart::ParameterExpansion(p) => {
                assert_eq!(p.parameter, "X");
                assert!(matches!(p.operation, Some(ParameterOperation::DefaultValue(_))));
            }
            _ => panic!("expected parameter expansion"),
        }
    }

    #[test]
    fn brace_expansion_cross_product() {
        let w = word(vec![Segment::Unquoted("{a,b}".to_string())]);
        match &w.parts[0] {
            WordPart::BraceExpansion(b) => assert_eq!(b.items.len(), 2),
            _ => panic!("expected brace expansion"),
        }
    }

    #[test]
    fn numeric_range() {
        let w = word(vec![Segment::Unquoted("{1..5}".to_string())]);
        match &w.parts[0] {
            WordPart::BraceExpansion(b) => assert_eq!(b.items.len(), 1),
            _ => panic!("expected brace expansion"),
        }
    }

    #[test]
    fn tilde_only_at_word_start() {
        let w = word(vec![Segment::Unquoted("~/bin".to_string())]);
        assert!(matches!(w.parts[0], WordPart::TildeExpansion(_)));
    }

    #[test]
    fn single_quote_passes_through() {
        let w = word(vec![Segment::SingleQuoted("$HOME".to_string())]);
        assert!(matches!(&w.parts[0], WordPart::SingleQuoted(p) if p.value == "$HOME"));
    }
}
