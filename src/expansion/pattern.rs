//! Glob pattern matching shared by parameter expansion
//! (`${v#pat}`, `${v/pat/rep}`, `case`) and pathname expansion.

use std::collections::HashMap;

use regex_lite::Regex;

lazy_static::lazy_static! {
    static ref POSIX_CLASSES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("alnum", "a-zA-Z0-9");
        m.insert("alpha", "a-zA-Z");
        m.insert("ascii", "\\x00-\\x7F");
        m.insert("blank", " \\t");
        m.insert("cntrl", "\\x00-\\x1F\\x7F");
        m.insert("digit", "0-9");
        m.insert("graph", "!-~");
        m.insert("lower", "a-z");
        m.insert("print", " -~");
        m.insert("punct", "!-/:-@\\[-`{-~");
        m.insert("space", " \\t\\n\\r\\f\\v");
        m.insert("upper", "A-Z");
        m.insert("word", "a-zA-Z0-9_");
        m.insert("xdigit", "0-9A-Fa-f");
        m
    };
}

/// Convert a shell glob pattern into an equivalent regex string.
///
/// `greedy` controls whether `*` is greedy (suffix/longest matches)
/// or lazy (prefix/shortest matches). `extglob` enables
/// `@(...) *(...) +(...) ?(...) !(...)` per shopt.
pub fn pattern_to_regex(pattern: &str, greedy: bool, extglob: bool) -> String {
    let mut regex = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if extglob
            && (c == '@' || c == '*' || c == '+' || c == '?' || c == '!')
            && i + 1 < chars.len()
            && chars[i + 1] == '('
        {
            let close_idx = find_matching_paren(&chars, i + 1);
            if close_idx != usize::MAX {
                let content: String = chars[i + 2..close_idx].iter().collect();
                let alternatives = split_extglob_alternatives(&content);
                let alt_regexes: Vec<String> =
                    alternatives.iter().map(|alt| pattern_to_regex(alt, greedy, extglob)).collect();
                let alt_group = if !alt_regexes.is_empty() { alt_regexes.join("|") } else { "(?:)".to_string() };

                match c {
                    '@' => regex.push_str(&format!("(?:{})", alt_group)),
                    '*' => regex.push_str(&format!("(?:{})*", alt_group)),
                    '+' => regex.push_str(&format!("(?:{})+", alt_group)),
                    '?' => regex.push_str(&format!("(?:{})?", alt_group)),
                    '!' => regex.push_str(&format!("(?!(?:{})$).*", alt_group)),
                    _ => {}
                }
                i = close_idx + 1;
                continue;
            }
        }

        if c == '\\' {
            if i + 1 < chars.len() {
                let next = chars[i + 1];
                if is_regex_special(next) {
                    regex.push('\\');
                    regex.push(next);
                } else {
                    regex.push(next);
                }
                i += 2;
            } else {
                regex.push_str("\\\\");
                i += 1;
            }
        } else if c == '*' {
            regex.push_str(if greedy { ".*" } else { ".*?" });
            i += 1;
        } else if c == '?' {
            regex.push('.');
            i += 1;
        } else if c == '[' {
            let class_end = find_char_class_end(&chars, i);
            if class_end == usize::MAX {
                regex.push_str("\\[");
                i += 1;
            } else {
                let class_content: String = chars[i + 1..class_end].iter().collect();
                regex.push_str(&convert_char_class(&class_content));
                i = class_end + 1;
            }
        } else if "^$.|+(){}".contains(c) {
            regex.push('\\');
            regex.push(c);
            i += 1;
        } else {
            regex.push(c);
            i += 1;
        }
    }
    regex
}

fn is_regex_special(c: char) -> bool {
    "\\^$.|+(){}[]*?".contains(c)
}

fn find_matching_paren(chars: &[char], open_idx: usize) -> usize {
    let mut depth = 1;
    let mut i = open_idx + 1;
    while i < chars.len() && depth > 0 {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
        i += 1;
    }
    usize::MAX
}

fn split_extglob_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            current.push(c);
            if i + 1 < chars.len() {
                current.push(chars[i + 1]);
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if c == '(' {
            depth += 1;
            current.push(c);
        } else if c == ')' {
            depth -= 1;
            current.push(c);
        } else if c == '|' && depth == 0 {
            alternatives.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        i += 1;
    }
    alternatives.push(current);
    alternatives
}

fn find_char_class_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;

    if i < chars.len() && chars[i] == '^' {
        i += 1;
    }
    if i < chars.len() && chars[i] == ']' {
        i += 1;
    }

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        if chars[i] == ']' {
            return i;
        }
        if chars[i] == '\'' {
            let rest: String = chars[i + 1..].iter().collect();
            if let Some(close_quote) = rest.find('\'') {
                i = i + 1 + close_quote + 1;
                continue;
            }
        }
        if chars[i] == '[' && i + 1 < chars.len() && chars[i + 1] == ':' {
            let rest: String = chars[i + 2..].iter().collect();
            if let Some(close_pos) = rest.find(":]") {
                i = i + 2 + close_pos + 2;
                continue;
            }
        }
        i += 1;
    }
    usize::MAX
}

fn convert_char_class(content: &str) -> String {
    let mut result = String::from("[");
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    if !chars.is_empty() && (chars[0] == '^' || chars[0] == '!') {
        result.push('^');
        i += 1;
    }

    while i < chars.len() {
        if chars[i] == '\'' {
            let rest: String = chars[i + 1..].iter().collect();
            if let Some(close_quote) = rest.find('\'') {
                let quoted: String = chars[i + 1..i + 1 + close_quote].iter().collect();
                for ch in quoted.chars() {
                    if ch == '\\' {
                        result.push_str("\\\\");
                    } else if ch == ']' {
                        result.push_str("\\]");
                    } else if ch == '^' && result == "[" {
                        result.push_str("\\^");
                    } else {
                        result.push(ch);
                    }
                }
                i = i + 1 + close_quote + 1;
                continue;
            }
        }

        if chars[i] == '[' && i + 1 < chars.len() && chars[i + 1] == ':' {
            let rest: String = chars[i + 2..].iter().collect();
            if let Some(close_pos) = rest.find(":]") {
                let posix_class: String = chars[i + 2..i + 2 + close_pos].iter().collect();
                result.push_str(posix_class_to_regex(&posix_class));
                i = i + 2 + close_pos + 2;
                continue;
            }
        }

        let c = chars[i];
        if c == '\\' {
            if i + 1 < chars.len() {
                result.push('\\');
                result.push(chars[i + 1]);
                i += 2;
            } else {
                result.push_str("\\\\");
                i += 1;
            }
        } else if c == '-' && i > 0 && i < chars.len() - 1 {
            result.push('-');
            i += 1;
        } else if c == '^' && i == 0 {
            result.push('^');
            i += 1;
        } else {
            if c == ']' && i == 0 {
                result.push_str("\\]");
            } else {
                result.push(c);
            }
            i += 1;
        }
    }

    result.push(']');
    result
}

fn posix_class_to_regex(name: &str) -> &'static str {
    POSIX_CLASSES.get(name).copied().unwrap_or("")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalSide {
    Prefix,
    Suffix,
}

/// `${NAME#P}`/`${NAME##P}`/`${NAME%P}`/`${NAME%%P}` — strip a
/// matching glob prefix or suffix, shortest (`greedy = false`) or
/// longest (`greedy = true`) match.
pub fn apply_pattern_removal(value: &str, regex_str: &str, side: RemovalSide, greedy: bool) -> String {
    if side == RemovalSide::Prefix {
        let pattern = format!("^{}", regex_str);
        if let Ok(re) = Regex::new(&pattern) {
            return re.replace(value, "").to_string();
        }
        return value.to_string();
    }

    let pattern = format!("{}$", regex_str);
    if let Ok(re) = Regex::new(&pattern) {
        if greedy {
            return re.replace(value, "").to_string();
        }
        let chars: Vec<char> = value.chars().collect();
        for i in (0..=chars.len()).rev() {
            let suffix: String = chars[i..].iter().collect();
            if re.is_match(&suffix) {
                return chars[..i].iter().collect();
            }
        }
    }
    value.to_string()
}

/// Compile a glob pattern (already converted via `pattern_to_regex`)
/// anchored at both ends, for full-value matches (`case`, `[[ == ]]`,
/// `${v/pat/rep}` whole-value anchors).
pub fn compile_anchored(regex_str: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{})$", regex_str)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_patterns() {
        assert_eq!(pattern_to_regex("*", true, false), ".*");
        assert_eq!(pattern_to_regex("*", false, false), ".*?");
        assert_eq!(pattern_to_regex("?", true, false), ".");
        assert_eq!(pattern_to_regex("abc", true, false), "abc");
    }

    #[test]
    fn escaped_chars() {
        assert_eq!(pattern_to_regex("\\*", true, false), "\\*");
        assert_eq!(pattern_to_regex("\\[", true, false), "\\[");
    }

    #[test]
    fn character_classes() {
        assert_eq!(pattern_to_regex("[abc]", true, false), "[abc]");
        assert_eq!(pattern_to_regex("[a-z]", true, false), "[a-z]");
        assert_eq!(pattern_to_regex("[^abc]", true, false), "[^abc]");
        assert_eq!(pattern_to_regex("[[:digit:]]", true, false), "[0-9]");
    }

    #[test]
    fn extglob_alternation() {
        assert_eq!(pattern_to_regex("@(a|b)", true, true), "(?:a|b)");
        assert_eq!(pattern_to_regex("*(a|b)", true, true), "(?:a|b)*");
    }

    #[test]
    fn prefix_removal_shortest() {
        let re = pattern_to_regex("*o", false, false);
        assert_eq!(apply_pattern_removal("foobar", &re, RemovalSide::Prefix, false), "bar");
    }

    #[test]
    fn suffix_removal_longest_vs_shortest() {
        let re = pattern_to_regex("b*", true, false);
        assert_eq!(apply_pattern_removal("ababab", &re, RemovalSide::Suffix, true), "a");
        let re2 = pattern_to_regex("b*", false, false);
        assert_eq!(apply_pattern_removal("ababab", &re2, RemovalSide::Suffix, false), "ababa");
    }
}
