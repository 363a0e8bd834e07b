//! IFS word splitting (spec §4.C E4).
//!
//! `split_by_ifs` distinguishes whitespace IFS characters (which
//! collapse and never produce empty fields) from non-whitespace ones
//! (each one is a delimiter in its own right, so consecutive
//! delimiters produce empty fields). `smart_word_split` then combines
//! per-part splittability with that splitter so that quoted segments
//! join onto whichever field they're adjacent to instead of being
//! split themselves.

use std::collections::HashSet;

pub const DEFAULT_IFS: &str = " \t\n";

fn is_ifs_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == '\n'
}

fn categorize(ifs: &str) -> (HashSet<char>, HashSet<char>) {
    let mut whitespace = HashSet::new();
    let mut non_whitespace = HashSet::new();
    for ch in ifs.chars() {
        if is_ifs_whitespace(ch) {
            whitespace.insert(ch);
        } else {
            non_whitespace.insert(ch);
        }
    }
    (whitespace, non_whitespace)
}

#[derive(Debug, Clone)]
pub struct IfsSplitResult {
    pub words: Vec<String>,
    pub had_leading_delimiter: bool,
    pub had_trailing_delimiter: bool,
}

/// IFS splitting with leading/trailing-delimiter tracking, needed so
/// `smart_word_split` can tell whether a splittable segment's edges
/// touch a neighboring segment's field or start a fresh one.
pub fn split_by_ifs(value: &str, ifs: &str) -> IfsSplitResult {
    if ifs.is_empty() || value.is_empty() {
        return IfsSplitResult {
            words: if value.is_empty() { vec![] } else { vec![value.to_string()] },
            had_leading_delimiter: false,
            had_trailing_delimiter: false,
        };
    }

    let (whitespace, non_whitespace) = categorize(ifs);
    let mut words = Vec::new();
    let chars: Vec<char> = value.chars().collect();
    let mut pos = 0;
    let mut had_leading_delimiter = false;
    let mut had_trailing_delimiter = false;

    let leading_start = pos;
    while pos < chars.len() && whitespace.contains(&chars[pos]) {
        pos += 1;
    }
    if pos > leading_start {
        had_leading_delimiter = true;
    }

    if pos >= chars.len() {
        return IfsSplitResult { words: vec![], had_leading_delimiter: true, had_trailing_delimiter: true };
    }

    if non_whitespace.contains(&chars[pos]) {
        words.push(String::new());
        pos += 1;
        while pos < chars.len() && whitespace.contains(&chars[pos]) {
            pos += 1;
        }
    }

    while pos < chars.len() {
        let word_start = pos;
        while pos < chars.len() {
            let ch = chars[pos];
            if whitespace.contains(&ch) || non_whitespace.contains(&ch) {
                break;
            }
            pos += 1;
        }
        words.push(chars[word_start..pos].iter().collect());

        if pos >= chars.len() {
            had_trailing_delimiter = false;
            break;
        }

        let before_delimiter = pos;
        while pos < chars.len() && whitespace.contains(&chars[pos]) {
            pos += 1;
        }
        if pos < chars.len() && non_whitespace.contains(&chars[pos]) {
            pos += 1;
            while pos < chars.len() && whitespace.contains(&chars[pos]) {
                pos += 1;
            }
            while pos < chars.len() && non_whitespace.contains(&chars[pos]) {
                words.push(String::new());
                pos += 1;
                while pos < chars.len() && whitespace.contains(&chars[pos]) {
                    pos += 1;
                }
            }
        }

        if pos >= chars.len() && pos > before_delimiter {
            had_trailing_delimiter = true;
        }
    }

    IfsSplitResult { words, had_leading_delimiter, had_trailing_delimiter }
}

/// One piece of an expanded word: its text, whether it is subject to
/// IFS splitting, and whether it came from a quoted source (a quoted
/// empty string can still anchor an empty field).
#[derive(Debug, Clone)]
pub struct WordSplitSegment {
    pub value: String,
    pub is_splittable: bool,
    pub is_quoted: bool,
}

#[derive(Debug, Clone)]
pub struct SmartSplitResult {
    pub words: Vec<String>,
}

/// Combine pre-expanded segments into final fields, splitting only the
/// segments marked splittable (spec §4.C E4's `$var` vs `"$var"`
/// distinction carried down to the sub-word level for cases like
/// `$a"$b"`).
pub fn smart_word_split(segments: &[WordSplitSegment], ifs: &str) -> SmartSplitResult {
    let has_any_splittable = segments.iter().any(|s| s.is_splittable);

    if !has_any_splittable {
        let joined: String = segments.iter().map(|s| s.value.as_str()).collect();
        return SmartSplitResult { words: if joined.is_empty() { vec![] } else { vec![joined] } };
    }

    let mut words: Vec<String> = Vec::new();
    let mut current_word = String::new();
    let mut has_produced_word = false;
    let mut pending_word_break = false;
    let mut prev_was_quoted_empty = false;

    for segment in segments {
        if !segment.is_splittable {
            if pending_word_break {
                if segment.is_quoted && segment.value.is_empty() {
                    if !current_word.is_empty() {
                        words.push(std::mem::take(&mut current_word));
                    }
                    words.push(String::new());
                    has_produced_word = true;
                    pending_word_break = false;
                    prev_was_quoted_empty = true;
                } else if !segment.value.is_empty() {
                    if !current_word.is_empty() {
                        words.push(std::mem::take(&mut current_word));
                    }
                    current_word = segment.value.clone();
                    pending_word_break = false;
                    prev_was_quoted_empty = false;
                } else {
                    current_word.push_str(&segment.value);
                    prev_was_quoted_empty = false;
                }
            } else {
                current_word.push_str(&segment.value);
                prev_was_quoted_empty = segment.is_quoted && segment.value.is_empty();
            }
            continue;
        }

        let IfsSplitResult { words: parts, had_leading_delimiter, had_trailing_delimiter } =
            split_by_ifs(&segment.value, ifs);

        if prev_was_quoted_empty && had_leading_delimiter && current_word.is_empty() {
            words.push(String::new());
            has_produced_word = true;
        }

        if parts.is_empty() {
            if had_trailing_delimiter {
                pending_word_break = true;
            }
        } else if parts.len() == 1 {
            current_word.push_str(&parts[0]);
            has_produced_word = true;
            pending_word_break = had_trailing_delimiter;
        } else {
            current_word.push_str(&parts[0]);
            words.push(std::mem::take(&mut current_word));
            has_produced_word = true;
            for part in &parts[1..parts.len() - 1] {
                words.push(part.clone());
            }
            current_word = parts[parts.len() - 1].clone();
            pending_word_break = had_trailing_delimiter;
        }
        prev_was_quoted_empty = false;
    }

    if !current_word.is_empty() {
        words.push(current_word);
    } else if words.is_empty() && has_produced_word {
        words.push(String::new());
    }

    SmartSplitResult { words }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_split() {
        let r = split_by_ifs("a b c", " \t\n");
        assert_eq!(r.words, vec!["a", "b", "c"]);
    }

    #[test]
    fn consecutive_non_whitespace_delimiters_make_empty_fields() {
        let r = split_by_ifs("a::b", ":");
        assert_eq!(r.words, vec!["a", "", "b"]);
    }

    #[test]
    fn empty_ifs_disables_split() {
        let r = split_by_ifs("a b c", "");
        assert_eq!(r.words, vec!["a b c"]);
    }

    #[test]
    fn smart_split_no_splittable_joins_whole() {
        let segs = vec![
            WordSplitSegment { value: "hello".into(), is_splittable: false, is_quoted: false },
            WordSplitSegment { value: " world".into(), is_splittable: false, is_quoted: true },
        ];
        assert_eq!(smart_word_split(&segs, " \t\n").words, vec!["hello world"]);
    }

    #[test]
    fn smart_split_quoted_joins_onto_split_field() {
        // $a"$b" where a="1 2" b="3 4"
        let segs = vec![
            WordSplitSegment { value: "1 2".into(), is_splittable: true, is_quoted: false },
            WordSplitSegment { value: "3 4".into(), is_splittable: false, is_quoted: true },
        ];
        assert_eq!(smart_word_split(&segs, " \t\n").words, vec!["1", "23 4"]);
    }

    #[test]
    fn smart_split_two_splittable_segments() {
        // $a$b where a="1 2" b="3 4"
        let segs = vec![
            WordSplitSegment { value: "1 2".into(), is_splittable: true, is_quoted: false },
            WordSplitSegment { value: "3 4".into(), is_splittable: true, is_quoted: false },
        ];
        assert_eq!(smart_word_split(&segs, " \t\n").words, vec!["1", "23", "4"]);
    }
}
