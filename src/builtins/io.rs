//! `echo`, `printf`, `read` (spec §4.G).

use std::io::Write;

use crate::errors::ShellResult;
use crate::executor::Executor;

pub fn echo(exec: &mut Executor, args: &[String]) -> i32 {
    let mut interpret_escapes = false;
    let mut suppress_newline = false;
    let mut rest = args;

    while let Some(first) = rest.first() {
        match first.as_str() {
            "-e" => {
                interpret_escapes = true;
                rest = &rest[1..];
            }
            "-n" => {
                suppress_newline = true;
                rest = &rest[1..];
            }
            "-E" => {
                interpret_escapes = false;
                rest = &rest[1..];
            }
            _ => break,
        }
    }

    let joined = rest.join(" ");
    let text = if interpret_escapes { expand_backslash_escapes(&joined, true).0 } else { joined };
    let _ = exec;
    if suppress_newline {
        print!("{text}");
    } else {
        println!("{text}");
    }
    let _ = std::io::stdout().flush();
    0
}

/// Shared `\n \t \r \\ \a \b \f \v \e \0NN \xNN \uNNNN \UNNNNNNNN`
/// escape set used by `echo -e` and `printf`'s `%b`/format string.
/// `stop_at_c` makes a bare `\c` (printf-only) truncate the rest of
/// the output immediately and is signalled in the returned bool.
fn expand_backslash_escapes(input: &str, stop_at_c: bool) -> (String, bool) {
    let mut out = String::new();
    let bytes: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != '\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let esc = bytes[i + 1];
        match esc {
            'n' => {
                out.push('\n');
                i += 2;
            }
            't' => {
                out.push('\t');
                i += 2;
            }
            'r' => {
                out.push('\r');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                i += 2;
            }
            'a' => {
                out.push('\u{7}');
                i += 2;
            }
            'b' => {
                out.push('\u{8}');
                i += 2;
            }
            'f' => {
                out.push('\u{c}');
                i += 2;
            }
            'v' => {
                out.push('\u{b}');
                i += 2;
            }
            'e' => {
                out.push('\u{1b}');
                i += 2;
            }
            'c' if stop_at_c => return (out, true),
            '0' => {
                let mut j = i + 2;
                let mut digits = String::new();
                while j < bytes.len() && digits.len() < 3 && bytes[j].is_digit(8) {
                    digits.push(bytes[j]);
                    j += 1;
                }
                let code = u32::from_str_radix(&digits, 8).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\0'));
                i = j;
            }
            'x' => {
                let mut j = i + 2;
                let mut digits = String::new();
                while j < bytes.len() && digits.len() < 2 && bytes[j].is_ascii_hexdigit() {
                    digits.push(bytes[j]);
                    j += 1;
                }
                let code = u32::from_str_radix(&digits, 16).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\0'));
                i = j;
            }
            'u' | 'U' => {
                let width = if esc == 'u' { 4 } else { 8 };
                let mut j = i + 2;
                let mut digits = String::new();
                while j < bytes.len() && digits.len() < width && bytes[j].is_ascii_hexdigit() {
                    digits.push(bytes[j]);
                    j += 1;
                }
                let code = u32::from_str_radix(&digits, 16).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                i = j;
            }
            other => {
                out.push('\\');
                out.push(other);
                i += 2;
            }
        }
    }
    (out, false)
}

/// `printf format [args...]`. The format string is reused once its
/// conversions are all consumed as long as arguments remain (spec
/// §4.G).
pub fn printf(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let mut rest = args;
    let mut var_name: Option<&str> = None;
    if rest.first().map(String::as_str) == Some("-v") {
        var_name = rest.get(1).map(String::as_str);
        rest = &rest[2.min(rest.len())..];
    }
    let Some(format) = rest.first() else {
        super::report("printf", "usage: printf format [arguments]");
        return Ok(1);
    };
    let operands = &rest[1..];

    let mut output = String::new();
    let mut consumed_any_conversion = false;
    let mut arg_idx = 0;
    loop {
        let (chunk, used) = render_once(format, operands, &mut arg_idx);
        output.push_str(&chunk);
        consumed_any_conversion |= used;
        if arg_idx >= operands.len() || !used {
            break;
        }
    }

    if let Some(name) = var_name {
        let _ = exec.state.set(name, output);
    } else {
        print!("{output}");
        let _ = std::io::stdout().flush();
    }
    let _ = consumed_any_conversion;
    Ok(0)
}

fn render_once(format: &str, operands: &[String], arg_idx: &mut usize) -> (String, bool) {
    // Backslash escapes never interact with `%` conversions, so expand
    // them up front and scan the result only for `%`.
    let (format, _) = expand_backslash_escapes(format, false);
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    let mut used_conversion = false;

    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if i + 1 < chars.len() && chars[i + 1] == '%' {
            out.push('%');
            i += 2;
            continue;
        }

        let start = i;
        i += 1;
        let mut flags = String::new();
        while i < chars.len() && "-+ 0#".contains(chars[i]) {
            flags.push(chars[i]);
            i += 1;
        }
        let mut width = String::new();
        if i < chars.len() && chars[i] == '*' {
            width = take_operand(operands, arg_idx).unwrap_or_default();
            i += 1;
        } else {
            while i < chars.len() && chars[i].is_ascii_digit() {
                width.push(chars[i]);
                i += 1;
            }
        }
        let mut precision: Option<String> = None;
        if i < chars.len() && chars[i] == '.' {
            i += 1;
            if i < chars.len() && chars[i] == '*' {
                precision = Some(take_operand(operands, arg_idx).unwrap_or_default());
                i += 1;
            } else {
                let mut p = String::new();
                while i < chars.len() && chars[i].is_ascii_digit() {
                    p.push(chars[i]);
                    i += 1;
                }
                precision = Some(p);
            }
        }
        let Some(&conv) = chars.get(i) else {
            out.push_str(&chars[start..].iter().collect::<String>());
            break;
        };
        i += 1;
        used_conversion = true;

        let operand = take_operand(operands, arg_idx).unwrap_or_default();
        let rendered = format_conversion(conv, &operand, &width, precision.as_deref(), &flags);
        out.push_str(&rendered);
    }
    (out, used_conversion)
}

fn take_operand(operands: &[String], idx: &mut usize) -> Option<String> {
    let v = operands.get(*idx).cloned();
    if *idx < operands.len() {
        *idx += 1;
    }
    v
}

fn format_conversion(conv: char, operand: &str, width: &str, precision: Option<&str>, flags: &str) -> String {
    let width: i64 = width.parse().unwrap_or(0);
    let left_align = flags.contains('-');
    let zero_pad = flags.contains('0') && !left_align;

    let body = match conv {
        's' => {
            let mut s = operand.to_string();
            if let Some(p) = precision.and_then(|p| p.parse::<usize>().ok()) {
                s.truncate(p);
            }
            s
        }
        'b' => expand_backslash_escapes(operand, false).0,
        'q' => shell_quote(operand),
        'c' => operand.chars().next().map(|c| c.to_string()).unwrap_or_default(),
        'd' | 'i' => crate::arithmetic::parse_integer_literal(operand).unwrap_or(0).to_string(),
        'u' => (crate::arithmetic::parse_integer_literal(operand).unwrap_or(0) as u64).to_string(),
        'o' => format!("{:o}", crate::arithmetic::parse_integer_literal(operand).unwrap_or(0)),
        'x' => format!("{:x}", crate::arithmetic::parse_integer_literal(operand).unwrap_or(0)),
        'X' => format!("{:X}", crate::arithmetic::parse_integer_literal(operand).unwrap_or(0)),
        'f' | 'e' | 'g' => {
            let value: f64 = operand.trim().parse().unwrap_or(0.0);
            let prec = precision.and_then(|p| p.parse::<usize>().ok()).unwrap_or(6);
            match conv {
                'f' => format!("{value:.prec$}"),
                'e' => format!("{value:.prec$e}"),
                _ => format!("{value}"),
            }
        }
        _ => operand.to_string(),
    };

    let pad_len = width.unsigned_abs() as usize;
    if body.len() >= pad_len {
        return body;
    }
    let pad = pad_len - body.len();
    if left_align {
        format!("{body}{}", " ".repeat(pad))
    } else if zero_pad && matches!(conv, 'd' | 'i' | 'u' | 'o' | 'x' | 'X' | 'f' | 'e' | 'g') {
        format!("{}{body}", "0".repeat(pad))
    } else {
        format!("{}{body}", " ".repeat(pad))
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "_./-".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// `read [-r] [-a array] [-d delim] [-n count] [-p prompt] [-t secs] [-s] [-u fd] name...`
pub fn read(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let mut raw = false;
    let mut delim = b'\n';
    let mut array_name: Option<String> = None;
    let mut max_chars: Option<usize> = None;
    let mut prompt: Option<String> = None;
    let mut timeout: Option<f64> = None;
    let mut fd = 0;
    let mut names: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-r" => raw = true,
            "-s" => {}
            "-d" => {
                i += 1;
                delim = args.get(i).and_then(|s| s.bytes().next()).unwrap_or(b'\n');
            }
            "-a" => {
                i += 1;
                array_name = args.get(i).cloned();
            }
            "-n" | "-N" => {
                i += 1;
                max_chars = args.get(i).and_then(|s| s.parse().ok());
            }
            "-p" => {
                i += 1;
                prompt = args.get(i).cloned();
            }
            "-t" => {
                i += 1;
                timeout = args.get(i).and_then(|s| s.parse().ok());
            }
            "-u" => {
                i += 1;
                fd = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            other => names.push(other.to_string()),
        }
        i += 1;
    }

    if let Some(p) = &prompt {
        eprint!("{p}");
        let _ = std::io::stderr().flush();
    }

    if let Some(secs) = timeout {
        if !fd_ready(fd, secs) {
            return Ok(1);
        }
    }

    let line = match max_chars {
        Some(n) => read_n_chars(fd, n),
        None => read_line(fd, delim),
    };
    let Some(line) = line else {
        return Ok(1);
    };

    let ifs = exec.state.get("IFS").unwrap_or_else(|| " \t\n".to_string());
    let split = crate::expansion::split::split_by_ifs(&line, &ifs);
    let fields = if raw { split.words } else { split.words.into_iter().map(unescape_read_field).collect() };

    if let Some(array) = array_name {
        let arr = crate::state::arrays::IndexedArray::from_values(fields);
        let _ = exec.state.set_array(&array, arr);
    } else if names.is_empty() {
        let _ = exec.state.set("REPLY", fields.join(" "));
    } else {
        for (idx, name) in names.iter().enumerate() {
            if idx + 1 == names.len() {
                let remainder = fields.get(idx..).map(|s| s.join(" ")).unwrap_or_default();
                let _ = exec.state.set(name, remainder);
            } else {
                let _ = exec.state.set(name, fields.get(idx).cloned().unwrap_or_default());
            }
        }
    }
    Ok(0)
}

fn unescape_read_field(field: String) -> String {
    if field.contains('\\') {
        expand_backslash_escapes(&field, false).0
    } else {
        field
    }
}

fn read_line(fd: i32, delim: u8) -> Option<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = unsafe { libc::read(fd, byte.as_mut_ptr() as *mut _, 1) };
        if n <= 0 {
            if buf.is_empty() {
                return None;
            }
            break;
        }
        if byte[0] == delim {
            break;
        }
        buf.push(byte[0]);
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn read_n_chars(fd: i32, n: usize) -> Option<String> {
    let mut buf = vec![0u8; n];
    let mut got = 0;
    while got < n {
        let r = unsafe { libc::read(fd, buf[got..].as_mut_ptr() as *mut _, n - got) };
        if r <= 0 {
            break;
        }
        got += r as usize;
    }
    if got == 0 {
        return None;
    }
    buf.truncate(got);
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn fd_ready(fd: i32, secs: f64) -> bool {
    let mut read_fds: libc::fd_set = unsafe { std::mem::zeroed() };
    unsafe { libc::FD_SET(fd, &mut read_fds) };
    let mut tv = libc::timeval { tv_sec: secs.trunc() as libc::time_t, tv_usec: (secs.fract() * 1_000_000.0) as libc::suseconds_t };
    let ret = unsafe { libc::select(fd + 1, &mut read_fds, std::ptr::null_mut(), std::ptr::null_mut(), &mut tv) };
    ret > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_expansion_handles_common_sequences() {
        let (out, _) = expand_backslash_escapes("a\\tb\\n", true);
        assert_eq!(out, "a\tb\n");
    }

    #[test]
    fn printf_width_and_precision() {
        let ops = vec!["5".to_string()];
        let mut idx = 0;
        let (out, used) = render_once("[%5d]", &ops, &mut idx);
        assert!(used);
        assert_eq!(out, "[    5]");
    }

    #[test]
    fn printf_reuses_format_for_extra_args() {
        let ops = vec!["a".to_string(), "b".to_string()];
        let mut idx = 0;
        let (first, _) = render_once("%s\n", &ops, &mut idx);
        assert_eq!(first, "a\n");
        let (second, _) = render_once("%s\n", &ops, &mut idx);
        assert_eq!(second, "b\n");
    }
}
