//! `mapfile`/`readarray` (spec §4.G).

use crate::executor::Executor;
use crate::state::arrays::IndexedArray;

/// `mapfile [-n count] [-O origin] [-s skip] [-t] [-C callback] [-c quantum] [-d delim] [-u fd] [array]`.
/// `-C`/`-c` (per-line callback invocation) are accepted but not
/// separately modeled — den has no notion of a callback command here
/// beyond the array fill itself.
pub fn mapfile(exec: &mut Executor, args: &[String]) -> i32 {
    let mut count = 0usize;
    let mut origin = 0usize;
    let mut skip = 0usize;
    let mut strip_trailing = false;
    let mut delim = b'\n';
    let mut fd = 0;
    let mut array_name = "MAPFILE".to_string();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-n" => {
                i += 1;
                count = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            "-O" => {
                i += 1;
                origin = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            "-s" => {
                i += 1;
                skip = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            "-t" => strip_trailing = true,
            "-d" => {
                i += 1;
                delim = args.get(i).and_then(|s| s.bytes().next()).unwrap_or(b'\n');
            }
            "-u" => {
                i += 1;
                fd = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            "-c" | "-C" => {
                i += 1;
            }
            other if !other.starts_with('-') => array_name = other.to_string(),
            _ => {}
        }
        i += 1;
    }

    let mut lines = Vec::new();
    let mut skipped = 0;
    loop {
        let Some(mut line) = read_delimited(fd, delim) else { break };
        if skipped < skip {
            skipped += 1;
            continue;
        }
        if strip_trailing && line.ends_with(delim as char) {
            line.pop();
        }
        lines.push(line);
        if count > 0 && lines.len() >= count {
            break;
        }
    }

    let existing = exec.state.get_array(&array_name).cloned().unwrap_or_default();
    let mut values = existing.values().to_vec();
    if origin == 0 {
        values = lines;
    } else {
        values.truncate(origin);
        values.extend(lines);
    }

    let _ = exec.state.set_array(&array_name, IndexedArray::from_values(values));
    0
}

fn read_delimited(fd: i32, delim: u8) -> Option<String> {
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
        buf.push(byte[0]);
        if byte[0] == delim {
            break;
        }
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}
