//! Shell quoting for remote command strings.
//!
//! Remote hops are handed to `ssh` as a single string that the remote login
//! shell re-splits. Each argv word is therefore quoted with POSIX single
//! quotes unless it consists solely of characters that survive word
//! splitting untouched.

use std::borrow::Cow;

/// Reports whether `byte` never needs quoting in a POSIX shell word.
fn is_shell_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'@' | b'%' | b'_' | b'+' | b'=' | b':' | b',' | b'.' | b'/' | b'-')
}

/// Quotes a single word for the remote shell.
///
/// Safe words are returned unchanged; everything else is wrapped in single
/// quotes with embedded single quotes escaped as `'\''`.
#[must_use]
pub fn quote(word: &str) -> Cow<'_, str> {
    if !word.is_empty() && word.bytes().all(is_shell_safe) {
        return Cow::Borrowed(word);
    }

    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('\'');
    for ch in word.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    Cow::Owned(quoted)
}

/// Renders an argv vector as one space-separated, quoted shell string.
#[must_use]
pub fn render_argv<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|word| quote(word.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
