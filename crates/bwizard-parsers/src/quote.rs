//! Shell quoting for tokens of the generated command line.

/// Characters that never need quoting in a POSIX shell word.
/// `%` is included so LSF placeholders like `%I` and `%J` pass through bare.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '-' | '.' | '/' | '%' | '@' | '+' | '=' | ':' | ',')
}

/// Wrap in single quotes, escaping embedded single quotes as `'\''`.
pub fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Wrap in double quotes, escaping the characters the shell still
/// interprets inside them.
pub fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Render a value as a single shell word, quoting only when needed.
pub fn shell_word(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_safe) {
        s.to_string()
    } else {
        single_quote(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quote() {
        assert_eq!(single_quote("python run.py"), "'python run.py'");
        assert_eq!(single_quote("echo 'hi'"), r"'echo '\''hi'\'''");
    }

    #[test]
    fn test_double_quote() {
        assert_eq!(double_quote("A=1"), "\"A=1\"");
        assert_eq!(double_quote(r#"say "$x""#), r#""say \"\$x\"""#);
    }

    #[test]
    fn test_shell_word() {
        assert_eq!(shell_word("/groups/lab/out.%J.%I.log"), "/groups/lab/out.%J.%I.log");
        assert_eq!(shell_word("/groups/my lab/out"), "'/groups/my lab/out'");
        assert_eq!(shell_word(""), "''");
    }
}
