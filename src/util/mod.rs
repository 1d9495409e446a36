//! Shell quoting for previews and shell-like tokenizing of prompted commands.

pub mod exec;

pub use exec::{ExecOutput, ExecRequest, ExecService};

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '.' | '/' | ':' | '@' | ',' | '+')
}

/// Quote `s` for a POSIX shell; words made only of safe characters stay bare.
pub fn shell_escape(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_shell_safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

pub fn shell_join<S: AsRef<str>>(args: &[S]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| shell_escape(a.as_ref())).collect();
    quoted.join(" ")
}

/// Split `s` into words honoring single and double quotes (no escapes or
/// expansion). `''` yields an empty word; an unterminated quote is an error.
pub fn shell_like_split_args(s: &str) -> Result<Vec<String>, String> {
    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut quote = Quote::None;

    for ch in s.chars() {
        match (&quote, ch) {
            (Quote::None, '\'') => {
                quote = Quote::Single;
                word.get_or_insert_with(String::new);
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                word.get_or_insert_with(String::new);
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::None, c) if c.is_whitespace() => words.extend(word.take()),
            (_, c) => word.get_or_insert_with(String::new).push(c),
        }
    }
    if quote != Quote::None {
        return Err(format!("unterminated quote in: {s}"));
    }
    words.extend(word);
    Ok(words)
}
