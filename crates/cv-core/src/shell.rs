//! Shell quoting for remote commands

/// Quote a word for a POSIX shell.
///
/// Words made only of safe characters are returned bare so that logged
/// commands stay readable.
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '+' | '@' | '%')
    }) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain_words() {
        assert_eq!(quote("apache2"), "apache2");
        assert_eq!(quote("/var/www/html/index.php"), "/var/www/html/index.php");
        assert_eq!(quote("libstdc++6"), "libstdc++6");
        assert_eq!(quote("www-data:www-data"), "www-data:www-data");
    }

    #[test]
    fn test_quote_special_characters() {
        assert_eq!(quote(""), "''");
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("x; rm -rf /"), "'x; rm -rf /'");
        assert_eq!(quote("it's"), "'it'\\''s'");
        assert_eq!(quote("$HOME"), "'$HOME'");
    }
}
