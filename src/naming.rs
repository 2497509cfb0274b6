//! Conversion of rpc names into method names
//!
//! Rpcs are declared with capitalized names (`PrintHTMLBooks`), the methods
//! that implement or call them use lowercase underscore separated names
//! (`print_html_books`).

/// Convert a capitalized identifier into a lowercase, underscore separated one.
///
/// A run of capitals is kept together as one word, except for its last letter
/// when that one starts a new capitalized word:
///
/// ```
/// use rpc_service::to_snake_case;
///
/// assert_eq!(to_snake_case("AnRPC"), "an_rpc");
/// assert_eq!(to_snake_case("PrintHTMLBooks"), "print_html_books");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let word_start = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if word_start {
                push_separator(&mut out);
            }
        }
        if c == '_' || c == '-' {
            push_separator(&mut out);
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn converts_capitalized_names() {
        assert_eq!(to_snake_case("AnRPC"), "an_rpc");
        assert_eq!(to_snake_case("AMethod"), "a_method");
        assert_eq!(to_snake_case("PrintHTML"), "print_html");
        assert_eq!(to_snake_case("PrintHTMLBooks"), "print_html_books");
    }

    #[test]
    fn keeps_simple_names() {
        assert_eq!(to_snake_case("Ping"), "ping");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("AServerStreamer"), "a_server_streamer");
        assert_eq!(to_snake_case("ABidiStreamer"), "a_bidi_streamer");
    }

    #[test]
    fn digits_and_separators() {
        assert_eq!(to_snake_case("Get2Things"), "get2_things");
        assert_eq!(to_snake_case("Put-File"), "put_file");
        assert_eq!(to_snake_case("Put__File"), "put_file");
        assert_eq!(to_snake_case(""), "");
    }
}
