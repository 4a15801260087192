//! Wire naming shared by the IR consistency checks and every generator.
//!
//! Route segments and envelope names are derived from service and method
//! names here so that the checks which reject colliding names and the code
//! that emits them can never disagree.

/// `GetUserInfo`, `getUserInfo` and `get_user_info` all become `get_user_info`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (index, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let boundary = match index.checked_sub(1).map(|prev| chars[prev]) {
                Some(prev) if prev.is_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_uppercase() =>
                    chars.get(index + 1).map(|next| next.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `get_user_info` and `getUserInfo` both become `GetUserInfo`.
pub fn pascal_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Name of the generated request envelope for a method.
pub fn request_envelope(service: &str, method: &str) -> String {
    format!("{}{}Request", pascal_case(service), pascal_case(method))
}

/// Name of the generated response envelope for a method.
pub fn response_envelope(service: &str, method: &str) -> String {
    format!("{}{}Response", pascal_case(service), pascal_case(method))
}

/// Wire name of a method: its snake_case form. Two methods of one service
/// with the same wire name would share a route.
pub fn wire_method_name(method: &str) -> String { snake_case(method) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_splits_words_and_acronyms() {
        assert_eq!(snake_case("Greeter"), "greeter");
        assert_eq!(snake_case("getUserInfo"), "get_user_info");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("Utf8Decoder"), "utf8_decoder");
    }

    #[test]
    fn pascal_case_joins_words() {
        assert_eq!(pascal_case("greet"), "Greet");
        assert_eq!(pascal_case("get_user_info"), "GetUserInfo");
        assert_eq!(pascal_case("Greeter"), "Greeter");
    }

    #[test]
    fn envelope_names() {
        assert_eq!(request_envelope("Greeter", "greet"), "GreeterGreetRequest");
        assert_eq!(response_envelope("Greeter", "list_users"), "GreeterListUsersResponse");
        assert_eq!(wire_method_name("Greet"), wire_method_name("greet"));
    }
}
