//! Doc comments for generated items.

/// Escape text so it cannot break out of a `///` line or open a doc test.
pub fn sanitize_doc_line(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        return format!("{}```text", &line[..line.len() - trimmed.len()]);
    }
    line.replace("*/", "* /")
}

/// Render `description` as `///` lines indented by `indent` spaces. Empty
/// descriptions render nothing.
pub fn format_doc_comment(description: Option<&str>, indent: usize) -> String {
    let Some(description) = description.map(str::trim).filter(|text| !text.is_empty()) else {
        return String::new();
    };
    let pad = " ".repeat(indent);
    let mut out = String::new();
    let mut in_code = false;
    for line in description.lines() {
        let line = line.trim_end();
        let rendered = if line.trim_start().starts_with("```") {
            let fence = if in_code { line.to_string() } else { sanitize_doc_line(line) };
            in_code = !in_code;
            fence
        } else {
            sanitize_doc_line(line)
        };
        if rendered.is_empty() {
            out.push_str(&format!("{}///\n", pad));
        } else {
            out.push_str(&format!("{}/// {}\n", pad, rendered));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indented_lines() {
        assert_eq!(
            format_doc_comment(Some("Make a greeting.\n\nFor a user."), 4),
            "    /// Make a greeting.\n    ///\n    /// For a user.\n"
        );
        assert_eq!(format_doc_comment(Some("  "), 0), "");
        assert_eq!(format_doc_comment(None, 0), "");
    }

    #[test]
    fn code_fences_never_become_doc_tests() {
        let doc = format_doc_comment(Some("```\nlet x = 1;\n```"), 0);
        assert_eq!(doc, "/// ```text\n/// let x = 1;\n/// ```\n");
    }
}
