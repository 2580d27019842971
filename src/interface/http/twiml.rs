//! Reply markup for the messaging provider.

pub const CONTENT_TYPE: &str = "application/xml";
pub const EMPTY_RESPONSE: &str = "<Response></Response>";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// A response sending one message back, or an empty one that sends nothing.
pub fn render(reply: Option<&str>) -> String {
    match reply {
        Some(text) => format!(
            "{XML_DECLARATION}<Response><Message>{}</Message></Response>",
            escape(text)
        ),
        None => EMPTY_RESPONSE.to_string(),
    }
}
