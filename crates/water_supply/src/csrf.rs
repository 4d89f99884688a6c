use once_cell::sync::Lazy;
use regex::Regex;

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta tag pattern is valid"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// Header the backend expects on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Finds the token in `<meta name="csrf-token" content="...">`, with the
/// attributes in either order.
pub fn extract_token(html: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut name = None;
        let mut content = None;
        for attribute in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = attribute
                .get(2)
                .or_else(|| attribute.get(3))
                .map(|value| value.as_str());
            match attribute[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                _ => content = value,
            }
        }
        match (name, content) {
            (Some(name), Some(content))
                if name.eq_ignore_ascii_case("csrf-token") && !content.is_empty() =>
            {
                Some(content.to_owned())
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_attribute_order() {
        let html = r#"<html><head>
            <meta charset="utf-8">
            <meta name="csrf-token" content="tok-123">
        </head></html>"#;
        assert_eq!(extract_token(html).as_deref(), Some("tok-123"));

        let html = "<META content='tok-456' NAME='csrf-token' />";
        assert_eq!(extract_token(html).as_deref(), Some("tok-456"));
    }

    #[test]
    fn missing_or_empty_token() {
        assert_eq!(extract_token("<meta name=\"viewport\" content=\"x\">"), None);
        assert_eq!(extract_token("<meta name=\"csrf-token\" content=\"\">"), None);
        assert_eq!(extract_token("no markup at all"), None);
    }
}
