// HTML entity escaping for interpolated values.
//
// Mustache escapes exactly five characters. `'` becomes the numeric `&#39;`
// because the named `&apos;` is not defined in HTML 4.

use std::borrow::Cow;

/// Replace `&`, `<`, `>`, `"`, `'` with their entities.
///
/// Fast path: text without special characters is returned borrowed, zero
/// allocation. All five characters are single-byte ASCII, so byte offsets at
/// them are always valid UTF-8 boundaries to slice on.
pub(crate) fn escape_html(text: &str) -> Cow<'_, str> {
    let Some(first) = text.bytes().position(needs_escape) else {
        return Cow::Borrowed(text);
    };

    let mut result = String::with_capacity(text.len() + 8);
    result.push_str(&text[..first]);
    let mut last = first;
    for (i, b) in text.as_bytes().iter().enumerate().skip(first) {
        let entity = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        result.push_str(&text[last..i]);
        result.push_str(entity);
        last = i + 1;
    }
    result.push_str(&text[last..]);
    Cow::Owned(result)
}

fn needs_escape(b: u8) -> bool {
    matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_borrows() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn escapes_all_five() {
        assert_eq!(escape_html(r#"<b a="x">'&'</b>"#), "&lt;b a=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/b&gt;");
    }

    #[test]
    fn preserves_multibyte_text() {
        assert_eq!(escape_html("héllo <wörld>"), "héllo &lt;wörld&gt;");
    }

    #[test]
    fn escaped_output_unescapes_back() {
        // The renderer relies on escaping being loss-free.
        let input = "<b>&\"'";
        let escaped = escape_html(input);
        let unescaped = escaped
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");
        assert_eq!(unescaped, input);
    }
}
