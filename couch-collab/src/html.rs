use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref LINK: Regex = Regex::new(r"(?i)\b(?:https?://|www\.)(?:[^\s<>&]|&amp;)+").unwrap();
}

/// Punctuation that usually ends a sentence rather than a link
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')'];

/// Escapes text so it can be placed in html
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Turns urls in escaped html into links that open in a new tab
pub fn linkify(html: &str) -> String {
    LINK.replace_all(html, |captures: &Captures| {
        let found = &captures[0];
        let link = found.trim_end_matches(TRAILING);
        let rest = &found[link.len()..];

        let href = if link.to_lowercase().starts_with("www.") {
            format!("http://{link}")
        } else {
            link.to_string()
        };

        format!(r#"<a href="{href}" rel="nofollow" target="_blank">{link}</a>{rest}"#)
    })
    .into_owned()
}

/// Renders a chat message as html, with only line breaks and links as markup
pub fn render_message(text: &str) -> String {
    let html = text.split('\n').map(escape).collect::<Vec<_>>().join("<br>");

    linkify(&html)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_escapes_markup() {
        assert_eq!(
            render_message("<b>hi</b> & \"bye\"\nsecond line"),
            "&lt;b&gt;hi&lt;/b&gt; &amp; &quot;bye&quot;<br>second line"
        );
    }

    #[test]
    fn test_render_links() {
        assert_eq!(
            render_message("watch https://youtu.be/abc?t=1&x=2."),
            r#"watch <a href="https://youtu.be/abc?t=1&amp;x=2" rel="nofollow" target="_blank">https://youtu.be/abc?t=1&amp;x=2</a>."#,
            "trailing punctuation should not be part of the link"
        );
        assert_eq!(
            render_message("see www.example.com"),
            r#"see <a href="http://www.example.com" rel="nofollow" target="_blank">www.example.com</a>"#
        );
        assert_eq!(
            render_message("<script>https://evil.com</script>"),
            r#"&lt;script&gt;<a href="https://evil.com" rel="nofollow" target="_blank">https://evil.com</a>&lt;/script&gt;"#,
            "escaped markup should never end up inside a link"
        );
    }
}
