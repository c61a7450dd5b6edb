use crate::news::Article;

/// Start of the `[+N chars]` marker NewsAPI appends to clipped content
const CLIP_MARKER_START: &str = "[+";
const CLIP_MARKER_END: &str = " chars]";

/// Derive usable plain text from an article.
///
/// `content` wins over `description`; empty fields count as missing. A trailing
/// provider clip marker (`... [+123 chars]`) is removed together with the
/// ellipsis before it. An empty result means the article has no usable text.
pub fn article_text(article: &Article) -> String {
    let raw = [article.content.as_deref(), article.description.as_deref()]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .unwrap_or("");

    strip_clip_marker(raw).trim().to_string()
}

fn strip_clip_marker(text: &str) -> &str {
    if !text.ends_with(CLIP_MARKER_END) {
        return text;
    }
    match text.rfind(CLIP_MARKER_START) {
        Some(start) => {
            let head = text[..start].trim_end();
            head.strip_suffix("...")
                .or_else(|| head.strip_suffix('…'))
                .unwrap_or(head)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(content: Option<&str>, description: Option<&str>) -> Article {
        Article {
            content: content.map(str::to_string),
            description: description.map(str::to_string),
            ..Article::default()
        }
    }

    #[test]
    fn clip_marker_is_removed_and_trimmed() {
        let a = article(Some("  OpenAI shipped a new model today...[+42 chars]"), None);
        assert_eq!(article_text(&a), "OpenAI shipped a new model today");
    }

    #[test]
    fn unicode_ellipsis_marker_is_removed() {
        let a = article(Some("Regulators met on Tuesday… [+3120 chars]"), None);
        assert_eq!(article_text(&a), "Regulators met on Tuesday");
    }

    #[test]
    fn description_used_when_content_missing_or_empty() {
        let a = article(None, Some("  Only a description.  "));
        assert_eq!(article_text(&a), "Only a description.");

        let a = article(Some(""), Some("Fallback"));
        assert_eq!(article_text(&a), "Fallback");
    }

    #[test]
    fn no_text_fields_yield_empty_string() {
        assert_eq!(article_text(&article(None, None)), "");
        assert_eq!(article_text(&article(Some("   "), None)), "");
    }

    #[test]
    fn bracketed_text_without_marker_suffix_is_kept() {
        let a = article(Some("Prices rose [+5%] this week"), None);
        assert_eq!(article_text(&a), "Prices rose [+5%] this week");
    }

    #[test]
    fn last_marker_occurrence_wins() {
        let a = article(Some("See [+1 chars] inline then end [+9 chars]"), None);
        assert_eq!(article_text(&a), "See [+1 chars] inline then end");
    }

    #[test]
    fn only_one_ellipsis_is_removed_before_marker() {
        let a = article(Some("Wait......[+3 chars]"), None);
        assert_eq!(article_text(&a), "Wait...");

        let a = article(Some("Hold on……[+3 chars]"), None);
        assert_eq!(article_text(&a), "Hold on…");
    }
}
