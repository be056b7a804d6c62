//! Title-derived slugs.
//!
//! Slugs keep ASCII letters and digits, `_`, `-` and Hangul syllables so that
//! Korean titles stay readable in URLs. Everything else is dropped, runs of
//! whitespace become a single hyphen and the result never starts or ends
//! with one. The transformation is idempotent.

const HANGUL_SYLLABLES: std::ops::RangeInclusive<char> = '\u{AC00}'..='\u{D7A3}';

/// Derive a URL slug from a post title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
            continue;
        }

        if !is_slug_char(ch) {
            continue;
        }

        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.push(ch);
    }

    slug
}

fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || HANGUL_SYLLABLES.contains(&ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust   Async  Basics "), "rust-async-basics");
    }

    #[test]
    fn slugify_keeps_hangul() {
        assert_eq!(slugify("Next.js 블로그 만들기!"), "nextjs-블로그-만들기");
    }

    #[test]
    fn slugify_strips_symbols_and_collapses_hyphens() {
        assert_eq!(slugify("C++ -- a (tour)"), "c-a-tour");
        assert_eq!(slugify("--edge--case--"), "edge-case");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn slugify_treats_title_hyphens_as_separators() {
        assert_eq!(slugify("Next-js"), "next-js");
        assert_eq!(slugify("next-js"), "next-js");
    }

    #[test]
    fn slugify_drops_non_ascii_letters_outside_hangul() {
        assert_eq!(slugify("Café Crème"), "caf-crme");
    }

    #[test]
    fn slugify_of_symbols_only_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn slugify_output_is_url_safe_and_idempotent() {
        let titles = [
            "Hello World",
            "  leading and trailing  ",
            "MiXeD CaSe\tTabs\nNewlines",
            "타입스크립트 - 제네릭 정리",
            "---",
            "a - b - c",
            "Ünïcödé & ASCII 123",
        ];

        for title in titles {
            let slug = slugify(title);
            assert!(!slug.chars().any(char::is_whitespace), "{slug:?}");
            assert!(!slug.chars().any(|c| c.is_ascii_uppercase()), "{slug:?}");
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{slug:?}");
            assert!(!slug.contains("--"), "{slug:?}");
            assert_eq!(slugify(&slug), slug);
        }
    }
}
