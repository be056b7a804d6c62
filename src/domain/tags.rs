//! Fixed colour palette for tag badges.

const MAIN_TAG_DEFAULT: &str = "#adb5bd";
const SUB_TAG_DEFAULT: &str = "#e5e7eb";

const MAIN_TAG_COLORS: [(&str, &str); 6] = [
    ("cs", "#8ecae6"),
    ("language", "#ffb703"),
    ("algorithm", "#219ebc"),
    ("frontend", "#fb8500"),
    ("backend", "#023047"),
    ("review", "#ff006e"),
];

const SUB_TAG_COLORS: [(&str, &str); 9] = [
    ("Nextjs", "#d6bcfa"),
    ("Notion", "#fde9d9"),
    ("Typescript", "#f3d1e0"),
    ("Blog", "#e6ccb2"),
    ("React", "#cce3de"),
    ("Bug", "#f8d7da"),
    ("TailwindCSS", "#e2e3e5"),
    ("JavaScript", "#ffb347"),
    ("Test", "#dbeafe"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Main,
    Sub,
}

/// Background colour for a tag. Main tags match case-insensitively, sub
/// tags match exactly as they are spelled in the database.
pub fn tag_color(kind: TagKind, tag: &str) -> &'static str {
    match kind {
        TagKind::Main => MAIN_TAG_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map_or(MAIN_TAG_DEFAULT, |(_, color)| *color),
        TagKind::Sub => SUB_TAG_COLORS
            .iter()
            .find(|(name, _)| *name == tag)
            .map_or(SUB_TAG_DEFAULT, |(_, color)| *color),
    }
}

/// Dark main-tag backgrounds need light text.
pub fn is_dark(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#').filter(|hex| hex.len() == 6) else {
        return false;
    };
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .map_or(255.0, f32::from)
    };
    let luma = 0.299 * channel(0..2) + 0.587 * channel(2..4) + 0.114 * channel(4..6);
    luma < 128.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_tags_use_fixed_palette() {
        assert_eq!(tag_color(TagKind::Main, "cs"), "#8ecae6");
        assert_eq!(tag_color(TagKind::Main, "Backend"), "#023047");
        assert_eq!(tag_color(TagKind::Main, "gardening"), MAIN_TAG_DEFAULT);
    }

    #[test]
    fn sub_tags_fall_back_to_neutral() {
        assert_eq!(tag_color(TagKind::Sub, "React"), "#cce3de");
        assert_eq!(tag_color(TagKind::Sub, "react"), SUB_TAG_DEFAULT);
        assert_eq!(tag_color(TagKind::Sub, "Rust"), SUB_TAG_DEFAULT);
    }

    #[test]
    fn dark_backgrounds_are_detected() {
        assert!(is_dark("#023047"));
        assert!(!is_dark("#8ecae6"));
        assert!(!is_dark("not-a-colour"));
    }
}
