//! Textbook name normalisation for quiz results and review tests.
//!
//! Quiz titles arrive as `"{textbook} - {unit}"`, `"{textbook} Lesson 3"`,
//! or with review suffixes such as `"(復習テスト)"`. Results are grouped by
//! the bare textbook name, so every entry point normalises the same way.

use std::sync::OnceLock;

use regex::Regex;

struct Patterns {
    dash_suffix: Regex,
    chapter_suffix: Regex,
    review_suffix: Regex,
    status_suffix: Regex,
    trailing_separators: Regex,
    leading_separators: Regex,
    review_unit: Regex,
    status_unit: Regex,
    whitespace: Regex,
}

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

fn patterns() -> Option<&'static Patterns> {
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                dash_suffix: Regex::new(r"\s*[-–—]\s*.*$").ok()?,
                chapter_suffix: Regex::new(r"(?i)\s*(Lesson|Unit|Chapter)\s*\d+.*$").ok()?,
                review_suffix: Regex::new(r"\s*[（(][^）)]*復習[^)）]*[)）]\s*$").ok()?,
                status_suffix: Regex::new(
                    r"\s*[（(][^）)]*(覚えた|要チェック|覚えていない)[^)）]*[)）]\s*$",
                )
                .ok()?,
                trailing_separators: Regex::new(r"[-–—\s]+$").ok()?,
                leading_separators: Regex::new(r"^[\s\-–—]+").ok()?,
                review_unit: Regex::new(r"^[（(]\s*復習テスト\s*[)）]$").ok()?,
                status_unit: Regex::new(r"^[（(]\s*(覚えた|要チェック|覚えていない)[^)）]*[)）]$")
                    .ok()?,
                whitespace: Regex::new(r"\s+").ok()?,
            })
        })
        .as_ref()
}

/// Strip unit, chapter, review, and status suffixes from a quiz title.
///
/// # Examples
/// ```
/// use edulens::domain::textbook::normalize_textbook_name;
///
/// assert_eq!(normalize_textbook_name("ターゲット1900 - 1-100"), "ターゲット1900");
/// assert_eq!(normalize_textbook_name("New Crown Lesson 3"), "New Crown");
/// ```
pub fn normalize_textbook_name(raw: &str) -> String {
    let Some(p) = patterns() else {
        return raw.trim().to_owned();
    };
    let mut name = raw.to_owned();
    for pattern in [
        &p.dash_suffix,
        &p.chapter_suffix,
        &p.review_suffix,
        &p.status_suffix,
        &p.trailing_separators,
    ] {
        name = pattern.replace(&name, "").into_owned();
    }
    name.trim().to_owned()
}

/// Grouping key for review aggregation: only the review suffix is removed.
pub fn review_textbook_key(raw: &str) -> String {
    match patterns() {
        Some(p) => p.review_suffix.replace(raw, "").trim().to_owned(),
        None => raw.trim().to_owned(),
    }
}

/// Derive the unit label from whatever follows the normalised name.
///
/// Returns `None` when the title carries no suffix.
pub fn derive_unit(raw: &str) -> Option<String> {
    let p = patterns()?;
    let base = normalize_textbook_name(raw);
    let rest = raw.trim().strip_prefix(base.as_str()).unwrap_or("");
    let rest = p.leading_separators.replace(rest, "");
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let unit = if p.review_unit.is_match(rest) {
        "復習テスト".to_owned()
    } else if let Some(captures) = p.status_unit.captures(rest) {
        let status = captures.get(1).map_or("", |m| m.as_str());
        format!("{status}単語")
    } else {
        let spaced = rest.replace(['-', '–', '—'], " ");
        p.whitespace.replace_all(spaced.trim(), " ").into_owned()
    };
    Some(unit).filter(|u| !u.is_empty())
}

/// Title given to generated review tests.
pub fn review_test_title(textbook: &str) -> String {
    format!("{textbook} (復習テスト)")
}
