//! Text normalization applied once, at load time.
//!
//! Every function here is a pure function of its input: the same raw text
//! always produces the same cleaned value, and nothing in this module can
//! fail. Malformed input falls back to a sentinel or to the original text.
//!
//! # Chapter titles
//!
//! [`extract_chapter_title`] tries its rules in a fixed order, and later
//! rules are only fallbacks:
//!
//! 1. The chapter-4 override ([`OVERRIDE_CHAPTER_TITLE`]).
//! 2. `CHAPTER <n> <title>` anywhere in the text (case-insensitive).
//! 3. `<n> <title>` at the start of a line.
//! 4. The first non-empty line that is not `Introduction` / `Chapter summary`.
//! 5. [`UNTITLED_CHAPTER`].

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::models::{NO_AGE_CATEGORY, UNTITLED_CHAPTER};

/// Fixed title for the chapter whose summary text has no usable heading.
pub const OVERRIDE_CHAPTER_TITLE: &str = "Gender and sexual equality";

/// Chapter number (in the source numbering) that receives the override.
const OVERRIDE_CHAPTER_NUMBER: &str = "4";

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
static CHAPTER_HEADING: OnceLock<Regex> = OnceLock::new();
static NUMBERED_HEADING: OnceLock<Regex> = OnceLock::new();
static CHAPTER_HEADER: OnceLock<Regex> = OnceLock::new();
static BARE_NUMBER: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // Patterns are string literals in this module.
    cell.get_or_init(|| Regex::new(pattern).expect("constant regex pattern"))
}

fn digit_run() -> &'static Regex {
    compiled(&DIGIT_RUN, r"\d+")
}

fn chapter_heading() -> &'static Regex {
    compiled(&CHAPTER_HEADING, r"(?i)CHAPTER\s+\d+\s+(.+)")
}

fn numbered_heading() -> &'static Regex {
    compiled(&NUMBERED_HEADING, r"(?m)^\d+\s+([A-Za-z].+)$")
}

fn chapter_header() -> &'static Regex {
    compiled(&CHAPTER_HEADER, r"(?i)CHAPTER\s+\d+")
}

fn bare_number() -> &'static Regex {
    compiled(&BARE_NUMBER, r"^\d+$")
}

/// Canonicalize a raw age field to `"<digits>+"`.
///
/// Uses the first run of digits in the text. Missing input, or input with no
/// digits at all, maps to [`NO_AGE_CATEGORY`].
///
/// ```rust
/// use pyari_browser::normalize::simplify_age;
///
/// assert_eq!(simplify_age(Some("Ages 11 and up")), "11+");
/// assert_eq!(simplify_age(Some("any age")), "No specific category");
/// assert_eq!(simplify_age(None), "No specific category");
/// ```
pub fn simplify_age(raw: Option<&str>) -> String {
    match raw.and_then(|text| digit_run().find(text)) {
        Some(m) => format!("{}+", m.as_str()),
        None => NO_AGE_CATEGORY.to_string(),
    }
}

/// Render list-encoded instructions as `- item` lines.
///
/// Text that is not a list literal (see [`parse_list_literal`]) is returned
/// unchanged, which makes the function idempotent on its own output.
pub fn format_instructions(raw: &str) -> String {
    match parse_list_literal(raw) {
        Some(items) => render_bullets(&items),
        None => raw.to_string(),
    }
}

/// Join items as newline-separated bullet lines.
pub fn render_bullets<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode a single bracketed list literal such as `['Stand up', "Sit down"]`.
///
/// Items are single- or double-quoted strings or bare numbers, separated by
/// commas, with an optional trailing comma. Returns `None` for anything
/// else; the text is never evaluated.
pub fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut chars = inner.chars().peekable();
    let mut items = Vec::new();

    loop {
        skip_whitespace(&mut chars);
        match chars.peek().copied() {
            None => break,
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                items.push(read_quoted(&mut chars, quote)?);
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                items.push(read_number(&mut chars)?);
            }
            Some(_) => return None,
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn skip_whitespace(chars: &mut Chars<'_>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_quoted(chars: &mut Chars<'_>, quote: char) -> Option<String> {
    let mut out = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(out),
            '\n' => return None,
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'a' => out.push('\u{7}'),
                'b' => out.push('\u{8}'),
                'f' => out.push('\u{c}'),
                'v' => out.push('\u{b}'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                '\n' => {}
                'x' => out.push(read_hex_escape(chars, 2)?),
                'u' => out.push(read_hex_escape(chars, 4)?),
                'U' => out.push(read_hex_escape(chars, 8)?),
                first @ '0'..='7' => out.push(read_octal_escape(chars, first)?),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}

/// Exactly `digits` hex digits, as in `\xHH` / `\uXXXX` / `\UXXXXXXXX`.
fn read_hex_escape(chars: &mut Chars<'_>, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}

/// One to three octal digits, the first already consumed (`\0`, `\12`, `\177`).
fn read_octal_escape(chars: &mut Chars<'_>, first: char) -> Option<char> {
    let mut code = first.to_digit(8)?;
    for _ in 0..2 {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(d) => {
                code = code * 8 + d;
                chars.next();
            }
            None => break,
        }
    }
    char::from_u32(code)
}

fn read_number(chars: &mut Chars<'_>) -> Option<String> {
    let mut token = String::new();
    while let Some(&c) = chars.peek() {
        if c == ',' || c.is_whitespace() {
            break;
        }
        token.push(c);
        chars.next();
    }
    token.parse::<f64>().ok().map(|_| token)
}

/// Split a comma-separated tag field into a set of trimmed, non-empty tags.
pub fn parse_tags(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|text| {
        text.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Whether `chapter` is the chapter that takes [`OVERRIDE_CHAPTER_TITLE`].
///
/// Accepts both `4` and `Chapter 4` (any case).
pub fn is_override_chapter(chapter: &str) -> bool {
    let trimmed = chapter.trim();
    let number = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chapter") => trimmed[7..].trim(),
        _ => trimmed,
    };
    number == OVERRIDE_CHAPTER_NUMBER
}

/// Pull a display title for `chapter` out of its raw summary text.
///
/// The override chapter keeps its fixed title even when it has no summary
/// text at all, where other chapters fall back to [`UNTITLED_CHAPTER`].
pub fn extract_chapter_title(summary: Option<&str>, chapter: &str) -> String {
    if is_override_chapter(chapter) {
        return OVERRIDE_CHAPTER_TITLE.to_string();
    }
    let Some(summary) = summary else {
        return UNTITLED_CHAPTER.to_string();
    };

    let heading = chapter_heading()
        .captures(summary)
        .or_else(|| numbered_heading().captures(summary));
    if let Some(caps) = heading {
        let title = caps[1].trim();
        return if title.is_empty() {
            UNTITLED_CHAPTER.to_string()
        } else {
            title.to_string()
        };
    }

    summary
        .lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !matches!(
                    line.to_lowercase().as_str(),
                    "introduction" | "chapter summary"
                )
        })
        .unwrap_or(UNTITLED_CHAPTER)
        .to_string()
}

/// Strip headings and page-number artifacts from a chapter summary.
///
/// Returns the remaining text as trimmed, non-empty paragraphs (blocks of
/// lines separated by blank lines).
pub fn clean_chapter_summary(text: &str, chapter_title: &str) -> Vec<String> {
    let title_lower = chapter_title.to_lowercase();
    let is_override = chapter_title == OVERRIDE_CHAPTER_TITLE;

    let mut paragraphs = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            flush_block(&mut block, &mut paragraphs);
            continue;
        }
        if is_override && stripped.eq_ignore_ascii_case("equality") {
            continue;
        }
        if stripped == chapter_title {
            continue;
        }
        // Running heads such as "Sexual health 261" or "261 Sexual health".
        if stripped.to_lowercase().contains(&title_lower)
            && digit_run().is_match(stripped)
        {
            continue;
        }
        if chapter_header().is_match(stripped) {
            continue;
        }
        if stripped.contains("Chapter summary") {
            continue;
        }
        if bare_number().is_match(stripped) {
            continue;
        }
        block.push(stripped);
    }
    flush_block(&mut block, &mut paragraphs);

    paragraphs
}

fn flush_block(block: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if !block.is_empty() {
        paragraphs.push(block.join("\n"));
        block.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_age_first_digit_run() {
        assert_eq!(simplify_age(Some("8+")), "8+");
        assert_eq!(simplify_age(Some("Age 13-16")), "13+");
        assert_eq!(simplify_age(Some("KS3 (11-14)")), "3+");
        assert_eq!(simplify_age(Some("11.0")), "11+");
    }

    #[test]
    fn test_simplify_age_sentinel() {
        assert_eq!(simplify_age(None), NO_AGE_CATEGORY);
        assert_eq!(simplify_age(Some("")), NO_AGE_CATEGORY);
        assert_eq!(simplify_age(Some("All ages")), NO_AGE_CATEGORY);
    }

    #[test]
    fn test_format_instructions_list() {
        let raw = r#"['Split into pairs.', "Discuss the card's statement.", 'Feed back']"#;
        assert_eq!(
            format_instructions(raw),
            "- Split into pairs.\n- Discuss the card's statement.\n- Feed back"
        );
    }

    #[test]
    fn test_format_instructions_plain_text_unchanged() {
        let raw = "Ask the group to stand in a circle.";
        assert_eq!(format_instructions(raw), raw);
        assert_eq!(format_instructions(""), "");
    }

    #[test]
    fn test_format_instructions_malformed_unchanged() {
        for raw in [
            "['unterminated",
            "[missing quotes]",
            "['a' 'b']",
            "['a',, 'b']",
            "[,]",
            "[['nested']]",
            "[print('x')]",
        ] {
            assert_eq!(format_instructions(raw), raw, "input: {raw}");
        }
    }

    #[test]
    fn test_format_instructions_idempotent() {
        let once = format_instructions("['One', 'Two']");
        assert_eq!(format_instructions(&once), once);
        let plain = "- Already\n- Bulleted";
        assert_eq!(format_instructions(&format_instructions(plain)), plain);
    }

    #[test]
    fn test_parse_list_literal_shapes() {
        assert_eq!(parse_list_literal("[]"), Some(vec![]));
        assert_eq!(
            parse_list_literal("  ['a', 'b',]\n"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            parse_list_literal(r#"["tab\there", 'it\'s', "é"]"#),
            Some(vec![
                "tab\there".to_string(),
                "it's".to_string(),
                "é".to_string()
            ])
        );
        assert_eq!(
            parse_list_literal("[1, 2.5, -3]"),
            Some(vec!["1".to_string(), "2.5".to_string(), "-3".to_string()])
        );
        assert_eq!(parse_list_literal("['x]', 'y']").map(|v| v.len()), Some(2));
        assert_eq!(parse_list_literal("[1x]"), None);
        assert_eq!(parse_list_literal("not a list"), None);
    }

    #[test]
    fn test_format_instructions_control_escapes() {
        assert_eq!(
            format_instructions(r"['Stand\xa0up', 'Page\x0cbreak']"),
            "- Stand\u{a0}up\n- Page\u{c}break"
        );
        assert_eq!(
            parse_list_literal(r"['\a\b\f\v', 'nul\0end', '\101\7', '\U0001F600']"),
            Some(vec![
                "\u{7}\u{8}\u{c}\u{b}".to_string(),
                "nul\u{0}end".to_string(),
                "A\u{7}".to_string(),
                "\u{1F600}".to_string(),
            ])
        );
        for raw in [r"['\x4']", r"['\xzz']", r"['\u00e']"] {
            assert_eq!(format_instructions(raw), raw, "input: {raw}");
        }
    }

    #[test]
    fn test_parse_tags_trims_and_drops_empty() {
        let tags = parse_tags(Some(" Consent, Relationships ,,  , Consent"));
        let expected: BTreeSet<String> = ["Consent", "Relationships"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tags, expected);
        assert!(parse_tags(None).is_empty());
        assert!(parse_tags(Some("")).is_empty());
    }

    #[test]
    fn test_parse_tags_roundtrip() {
        let tags = parse_tags(Some("Body image,Gender,Online safety"));
        let joined = tags.iter().cloned().collect::<Vec<_>>().join(",");
        assert_eq!(parse_tags(Some(&joined)), tags);
    }

    #[test]
    fn test_is_override_chapter() {
        assert!(is_override_chapter("Chapter 4"));
        assert!(is_override_chapter("CHAPTER 4"));
        assert!(is_override_chapter("4"));
        assert!(!is_override_chapter("Chapter 14"));
        assert!(!is_override_chapter("Chapter 40"));
        assert!(!is_override_chapter("Chapter"));
    }

    #[test]
    fn test_title_from_chapter_heading() {
        assert_eq!(extract_chapter_title(Some("CHAPTER 6 Sex"), "Chapter 6"), "Sex");
        assert_eq!(
            extract_chapter_title(Some("Introduction\nchapter 9   Sexual health  \nBody"), "9"),
            "Sexual health"
        );
    }

    #[test]
    fn test_title_from_numbered_line() {
        assert_eq!(extract_chapter_title(Some("6 Sex"), "Chapter 6"), "Sex");
        assert_eq!(
            extract_chapter_title(Some("Introduction\n112 Consent and respect\nMore"), "Chapter 3"),
            "Consent and respect"
        );
    }

    #[test]
    fn test_chapter_heading_wins_over_numbered_line() {
        let text = "12 Page heading\nCHAPTER 2 Relationships";
        assert_eq!(extract_chapter_title(Some(text), "Chapter 2"), "Relationships");
    }

    #[test]
    fn test_title_fallback_first_line() {
        let text = "\n  Introduction \nChapter summary\n  Bodies and puberty \nThis chapter...";
        assert_eq!(extract_chapter_title(Some(text), "Chapter 5"), "Bodies and puberty");
    }

    #[test]
    fn test_title_untitled() {
        assert_eq!(extract_chapter_title(None, "Chapter 1"), UNTITLED_CHAPTER);
        assert_eq!(extract_chapter_title(Some(""), "Chapter 1"), UNTITLED_CHAPTER);
        assert_eq!(
            extract_chapter_title(Some("Introduction\n\nCHAPTER SUMMARY"), "Chapter 1"),
            UNTITLED_CHAPTER
        );
    }

    #[test]
    fn test_title_override_ignores_text() {
        assert_eq!(
            extract_chapter_title(Some("CHAPTER 4 Gender"), "Chapter 4"),
            OVERRIDE_CHAPTER_TITLE
        );
        assert_eq!(extract_chapter_title(None, "Chapter 4"), OVERRIDE_CHAPTER_TITLE);
    }

    #[test]
    fn test_clean_summary_drops_page_artifacts() {
        let text = "Sexual health\nCHAPTER 9\nChapter summary\n\nThis chapter covers STIs.\n261\nIt also covers contraception.\n\nSexual health 261\n\nClinics can help.";
        let paragraphs = clean_chapter_summary(text, "Sexual health");
        assert_eq!(
            paragraphs,
            vec![
                "This chapter covers STIs.\nIt also covers contraception.".to_string(),
                "Clinics can help.".to_string(),
            ]
        );
    }

    #[test]
    fn test_clean_summary_keeps_unrelated_digits() {
        let text = "There are 3 activities on health here.\n\n261 Sexual health";
        let paragraphs = clean_chapter_summary(text, "Sexual health");
        assert_eq!(paragraphs, vec!["There are 3 activities on health here.".to_string()]);
    }

    #[test]
    fn test_clean_summary_override_drops_equality() {
        let text = "Gender and sexual\nEquality\n\nWe explore gender norms.";
        let paragraphs = clean_chapter_summary(text, OVERRIDE_CHAPTER_TITLE);
        assert_eq!(
            paragraphs,
            vec![
                "Gender and sexual".to_string(),
                "We explore gender norms.".to_string()
            ]
        );
        let other = clean_chapter_summary("equality", "Relationships");
        assert_eq!(other, vec!["equality".to_string()]);
    }

    #[test]
    fn test_clean_summary_collapses_blank_runs() {
        let text = "\n\n  First para  \n\n\n\n   \nSecond para\n\n";
        assert_eq!(
            clean_chapter_summary(text, "Untitled"),
            vec!["First para".to_string(), "Second para".to_string()]
        );
        assert!(clean_chapter_summary("", "Untitled").is_empty());
    }
}
