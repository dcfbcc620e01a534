use regex::Regex;
use std::sync::LazyLock;

/// Affirmative tokens on the French-language site
pub const YES: &[&str] = &["oui"];
/// Negative tokens on the French-language site
pub const NO: &[&str] = &["non"];
/// Area unit used for every surface
pub const SQUARE_METRES: &str = "m²";

// A digit run that may carry plain, no-break or narrow no-break spaces
static SPACED_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d\s\u{00a0}\u{202f}]*").expect("Failed to compile spaced digits regex")
});

static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Failed to compile digits regex"));

// Thousands are only grouped with no-break variants, so "3 120 m²" stays 120
static SURFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[\u{00a0}\u{202f}]\d{3})*").expect("Failed to compile surface regex")
});

/// First digit run of `text` with locale separators removed.
///
/// `"385\u{202f}000 €"` becomes `"385000"`. The result stays a digit string.
pub fn normalize_number(text: &str) -> Option<String> {
    let run = SPACED_DIGITS_RE.find(text)?;
    Some(run.as_str().chars().filter(char::is_ascii_digit).collect())
}

/// First plain digit run of `text` as an integer
pub fn first_integer(text: &str) -> Option<u32> {
    DIGITS_RE.find(text)?.as_str().parse().ok()
}

/// Match `text` against locale tokens; affirmative tokens win
pub fn parse_boolean(text: &str, true_tokens: &[&str], false_tokens: &[&str]) -> Option<bool> {
    if true_tokens.iter().any(|token| text.contains(token)) {
        Some(true)
    } else if false_tokens.iter().any(|token| text.contains(token)) {
        Some(false)
    } else {
        None
    }
}

/// First number directly followed (after optional whitespace) by `unit`
pub fn extract_leading_surface(text: &str, unit: &str) -> Option<u32> {
    SURFACE_RE.find_iter(text).find_map(|run| {
        if !text[run.end()..].trim_start().starts_with(unit) {
            return None;
        }
        run.as_str()
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()
    })
}

/// Uppercase the first character and lowercase the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
