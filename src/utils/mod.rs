use regex::Regex;
use std::sync::LazyLock;

/// Punctuation kept verbatim by [`safe_path_string`]; everything else that is
/// not alphanumeric becomes `_`.
const KEEP_CHARACTERS: &str = " !£$%^&()_-+=,.;'@#~[]{}";

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthesized pattern is valid"));
static REMIX_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" - .*Remix").expect("remix pattern is valid"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Turns an arbitrary title into something usable as a file name.
///
/// No truncation happens here, so callers must cope with long names.
pub fn safe_path_string(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || KEEP_CHARACTERS.contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    replaced
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// yt-dlp's `--restrict-filenames` policy as far as it concerns already
/// sanitized names: no spaces and ASCII only.
pub fn restrict_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' || !c.is_ascii() { '_' } else { c })
        .collect()
}

/// Strips decorations like `(Official Video)` or `- Extended Remix` from an
/// `artist - title` string before it is used as a search expression.
pub fn clean_search_query(artist_title: &str) -> String {
    let cleaned = PARENTHESIZED.replace_all(artist_title, "");
    let cleaned = REMIX_SUFFIX.replace_all(&cleaned, "");
    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}
