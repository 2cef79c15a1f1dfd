//! Name and school canonicalization
//!
//! Heuristics tuned for U.S. university naming. They are deliberately lossy:
//! the matcher prefers recall over precision.

/// Standalone tokens dropped from athlete names
const NAME_SUFFIXES: [&str; 5] = ["jr", "sr", "ii", "iii", "iv"];

/// Canonicalize an athlete name for comparison.
///
/// Lowercases, drops punctuation (apostrophes, backticks, hyphens, periods,
/// commas, ...), removes generational suffixes and collapses whitespace.
///
/// # Examples
///
/// ```
/// use xcd_common::matching::normalize_name;
///
/// assert_eq!(normalize_name("  Colin   Sahlman "), "colin sahlman");
/// assert_eq!(normalize_name("O'Brien, Jr."), "obrien");
/// assert_eq!(normalize_name("Mary-Kate Smith III"), "marykate smith");
/// ```
pub fn normalize_name(name: &str) -> String {
    let stripped = strip_punctuation(&name.to_lowercase());
    stripped
        .split_whitespace()
        .filter(|token| !NAME_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize a school name for comparison.
///
/// "university" becomes "u", "college" is dropped and "state" becomes "st"
/// (whole words only), then punctuation is removed and whitespace collapsed.
///
/// # Examples
///
/// ```
/// use xcd_common::matching::normalize_school;
///
/// assert_eq!(normalize_school("Ohio State University"), "ohio st u");
/// assert_eq!(normalize_school("Boston College"), "boston");
/// assert_eq!(normalize_school("St. John's"), "st johns");
/// ```
pub fn normalize_school(school: &str) -> String {
    let lowered = school.trim().to_lowercase();
    let replaced = replace_words(&lowered, |word| match word {
        "university" => Some("u"),
        "college" => Some(""),
        "state" => Some("st"),
        _ => None,
    });
    strip_punctuation(&replaced)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Delete punctuation characters, keeping letters, digits and whitespace
fn strip_punctuation(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Replace whole words (maximal alphanumeric runs) using `replacement`
fn replace_words<F>(value: &str, replacement: F) -> String
where
    F: Fn(&str) -> Option<&'static str>,
{
    let mut out = String::with_capacity(value.len());
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        if !word.is_empty() {
            match replacement(word.as_str()) {
                Some(replaced) => out.push_str(replaced),
                None => out.push_str(word),
            }
            word.clear();
        }
    };

    for c in value.chars() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);

    out
}
