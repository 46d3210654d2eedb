use itertools::Itertools;

/// Lowercase in titles unless first or last
const MINOR_WORDS: [&str; 17] = [
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "of", "on", "or", "the", "to", "with",
    "vs", "via",
];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Title-cases `text`, collapsing runs of whitespace.
///
/// Only the first letter of each word is changed, so acronyms like `AI` or
/// `SaaS` survive.
pub fn to_title_case(text: &str) -> String {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let last = words.len().saturating_sub(1);

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i != 0 && i != last && MINOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(word)
            }
        })
        .join(" ")
}
