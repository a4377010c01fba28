//! English singular/plural rules for identifier words

/// Plural form of a lowercase word using English grammar rules
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();

    // s, ss, sh, ch, x -> add 'es'
    if lower.ends_with('s')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
    {
        return format!("{}es", word);
    }

    // z (but not tz) -> double it and add 'es'
    if lower.ends_with('z') && !lower.ends_with("tz") {
        return format!("{}zes", word);
    }

    // consonant + y -> ies
    if let Some(before) = second_last(&lower) {
        if lower.ends_with('y') && !is_vowel(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }

    // f / fe -> ves
    if lower.ends_with("fe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    if lower.ends_with('f') {
        return format!("{}ves", &word[..word.len() - 1]);
    }

    // consonant + o -> add 'es'
    if let Some(before) = second_last(&lower) {
        if lower.ends_with('o') && !is_vowel(before) {
            return format!("{}es", word);
        }
    }

    format!("{}s", word)
}

/// True when one word is the plural of the other (in either direction)
///
/// Identical words are not number variants.
pub fn are_number_variants(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b || a.is_empty() || b.is_empty() {
        return false;
    }
    pluralize(&a) == b || pluralize(&b) == a || simple_plural(&a) == b || simple_plural(&b) == a
}

/// Plain 's' suffix, which identifiers often use regardless of grammar
fn simple_plural(word: &str) -> String {
    format!("{}s", word)
}

fn second_last(word: &str) -> Option<char> {
    let mut chars = word.chars().rev();
    chars.next()?;
    chars.next()
}

fn is_vowel(c: char) -> bool {
    "aeiou".contains(c)
}
