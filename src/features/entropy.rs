//! Shannon entropy over the characters of a text.

use std::collections::HashMap;

/// Returns bits per character; 0.0 for empty input or a single repeated character.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut frequency: HashMap<char, u64> = HashMap::new();
    let mut len = 0u64;
    for c in text.chars() {
        *frequency.entry(c).or_insert(0) += 1;
        len += 1;
    }
    if len == 0 {
        return 0.0;
    }

    let len = len as f64;
    frequency
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            p * (1.0 / p).log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_character_is_zero() {
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn two_equiprobable_symbols_is_one_bit() {
        assert!((shannon_entropy("abab") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // two distinct multi-byte characters, equally frequent
        assert!((shannon_entropy("éü") - 1.0).abs() < 1e-12);
    }
}
