//! Locale-aware text ordering for table cells.
//!
//! Approximates a root-locale collation in four levels:
//!
//! 1. base letters, after canonical decomposition with combining marks
//!    removed and case folded, so `Ö` sorts with `o`;
//! 2. accents, letter by letter, with an unmarked letter before a marked one;
//! 3. case, with lowercase before uppercase;
//! 4. exact code point order, so the result is a total order.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Compare two strings the way a table header sort presents them.
#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary(a, b)
        .then_with(|| secondary(a, b))
        .then_with(|| tertiary(a, b))
        .then_with(|| a.cmp(b))
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn primary(a: &str, b: &str) -> Ordering {
    base_letters(a).cmp(base_letters(b))
}

/// Combining marks attached to each base letter, in order.
fn accents(s: &str) -> Vec<Vec<char>> {
    let mut letters: Vec<Vec<char>> = Vec::new();
    for c in s.nfd() {
        if !is_combining_mark(c) {
            letters.push(Vec::new());
        } else if let Some(marks) = letters.last_mut() {
            marks.push(c);
        } else {
            letters.push(vec![c]);
        }
    }
    letters
}

fn secondary(a: &str, b: &str) -> Ordering {
    accents(a).cmp(&accents(b))
}

fn tertiary(a: &str, b: &str) -> Ordering {
    for (x, y) in a.nfd().zip(b.nfd()) {
        if x == y {
            continue;
        }
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("AAA", "BBB", Ordering::Less)]
    #[test_case("BBB", "AAA", Ordering::Greater)]
    #[test_case("apple", "Banana", Ordering::Less)]
    #[test_case("Zebra", "apple", Ordering::Greater)]
    #[test_case("a", "A", Ordering::Less)]
    #[test_case("A", "a", Ordering::Greater)]
    #[test_case("same", "same", Ordering::Equal)]
    #[test_case("", "a", Ordering::Less)]
    #[test_case("abc", "ab", Ordering::Greater)]
    #[test_case("Ärger", "arger", Ordering::Greater ; "umlaut after plain letter")]
    #[test_case("Äb", "ac", Ordering::Less ; "accent is not a primary difference")]
    #[test_case("Öresund", "Zeta", Ordering::Less ; "accented letter sorts with its base")]
    #[test_case("Ébène", "Fox", Ordering::Less ; "accented capital sorts by base")]
    #[test_case("e", "é", Ordering::Less ; "unmarked before marked")]
    #[test_case("resume", "Résumé", Ordering::Less ; "plain word before accented")]
    #[test_case("résumé", "Resume", Ordering::Greater ; "accent outranks case")]
    #[test_case("éa", "Éa", Ordering::Less ; "case breaks accent tie")]
    fn orders(a: &str, b: &str, expected: Ordering) {
        assert_eq!(locale_cmp(a, b), expected);
    }

    #[test]
    fn antisymmetric() {
        let words = [
            "Apple", "apple", "APPLE", "banana", "Banana", "a", "B", "", "é", "É", "e", "e\u{301}",
        ];
        for a in words {
            for b in words {
                assert_eq!(locale_cmp(a, b), locale_cmp(b, a).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn sorts_mixed_case_words() {
        let mut words = vec!["banana", "Apple", "cherry", "apple", "Banana"];
        words.sort_by(|a, b| locale_cmp(a, b));
        assert_eq!(words, ["apple", "Apple", "banana", "Banana", "cherry"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letters() {
        let mut names = vec!["Zeta Corp", "Öresund AB", "Oracle", "Ébène SA", "Fox"];
        names.sort_by(|a, b| locale_cmp(a, b));
        assert_eq!(names, ["Ébène SA", "Fox", "Oracle", "Öresund AB", "Zeta Corp"]);
    }
}
