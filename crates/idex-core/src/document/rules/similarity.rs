//! Fuzzy similarity between a key phrase and an OCR line.

use strsim::normalized_levenshtein;

/// A string similarity score in `0..=100`.
pub trait Similarity {
    fn score(&self, needle: &str, haystack: &str) -> u8;
}

/// Partial-ratio similarity: the best score of the shorter string against
/// every same-length window of the longer one.
///
/// Both strings are lowercased and stripped of whitespace first, so
/// `"Engine No"` scores 100 against `"ENGINENO."`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatio;

impl Similarity for PartialRatio {
    fn score(&self, needle: &str, haystack: &str) -> u8 {
        partial_ratio(needle, haystack)
    }
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> u8,
{
    fn score(&self, needle: &str, haystack: &str) -> u8 {
        self(needle, haystack)
    }
}

/// Score `a` against `b` with [`PartialRatio`].
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let best = long
        .windows(short.len())
        .map(|window| {
            let window: String = window.iter().collect();
            let short: String = short.iter().collect();
            normalized_levenshtein(&short, &window)
        })
        .fold(0.0_f64, f64::max);

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

fn normalize(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_substring_scores_100() {
        assert_eq!(partial_ratio("Engine No", "Engine No"), 100);
        assert_eq!(partial_ratio("Engine No", "5. Engine No :"), 100);
    }

    #[test]
    fn test_case_and_space_insensitive() {
        assert_eq!(partial_ratio("Engine No", "ENGINENO"), 100);
        assert_eq!(partial_ratio("Type of Body", "type  of body"), 100);
    }

    #[test]
    fn test_argument_order_does_not_matter() {
        assert_eq!(
            partial_ratio("Class of Vehicle", "Class of Vehicl"),
            partial_ratio("Class of Vehicl", "Class of Vehicle")
        );
    }

    #[test]
    fn test_ocr_noise_still_scores_high() {
        // One substituted character in eight.
        assert!(partial_ratio("Engine No", "Engime No") >= 80);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        assert!(partial_ratio("Engine No", "WP CAB-1234") < 50);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("Make", "   "), 0);
    }

    #[test]
    fn test_closure_similarity() {
        let always = |_: &str, _: &str| 42u8;
        assert_eq!(always.score("a", "b"), 42);
        assert_eq!(PartialRatio.score("Make", "MAKE"), 100);
    }
}
