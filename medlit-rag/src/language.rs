//! Detection of non-English characters in a query.

use regex::Regex;

/// Result of running the detector over a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Whether the query should be translated before embedding.
    pub needs_translation: bool,
    /// Fraction of non-target characters among non-whitespace characters.
    pub non_target_fraction: f64,
}

/// Decides whether a query contains enough non-English text to warrant
/// translation.
///
/// The target alphabet is ASCII letters, digits, and common punctuation.
/// The detector counts characters outside that class (whitespace excluded
/// on both sides) and compares the fraction against a threshold. With the
/// default threshold of 0.0 a single non-target character is sufficient,
/// so mixed-language queries always translate. Detection never fails; an
/// empty query simply needs no translation.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    non_target: Regex,
    threshold: f64,
}

impl LanguageDetector {
    /// Create a detector with the given non-target fraction threshold.
    pub fn new(threshold: f64) -> Self {
        // Everything outside ASCII letters, digits, whitespace, and the
        // punctuation that shows up in search queries.
        let non_target = Regex::new(r#"[^a-zA-Z0-9\s.,;:!?\-()\[\]{}'"/\\@#$%^&*+=<>~`|]"#)
            .expect("valid character class");
        Self { non_target, threshold }
    }

    /// Inspect the query and report whether it needs translation.
    pub fn detect(&self, text: &str) -> Detection {
        let total = text.chars().filter(|c| !c.is_whitespace()).count();
        if total == 0 {
            return Detection { needs_translation: false, non_target_fraction: 0.0 };
        }

        let non_target = self.non_target.find_iter(text).count();
        let fraction = non_target as f64 / total as f64;
        Detection { needs_translation: fraction > self.threshold, non_target_fraction: fraction }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::LanguageDetector;

    #[test]
    fn pure_english_needs_no_translation() {
        let detector = LanguageDetector::default();
        let detection = detector.detect("diabetes treatment (type 2), insulin-dependent?");
        assert!(!detection.needs_translation);
        assert_eq!(detection.non_target_fraction, 0.0);
    }

    #[test]
    fn single_cjk_character_triggers_translation() {
        let detector = LanguageDetector::default();
        let detection = detector.detect("糖尿病 diabetes");
        assert!(detection.needs_translation);
        assert!(detection.non_target_fraction > 0.0);
    }

    #[test]
    fn fully_non_english_query_triggers_translation() {
        let detector = LanguageDetector::default();
        assert!(detector.detect("糖尿病的治療方法").needs_translation);
    }

    #[test]
    fn threshold_tolerates_small_fractions() {
        // One CJK char among nine non-whitespace chars is ~11%.
        let detector = LanguageDetector::new(0.25);
        assert!(!detector.detect("diabetes 病").needs_translation);
        assert!(detector.detect("糖尿病的治療").needs_translation);
    }

    #[test]
    fn empty_and_whitespace_queries_need_no_translation() {
        let detector = LanguageDetector::default();
        assert!(!detector.detect("").needs_translation);
        assert!(!detector.detect("   \t\n").needs_translation);
    }
}
