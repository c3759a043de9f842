//! PII classification: decide which recognised spans carry PII.
//!
//! ## Ordered dispatch
//!
//! Detectors are plain functions held in an explicit, ordered table
//! ([`DEFAULT_DETECTORS`]). For each span the table is walked top to bottom
//! and the first detector that returns a match wins; nothing after it runs
//! for that span. The order is the policy:
//!
//! 1. `aadhaar`, `phone`, `dob`, `email`: rigid numeric/lexical shapes, very
//!    few false positives. Matched text is the matching substring.
//! 2. `address` (contextual): an address marker in any supported script, or
//!    a long line broken up by list separators. Matched text is the whole
//!    line.
//! 3. `name`: a labelled name field, else two or more title-case tokens.
//!    Matched text is the name tokens only.
//! 4. `address` (fallback): a long line with any internal punctuation.
//!
//! A long comma-separated line can look like both a name and an address;
//! the contextual address detector sits above the name detector so such a
//! line is always reported as `address`.

use crate::config::RedactionConfig;
use crate::keywords::{self, latin_alternation, uncased_words, NAME_KEYWORDS};
use crate::span::{PiiLabel, PiiMatch, TextSpan};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

/// Tunables shared by every detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierSettings {
    /// Lines longer than this many characters qualify for the length-based
    /// address heuristics.
    pub address_min_chars: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            address_min_chars: 25,
        }
    }
}

/// Signature every detector implements: `Some(matched_text)` on a hit.
pub type DetectFn = fn(&str, &ClassifierSettings) -> Option<String>;

/// One entry of the dispatch table.
#[derive(Clone, Copy)]
pub struct Detector {
    pub label: PiiLabel,
    /// Stable identifier used in logs.
    pub name: &'static str,
    pub detect: DetectFn,
}

impl Detector {
    pub fn run(&self, text: &str, settings: &ClassifierSettings) -> Option<String> {
        (self.detect)(text, settings)
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("label", &self.label)
            .field("name", &self.name)
            .finish()
    }
}

/// The evaluation order. See the module docs for why it is this order.
pub const DEFAULT_DETECTORS: &[Detector] = &[
    Detector { label: PiiLabel::Aadhaar, name: "aadhaar", detect: detect_aadhaar },
    Detector { label: PiiLabel::Phone, name: "phone", detect: detect_phone },
    Detector { label: PiiLabel::Dob, name: "dob", detect: detect_dob },
    Detector { label: PiiLabel::Email, name: "email", detect: detect_email },
    Detector { label: PiiLabel::Address, name: "address_context", detect: detect_address_context },
    Detector { label: PiiLabel::Name, name: "name", detect: detect_name },
    Detector { label: PiiLabel::Address, name: "address_fallback", detect: detect_address_fallback },
];

/// Runs the detector table over OCR spans.
#[derive(Debug, Clone)]
pub struct Classifier {
    detectors: Vec<Detector>,
    settings: ClassifierSettings,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            detectors: DEFAULT_DETECTORS.to_vec(),
            settings: ClassifierSettings::default(),
        }
    }
}

impl Classifier {
    /// Build a classifier restricted to `labels`.
    ///
    /// Detectors for other labels are dropped; the survivors keep their
    /// relative order.
    pub fn new(settings: ClassifierSettings, labels: &[PiiLabel]) -> Self {
        let detectors = DEFAULT_DETECTORS
            .iter()
            .filter(|d| labels.contains(&d.label))
            .copied()
            .collect();
        Self {
            detectors,
            settings,
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(
            ClassifierSettings {
                address_min_chars: config.address_min_chars,
            },
            &config.labels,
        )
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Classify a single piece of text. Returns the first hit only.
    pub fn classify_text(&self, text: &str) -> Option<(PiiLabel, String)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.detectors.iter().find_map(|d| {
            d.run(text, &self.settings).map(|m| {
                debug!(detector = d.name, label = %d.label, "PII detector hit");
                trace!(matched = %m, "matched text");
                (d.label, m)
            })
        })
    }

    /// Classify every span; at most one match per span.
    pub fn classify(&self, spans: &[TextSpan]) -> Vec<PiiMatch> {
        spans
            .iter()
            .enumerate()
            .filter_map(|(i, span)| {
                self.classify_text(&span.text).map(|(label, matched_text)| PiiMatch {
                    label,
                    matched_text,
                    boundary: span.boundary.clone(),
                    confidence: span.confidence,
                    span_index: i,
                })
            })
            .collect()
    }
}

/// Classify `spans` with the detectors enabled in `config`.
pub fn classify(spans: &[TextSpan], config: &RedactionConfig) -> Vec<PiiMatch> {
    Classifier::from_config(config).classify(spans)
}

// ── Numeric identifiers ──────────────────────────────────────────────────

static RE_AADHAAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{4}[\s\-]?[0-9]{4}[\s\-]?[0-9]{4}\b").unwrap());

/// 12 digits, optionally grouped 4-4-4 by spaces or hyphens.
pub fn detect_aadhaar(text: &str, _: &ClassifierSettings) -> Option<String> {
    RE_AADHAAR
        .find_iter(text)
        // "+91…" is an international phone number, not an identifier.
        .find(|m| !text[..m.start()].ends_with('+'))
        .map(|m| m.as_str().to_string())
}

static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+91[\s\-]?|\b)[6-9][0-9]{4}[\s\-]?[0-9]{5}\b").unwrap()
});

/// Indian mobile number: leading 6–9, ten digits, optional `+91`.
pub fn detect_phone(text: &str, _: &ClassifierSettings) -> Option<String> {
    RE_PHONE.find(text).map(|m| m.as_str().to_string())
}

static RE_DOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?i:\bdob|\bdate\s+of\s+birth)\s*[:\-]?\s*)?\b([0-9]{2}[/\-][0-9]{2}[/\-][0-9]{4})\b",
    )
    .unwrap()
});

static RE_YOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:\byob|\byear\s+of\s+birth)\s*[:\-]?\s*\b([0-9]{4})\b").unwrap()
});

/// Day-first date of birth; a bare year only when labelled as one.
pub fn detect_dob(text: &str, _: &ClassifierSettings) -> Option<String> {
    RE_DOB
        .captures(text)
        .or_else(|| RE_YOB.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.\-]+@[\w.\-]+\.\w+\b").unwrap());

pub fn detect_email(text: &str, _: &ClassifierSettings) -> Option<String> {
    RE_EMAIL.find(text).map(|m| m.as_str().to_string())
}

// ── Addresses ────────────────────────────────────────────────────────────

const LIST_SEPARATORS: [char; 2] = [',', ';'];
const INTERNAL_PUNCTUATION: [char; 7] = [',', ';', ':', '.', '-', '/', '#'];

fn is_long(text: &str, settings: &ClassifierSettings) -> bool {
    text.chars().count() > settings.address_min_chars
}

/// Address keyword in any script, or a long list-separated line.
pub fn detect_address_context(text: &str, settings: &ClassifierSettings) -> Option<String> {
    let text = text.trim();
    let hit = keywords::has_address_keyword(text)
        || (is_long(text, settings) && text.contains(LIST_SEPARATORS));
    hit.then(|| text.to_string())
}

/// Long line with punctuation somewhere other than its tail.
pub fn detect_address_fallback(text: &str, settings: &ClassifierSettings) -> Option<String> {
    let text = text.trim();
    if !is_long(text, settings) {
        return None;
    }
    let body = text.trim_end_matches(INTERNAL_PUNCTUATION);
    body.contains(INTERNAL_PUNCTUATION).then(|| text.to_string())
}

// ── Names ────────────────────────────────────────────────────────────────

static RE_NAME_LABELLED: Lazy<Regex> = Lazy::new(|| {
    let uncased: Vec<String> = uncased_words(NAME_KEYWORDS).map(regex::escape).collect();
    let token = r"(?:\p{Devanagari}+|\p{L}[\p{L}.']*)";
    Regex::new(&format!(
        r"(?:\b(?i:{latin})\b|{uncased})\s*[:\-]?\s*({token}(?:[ \t]+{token})*)",
        latin = latin_alternation(NAME_KEYWORDS),
        uncased = uncased.join("|"),
    ))
    .expect("name label pattern is valid")
});

static RE_NAME_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)+\b").unwrap());

/// Labelled name field, else the first run of 2+ title-case tokens that is
/// not card boilerplate.
pub fn detect_name(text: &str, _: &ClassifierSettings) -> Option<String> {
    let labelled = RE_NAME_LABELLED
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|s| !keywords::is_boilerplate(s));
    if let Some(name) = labelled {
        return Some(name.to_string());
    }

    RE_NAME_BARE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|s| !keywords::is_boilerplate(s))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str) -> TextSpan {
        TextSpan::from_corners(&[(10, 10), (100, 10), (100, 30), (10, 30)], text, 0.9)
    }

    fn label_of(text: &str) -> Option<(PiiLabel, String)> {
        Classifier::default().classify_text(text)
    }

    #[test]
    fn aadhaar_grouped_number_is_matched_exactly() {
        let matches = Classifier::default().classify(&[span("1234 5678 9012")]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].label, PiiLabel::Aadhaar);
        assert_eq!(matches[0].matched_text, "1234 5678 9012");
        assert!((matches[0].confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(matches[0].span_index, 0);
    }

    #[test]
    fn aadhaar_embedded_in_sentence_returns_substring() {
        let (label, m) = label_of("Your Aadhaar No. : 2345-6789-0123 issued").unwrap();
        assert_eq!(label, PiiLabel::Aadhaar);
        assert_eq!(m, "2345-6789-0123");
    }

    #[test]
    fn ungrouped_twelve_digits_is_aadhaar() {
        assert_eq!(label_of("234567890123").unwrap().0, PiiLabel::Aadhaar);
    }

    #[test]
    fn mobile_numbers() {
        assert_eq!(
            label_of("Mobile: 9876543210").unwrap(),
            (PiiLabel::Phone, "9876543210".to_string())
        );
        assert_eq!(
            label_of("Ph +91 98765 43210").unwrap(),
            (PiiLabel::Phone, "+91 98765 43210".to_string())
        );
        // Leading 5 is not a mobile prefix
        assert_eq!(label_of("5876543210"), None);
    }

    #[test]
    fn international_prefix_is_not_read_as_aadhaar() {
        let (label, m) = label_of("+919876543210").unwrap();
        assert_eq!(label, PiiLabel::Phone);
        assert_eq!(m, "+919876543210");
    }

    #[test]
    fn dob_with_and_without_label() {
        assert_eq!(
            label_of("DOB: 01/02/1990").unwrap(),
            (PiiLabel::Dob, "01/02/1990".to_string())
        );
        assert_eq!(
            label_of("Date of Birth - 15-08-1985").unwrap(),
            (PiiLabel::Dob, "15-08-1985".to_string())
        );
        assert_eq!(label_of("31/12/2001").unwrap().0, PiiLabel::Dob);
        assert_eq!(
            label_of("Year of Birth : 1979").unwrap(),
            (PiiLabel::Dob, "1979".to_string())
        );
        // A bare year is not a birth date
        assert_eq!(label_of("1979"), None);
    }

    #[test]
    fn email_addresses() {
        assert_eq!(
            label_of("mail: r.sharma-01@example.co.in").unwrap(),
            (PiiLabel::Email, "r.sharma-01@example.co.in".to_string())
        );
    }

    #[test]
    fn address_keyword_takes_the_whole_line() {
        let (label, m) = label_of("  Address: 12, MG Road, Bengaluru  ").unwrap();
        assert_eq!(label, PiiLabel::Address);
        assert_eq!(m, "Address: 12, MG Road, Bengaluru");
    }

    #[test]
    fn relation_marker_is_an_address_not_a_name() {
        assert_eq!(label_of("S/O Ramesh Kumar").unwrap().0, PiiLabel::Address);
    }

    #[test]
    fn devanagari_address_keyword() {
        assert_eq!(label_of("पता: गली 4, जयपुर").unwrap().0, PiiLabel::Address);
    }

    #[test]
    fn long_comma_line_is_address_before_name() {
        // Satisfies both the name and address heuristics.
        let text = "Rahul Sharma, Green Park Colony, New Delhi";
        let (label, m) = label_of(text).unwrap();
        assert_eq!(label, PiiLabel::Address);
        assert_eq!(m, text);
    }

    #[test]
    fn short_comma_line_is_not_an_address() {
        assert_eq!(label_of("a, b"), None);
    }

    #[test]
    fn bare_title_case_name() {
        assert_eq!(
            label_of("Rahul Sharma").unwrap(),
            (PiiLabel::Name, "Rahul Sharma".to_string())
        );
    }

    #[test]
    fn labelled_name_captures_tokens_only() {
        assert_eq!(
            label_of("Name: RAHUL KUMAR SHARMA").unwrap(),
            (PiiLabel::Name, "RAHUL KUMAR SHARMA".to_string())
        );
        assert_eq!(
            label_of("Name of the Holder - Priya").unwrap(),
            (PiiLabel::Name, "Priya".to_string())
        );
        assert_eq!(
            label_of("नाम: राहुल शर्मा").unwrap(),
            (PiiLabel::Name, "राहुल शर्मा".to_string())
        );
    }

    #[test]
    fn labelled_name_accepts_lowercase_ocr() {
        assert_eq!(
            label_of("Name : rahul sharma").unwrap(),
            (PiiLabel::Name, "rahul sharma".to_string())
        );
        // Without the label, lowercase words stay unmatched.
        assert_eq!(label_of("rahul sharma"), None);
    }

    #[test]
    fn card_number_labels_are_not_names() {
        let hit = label_of("Enrolment No: 1234/56789/01234");
        assert_ne!(hit.map(|(label, _)| label), Some(PiiLabel::Name));
        assert_eq!(label_of("Enrolment No"), None);
    }

    #[test]
    fn card_boilerplate_is_not_a_name() {
        assert_eq!(label_of("Government Of India"), None);
        assert_eq!(label_of("Unique Identification Authority"), None);
        assert_eq!(label_of("hello world"), None);
    }

    #[test]
    fn fallback_address_for_long_punctuated_line() {
        let text = "flat 4b - green park extension block c";
        let (label, m) = label_of(text).unwrap();
        assert_eq!(label, PiiLabel::Address);
        assert_eq!(m, text);
        // Trailing punctuation alone does not count
        assert_eq!(label_of("this line is long but only ends with a dot."), None);
    }

    #[test]
    fn empty_and_whitespace_text_yield_nothing() {
        let matches = Classifier::default().classify(&[span(""), span("   \t")]);
        assert!(matches.is_empty());
    }

    #[test]
    fn first_hit_short_circuits() {
        // Contains both a phone number and an email: phone is tried first.
        let (label, _) = label_of("9876543210 r@x.io").unwrap();
        assert_eq!(label, PiiLabel::Phone);
    }

    #[test]
    fn restricted_labels_keep_relative_order() {
        let c = Classifier::new(
            ClassifierSettings::default(),
            &[PiiLabel::Address, PiiLabel::Email],
        );
        let names: Vec<_> = c.detectors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["email", "address_context", "address_fallback"]);
        assert_eq!(c.classify_text("1234 5678 9012"), None);
    }

    #[test]
    fn address_threshold_is_configurable() {
        let c = Classifier::new(ClassifierSettings { address_min_chars: 3 }, &PiiLabel::ALL);
        assert_eq!(c.classify_text("ab, cd").unwrap().0, PiiLabel::Address);
    }

    #[test]
    fn one_match_per_span_in_batch_order() {
        let spans = vec![
            span("hello world"),
            span("9876543210"),
            span("Rahul Sharma"),
        ];
        let matches = Classifier::default().classify(&spans);
        let got: Vec<_> = matches.iter().map(|m| (m.span_index, m.label)).collect();
        assert_eq!(got, vec![(1, PiiLabel::Phone), (2, PiiLabel::Name)]);
    }
}
