//! Keyword lists consulted by the contextual detectors.
//!
//! Latin-script words are matched case-insensitively on word boundaries.
//! Scripts without letter case (Devanagari, Bengali, Tamil, Telugu) are
//! matched as exact substrings, since `\b` is unreliable around their
//! combining vowel signs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Writing system a keyword list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Case-insensitive, word-boundary matching.
    Latin,
    /// Exact substring matching.
    Devanagari,
    Bengali,
    Tamil,
    Telugu,
}

impl Script {
    pub fn is_cased(self) -> bool {
        matches!(self, Script::Latin)
    }
}

/// Keywords for one script.
#[derive(Debug, Clone, Copy)]
pub struct KeywordList {
    pub script: Script,
    pub words: &'static [&'static str],
}

/// Markers that put the rest of a line into address territory.
///
/// Relation markers (`S/O`, `पुत्र`, …) are included because on Indian
/// identity cards the guardian line runs straight into the postal address.
pub const ADDRESS_KEYWORDS: &[KeywordList] = &[
    KeywordList {
        script: Script::Latin,
        words: &[
            "address", "addr", "c/o", "s/o", "d/o", "w/o", "care of", "son of",
            "daughter of", "wife of",
        ],
    },
    KeywordList {
        script: Script::Devanagari,
        words: &["पता", "पुत्र", "पुत्री", "पत्नी", "द्वारा"],
    },
    KeywordList {
        script: Script::Bengali,
        words: &["ঠিকানা"],
    },
    KeywordList {
        script: Script::Tamil,
        words: &["முகவரி"],
    },
    KeywordList {
        script: Script::Telugu,
        words: &["చిరునామా"],
    },
];

/// Field labels that introduce the holder's name.
pub const NAME_KEYWORDS: &[KeywordList] = &[
    KeywordList {
        script: Script::Latin,
        words: &["name of the holder", "name of holder", "name"],
    },
    KeywordList {
        script: Script::Devanagari,
        words: &["नाम"],
    },
];

/// Title-case words printed on the card itself. A name candidate made only
/// of these is boilerplate, not a person.
pub const NAME_STOPWORDS: &[&str] = &[
    "government", "india", "unique", "identification", "authority", "of",
    "the", "republic", "male", "female", "transgender", "address", "date",
    "birth", "year", "father", "mother", "husband", "enrolment", "enrollment",
    "aadhaar", "mobile", "issue", "download", "signature", "valid", "help",
    "income", "tax", "department", "permanent", "account", "number", "card",
    "election", "commission", "voter", "driving", "licence", "license",
    "passport", "state", "union", "dob", "name", "no",
];

/// Build a case-insensitive alternation over every Latin word in `lists`.
///
/// Spaces in a keyword match any run of whitespace and `/` tolerates the
/// padding OCR often inserts (`S / O`).
pub fn latin_alternation(lists: &[KeywordList]) -> String {
    let mut words: Vec<&str> = lists
        .iter()
        .filter(|l| l.script.is_cased())
        .flat_map(|l| l.words.iter().copied())
        .collect();
    // Longest first so "name of the holder" wins over "name".
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));

    words
        .iter()
        .map(|w| {
            regex::escape(w)
                .replace(' ', r"\s+")
                .replace('/', r"\s*/\s*")
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Every uncased keyword in `lists`, flattened.
pub fn uncased_words(lists: &[KeywordList]) -> impl Iterator<Item = &'static str> + '_ {
    lists
        .iter()
        .filter(|l| !l.script.is_cased())
        .flat_map(|l| l.words.iter().copied())
}

static RE_ADDRESS_LATIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", latin_alternation(ADDRESS_KEYWORDS)))
        .expect("address keyword pattern is valid")
});

/// True when `text` carries an address marker in any supported script.
pub fn has_address_keyword(text: &str) -> bool {
    RE_ADDRESS_LATIN.is_match(text)
        || uncased_words(ADDRESS_KEYWORDS).any(|w| contains_standalone(text, w))
}

/// `word` occurs in `text` with no letter or vowel sign directly before or
/// after it.
fn contains_standalone(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Letters, digits and Indic combining signs. Dandas are punctuation.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
        || (matches!(c, '\u{0900}'..='\u{0DFF}') && !matches!(c, '\u{0964}' | '\u{0965}'))
}

/// True when every whitespace-separated token of `candidate` is a stopword.
pub fn is_boilerplate(candidate: &str) -> bool {
    candidate.split_whitespace().all(|tok| {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        tok.is_empty() || NAME_STOPWORDS.contains(&tok.to_lowercase().as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_address_keywords_are_case_insensitive() {
        assert!(has_address_keyword("ADDRESS: 12 MG Road"));
        assert!(has_address_keyword("Address"));
        assert!(has_address_keyword("S/O Ramesh Kumar"));
        assert!(has_address_keyword("s / o Ramesh"));
        assert!(has_address_keyword("C/O: Suresh"));
        assert!(has_address_keyword("care  of the manager"));
    }

    #[test]
    fn latin_keywords_respect_word_boundaries() {
        // "addressee" / "solo" must not trip the detector
        assert!(!has_address_keyword("addressee unknown"));
        assert!(!has_address_keyword("solo trip"));
    }

    #[test]
    fn devanagari_keywords_match_without_case_folding() {
        assert!(has_address_keyword("पता: 12 एमजी रोड"));
        assert!(has_address_keyword("रमेश कुमार पुत्र"));
        assert!(!has_address_keyword("जन्म तिथि"));
    }

    #[test]
    fn uncased_keywords_need_a_word_edge() {
        // पताका is "flag", not an address marker
        assert!(!has_address_keyword("पताका"));
        assert!(!has_address_keyword("नया पताका लाल"));
        assert!(has_address_keyword("पता। जयपुर"));
        assert!(has_address_keyword("(पता) जयपुर"));
    }

    #[test]
    fn other_scripts_have_address_markers() {
        assert!(has_address_keyword("ঠিকানা: কলকাতা"));
        assert!(has_address_keyword("முகவரி"));
    }

    #[test]
    fn alternation_puts_longer_phrases_first() {
        let alt = latin_alternation(NAME_KEYWORDS);
        let holder = alt.find("holder").unwrap();
        let bare = alt.rfind("|name").unwrap();
        assert!(holder < bare, "got: {alt}");
    }

    #[test]
    fn boilerplate_detection() {
        assert!(is_boilerplate("Government Of India"));
        assert!(is_boilerplate("Unique Identification Authority"));
        assert!(!is_boilerplate("Rahul Sharma"));
        assert!(!is_boilerplate("Government Rahul"));
    }
}
