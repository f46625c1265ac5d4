//! Language codes returned by the detection endpoint and their display names.
use serde::{Deserialize, Serialize};

const LANGUAGE_NAMES: [(&str, &str); 54] = [
    ("af", "Afrikaans"),
    ("ar", "Arabic"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("gu", "Gujarati"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pa", "Punjabi"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("so", "Somali"),
    ("sq", "Albanian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tl", "Tagalog"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// Display name of a language code, or the trimmed code itself when unknown
pub fn language_name(code: &str) -> String {
    let code = code.trim();
    LANGUAGE_NAMES
        .binary_search_by(|(known, _)| known.cmp(&code))
        .map(|idx| LANGUAGE_NAMES[idx].1.to_string())
        .unwrap_or_else(|_| code.to_string())
}

/// One candidate of a language detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbableLanguage {
    pub code: String,
    pub name: String,
    pub probability: f64,
}

/// Parses the backend's `"[en:0.9871, fr:0.0129]"` candidate list.
/// Entries without a numeric probability are skipped.
pub fn parse_probable_languages(raw: &str) -> Vec<ProbableLanguage> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .filter_map(|item| {
            let (code, probability) = item.split_once(':')?;
            let code = code.trim();
            let probability: f64 = probability.trim().parse().ok()?;
            if code.is_empty() {
                return None;
            }
            Some(ProbableLanguage {
                code: code.to_string(),
                name: language_name(code),
                probability,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(LANGUAGE_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(language_name("hi"), "Hindi");
        assert_eq!(language_name(" fr "), "French");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn candidate_lists_are_parsed() {
        let parsed = parse_probable_languages("[en:0.9871, fr:0.0129, garbage]");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "English");
        assert!((parsed[0].probability - 0.9871).abs() < 1e-9);
        assert_eq!(parsed[1].code, "fr");
        assert!(parse_probable_languages("").is_empty());
    }
}
