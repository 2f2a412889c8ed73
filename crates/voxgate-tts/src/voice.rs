//! Voice selection
//!
//! Requests name voices loosely ("fiona", "en-GB"); engines report what
//! they actually have. Matching is case-insensitive: voice names first,
//! language codes second, platform default (`None`) when nothing matches.

use crate::types::VoiceInfo;

pub fn select_voice<'a>(voices: &'a [VoiceInfo], query: &str) -> Option<&'a VoiceInfo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    voices
        .iter()
        .find(|v| v.name.to_lowercase().contains(&query))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.language.to_lowercase().contains(&query))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo {
                id: "en-us-1".into(),
                name: "Samantha".into(),
                language: "en-US".into(),
            },
            VoiceInfo {
                id: "en-gb-1".into(),
                name: "Daniel".into(),
                language: "en-GB".into(),
            },
            VoiceInfo {
                id: "fr-fr-1".into(),
                name: "Amelie".into(),
                language: "fr-FR".into(),
            },
        ]
    }

    #[test]
    fn matches_name_substring_case_insensitively() {
        let voices = catalog();
        let v = select_voice(&voices, "sam").unwrap();
        assert_eq!(v.id, "en-us-1");
        let v = select_voice(&voices, "DANIEL").unwrap();
        assert_eq!(v.id, "en-gb-1");
    }

    #[test]
    fn falls_back_to_language_code() {
        let voices = catalog();
        let v = select_voice(&voices, "fr-FR").unwrap();
        assert_eq!(v.id, "fr-fr-1");
    }

    #[test]
    fn name_match_wins_over_language() {
        // "an" appears in both "Daniel" (name) and nothing useful in
        // languages; name pass must run first
        let voices = catalog();
        let v = select_voice(&voices, "an").unwrap();
        assert_eq!(v.id, "en-us-1"); // "Samantha" is the first name hit
    }

    #[test]
    fn no_match_means_platform_default() {
        let voices = catalog();
        assert!(select_voice(&voices, "klingon").is_none());
        assert!(select_voice(&voices, "").is_none());
    }
}
