//! Secret-like rejection for auto-capture candidates (spec §4.7), reusing
//! the redaction pattern table (spec §4.2) as the detector.

pub use crate::redact::looks_like_secret;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_a_plausible_api_key() {
        assert!(looks_like_secret(
            "sk-AAAA1111BBBB2222CCCC3333DDDD4444"
        ));
    }

    #[test]
    fn does_not_flag_ordinary_text() {
        assert!(!looks_like_secret("I prefer dark mode"));
    }
}
