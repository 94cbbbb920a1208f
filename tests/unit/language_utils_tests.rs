/*!
 * Tests for ISO language code utilities
 */

use catalogtl::language_utils::{get_language_name, language_codes_match, normalize_language_code};

#[test]
fn test_normalizeLanguageCode_withThreeLetterCodes_shouldReturnTwoLetterForm() {
    assert_eq!(normalize_language_code("eng").unwrap(), "en");
    assert_eq!(normalize_language_code("ger").unwrap(), "de");
    assert_eq!(normalize_language_code("RU").unwrap(), "ru");
}

#[test]
fn test_getLanguageName_withInvalidCode_shouldFail() {
    assert!(get_language_name("").is_err());
    assert!(get_language_name("xyzq").is_err());
}

#[test]
fn test_languageCodesMatch_withBibliographicAndTerminologyCodes_shouldMatch() {
    assert!(language_codes_match("fre", "fra"));
    assert!(language_codes_match("fr", "fre"));
    assert!(!language_codes_match("en", "ru"));
}
