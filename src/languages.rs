//! Mapping from short language codes to NLLB language tags.
//!
//! NLLB indexes its vocabulary by `xxx_Script` tags (`eng_Latn`, `zho_Hans`).
//! Clients usually speak two-letter codes, so requests are normalized through
//! a lookup table. Anything the table doesn't know is passed through as is,
//! on the assumption that it already is a tag.

use std::{collections::HashMap, fs, path::Path};

use once_cell::sync::Lazy;

use crate::error::ServiceError;

/// Sentinel accepted as a source language. There is no detection behind it.
pub const AUTODETECT: &str = "autodetect";
/// Source tag used in place of [`AUTODETECT`].
pub const DEFAULT_SOURCE_TAG: &str = "eng_Latn";
/// Target tag used when a request does not name one.
pub const DEFAULT_TARGET_TAG: &str = "zho_Hans";

static BUILTIN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("en", "eng_Latn");
    m.insert("zh", "zho_Hans");
    m.insert("zh-cn", "zho_Hans");
    m.insert("ja", "jpn_Jpan");
    m.insert("ko", "kor_Hang");
    m.insert("fr", "fra_Latn");
    m.insert("de", "deu_Latn");
    m.insert("es", "spa_Latn");
    m.insert("ru", "rus_Cyrl");
    m.insert("th", "tha_Thai");
    m.insert("vi", "vie_Latn");
    m.insert("it", "ita_Latn");
    m.insert("pt", "por_Latn");
    m.insert("hi", "hin_Deva");
    m
});

/// Lookup table for language codes. Keys are stored lower-cased.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    entries: HashMap<String, String>,
}

impl LanguageTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(code, tag)| (code.to_string(), tag.to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in table extended with the entries of a JSON object file.
    /// File entries win over built-in ones.
    pub fn from_path(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path)?;
        let extra: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            ServiceError::Config(format!("invalid language map {}: {e}", path.display()))
        })?;

        let mut table = Self::builtin();
        table.extend(extra);
        Ok(table)
    }

    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (code, tag) in entries {
            self.entries.insert(code.to_lowercase(), tag);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup; unknown codes come back unchanged.
    pub fn map_lang(&self, code: &str) -> String {
        self.entries
            .get(&code.to_lowercase())
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// Normalizes a `(source, target)` pair. A source that is still the
    /// autodetect sentinel after mapping falls back to English.
    pub fn resolve_pair(&self, source: &str, target: &str) -> (String, String) {
        let mut source = self.map_lang(source);
        if source.eq_ignore_ascii_case(AUTODETECT) {
            source = DEFAULT_SOURCE_TAG.to_string();
        }
        (source, self.map_lang(target))
    }
}

/// Maps a code through the built-in table only.
pub fn map_lang(code: &str) -> String {
    BUILTIN
        .get(code.to_lowercase().as_str())
        .map(|tag| tag.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_tags() {
        let expected = [
            ("en", "eng_Latn"),
            ("zh", "zho_Hans"),
            ("zh-cn", "zho_Hans"),
            ("ja", "jpn_Jpan"),
            ("ko", "kor_Hang"),
            ("fr", "fra_Latn"),
            ("de", "deu_Latn"),
            ("es", "spa_Latn"),
            ("ru", "rus_Cyrl"),
            ("th", "tha_Thai"),
            ("vi", "vie_Latn"),
            ("it", "ita_Latn"),
            ("pt", "por_Latn"),
            ("hi", "hin_Deva"),
        ];
        let table = LanguageTable::builtin();
        for (code, tag) in expected {
            assert_eq!(map_lang(code), tag);
            assert_eq!(table.map_lang(code), tag);
        }
        assert_eq!(table.len(), expected.len());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(map_lang("EN"), "eng_Latn");
        assert_eq!(map_lang("zh-CN"), "zho_Hans");
        assert_eq!(map_lang("Fr"), "fra_Latn");
    }

    #[test]
    fn test_unknown_codes_pass_through_unchanged() {
        assert_eq!(map_lang("zho_Hant"), "zho_Hant");
        assert_eq!(map_lang("eng_Latn"), "eng_Latn");
        assert_eq!(map_lang("xx"), "xx");
        assert_eq!(map_lang(""), "");
    }

    #[test]
    fn test_autodetect_resolves_to_english() {
        let table = LanguageTable::builtin();
        let (source, target) = table.resolve_pair(AUTODETECT, "ja");
        assert_eq!(source, "eng_Latn");
        assert_eq!(target, "jpn_Jpan");

        let (source, _) = table.resolve_pair("AutoDetect", "zh");
        assert_eq!(source, DEFAULT_SOURCE_TAG);
    }

    #[test]
    fn test_autodetect_only_applies_to_source() {
        let table = LanguageTable::builtin();
        let (_, target) = table.resolve_pair("en", AUTODETECT);
        assert_eq!(target, AUTODETECT);
    }

    #[test]
    fn test_extend_overrides_and_lowercases() {
        let mut table = LanguageTable::builtin();
        table.extend([
            ("AR".to_string(), "arb_Arab".to_string()),
            ("zh".to_string(), "zho_Hant".to_string()),
        ]);
        assert_eq!(table.map_lang("ar"), "arb_Arab");
        assert_eq!(table.map_lang("zh"), "zho_Hant");
        assert_eq!(table.map_lang("en"), "eng_Latn");
    }

    #[test]
    fn test_from_missing_file_is_error() {
        let result = LanguageTable::from_path(Path::new("/nonexistent/languages.json"));
        assert!(matches!(result, Err(ServiceError::Io(_))));
    }
}
