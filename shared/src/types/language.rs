//! Language and internationalization types

use serde::{Deserialize, Serialize};

/// Separator between the English and Arabic halves of a bilingual message
pub const BILINGUAL_SEPARATOR: &str = " | ";

/// Language preference for internationalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ar")]
    Arabic,
}

impl Language {
    /// Extract language from Accept-Language header
    pub fn from_accept_language(header: &str) -> Self {
        let preferred = header
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if preferred.starts_with("ar") {
            Language::Arabic
        } else {
            Language::English
        }
    }

    /// Get language code (ISO 639-1)
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Arabic => "ar",
        }
    }

    /// Get native language name
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "العربية",
        }
    }

    /// Check if language uses right-to-left script
    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Arabic)
    }

    /// Pick this language's half of an `"English | Arabic"` message.
    ///
    /// Messages without a separator are returned unchanged.
    pub fn select<'a>(&self, bilingual: &'a str) -> &'a str {
        match bilingual.split_once(BILINGUAL_SEPARATOR) {
            Some((english, arabic)) => match self {
                Language::English => english,
                Language::Arabic => arabic,
            },
            None => bilingual,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Language::English),
            "ar" | "ara" | "arabic" | "العربية" => Ok(Language::Arabic),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_header() {
        assert_eq!(Language::from_accept_language("en-US,en;q=0.9"), Language::English);
        assert_eq!(Language::from_accept_language("ar-SA,ar;q=0.9"), Language::Arabic);
        assert_eq!(Language::from_accept_language("fr-FR"), Language::English);
        assert_eq!(Language::from_accept_language("AR"), Language::Arabic);
        assert_eq!(Language::from_accept_language(""), Language::English);
    }

    #[test]
    fn test_language_properties() {
        assert_eq!(Language::English.code(), "en");
        assert!(!Language::English.is_rtl());

        assert_eq!(Language::Arabic.code(), "ar");
        assert_eq!(Language::Arabic.native_name(), "العربية");
        assert!(Language::Arabic.is_rtl());
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
        assert_eq!("Arabic".parse::<Language>().unwrap(), Language::Arabic);
        assert!("zh".parse::<Language>().is_err());
    }

    #[test]
    fn test_select_bilingual_message() {
        let message = "Token expired | انتهت صلاحية الرمز";
        assert_eq!(Language::English.select(message), "Token expired");
        assert_eq!(Language::Arabic.select(message), "انتهت صلاحية الرمز");
        assert_eq!(Language::Arabic.select("English only"), "English only");
    }
}
