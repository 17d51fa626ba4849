use crate::config::GameConfig;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DEFAULT_LANGUAGE: &str = "en";
/// stored value meaning "follow the browser"
const AUTO: &str = "auto";

/// Player facing text for one language
#[derive(Debug, PartialEq, Eq)]
pub struct Strings {
    pub title: &'static str,
    pub try_again: &'static str,
    score_word: &'static str,
    level_word: &'static str,
}

impl Strings {
    /// Label above the try again button, lower case like the rest of the panel
    pub fn score_label(&self, score: u32) -> String {
        format!("{} = {}", self.score_word, score)
    }

    /// The match level breakdown under the button, the last line carries the
    /// run's score
    pub fn level_lines(&self, score: u32) -> [String; 4] {
        let level = self.level_word;
        [
            format!("match {} 1: 1 + 1 = {}", level, 1 + 1),
            format!("match {} 2: 10 + 10 = {}", level, 10 + 10),
            format!("match {} 3: 20 x 20 = {}", level, 20 * 20),
            format!("match {} 4: 90 + 90 = {} ({})", level, 90 + 90, score),
        ]
    }
}

const TITLE: &str = "Flying SMG3";

static STRINGS: Lazy<HashMap<&'static str, Strings>> = Lazy::new(|| {
    let table = [
        ("en", "Try Again", "score", "level"),
        ("pt", "Tentar Novamente", "pontuação", "nível"),
        ("es", "Intentar de Nuevo", "puntuación", "nivel"),
        ("fr", "Réessayer", "score", "niveau"),
        ("de", "Nochmals versuchen", "punktzahl", "level"),
    ];
    table
        .into_iter()
        .map(|(code, try_again, score_word, level_word)| {
            (
                code,
                Strings {
                    title: TITLE,
                    try_again,
                    score_word,
                    level_word,
                },
            )
        })
        .collect()
});

/// "pt-BR" finds "pt", anything unknown gets English
pub fn lookup(code: &str) -> &'static Strings {
    let primary = code.split('-').next().unwrap_or(code);
    STRINGS
        .get(code)
        .or_else(|| STRINGS.get(primary))
        .unwrap_or_else(|| &STRINGS[DEFAULT_LANGUAGE])
}

/// First hit wins : forced config language, stored choice (unless "auto"),
/// browser language, English. Unlocalized configs always get English.
pub fn resolve(
    config: &GameConfig,
    stored: Option<&str>,
    navigator: Option<&str>,
) -> &'static Strings {
    if !config.localized {
        return lookup(DEFAULT_LANGUAGE);
    }
    let code = config
        .language
        .as_deref()
        .or(stored.filter(|code| *code != AUTO && !code.is_empty()))
        .or(navigator)
        .unwrap_or(DEFAULT_LANGUAGE);
    log::debug!("i18n: using language {}", code);
    lookup(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_its_own_strings() {
        let english = lookup("en");
        for code in ["pt", "es", "fr", "de"] {
            assert_ne!(lookup(code), english, "{} missing", code);
            assert_eq!(lookup(code).title, "Flying SMG3");
        }
        assert_eq!(lookup("it"), english);
    }

    #[test]
    fn region_tags_fall_back_to_primary_language() {
        assert_eq!(lookup("pt-BR").try_again, "Tentar Novamente");
        assert_eq!(lookup("de").try_again, "Nochmals versuchen");
        assert_eq!(lookup("xx-YY"), lookup("en"));
    }

    #[test]
    fn resolution_order() {
        let config = GameConfig::default();
        assert_eq!(resolve(&config, Some("fr"), Some("es")), lookup("fr"));
        assert_eq!(resolve(&config, Some("auto"), Some("es-MX")), lookup("es"));
        assert_eq!(resolve(&config, None, None), lookup("en"));

        let forced = GameConfig::default().with_language("de");
        assert_eq!(resolve(&forced, Some("fr"), Some("es")), lookup("de"));
    }

    #[test]
    fn unlocalized_is_always_english() {
        let config = GameConfig::default()
            .with_localization(false)
            .with_language("pt");
        assert_eq!(resolve(&config, Some("fr"), Some("es")), lookup("en"));
    }

    #[test]
    fn panel_text_carries_the_score() {
        let pt = lookup("pt");
        assert_eq!(pt.score_label(12), "pontuação = 12");
        let lines = pt.level_lines(12);
        assert_eq!(lines[0], "match nível 1: 1 + 1 = 2");
        assert_eq!(lines[3], "match nível 4: 90 + 90 = 180 (12)");
    }
}
