//! Language detection and display names for brochure languages

use tracing::{info, warn};
use whatlang::Lang;

/// Texts shorter than this are not worth detecting
const MIN_DETECTION_CHARS: usize = 50;

/// Only the start of the text is sampled
const DETECTION_SAMPLE_CHARS: usize = 1000;

/// ISO 639-1 codes a brochure can be generated in
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "es", "en", "fr", "de", "it", "pt", "nl", "ru", "zh", "ja", "ko", "ar",
];

fn iso_639_1(lang: Lang) -> Option<&'static str> {
    Some(match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Ara => "ar",
        _ => return None,
    })
}

/// Best guess at the ISO 639-1 language of `text`, defaulting to `"en"`.
pub fn detect_language(text: &str) -> String {
    if text.chars().count() < MIN_DETECTION_CHARS {
        warn!("Text too short to detect its language, defaulting to 'en'");
        return "en".to_string();
    }

    let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();
    match whatlang::detect(&sample) {
        Some(info) => match iso_639_1(info.lang()) {
            Some(code) => {
                info!("Detected language: {}", code);
                code.to_string()
            }
            None => {
                warn!(
                    "Detected unsupported language '{}', defaulting to 'en'",
                    info.lang().code()
                );
                "en".to_string()
            }
        },
        None => {
            warn!("Could not detect language, defaulting to 'en'");
            "en".to_string()
        }
    }
}

pub fn is_language_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// English name for a language code; unknown codes are returned as given.
pub fn language_name(code: &str) -> String {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "ru" => "Russian",
        "zh" | "zh-cn" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "ar" => "Arabic",
        other => other,
    }
    .to_string()
}
