use serde::{Deserialize, Serialize};

/// Display language for generated content. Catalog text stays English; the
/// chosen language is threaded into every generator prompt instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    TraditionalChinese,
    Japanese,
    Korean,
    Spanish,
    French,
    German,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::English,
        Language::TraditionalChinese,
        Language::Japanese,
        Language::Korean,
        Language::Spanish,
        Language::French,
        Language::German,
    ];

    /// Short code accepted on the command line.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::TraditionalChinese => "zh-tw",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
        }
    }

    /// Name the generator is told to reply in.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::TraditionalChinese => "Traditional Chinese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
        }
    }

    pub fn parse(input: &str) -> Option<Language> {
        let needle = input.trim();
        Language::ALL.iter().copied().find(|lang| {
            lang.code().eq_ignore_ascii_case(needle)
                || lang.prompt_name().eq_ignore_ascii_case(needle)
        })
    }
}
