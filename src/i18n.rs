//! Interface language selection and string lookup.
//!
//! The translator is constructed once at startup and passed to whatever
//! prints interface text. Resolution order: an explicit tag (CLI flag or
//! config), then the locale environment, then English.

/// Languages with bundled interface strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    /// Resolve a language per the policy above.
    pub fn resolve(explicit: Option<&str>) -> Self {
        if let Some(language) = explicit.and_then(Self::from_tag) {
            return language;
        }
        Self::from_locale_env().unwrap_or(Language::English)
    }

    fn from_locale_env() -> Option<Self> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
            .and_then(|value| Self::from_tag(&value))
    }

    /// Map a language tag or POSIX locale (e.g. `zh_CN.UTF-8`) onto the
    /// supported set.
    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['_', '-', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::English),
            "zh" => Some(Language::Chinese),
            _ => None,
        }
    }
}

/// Keys for the user-facing interface strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    InteractiveIntro,
    Goodbye,
    OnceNeedsQuery,
}

pub struct Translator {
    language: Language,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn text(&self, key: Text) -> &'static str {
        match (self.language, key) {
            (Language::English, Text::InteractiveIntro) => {
                "👋 Entering interactive mode. Type 'exit' or 'quit' or press Ctrl+C to leave."
            }
            (Language::English, Text::Goodbye) => "Goodbye!",
            (Language::English, Text::OnceNeedsQuery) => {
                "A query is required when --once is given."
            }
            (Language::Chinese, Text::InteractiveIntro) => {
                "👋 进入交互模式。输入'exit'或'quit'或按Ctrl+C退出。"
            }
            (Language::Chinese, Text::Goodbye) => "再见！",
            (Language::Chinese, Text::OnceNeedsQuery) => "使用--once参数时必须提供查询内容。",
        }
    }
}
