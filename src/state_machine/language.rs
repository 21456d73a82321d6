//! Language-switch slice and the table of supported languages

use super::action::Action;
use super::state::Slice;
use crate::runtime::SpeechRecognizer;
use std::fmt;
use std::sync::{Arc, Weak};

/// A language the peer can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageEntry {
    /// Keyword sent to the peer to request the switch
    pub keyword: &'static str,
    /// Locale applied once the switch is confirmed
    pub locale: &'static str,
    /// Greeting the peer replies with after switching
    pub confirmation: &'static str,
    pub recognizer_language: &'static str,
}

pub const LANGUAGES: [LanguageEntry; 7] = [
    LanguageEntry {
        keyword: "japanese",
        locale: "ja-JP",
        confirmation: "こんにちは、日本語を設定しました。",
        recognizer_language: "ja-JP",
    },
    LanguageEntry {
        keyword: "tchinese",
        locale: "zh-hant",
        confirmation: "您好，語言已經設定為繁體中文。",
        recognizer_language: "cmn-Hant-TW",
    },
    LanguageEntry {
        keyword: "chinese",
        locale: "zh",
        confirmation: "您好，语言已经设定为简体中文。",
        recognizer_language: "zh",
    },
    LanguageEntry {
        keyword: "english",
        locale: "en-US",
        confirmation: "Hello,Language has been set to English.",
        recognizer_language: "en-US",
    },
    LanguageEntry {
        keyword: "korean",
        locale: "ko-kr",
        confirmation: "안녕하세요，언어가 한국어로 설정되었습니다.",
        recognizer_language: "ko-KR",
    },
    LanguageEntry {
        keyword: "russian",
        locale: "ru-ru",
        confirmation: "Привет, Язык установлен на русский язык.",
        recognizer_language: "ru-RU",
    },
    LanguageEntry {
        keyword: "thai",
        locale: "th-th",
        confirmation: "สวัสดีภาษาได้รับการตั้งค่าเป็นภาษาไทยแล้ว.",
        recognizer_language: "th-TH",
    },
];

/// Locale spellings that name the same language
const LOCALE_GROUPS: [&[&str]; 7] = [
    &["ja", "ja-jp", "japanese"],
    &["zh-hant", "zh-tw", "zh-hk", "cmn-hant-tw", "tchinese"],
    &["zh", "zh-cn", "zh-hans", "zh-sg", "chinese"],
    &["en", "en-us", "en-gb", "english"],
    &["ko", "ko-kr", "korean"],
    &["ru", "ru-ru", "russian"],
    &["th", "th-th", "thai"],
];

/// `value.type` of a structured language-change event
pub const CHANGE_LANGUAGE_EVENT: &str = "changeLanguage";

/// Whether two locale spellings belong to the same group (case-insensitive)
pub fn same_locale_group(a: &str, b: &str) -> bool {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    LOCALE_GROUPS
        .iter()
        .any(|group| group.contains(&a.as_str()) && group.contains(&b.as_str()))
}

/// Entry whose confirmation greeting is exactly `text`
pub fn by_confirmation(text: &str) -> Option<&'static LanguageEntry> {
    LANGUAGES.iter().find(|l| l.confirmation == text)
}

/// Entry whose locale shares a group with `code`
pub fn by_locale(code: &str) -> Option<&'static LanguageEntry> {
    LANGUAGES.iter().find(|l| same_locale_group(l.locale, code))
}

/// Opaque speech-recognizer handle owned by the voice collaborator
#[derive(Clone)]
pub struct RecognizerHandle(Weak<dyn SpeechRecognizer>);

impl RecognizerHandle {
    pub fn new(recognizer: &Arc<dyn SpeechRecognizer>) -> Self {
        Self(Arc::downgrade(recognizer))
    }

    pub fn upgrade(&self) -> Option<Arc<dyn SpeechRecognizer>> {
        self.0.upgrade()
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RecognizerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognizerHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// Progress of a language-change negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchStatus {
    #[default]
    Idle,
    /// Request is being posted
    Posting,
    /// Posted; waiting for the peer's confirmation
    AwaitingConfirmation,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageState {
    pub status: SwitchStatus,
    pub requested: Option<String>,
    pub recognizer: Option<RecognizerHandle>,
    /// Whether the language picker is offered at all
    pub display: bool,
    pub languages: Vec<String>,
}

impl LanguageState {
    pub fn is_changing_language(&self) -> bool {
        matches!(
            self.status,
            SwitchStatus::Posting | SwitchStatus::AwaitingConfirmation
        )
    }

    pub fn recognizer(&self) -> Option<Arc<dyn SpeechRecognizer>> {
        self.recognizer.as_ref().and_then(RecognizerHandle::upgrade)
    }

    fn with_status(&self, status: SwitchStatus) -> Option<Self> {
        (self.status != status).then(|| Self {
            status,
            ..self.clone()
        })
    }
}

impl PartialEq for LanguageState {
    fn eq(&self, other: &Self) -> bool {
        let same_recognizer = match (&self.recognizer, &other.recognizer) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        };
        same_recognizer
            && self.status == other.status
            && self.requested == other.requested
            && self.display == other.display
            && self.languages == other.languages
    }
}

impl Slice for LanguageState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::ChangeLanguage { language, .. } => Some(Self {
                status: SwitchStatus::Posting,
                requested: Some(language.clone()),
                ..self.clone()
            }),
            Action::ChangedLanguage => self.with_status(SwitchStatus::AwaitingConfirmation),
            Action::ChangeLanguageFail => self.with_status(SwitchStatus::Failed),
            Action::ResetChangeLanguage | Action::Receive { .. } => {
                self.with_status(SwitchStatus::Idle)
            }
            Action::SaveRecognizer { recognizer } => Some(Self {
                recognizer: Some(recognizer.clone()),
                ..self.clone()
            }),
            Action::SetLanguageSetting { display, languages } => Some(Self {
                display: *display,
                languages: languages.clone(),
                ..self.clone()
            }),
            _ => None,
        }
    }
}
