//! Format slice: locale and presentation hints

use super::action::Action;
use super::language::same_locale_group;
use super::state::Slice;
use serde::Serialize;

pub const DEFAULT_LOCALE: &str = "en-us";

/// Handle to one of the bundled localized string tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringTable {
    #[default]
    English,
    Japanese,
    TraditionalChinese,
    SimplifiedChinese,
    Korean,
    Russian,
    Thai,
}

impl StringTable {
    /// Table for `locale`, falling back to English
    pub fn for_locale(locale: &str) -> Self {
        [
            ("ja-jp", Self::Japanese),
            ("zh-hant", Self::TraditionalChinese),
            ("zh", Self::SimplifiedChinese),
            ("ko-kr", Self::Korean),
            ("ru-ru", Self::Russian),
            ("th-th", Self::Thai),
        ]
        .into_iter()
        .find(|(canonical, _)| same_locale_group(canonical, locale))
        .map_or(Self::English, |(_, table)| table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatState {
    pub locale: String,
    /// Changes only together with `locale`
    pub strings: StringTable,
    /// `None` shows the default title
    pub chat_title: Option<String>,
    pub show_upload_button: bool,
    pub carousel_margin: Option<u32>,
}

impl Default for FormatState {
    fn default() -> Self {
        Self::with_locale(DEFAULT_LOCALE)
    }
}

impl FormatState {
    pub fn with_locale(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        Self {
            strings: StringTable::for_locale(&locale),
            locale,
            chat_title: None,
            show_upload_button: true,
            carousel_margin: None,
        }
    }
}

impl Slice for FormatState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::SetLocale { locale } => (self.locale != *locale).then(|| Self {
                locale: locale.clone(),
                strings: StringTable::for_locale(locale),
                ..self.clone()
            }),
            Action::SetChatTitle { title } => (self.chat_title != *title).then(|| Self {
                chat_title: title.clone(),
                ..self.clone()
            }),
            Action::SetMeasurements { carousel_margin } => {
                (self.carousel_margin != *carousel_margin).then(|| Self {
                    carousel_margin: *carousel_margin,
                    ..self.clone()
                })
            }
            Action::ToggleUploadButton { show } => {
                (self.show_upload_button != *show).then(|| Self {
                    show_upload_button: *show,
                    ..self.clone()
                })
            }
            _ => None,
        }
    }
}
