/// Streaming platform a track link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePlatform {
    Spotify,
    YandexMusic,
}

impl SourcePlatform {
    /// Localized label shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            SourcePlatform::Spotify => "Spotify",
            SourcePlatform::YandexMusic => "Яндекс.Музыка",
        }
    }

    /// The platform a link gets mapped to.
    pub fn other(self) -> SourcePlatform {
        match self {
            SourcePlatform::Spotify => SourcePlatform::YandexMusic,
            SourcePlatform::YandexMusic => SourcePlatform::Spotify,
        }
    }
}

/// Detected origin of an input link.
/// For Yandex Music the id is `"trackId:albumId"`, since their API needs both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub platform: SourcePlatform,
    pub id: String,
}

/// Platform-independent track metadata, just enough to search the other
/// platform with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
}

impl TrackInfo {
    pub fn summary(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// One inline result, kept free of transport types so the mapper can be
/// tested without a Telegram connection. main.rs converts this into a
/// teloxide article.
#[derive(Debug, Clone)]
pub struct InlineCard {
    pub id: String,
    pub title: String,
    pub body_html: String,
    pub description: Option<String>,
    pub button: Option<LinkButton>,
}

#[derive(Debug, Clone)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}
