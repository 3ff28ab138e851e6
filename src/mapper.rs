use teloxide::utils::html;
use uuid::Uuid;

use crate::detect;
use crate::error::{Error, Result};
use crate::models::{InlineCard, LinkButton, SourcePlatform, TrackInfo};
use crate::sources::MediaClient;

/// Orchestrates one link mapping: classify the input, look the track up
/// on the source platform, search the other platform, format the result.
///
/// `process` never fails; every error becomes a user-facing notice card.
pub struct LinkMapper {
    spotify: Box<dyn MediaClient>,
    yandex: Box<dyn MediaClient>,
}

impl LinkMapper {
    pub fn new(spotify: Box<dyn MediaClient>, yandex: Box<dyn MediaClient>) -> Self {
        Self { spotify, yandex }
    }

    pub async fn process(&self, raw_query: &str) -> Vec<InlineCard> {
        match self.resolve(raw_query.trim()).await {
            Ok(card) => vec![card],
            Err(Error::RateLimited) => {
                log::warn!("rate limited while processing query: {raw_query:?}");
                vec![rate_limit_card()]
            }
            Err(err) => {
                log::error!("failed to map link for query {raw_query:?}: {err}");
                vec![failure_card(raw_query)]
            }
        }
    }

    async fn resolve(&self, query: &str) -> Result<InlineCard> {
        let source = detect::classify(query)?;

        // The detected platform resolves metadata, the other one is searched.
        let (lookup, search) = match source.platform {
            SourcePlatform::Spotify => (&self.spotify, &self.yandex),
            SourcePlatform::YandexMusic => (&self.yandex, &self.spotify),
        };

        let track = lookup.get_track_info(&source.id).await?;
        let url = search.get_uri(&track).await?;

        Ok(success_card(source.platform, &track, url))
    }
}

fn success_card(platform: SourcePlatform, track: &TrackInfo, url: String) -> InlineCard {
    let source = platform.display_name();
    let target = platform.other().display_name();
    let artist = html::escape(&track.artist);
    let title = html::escape(&track.title);

    InlineCard {
        id: Uuid::new_v4().to_string(),
        title: track.summary(),
        body_html: format!(
            "🎵 <b>{artist}</b> - {title}\n\n📍 Из: {source}\n➡️ В: {target}"
        ),
        description: Some(format!("{source} → {target}")),
        button: Some(LinkButton {
            label: format!("Открыть в {target}"),
            url,
        }),
    }
}

fn rate_limit_card() -> InlineCard {
    InlineCard {
        id: Uuid::new_v4().to_string(),
        title: "Превышен лимит запросов".to_string(),
        body_html: "Сервис временно недоступен из-за превышения лимита запросов. \
                    Пожалуйста, попробуйте снова через некоторое время."
            .to_string(),
        description: None,
        button: None,
    }
}

fn failure_card(raw_query: &str) -> InlineCard {
    InlineCard {
        id: Uuid::new_v4().to_string(),
        title: "Не удалось обработать запрос".to_string(),
        body_html: format!(
            "Не удалось сформировать ссылку для ввода '{}'. \
             Неверный формат ссылки или в конечном сервисе трек отсутствует.",
            html::escape(raw_query)
        ),
        description: None,
        button: None,
    }
}
