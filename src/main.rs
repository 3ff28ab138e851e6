mod auth;
mod config;
mod detect;
mod error;
mod mapper;
mod models;
mod sources;

use std::sync::Arc;

use anyhow::{bail, Context};
use teloxide::payloads::AnswerInlineQuerySetters;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InlineQuery, InlineQueryResult,
    InlineQueryResultArticle, InputMessageContent, InputMessageContentText, ParseMode,
};
use url::Url;

use crate::auth::{AnonymousAuth, ClientCredentialsAuth, SpotifyAuthorization};
use crate::mapper::LinkMapper;
use crate::models::InlineCard;
use crate::sources::spotify::SpotifyClient;
use crate::sources::yandex::YandexClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = config::load_config().context("failed to load configuration")?;

    let token = if config.telegram.token.is_empty() {
        match std::env::var("TELOXIDE_TOKEN") {
            Ok(token) => token,
            Err(_) => bail!("no telegram token in config.toml or TELOXIDE_TOKEN"),
        }
    } else {
        config.telegram.token.clone()
    };

    let http = reqwest::Client::new();

    let authorization: Box<dyn SpotifyAuthorization> = match config.spotify.credentials() {
        Some((id, secret)) => {
            log::info!("using spotify client-credentials authorization");
            Box::new(ClientCredentialsAuth::new(
                http.clone(),
                id.to_string(),
                secret.to_string(),
            ))
        }
        None => {
            log::info!("using anonymous spotify authorization");
            Box::new(AnonymousAuth::new(http.clone()))
        }
    };

    let mapper = Arc::new(LinkMapper::new(
        Box::new(SpotifyClient::new(http.clone(), authorization)),
        Box::new(YandexClient::new(http)),
    ));
    let allowed_users = Arc::new(config.telegram.allowed_users);

    let bot = Bot::new(token);
    log::info!("bot started, waiting for inline queries");

    let handler = Update::filter_inline_query().endpoint(handle_inline_query);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![mapper, allowed_users])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("stopping");
    Ok(())
}

async fn handle_inline_query(
    bot: Bot,
    query: InlineQuery,
    mapper: Arc<LinkMapper>,
    allowed_users: Arc<Vec<String>>,
) -> ResponseResult<()> {
    let username = query.from.username.as_deref().unwrap_or_default();
    if !allowed_users.is_empty() && !allowed_users.iter().any(|u| u == username) {
        log::warn!("rejected inline query from @{username}");
        bot.answer_inline_query(query.id, vec![refusal_result()])
            .cache_time(0)
            .await?;
        return Ok(());
    }

    if query.query.trim().is_empty() {
        return Ok(());
    }

    let cards = mapper.process(&query.query).await;
    let results: Vec<InlineQueryResult> = cards.into_iter().map(to_query_result).collect();

    bot.answer_inline_query(query.id, results)
        .cache_time(0)
        .await?;

    Ok(())
}

fn to_query_result(card: InlineCard) -> InlineQueryResult {
    let content = InputMessageContent::Text(
        InputMessageContentText::new(card.body_html).parse_mode(ParseMode::Html),
    );

    let mut article = InlineQueryResultArticle::new(card.id, card.title, content);
    if let Some(description) = card.description {
        article = article.description(description);
    }
    if let Some(button) = card.button {
        match Url::parse(&button.url) {
            Ok(url) => {
                article = article.reply_markup(InlineKeyboardMarkup::new([[
                    InlineKeyboardButton::url(button.label, url),
                ]]));
            }
            Err(err) => log::warn!("skipping button with bad url {:?}: {err}", button.url),
        }
    }

    InlineQueryResult::Article(article)
}

fn refusal_result() -> InlineQueryResult {
    InlineQueryResult::Article(InlineQueryResultArticle::new(
        "0",
        "Этот бот не для тебя, сори",
        InputMessageContent::Text(InputMessageContentText::new(
            "You do not have permission to use this bot.",
        )),
    ))
}
