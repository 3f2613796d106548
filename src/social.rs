//! Polls the photo and video feeds and announces new posts to the social
//! channel. Each poller tracks only the last-seen post id; the first
//! successful fetch initializes it so old posts are never announced.

use poise::serenity_prelude as serenity;
use reqwest::header;
use serde::Deserialize;
use poise::serenity_prelude::Mentionable;

use crate::config::BotConfig;

const USER_AGENT: &str = "novabot";
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30 * 60);

#[derive(Debug, Deserialize)]
struct InstagramFeed {
    #[serde(default)]
    data: Vec<InstagramPost>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramPost {
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YoutubeSearch {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeItem {
    pub id: YoutubeVideoId,
    pub snippet: YoutubeSnippet,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeVideoId {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeSnippet {
    pub title: String,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Records `current` as the newest seen post. Returns whether it should be
/// announced: only when a previously seen post exists and differs, so the
/// first poll after startup never replays history.
pub fn update_latest(last: &mut Option<String>, current: String) -> bool {
    let announce = matches!(last.as_deref(), Some(seen) if seen != current);
    *last = Some(current);
    announce
}

async fn fetch_latest_instagram(
    http: &reqwest::Client,
    token: &str,
) -> Result<Option<InstagramPost>, reqwest::Error> {
    let feed = http
        .get("https://graph.instagram.com/me/media")
        .header(header::USER_AGENT, USER_AGENT)
        .query(&[
            ("fields", "id,caption,media_url,permalink,timestamp"),
            ("access_token", token),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<InstagramFeed>()
        .await?;
    Ok(feed.data.into_iter().next())
}

async fn fetch_latest_youtube(
    http: &reqwest::Client,
    api_key: &str,
    channel_id: &str,
) -> Result<Option<YoutubeItem>, reqwest::Error> {
    let search = http
        .get("https://www.googleapis.com/youtube/v3/search")
        .header(header::USER_AGENT, USER_AGENT)
        .query(&[
            ("part", "snippet"),
            ("channelId", channel_id),
            ("maxResults", "1"),
            ("order", "date"),
            ("key", api_key),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<YoutubeSearch>()
        .await?;
    Ok(search.items.into_iter().next())
}

fn link_button(url: String) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new_link(url).label("View post"),
    ])]
}

fn embed_timestamp(raw: Option<&str>) -> serenity::Timestamp {
    raw.and_then(|ts| serenity::Timestamp::parse(ts).ok())
        .unwrap_or_else(serenity::Timestamp::now)
}

async fn announce_instagram(
    ctx: &serenity::Context,
    config: &BotConfig,
    post: &InstagramPost,
) -> Result<(), serenity::Error> {
    let mut embed = serenity::CreateEmbed::new()
        .title("New photo post")
        .description(
            post.caption
                .clone()
                .unwrap_or_else(|| "Check out our latest post!".to_owned()),
        )
        .colour(serenity::Colour::PURPLE)
        .timestamp(embed_timestamp(post.timestamp.as_deref()));
    if let Some(media) = &post.media_url {
        embed = embed.image(media.clone());
    }

    config
        .social_channel
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!(
                    "{} a new photo just went up!",
                    config.social_role.mention()
                ))
                .embed(embed)
                .components(link_button(post.permalink.clone()))
                .allowed_mentions(
                    serenity::CreateAllowedMentions::new().roles(vec![config.social_role]),
                ),
        )
        .await?;
    Ok(())
}

async fn announce_youtube(
    ctx: &serenity::Context,
    config: &BotConfig,
    video: &YoutubeItem,
) -> Result<(), serenity::Error> {
    let url = format!("https://www.youtube.com/watch?v={}", video.id.video_id);
    let mut embed = serenity::CreateEmbed::new()
        .title("New video")
        .description(video.snippet.title.clone())
        .colour(serenity::Colour::RED)
        .timestamp(embed_timestamp(video.snippet.published_at.as_deref()));
    if let Some(thumb) = &video.snippet.thumbnails.high {
        embed = embed.image(thumb.url.clone());
    }

    config
        .social_channel
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!(
                    "{} a new video just dropped!",
                    config.social_role.mention()
                ))
                .embed(embed)
                .components(link_button(url))
                .allowed_mentions(
                    serenity::CreateAllowedMentions::new().roles(vec![config.social_role]),
                ),
        )
        .await?;
    Ok(())
}

/// Poller loop, spawned once at startup. A missing credential disables just
/// that feed; fetch or parse failures are logged and retried next tick.
pub async fn poll_feeds(ctx: serenity::Context, http: reqwest::Client, config: BotConfig) {
    if config.instagram_token.is_none() {
        log::info!("photo feed token not set, skipping photo updates");
    }
    if config.youtube_api_key.is_none() || config.youtube_channel_id.is_none() {
        log::info!("video feed credentials not set, skipping video updates");
    }

    let mut last_instagram: Option<String> = None;
    let mut last_youtube: Option<String> = None;

    loop {
        if let Some(token) = &config.instagram_token {
            match fetch_latest_instagram(&http, token).await {
                Ok(Some(post)) => {
                    if update_latest(&mut last_instagram, post.id.clone()) {
                        log::info!("announcing photo post {}", post.id);
                        if let Err(e) = announce_instagram(&ctx, &config, &post).await {
                            log::error!("could not announce photo post: {}", e);
                        }
                    }
                }
                Ok(None) => log::warn!("photo feed returned no posts"),
                Err(e) => log::warn!("photo feed fetch failed: {}", e),
            }
        }

        if let (Some(key), Some(channel)) = (&config.youtube_api_key, &config.youtube_channel_id)
        {
            match fetch_latest_youtube(&http, key, channel).await {
                Ok(Some(video)) => {
                    if update_latest(&mut last_youtube, video.id.video_id.clone()) {
                        log::info!("announcing video {}", video.id.video_id);
                        if let Err(e) = announce_youtube(&ctx, &config, &video).await {
                            log::error!("could not announce video: {}", e);
                        }
                    }
                }
                Ok(None) => log::warn!("video feed returned no items"),
                Err(e) => log::warn!("video feed fetch failed: {}", e),
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fetch_initializes_without_announcing() {
        let mut last = None;
        assert!(!update_latest(&mut last, "a".to_owned()));
        assert_eq!(last.as_deref(), Some("a"));
    }

    #[test]
    fn repeated_post_is_not_announced_again() {
        let mut last = Some("a".to_owned());
        assert!(!update_latest(&mut last, "a".to_owned()));
    }

    #[test]
    fn fresh_post_is_announced_once() {
        let mut last = Some("a".to_owned());
        assert!(update_latest(&mut last, "b".to_owned()));
        assert!(!update_latest(&mut last, "b".to_owned()));
    }

    #[test]
    fn instagram_payload_parses() {
        let payload = r#"{
            "data": [{
                "id": "179",
                "caption": "exam season!",
                "media_url": "https://cdn.example/p.jpg",
                "permalink": "https://instagram.com/p/179",
                "timestamp": "2024-05-01T12:00:00+0000"
            }]
        }"#;
        let feed: InstagramFeed = serde_json::from_str(payload).unwrap();
        let post = &feed.data[0];
        assert_eq!(post.id, "179");
        assert_eq!(post.caption.as_deref(), Some("exam season!"));
    }

    #[test]
    fn youtube_payload_parses_nested_video_id() {
        let payload = r#"{
            "items": [{
                "id": {"kind": "youtube#video", "videoId": "dQw4"},
                "snippet": {
                    "title": "Revision tips",
                    "publishedAt": "2024-05-01T12:00:00Z",
                    "thumbnails": {"high": {"url": "https://i.ytimg.com/t.jpg"}}
                }
            }]
        }"#;
        let search: YoutubeSearch = serde_json::from_str(payload).unwrap();
        let video = &search.items[0];
        assert_eq!(video.id.video_id, "dQw4");
        assert_eq!(video.snippet.title, "Revision tips");
        assert!(video.snippet.thumbnails.high.is_some());
    }

    #[test]
    fn empty_feed_parses_to_no_posts() {
        let feed: InstagramFeed = serde_json::from_str("{}").unwrap();
        assert!(feed.data.is_empty());
    }
}
