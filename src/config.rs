//! Environment-backed configuration, loaded once at startup.
//!
//! The auth token is read separately in `app()` and is fatal when missing;
//! everything here describes the guild the bot serves. Feed credentials are
//! optional; a missing one disables just that poller.

use poise::serenity_prelude as serenity;

use crate::{env_var, Error};

#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Roles whose holders may use moderation and modmail commands.
    pub staff_role_ids: Vec<serenity::RoleId>,
    pub helper_role_id: serenity::RoleId,
    pub mod_log_channel: serenity::ChannelId,
    pub status_channel: serenity::ChannelId,
    pub suggestion_channel: serenity::ChannelId,
    pub guide_channel: serenity::ChannelId,
    /// Parent channel whose private threads back the modmail tickets.
    pub modmail_channel: serenity::ChannelId,
    pub bump_channel: serenity::ChannelId,
    pub bump_role: serenity::RoleId,
    pub social_channel: serenity::ChannelId,
    pub social_role: serenity::RoleId,
    /// Channel where "i want <resource> of <board>" requests are collected.
    pub link_channel: serenity::ChannelId,
    pub welcome_channel: serenity::ChannelId,
    pub default_role: serenity::RoleId,
    pub instagram_token: Option<String>,
    pub youtube_api_key: Option<String>,
    pub youtube_channel_id: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, Error> {
        let staff_role_ids = std::env::var("STAFF_ROLE_IDS")
            .map_err(|_| "Missing STAFF_ROLE_IDS")?
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map(serenity::RoleId::new)
                    .map_err(|e| format!("Invalid STAFF_ROLE_IDS entry {:?}: {}", part, e).into())
            })
            .collect::<Result<Vec<_>, Error>>()?;
        if staff_role_ids.is_empty() {
            return Err("STAFF_ROLE_IDS must name at least one role".into());
        }

        Ok(Self {
            staff_role_ids,
            helper_role_id: serenity::RoleId::new(env_var("HELPER_ROLE_ID")?),
            mod_log_channel: serenity::ChannelId::new(env_var("MOD_LOG_CHANNEL_ID")?),
            status_channel: serenity::ChannelId::new(env_var("STATUS_CHANNEL_ID")?),
            suggestion_channel: serenity::ChannelId::new(env_var("SUGGESTION_CHANNEL_ID")?),
            guide_channel: serenity::ChannelId::new(env_var("GUIDE_CHANNEL_ID")?),
            modmail_channel: serenity::ChannelId::new(env_var("MODMAIL_CHANNEL_ID")?),
            bump_channel: serenity::ChannelId::new(env_var("BUMP_CHANNEL_ID")?),
            bump_role: serenity::RoleId::new(env_var("BUMP_ROLE_ID")?),
            social_channel: serenity::ChannelId::new(env_var("SOCIAL_MEDIA_CHANNEL_ID")?),
            social_role: serenity::RoleId::new(env_var("SOCIAL_MEDIA_ROLE_ID")?),
            link_channel: serenity::ChannelId::new(env_var("LINK_CHANNEL_ID")?),
            welcome_channel: serenity::ChannelId::new(env_var("WELCOME_CHANNEL_ID")?),
            default_role: serenity::RoleId::new(env_var("DEFAULT_ROLE_ID")?),
            instagram_token: std::env::var("INSTAGRAM_TOKEN").ok(),
            youtube_api_key: std::env::var("YOUTUBE_API_KEY").ok(),
            youtube_channel_id: std::env::var("YOUTUBE_CHANNEL_ID").ok(),
        })
    }

    pub fn is_staff_role(&self, role: serenity::RoleId) -> bool {
        self.staff_role_ids.contains(&role)
    }
}
