//! Staff-curated link triggers and the resource-request table.

use std::sync::Mutex;

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{modlog, Context, Error};

#[derive(Debug, Clone)]
pub struct LinkEntry {
    /// Lowercased word that triggers the reply.
    pub trigger: String,
    pub title: String,
    pub url: String,
    pub added_by: serenity::UserId,
}

#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub resource: String,
    pub board: String,
    pub requested_by: serenity::UserId,
    pub channel: serenity::ChannelId,
}

#[derive(Default)]
pub struct LinkLibrary {
    links: Mutex<Vec<LinkEntry>>,
    requests: Mutex<Vec<ResourceRequest>>,
}

impl LinkLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: LinkEntry) {
        self.links.lock().unwrap().push(entry);
    }

    pub fn all(&self) -> Vec<LinkEntry> {
        self.links.lock().unwrap().clone()
    }

    /// First entry whose trigger occurs in the (lowercased) message, in
    /// insertion order.
    pub fn find_trigger(&self, content: &str) -> Option<LinkEntry> {
        let content = content.to_lowercase();
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|entry| content.contains(&entry.trigger))
            .cloned()
    }

    pub fn record_request(&self, request: ResourceRequest) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Register a link trigger
///
/// ?link <trigger> <title> <url>
///
/// Any message containing the trigger word gets a reply linking to the
/// stored resource.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Links"
)]
pub async fn link(
    ctx: Context<'_>,
    #[description = "Trigger word"] trigger: String,
    #[description = "Display title"] title: String,
    #[description = "Resource URL"] url: String,
) -> Result<(), Error> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        ctx.say("The link must be an http(s) URL.").await?;
        return Ok(());
    }
    let entry = LinkEntry {
        trigger: trigger.to_lowercase(),
        title: title.clone(),
        url: url.clone(),
        added_by: ctx.author().id,
    };
    ctx.data().links.add(entry);
    ctx.say(format!("Linked `{}` to \"{}\".", trigger.to_lowercase(), title))
        .await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Link added",
        None,
        Some(ctx.author().mention().to_string()),
        &format!("Trigger: {}, Title: {}, Link: {}", trigger, title, url),
        None,
    )
    .await;
    Ok(())
}

/// List all registered link triggers
///
/// ?listlink
#[poise::command(prefix_command, category = "Links")]
pub async fn listlink(ctx: Context<'_>) -> Result<(), Error> {
    let links = ctx.data().links.all();
    if links.is_empty() {
        ctx.say("No links registered yet. Staff can add some with `.link`.")
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Link library")
        .colour(serenity::Colour::TEAL)
        .timestamp(serenity::Timestamp::now());
    for (idx, entry) in links.iter().enumerate() {
        embed = embed.field(
            format!("{}. {}", idx + 1, entry.trigger),
            format!(
                "[{}]({}) — added by {}",
                entry.title,
                entry.url,
                entry.added_by.mention()
            ),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List pending resource requests
///
/// ?requests
///
/// Shows what people asked for in the link channel so staff can go find it.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Links"
)]
pub async fn requests(ctx: Context<'_>) -> Result<(), Error> {
    let requests = ctx.data().links.requests();
    if requests.is_empty() {
        ctx.say("No resource requests on file.").await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Resource requests")
        .colour(serenity::Colour::PURPLE)
        .timestamp(serenity::Timestamp::now());
    for (idx, request) in requests.iter().enumerate() {
        embed = embed.field(
            format!("Request #{}", idx + 1),
            format!(
                "**{}** for **{}** — requested by {} in {}",
                request.resource,
                request.board,
                request.requested_by.mention(),
                request.channel.mention()
            ),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(trigger: &str, title: &str) -> LinkEntry {
        LinkEntry {
            trigger: trigger.to_owned(),
            title: title.to_owned(),
            url: format!("https://example.com/{}", trigger),
            added_by: serenity::UserId::new(1),
        }
    }

    #[test]
    fn first_matching_trigger_wins() {
        let library = LinkLibrary::new();
        library.add(entry("mechanics", "Mechanics notes"));
        library.add(entry("mech", "Other notes"));

        let hit = library.find_trigger("anyone got the MECHANICS sheet?").unwrap();
        assert_eq!(hit.title, "Mechanics notes");
    }

    #[test]
    fn no_trigger_no_match() {
        let library = LinkLibrary::new();
        library.add(entry("optics", "Optics notes"));
        assert!(library.find_trigger("totally unrelated").is_none());
    }

    #[test]
    fn requests_are_recorded_in_order() {
        let library = LinkLibrary::new();
        library.record_request(ResourceRequest {
            resource: "notes".into(),
            board: "caie".into(),
            requested_by: serenity::UserId::new(9),
            channel: serenity::ChannelId::new(10),
        });
        let requests = library.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].resource, "notes");
    }
}
