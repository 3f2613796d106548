//! Keyword auto-responses and the other passive message hooks: thanks-based
//! reputation, status ping replies, helper pings, link triggers, and
//! resource requests.

use once_cell::sync::Lazy;
use poise::serenity_prelude as serenity;
use regex::Regex;
use poise::serenity_prelude::Mentionable;

use crate::links::ResourceRequest;
use crate::{modlog, reputation, Data, Error, PREFIX};

static PAST_PAPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)past paper (\w+) (\d{4})").unwrap());
static RESOURCE_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)i want (\w+) of (\w+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Salutation {
    Greeting,
    Farewell,
    Morning,
    Night,
}

/// Word-level keyword match, so "hi" does not fire inside "this".
fn has_word(content: &str, word: &str) -> bool {
    content
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word))
}

pub fn classify_salutation(content: &str) -> Option<Salutation> {
    let lower = content.to_lowercase();
    if ["hello", "hi", "hey"].iter().any(|w| has_word(content, w)) {
        Some(Salutation::Greeting)
    } else if has_word(content, "bye") || has_word(content, "goodbye") || lower.contains("see ya")
    {
        Some(Salutation::Farewell)
    } else if lower.contains("good morning") || has_word(content, "morning") {
        Some(Salutation::Morning)
    } else if lower.contains("good night") || has_word(content, "night") {
        Some(Salutation::Night)
    } else {
        None
    }
}

/// Rotating response pools, indexed by message id so the choice is spread
/// out without pulling in a randomness dependency.
pub fn salutation_reply(kind: Salutation, mention: &str, seed: u64) -> String {
    let pool: &[&str] = match kind {
        Salutation::Greeting => &[
            "Hey {}! What's up?",
            "Hello {}! Good to see you around.",
            "Hi {}! How's it going?",
        ],
        Salutation::Farewell => &[
            "See you later, {}!",
            "Bye {} — take care!",
        ],
        Salutation::Morning => &[
            "Good morning, {}! Make it a good one.",
            "Morning, {}! Coffee first, then everything else.",
        ],
        Salutation::Night => &[
            "Good night, {}! Sleep well.",
            "Night, {} — see you tomorrow.",
        ],
    };
    pool[(seed as usize) % pool.len()].replace("{}", mention)
}

pub fn parse_past_paper(content: &str) -> Option<(String, String)> {
    let caps = PAST_PAPER.captures(content)?;
    Some((caps[1].to_lowercase(), caps[2].to_owned()))
}

pub fn parse_resource_request(content: &str) -> Option<(String, String)> {
    let caps = RESOURCE_REQUEST.captures(content)?;
    Some((caps[1].to_lowercase(), caps[2].to_lowercase()))
}

pub fn wants_helper(content: &str) -> bool {
    content.to_lowercase().contains("help me")
}

/// Runs every passive hook against a guild message. Each hook is independent;
/// a message can trigger several of them, as the original behavior allows.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<(), Error> {
    if msg.content.starts_with(PREFIX) {
        return Ok(());
    }

    if let Some(kind) = classify_salutation(&msg.content) {
        let reply = salutation_reply(kind, &msg.author.mention().to_string(), msg.id.get());
        msg.channel_id.say(ctx, reply).await?;
    }

    if reputation::is_thanks(&msg.content) {
        if let Some(replied) = &msg.referenced_message {
            if replied.author.id != msg.author.id && !replied.author.bot {
                let total = data.reputation.award(replied.author.id);
                msg.channel_id
                    .say(
                        ctx,
                        format!(
                            "{} thanked {} — that's +1 rep (now {}).",
                            msg.author.mention(),
                            replied.author.mention(),
                            total
                        ),
                    )
                    .await?;
                modlog::log_action(
                    ctx,
                    &data.config,
                    "Reputation awarded",
                    Some(replied.author.mention().to_string()),
                    Some(msg.author.mention().to_string()),
                    "+1 rep for a thanked reply",
                    None,
                )
                .await;
            }
        }
    }

    for mentioned in &msg.mentions {
        if let Some(status) = data.statuses.get(mentioned.id) {
            msg.channel_id
                .say(ctx, status.ping_reply(&mentioned.mention().to_string()))
                .await?;
        }
    }

    if let Some((subject, year)) = parse_past_paper(&msg.content) {
        msg.channel_id
            .say(
                ctx,
                format!(
                    "Looking for {} past papers from {}? Check `{}listlink` — and ask staff to add them if they're missing.",
                    subject, year, PREFIX
                ),
            )
            .await?;
    }

    if wants_helper(&msg.content) {
        msg.channel_id
            .send_message(
                ctx,
                serenity::CreateMessage::new()
                    .content(format!(
                        "{} — {} needs a hand here!",
                        data.config.helper_role_id.mention(),
                        msg.author.mention()
                    ))
                    .allowed_mentions(
                        serenity::CreateAllowedMentions::new()
                            .roles(vec![data.config.helper_role_id]),
                    ),
            )
            .await?;
        modlog::log_action(
            ctx,
            &data.config,
            "Helper ping",
            Some(msg.author.mention().to_string()),
            None,
            "Asked for help in chat",
            None,
        )
        .await;
    }

    if msg.channel_id == data.config.link_channel {
        if let Some((resource, board)) = parse_resource_request(&msg.content) {
            data.links.record_request(ResourceRequest {
                resource: resource.clone(),
                board: board.clone(),
                requested_by: msg.author.id,
                channel: msg.channel_id,
            });
            msg.channel_id
                .say(
                    ctx,
                    format!(
                        "Noted: {} for {}. Staff can see open requests with `{}requests`.",
                        resource, board, PREFIX
                    ),
                )
                .await?;
        }
    }

    if let Some(entry) = data.links.find_trigger(&msg.content) {
        msg.channel_id
            .say(ctx, format!("Here you go: [{}]({})", entry.title, entry.url))
            .await?;
        modlog::log_action(
            ctx,
            &data.config,
            "Link triggered",
            Some(msg.author.mention().to_string()),
            None,
            &format!("Trigger: {}, Title: {}", entry.trigger, entry.title),
            None,
        )
        .await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_match_whole_words_only() {
        assert_eq!(classify_salutation("hi everyone"), Some(Salutation::Greeting));
        assert_eq!(classify_salutation("Hey!"), Some(Salutation::Greeting));
        // "hi" inside "this" must not fire.
        assert_eq!(classify_salutation("this is fine"), None);
    }

    #[test]
    fn salutation_precedence_follows_listing_order() {
        // Both a greeting word and a morning phrase: greeting wins.
        assert_eq!(
            classify_salutation("hey, good morning"),
            Some(Salutation::Greeting)
        );
        assert_eq!(
            classify_salutation("good morning all"),
            Some(Salutation::Morning)
        );
        assert_eq!(classify_salutation("good night"), Some(Salutation::Night));
        assert_eq!(classify_salutation("see ya"), Some(Salutation::Farewell));
    }

    #[test]
    fn replies_rotate_with_the_seed_and_carry_the_mention() {
        let a = salutation_reply(Salutation::Greeting, "@mira", 0);
        let b = salutation_reply(Salutation::Greeting, "@mira", 1);
        assert!(a.contains("@mira"));
        assert!(b.contains("@mira"));
        assert_ne!(a, b);
    }

    #[test]
    fn past_paper_queries_are_parsed() {
        assert_eq!(
            parse_past_paper("any Past Paper physics 2019 around?"),
            Some(("physics".to_owned(), "2019".to_owned()))
        );
        assert_eq!(parse_past_paper("past paper physics"), None);
    }

    #[test]
    fn resource_requests_are_parsed() {
        assert_eq!(
            parse_resource_request("I want notes of CAIE"),
            Some(("notes".to_owned(), "caie".to_owned()))
        );
        assert_eq!(parse_resource_request("i want everything"), None);
    }

    #[test]
    fn helper_trigger() {
        assert!(wants_helper("can someone HELP ME with this?"));
        assert!(!wants_helper("helpful as always"));
    }
}
