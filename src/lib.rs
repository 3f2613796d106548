pub mod autoresponder;
pub mod checks;
pub mod config;
pub mod jobs;
pub mod links;
pub mod misc;
pub mod moderation;
pub mod modlog;
pub mod modmail;
pub mod reputation;
pub mod resources;
pub mod social;
pub mod status;
pub mod suggest;
pub mod welcome;

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub const PREFIX: &str = ".";

/// Everything the handlers share, injected by the framework. All mutable
/// state lives in these stores; nothing is global and nothing is persisted.
pub struct Data {
    pub config: config::BotConfig,
    pub bot_user_id: serenity::UserId,
    pub http: reqwest::Client,
    pub tickets: modmail::TicketStore,
    pub statuses: status::StatusBoard,
    pub reputation: reputation::RepLedger,
    pub cases: modlog::CaseLog,
    pub links: links::LinkLibrary,
    pub suggestions: suggest::SuggestionLog,
}

pub fn env_var<T: std::str::FromStr>(name: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    Ok(std::env::var(name)
        .map_err(|_| format!("Missing {}", name))?
        .parse()
        .map_err(|e| format!("Invalid {}: {}", name, e))?)
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            panic!("failed to start bot: {:?}", error)
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            log::warn!("command `{}` errored: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(error.to_string()).await {
                log::warn!("could not report command error: {}", e);
            }
        }
        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
            let usage = ctx
                .command()
                .help_text
                .clone()
                .unwrap_or_else(|| "See `.help` for usage.".to_owned());
            if let Err(e) = ctx.say(format!("**{}**\n{}", error, usage)).await {
                log::warn!("could not report argument error: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                if let Err(e) = ctx.say(error.to_string()).await {
                    log::warn!("could not report check failure: {}", e);
                }
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                log::error!("error while handling error: {}", e);
            }
        }
    }
}

async fn in_modmail_thread(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> bool {
    match msg.channel(ctx).await {
        Ok(serenity::Channel::Guild(channel)) => {
            channel.thread_metadata.is_some()
                && channel.parent_id == Some(data.config.modmail_channel)
        }
        _ => false,
    }
}

/// Central event dispatch. Errors are contained per event: a failing handler
/// is logged by the framework and never takes the process down.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            log::info!("novabot is online as {}", data_about_bot.user.name);
            jobs::start_jobs(ctx.clone(), data.config.clone(), data.http.clone());
            if let Err(e) = status::update_board(ctx, data).await {
                log::error!("could not render status board at startup: {}", e);
            }
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }
            if new_message.guild_id.is_none() {
                modmail::router::handle_dm(ctx, data, new_message).await?;
            } else {
                autoresponder::handle_message(ctx, data, new_message).await?;
                if in_modmail_thread(ctx, data, new_message).await {
                    modmail::router::handle_thread_message(ctx, data, new_message).await?;
                }
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            welcome::greet_new_member(ctx, data, new_member).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn app() -> Result<(), Error> {
    let _ = dotenv::dotenv();

    let token: String = env_var("DISCORD_TOKEN")?;
    let config = config::BotConfig::from_env()?;

    let options = poise::FrameworkOptions {
        commands: vec![
            // Modmail
            modmail::modmail_close(),
            modmail::modmail_open(),
            // Moderation
            moderation::warn(),
            moderation::timeout(),
            moderation::kick(),
            moderation::ban(),
            moderation::tempban(),
            moderation::softban(),
            moderation::unban(),
            moderation::slowmode(),
            moderation::lock(),
            moderation::unlock(),
            moderation::purge(),
            moderation::say(),
            moderation::report(),
            // Statuses
            status::free(),
            status::sleeping(),
            status::dolater(),
            status::studying(),
            status::outside(),
            status::on_break(),
            status::clearstatus(),
            // Community
            reputation::profile(),
            suggest::suggest(),
            links::link(),
            links::listlink(),
            links::requests(),
            // Miscellaneous
            misc::help(),
            misc::ping(),
            misc::guide(),
            misc::register(),
        ],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(PREFIX.into()),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(3600),
            ))),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                log::info!(
                    "{} used `{}` in channel {}",
                    ctx.author().name,
                    ctx.invoked_command_name(),
                    ctx.channel_id()
                );
            })
        },
        event_handler: |ctx, event, _framework, data| {
            Box::pin(event_handler(ctx, event, data))
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |_ctx, ready, _framework| {
            Box::pin(async move {
                Ok(Data {
                    config,
                    bot_user_id: ready.user.id,
                    http: reqwest::Client::new(),
                    tickets: modmail::TicketStore::new(),
                    statuses: status::StatusBoard::new(),
                    reputation: reputation::RepLedger::new(),
                    cases: modlog::CaseLog::new(),
                    links: links::LinkLibrary::new(),
                    suggestions: suggest::SuggestionLog::new(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}

pub async fn main() {
    env_logger::init();

    if let Err(e) = app().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
