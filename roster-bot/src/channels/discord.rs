use crate::channels::util::split_message;
use crate::commands;
use crate::ingest::{IngestError, Ingestor};
use roster_types::{Ack, InboundMessage};
use serenity::all::{
    Client, Context, EventHandler, GatewayIntents, GuildId, Message, Ready, RoleId,
};
use std::sync::Arc;

/// Discord's per-message character limit
const DISCORD_MAX_CHARS: usize = 2000;

/// Role name used when the author has no roles besides the implicit one
const EVERYONE_ROLE: &str = "@everyone";

struct RosterHandler {
    ingestor: Arc<Ingestor>,
    command_prefix: String,
}

/// Pick the name of the highest-positioned role.
fn highest_role<'a, I>(roles: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (u16, &'a str)>,
{
    roles
        .into_iter()
        .max_by_key(|(position, _)| *position)
        .map(|(_, name)| name)
}

/// Resolve the author's top role name as of now.
async fn top_role_name(ctx: &Context, guild_id: GuildId, msg: &Message) -> String {
    let member_roles: Vec<RoleId> = match &msg.member {
        Some(member) => member.roles.clone(),
        None => match guild_id.member(&ctx.http, msg.author.id).await {
            Ok(member) => member.roles,
            Err(e) => {
                log::warn!("Discord: Failed to fetch member {}: {}", msg.author.id, e);
                Vec::new()
            }
        },
    };

    if member_roles.is_empty() {
        return EVERYONE_ROLE.to_string();
    }

    let guild_roles = match guild_id.roles(&ctx.http).await {
        Ok(roles) => roles,
        Err(e) => {
            log::warn!("Discord: Failed to fetch roles for guild {}: {}", guild_id, e);
            return EVERYONE_ROLE.to_string();
        }
    };

    let held = member_roles
        .iter()
        .filter_map(|id| guild_roles.get(id))
        .map(|role| (role.position, role.name.as_str()));

    highest_role(held).unwrap_or(EVERYONE_ROLE).to_string()
}

/// Reaction for an ingest result. Every failure is shown as negative.
fn ack_for(result: Result<Option<Ack>, IngestError>, author_id: &str) -> Option<Ack> {
    match result {
        Ok(ack) => ack,
        Err(e @ IngestError::Mirror { .. }) => {
            log::warn!("Discord: Message from {}: {}", author_id, e);
            Some(Ack::Negative)
        }
        Err(e) => {
            log::error!("Discord: Message from {} not stored: {}", author_id, e);
            Some(Ack::Negative)
        }
    }
}

async fn channel_name(ctx: &Context, msg: &Message) -> Option<String> {
    match msg.channel_id.to_channel(ctx).await {
        Ok(channel) => channel.guild().map(|c| c.name),
        Err(e) => {
            log::warn!("Discord: Failed to resolve channel {}: {}", msg.channel_id, e);
            None
        }
    }
}

async fn reply(ctx: &Context, msg: &Message, text: &str) {
    for chunk in split_message(text, DISCORD_MAX_CHARS) {
        if let Err(e) = msg.channel_id.say(&ctx.http, &chunk).await {
            log::error!("Discord: Failed to send reply: {}", e);
        }
    }
}

#[serenity::async_trait]
impl EventHandler for RosterHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore bots, including ourselves
        if msg.author.bot {
            return;
        }
        // Registration only happens in guild channels
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let Some(channel_name) = channel_name(&ctx, &msg).await else {
            return;
        };
        if !self.ingestor.is_target_channel(&channel_name) {
            return;
        }

        let author_id = msg.author.id.to_string();

        if let Some(cmd) = commands::parse(&msg.content, &self.command_prefix) {
            log::info!("Discord: Command {:?} from {}", cmd, author_id);
            let text = match commands::execute(cmd, &author_id, &self.command_prefix, self.ingestor.store()) {
                Ok(text) => text,
                Err(e) => {
                    log::error!("Discord: Command failed: {}", e);
                    format!("Sorry, I encountered an error: {}", e)
                }
            };
            reply(&ctx, &msg, &text).await;
            return;
        }

        let inbound = InboundMessage {
            author_role: top_role_name(&ctx, guild_id, &msg).await,
            author_id,
            channel_name,
            text: msg.content.clone(),
        };

        let result = self.ingestor.handle(&inbound).await;
        let Some(ack) = ack_for(result, &inbound.author_id) else {
            return;
        };

        if let Err(e) = msg.react(&ctx.http, ack.emoji()).await {
            log::error!("Discord: Failed to add reaction: {}", e);
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!("Discord: Bot connected as {}", ready.user.name);
    }
}

/// Connect to the gateway and serve events until Ctrl-C or a client error.
pub async fn start_discord_listener(
    token: &str,
    command_prefix: String,
    ingestor: Arc<Ingestor>,
) -> Result<(), String> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = RosterHandler {
        ingestor,
        command_prefix,
    };

    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| format!("Failed to create Discord client: {}", e))?;

    log::info!("Discord: Client created successfully");

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Discord: Received shutdown signal");
            shard_manager.shutdown_all().await;
        }
        result = client.start() => {
            if let Err(e) = result {
                let error = format!("Discord client error: {}", e);
                log::error!("{}", error);
                return Err(error);
            }
            log::info!("Discord: Listener stopped");
        }
    }

    Ok(())
}
