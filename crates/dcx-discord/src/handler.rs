//! Gateway event handler: registers the slash commands on `ready` and
//! dispatches interactions to their callbacks.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use serenity::all::{
    Command, CommandInteraction, Context, CreateAttachment, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EditInteractionResponse,
    EventHandler, GuildId, Interaction, Ready,
};
use serenity::async_trait;
use tracing::{error, info, warn};

use dcx_core::{
    config::Config,
    domain::ChannelId,
    export::{ExportFormat, ExportRequest, Exporter},
    formatting::truncate_one_line,
    ports::HistorySource,
};

use crate::{commands, DiscordHistory};

pub struct Handler {
    cfg: Arc<Config>,
    exporter: Exporter,
}

impl Handler {
    pub fn new(cfg: Arc<Config>) -> Self {
        let exporter = Exporter::new(cfg.temp_dir.clone());
        Self { cfg, exporter }
    }

    async fn handle_export(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> anyhow::Result<()> {
        // The fetch plus file write can exceed the 3 second interaction
        // deadline, so acknowledge first and follow up with the file.
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await?;

        let format = command
            .data
            .options
            .iter()
            .find(|o| o.name == "format")
            .and_then(|o| o.value.as_str())
            .map(ExportFormat::parse)
            .unwrap_or_default();

        let limit = command
            .data
            .options
            .iter()
            .find(|o| o.name == "limit")
            .and_then(|o| o.value.as_i64())
            .map(|n| n.clamp(1, 100) as u8)
            .unwrap_or(self.cfg.default_export_limit);

        let channel_name = command
            .channel_id
            .name(&ctx)
            .await
            .unwrap_or_else(|_| format!("channel-{}", command.channel_id.get()));

        let history = DiscordHistory::new(ctx.http.clone());
        let messages = history
            .fetch_recent(ChannelId(command.channel_id.get()), limit)
            .await?;
        let count = messages.len();

        let req = ExportRequest {
            channel_name: channel_name.clone(),
            format,
            messages,
        };
        let path = self.exporter.export(&req)?;

        // Whatever happens past this point, the temp file is ours to delete.
        let delivered = self.deliver(ctx, command, &path, count, &channel_name).await;
        tokio::fs::remove_file(&path).await.ok();
        delivered?;

        info!(channel = %channel_name, count, format = ?format, "export delivered");
        Ok(())
    }

    async fn deliver(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        path: &Path,
        count: usize,
        channel_name: &str,
    ) -> anyhow::Result<()> {
        let size = tokio::fs::metadata(path).await?.len();
        if size >= self.cfg.max_upload_bytes {
            // Discord rejects uploads at the ceiling; don't even try.
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(format!(
                            "Export of #{channel_name} came out at {size} bytes, \
                             above the {} byte upload ceiling.",
                            self.cfg.max_upload_bytes
                        ))
                        .ephemeral(true),
                )
                .await?;
            return Ok(());
        }

        let attachment = CreateAttachment::path(path).await?;
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(format!("Exported {count} messages from #{channel_name}."))
                    .add_file(attachment),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected to Discord", ready.user.name);

        let cmds = commands::create_commands(self.cfg.default_export_limit);
        // Guild-scoped commands propagate instantly; global ones can take
        // up to an hour to appear.
        let registered = match self.cfg.guild_id {
            Some(id) => GuildId::new(id).set_commands(&ctx.http, cmds).await,
            None => Command::set_global_commands(&ctx.http, cmds).await,
        };
        match registered {
            Ok(cmds) => info!("registered {} slash commands", cmds.len()),
            Err(e) => error!("slash command registration failed: {e}"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let outcome = match command.data.name.as_str() {
            commands::EXPORT => self.handle_export(&ctx, &command).await,
            commands::PING => handle_ping(&ctx, &command).await,
            other => {
                warn!("unknown command: {other}");
                reply_ephemeral(&ctx, &command, "Unknown command.").await
            }
        };

        if let Err(e) = outcome {
            error!("command {} failed: {e}", command.data.name);
            let msg = format!(
                "Something went wrong: {}",
                truncate_one_line(&e.to_string(), 200)
            );
            // Best effort; works whenever the initial response went out.
            let _ = command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(msg)
                        .ephemeral(true),
                )
                .await;
        }
    }
}

async fn handle_ping(ctx: &Context, command: &CommandInteraction) -> anyhow::Result<()> {
    let started = Instant::now();
    reply_ephemeral(ctx, command, "Pong.").await?;

    // The acknowledgement above is a full REST round trip to Discord; report
    // how long it took.
    let rtt = started.elapsed();
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(ping_reply(rtt)))
        .await?;
    Ok(())
}

fn ping_reply(rtt: Duration) -> String {
    format!("Pong. Gateway round trip took {} ms.", rtt.as_millis())
}

async fn reply_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    text: &str,
) -> anyhow::Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(text)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
