mod data;
mod discord;
mod embed;
mod getmyip;
mod settings;

use std::{env, path::Path, sync::Arc};

use anyhow::Context as _;
use factorio_manager::{
    lifecycle::{ProcessLauncher, ServerConfig, ServerController},
    panel::PanelManager,
    rcon::{RconClient, RemoteConsole},
    refresh::RefreshLoop,
    router::{Authorizer, InteractionRouter, Outcome, PanelAction, Requester},
    state::{CurrentWorld, PanelStore},
    status::StatusProbe,
};
use poise::{futures_util::lock::Mutex, serenity_prelude as serenity};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    data::Data,
    discord::{ComponentPicker, SerenityPanel},
    settings::Settings,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Set while the framework runs, taken again for the shutdown.
type Running = Arc<Mutex<Option<(Arc<PanelManager>, RefreshLoop)>>>;

async fn requester(ctx: Context<'_>) -> Requester {
    let roles = ctx
        .author_member()
        .await
        .map(|member| member.roles.iter().map(|r| r.0).collect())
        .unwrap_or_default();
    Requester {
        user_id: ctx.author().id.0,
        roles,
    }
}

async fn reply(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(|b| b.content(text).ephemeral(true)).await?;
    Ok(())
}

/// The outcome's message, plus the address to connect to after a start.
async fn describe(settings: &Settings, outcome: &Outcome) -> String {
    let mut text = outcome.message();
    if matches!(outcome, Outcome::Started { .. } | Outcome::Restarted { .. }) {
        if let Some(ip) =
            getmyip::get_my_ip(&settings.get_my_ip_url1, &settings.get_my_ip_url2).await
        {
            text.push_str(&format!("\nConnect to `{ip}:{}`", settings.game_port));
        }
    }
    text
}

/// Show the current server status
#[poise::command(slash_command)]
async fn status(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let status = ctx.data().probe.get_status().await;
    ctx.send(|b| b.embed(|e| embed::status(e, &status))).await?;
    Ok(())
}

/// List connected players
#[poise::command(slash_command)]
async fn players(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let text = match ctx.data().probe.players_raw().await {
        Some(raw) => format!("```{raw}```"),
        None => "🔴 Server is offline or not responding.".to_owned(),
    };
    reply(ctx, text).await
}

/// List the available save files
#[poise::command(slash_command)]
async fn saves(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let text = match factorio_manager::saves::list_saves(&ctx.data().settings.saves_dir).await {
        Ok(saves) => embed::save_list(&saves),
        Err(e) => {
            tracing::warn!(error = %e, "failed to list saves");
            format!("⚠️ {e}")
        }
    };
    reply(ctx, text).await
}

/// Save the game
#[poise::command(slash_command)]
async fn save(
    ctx: Context<'_>,
    #[description = "Save file name (defaults to the current save)"] filename: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let requester = requester(ctx).await;
    let outcome = ctx.data().router.save(&requester, filename.as_deref()).await;
    reply(ctx, outcome.message()).await
}

/// Stop the server, wait a moment and start it again
#[poise::command(slash_command)]
async fn restart(
    ctx: Context<'_>,
    #[description = "Save to load (see /saves, defaults to the newest)"] save: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let requester = requester(ctx).await;
    let outcome = ctx.data().router.restart(&requester, save.as_deref()).await;
    reply(ctx, describe(&ctx.data().settings, &outcome).await).await
}

/// Make sure the control panel exists
#[poise::command(slash_command)]
async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let requester = requester(ctx).await;
    if ctx.data().router.authorizer().authorize(&requester).is_err() {
        return reply(ctx, Outcome::Denied.message()).await;
    }
    let text = match ctx.data().panel.ensure_single_panel().await {
        Ok(id) => format!("✅ Control panel is message {id}."),
        Err(e) => {
            tracing::error!(error = %e, "panel reconciliation failed");
            format!("⚠️ {e}")
        }
    };
    reply(ctx, text).await
}

/// Print a message in the game chat
#[poise::command(slash_command)]
async fn broadcast(
    ctx: Context<'_>,
    #[description = "Message"] message: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let requester = requester(ctx).await;
    let outcome = ctx.data().router.broadcast(&requester, &message).await;
    reply(ctx, outcome.message()).await
}

/// Ban a player from the server
#[poise::command(slash_command)]
async fn ban(
    ctx: Context<'_>,
    #[description = "Player name"] player: String,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let requester = requester(ctx).await;
    let outcome = ctx
        .data()
        .router
        .ban(&requester, &player, reason.as_deref().unwrap_or(""))
        .await;
    reply(ctx, outcome.message()).await
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &poise::Event<'_>,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let poise::Event::InteractionCreate {
        interaction: serenity::Interaction::MessageComponent(component),
    } = event
    {
        // select menus are awaited by the picker that sent them
        let Some(action) = PanelAction::from_custom_id(&component.data.custom_id) else {
            return Ok(());
        };
        component
            .create_interaction_response(&ctx.http, |r| {
                r.kind(serenity::InteractionResponseType::DeferredChannelMessageWithSource)
                    .interaction_response_data(|d| d.ephemeral(true))
            })
            .await?;

        let requester = Requester {
            user_id: component.user.id.0,
            roles: component
                .member
                .as_ref()
                .map(|m| m.roles.iter().map(|r| r.0).collect())
                .unwrap_or_default(),
        };
        let picker = ComponentPicker {
            ctx,
            interaction: component,
        };
        let outcome = data.router.handle(action, &requester, &picker).await;
        let text = describe(&data.settings, &outcome).await;
        component
            .create_followup_message(&ctx.http, |f| f.ephemeral(true).content(text))
            .await?;
    }
    Ok(())
}

fn init_logging(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let (file, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "bot.log"));
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file))
        .init();
    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // read settings file
    let settings_file =
        env::var("FctDcBotSettingsFile").unwrap_or_else(|_| "settings.toml".to_owned());
    let settings = Settings::from_file(&settings_file)
        .with_context(|| format!("loading {settings_file}, maybe specify the file with the FctDcBotSettingsFile env variable?"))?;
    std::fs::create_dir_all(&settings.log_dir)
        .with_context(|| format!("creating log dir {}", settings.log_dir.display()))?;
    let _log_guard = init_logging(&settings.log_dir);
    std::fs::create_dir_all(&settings.saves_dir)
        .with_context(|| format!("creating saves dir {}", settings.saves_dir.display()))?;
    let token = env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN env var")?;

    // server side
    let console: Arc<dyn RemoteConsole> = Arc::new(RconClient::new(
        &settings.rcon_host,
        settings.rcon_port,
        settings.rcon_password.clone(),
    ));
    let world = CurrentWorld::default();
    let probe = Arc::new(
        StatusProbe::new(console.clone(), world.clone())
            .with_world_name_command(settings.world_name_command.clone())
            .with_timeouts(settings.rcon_timeout(), settings.probe_timeout()),
    );
    let controller = Arc::new(
        ServerController::new(
            console,
            Arc::new(ProcessLauncher),
            world,
            ServerConfig {
                executable: settings.server_executable.clone(),
                saves_dir: settings.saves_dir.clone(),
                rcon_port: settings.rcon_port,
                rcon_password: settings.rcon_password.clone(),
                game_port: settings.game_port,
            },
        )
        .with_timeout(settings.rcon_timeout()),
    );

    let running: Running = Arc::new(Mutex::new(None));
    let running_setup = Arc::clone(&running);
    // start
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                status(),
                players(),
                saves(),
                save(),
                restart(),
                panel(),
                broadcast(),
                ban(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .token(token)
        .intents(serenity::GatewayIntents::non_privileged())
        .setup(move |ctx, ready, framework: &poise::Framework<Data, Error>| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(user = %ready.user.name, "connected");

                let channel = Arc::new(SerenityPanel::new(
                    ctx.http.clone(),
                    settings.channel_id,
                    ready.user.id,
                ));
                let panel = Arc::new(
                    PanelManager::new(channel, probe.clone(), PanelStore::new(&settings.state_file))
                        .with_history_limit(settings.history_limit),
                );
                if let Err(e) = panel.load().await {
                    tracing::warn!(error = %e, "ignoring unreadable panel state");
                }
                if let Err(e) = panel.ensure_single_panel().await {
                    tracing::error!(error = %e, "initial panel reconciliation failed");
                }
                let refresh = RefreshLoop::spawn(panel.clone(), settings.status_update_interval());
                *running_setup.lock().await = Some((panel.clone(), refresh));

                let router = Arc::new(InteractionRouter::new(
                    controller,
                    panel.clone(),
                    Authorizer::new(settings.operator_role_id),
                    settings.selection_timeout(),
                ));
                Ok(Data {
                    settings,
                    probe,
                    panel,
                    router,
                })
            })
        })
        .build()
        .await?;

    let shard_manager = framework.shard_manager().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            shard_manager.lock().await.shutdown_all().await;
        }
    });

    framework.start().await?;

    if let Some((panel, refresh)) = running.lock().await.take() {
        refresh.stop().await;
        panel.retire().await;
    }
    Ok(())
}
