use crate::{
    bot::{
        BotData, build_registry,
        commands::ping,
        handlers::event_handler,
        transport::{SerenityMessenger, SerenityUsers},
    },
    config::AppConfig,
    dialog::registry::SessionRegistry,
    errors::{Error, Result},
};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Error while handling {}: {}", event.snake_case_name(), error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Connects to Discord and runs until the gateway closes or Ctrl-C is
/// pressed. On Ctrl-C every active dialog is cancelled before the shards
/// shut down.
#[instrument(skip(token, app_config))]
pub async fn run_bot(token: String, app_config: AppConfig) -> Result<()> {
    let app_config = Arc::new(app_config);
    let sessions = Arc::new(SessionRegistry::new());
    let started_at = Utc::now();

    let setup_config = Arc::clone(&app_config);
    let setup_sessions = Arc::clone(&sessions);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping()],
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering slash commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let users = Arc::new(SerenityUsers::new(Arc::clone(&ctx.http)));
                let registry = build_registry(&setup_config, &ready.user.name, users, started_at);
                info!(
                    "Registered {} commands with prefix `{}`",
                    registry.commands().len(),
                    registry.prefix()
                );

                Ok(BotData {
                    registry,
                    sessions: setup_sessions,
                    config: setup_config,
                    messenger: Arc::new(SerenityMessenger::new(Arc::clone(&ctx.http))),
                })
            })
        })
        .build();

    // Prefix commands and dialog replies are read from message content
    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received, shutting down");
        sessions.shutdown();
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
