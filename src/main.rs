use sdbot::logger::{self, LoggerConfig};
use sdbot::{
    parse_command, AttachmentClient, CommandHandler, Config, DefaultsStore, Invocation,
    ModelRegistry, Reply, WebUiClient,
};
use sdbot::models::ChannelKind;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const OUTPUT_DIR: &str = "outputs";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config_path = env::var("SDBOT_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let mut config = if Path::new(&config_path).exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("⚠️  {} not found, using defaults and environment", config_path);
        Config::new()
    };
    config.apply_env();

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.sd_auth.base_url(),
    );
    logger::log_config_info(&config);

    let client = Arc::new(WebUiClient::new(&config.sd_auth)?);
    let registry = Arc::new(ModelRegistry::new(client));
    let store = Arc::new(DefaultsStore::load(config.defaults_path.clone()).await?);
    let attachments = Arc::new(AttachmentClient::new(config.sd_auth.timeout())?);
    let handler = Arc::new(
        CommandHandler::new(registry.clone(), store, attachments).with_config(&config),
    );

    if !registry.api().health_check().await? {
        log::warn!("⚠️  WebUI at {} did not answer the health check", config.sd_auth.base_url());
    }

    match registry.current_model().await {
        Ok(Some(model)) => log::info!("🎮 Playing with {}", model),
        Ok(None) => log::warn!("⚠️  WebUI reports no loaded checkpoint"),
        Err(e) => log::error!("❌ Could not reach the WebUI: {}", e),
    }

    let prefix = config.command_prefix().to_string();
    println!("Type a command (e.g. `{}create prompt:a red fox`), `{}help` for the list.", prefix, prefix);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let invocation = Invocation::new(0, ChannelKind::Guild).with_admin(true);
        let command = match parse_command(&line, &prefix) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            let reply = handler.dispatch(&invocation, command).await;
            render(&reply).await;
        });
    }

    log::info!("👋 Input closed, shutting down");
    Ok(())
}

async fn render(reply: &Reply) {
    println!("{}{}", if reply.ephemeral { "(only you) " } else { "" }, reply.content);
    if let Some(action) = &reply.action {
        println!("-> {:?}", action);
    }
    if reply.attachments.is_empty() {
        return;
    }

    if let Err(e) = tokio::fs::create_dir_all(OUTPUT_DIR).await {
        log::error!("❌ Failed to create {}: {}", OUTPUT_DIR, e);
        return;
    }
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let writes = reply.attachments.iter().map(|attachment| {
        let path: PathBuf = Path::new(OUTPUT_DIR).join(format!("{}-{}", stamp, attachment.filename));
        async move {
            match tokio::fs::write(&path, &attachment.data).await {
                Ok(_) => log::info!("💾 Image saved to: {}", path.display()),
                Err(e) => log::error!("❌ Failed to save image: {}", e),
            }
        }
    });
    futures::future::join_all(writes).await;
}
