use crate::{
    commands::{Attachment, Command, DescribeArgs, Invocation, Reply, ReplyAction},
    config::Config,
    error::{BotError, Result},
    logger,
    models::{ChannelKind, GenerationDefaults},
    registry::ModelRegistry,
    store::DefaultsStore,
    translator::{CreateArgs, RequestTranslator},
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::parser::HELP_TEXT;

pub const GUILD_ONLY: &str = "This command cannot be used in direct messages.";
pub const REMOTE_FAILURE: &str = "Something went wrong while talking to the image backend.";
const INTERNAL_FAILURE: &str = "Something went wrong on our side.";

/// Loads the bytes of an attachment the user pointed at.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads `http(s)` attachments and reads anything else from disk.
pub struct AttachmentClient {
    client: Client,
}

impl AttachmentClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AttachmentFetcher for AttachmentClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(BotError::RemoteCall(format!(
                    "downloading {} returned {}",
                    url,
                    response.status()
                )));
            }
            return Ok(response.bytes().await?.to_vec());
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        match tokio::fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BotError::NotFound(
                format!("Could not find the attachment `{}`", path),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Runs commands against the WebUI and turns every outcome into one [`Reply`].
pub struct CommandHandler {
    registry: Arc<ModelRegistry>,
    translator: RequestTranslator,
    store: Arc<DefaultsStore>,
    attachments: Arc<dyn AttachmentFetcher>,
    bot_user_id: u64,
    admins: Vec<u64>,
}

impl CommandHandler {
    pub fn new(
        registry: Arc<ModelRegistry>,
        store: Arc<DefaultsStore>,
        attachments: Arc<dyn AttachmentFetcher>,
    ) -> Self {
        Self {
            translator: RequestTranslator::new(registry.clone()),
            registry,
            store,
            attachments,
            bot_user_id: 0,
            admins: Vec::new(),
        }
    }

    /// Takes the bot identity and the admin list from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_bot_user_id(config.bot_user_id)
            .with_admins(config.admins.clone())
    }

    pub fn with_bot_user_id(mut self, id: u64) -> Self {
        self.bot_user_id = id;
        self
    }

    pub fn with_admins(mut self, admins: Vec<u64>) -> Self {
        self.admins = admins;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, invocation: &Invocation, command: Command) -> Reply {
        let name = command.name();
        log::info!(
            "[{}] /{} from user {} ({:?})",
            invocation.id,
            name,
            invocation.user_id,
            invocation.channel
        );

        if command.guild_only() && invocation.channel == ChannelKind::Direct {
            return Reply::ephemeral(GUILD_ONLY);
        }

        let outcome = match command {
            Command::Create(args) => self.create(invocation, &args).await,
            Command::SetModel { model } => self.set_model(&model).await,
            Command::GetModel => self.get_model().await,
            Command::Describe(args) => self.describe(&args).await,
            Command::Recreate {
                describe,
                overrides,
            } => self.recreate(invocation, &describe, overrides).await,
            Command::Delete {
                message_id,
                author_id,
            } => Ok(self.delete(invocation, message_id, author_id)),
            Command::GetDefault { name } => self.get_default(name.as_deref()).await,
            Command::SetDefault { name, value } => self.set_default(&name, &value).await,
            Command::Help => Ok(Reply::ephemeral(HELP_TEXT)),
        };

        match outcome {
            Ok(reply) => reply,
            Err(err) => error_reply(invocation, name, err),
        }
    }

    async fn create(&self, invocation: &Invocation, args: &CreateArgs) -> Result<Reply> {
        let defaults = self.store.get().await;
        let plan = self
            .translator
            .translate_create_request(args, &defaults, invocation.channel)
            .await?;

        let result = {
            let _timer = logger::timer("txt2img");
            self.registry.api().txt2img(&plan.request).await?
        };
        // read after generation so a concurrent setmodel is reflected
        let model = match self.registry.current_model().await {
            Ok(model) => model,
            Err(e) => {
                log::warn!("[{}] could not read the current model: {}", invocation.id, e);
                None
            }
        };

        let seed = result.seed().unwrap_or(plan.request.seed);
        let images =
            RequestTranslator::select_images(result.images, plan.request.batch_size, plan.grid);
        let attachments = images
            .into_iter()
            .enumerate()
            .map(|(i, data)| Attachment {
                filename: format!("image-{}.png", i),
                data,
            })
            .collect();

        Ok(Reply::public(format!(
            "Generated image with model `{}`, seed: `{}`.",
            model.unwrap_or_else(|| "unknown".to_string()),
            seed
        ))
        .with_attachments(attachments)
        .hidden(!plan.show))
    }

    async fn set_model(&self, model: &str) -> Result<Reply> {
        let hash_name = self.translator.translate_model_switch(model).await?;
        self.registry.activate(&hash_name).await?;
        log::info!("Switched WebUI checkpoint to {}", hash_name);
        Ok(Reply::ephemeral(format!("Selected the model `{}`.", model)))
    }

    async fn get_model(&self) -> Result<Reply> {
        let model = self.registry.current_model().await?;
        Ok(Reply::ephemeral(format!(
            "Current model: `{}`",
            model.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    async fn describe(&self, args: &DescribeArgs) -> Result<Reply> {
        let caption = match self.interrogate(args).await {
            Ok(caption) => caption,
            Err(err) if err.is_remote() => {
                log::warn!("Interrogation failed: {}", err);
                return Ok(Reply::public(format!("Error: {}", err)).hidden(args.hide));
            }
            Err(err) => return Err(err),
        };

        let image = if args.hide_image {
            "image".to_string()
        } else {
            format!("[image]({})", args.image.url)
        };
        Ok(Reply::public(format!("{} has the description `{}`.", image, caption)).hidden(args.hide))
    }

    async fn interrogate(&self, args: &DescribeArgs) -> Result<String> {
        let model = RequestTranslator::translate_describe_request(
            args.model.as_deref(),
            args.image.filename.as_deref(),
        )?;
        let image = self.attachments.fetch(&args.image.url).await?;

        let _timer = logger::timer("interrogate");
        let caption = self.registry.api().interrogate(model, &image).await?;
        Ok(caption.trim().to_string())
    }

    async fn recreate(
        &self,
        invocation: &Invocation,
        describe: &DescribeArgs,
        overrides: CreateArgs,
    ) -> Result<Reply> {
        let caption = match self.interrogate(describe).await {
            Ok(caption) => caption,
            Err(err) if err.is_remote() => {
                log::warn!("Interrogation failed: {}", err);
                return Ok(Reply::public(format!("Error: {}", err)).hidden(describe.hide));
            }
            Err(err) => return Err(err),
        };

        let args = CreateArgs {
            prompt: caption,
            ..overrides
        };
        self.create(invocation, &args).await
    }

    fn delete(&self, invocation: &Invocation, message_id: u64, author_id: u64) -> Reply {
        if !self.can_delete(invocation, author_id) {
            return Reply::ephemeral("You do not have permission to delete this message.");
        }
        log::info!(
            "[{}] user {} deleted message {}",
            invocation.id,
            invocation.user_id,
            message_id
        );
        Reply::ephemeral("You have deleted the message.")
            .with_action(ReplyAction::DeleteMessage(message_id))
    }

    /// Only the bot's own messages can be deleted, and only by someone who
    /// owns the conversation.
    pub fn can_delete(&self, invocation: &Invocation, author_id: u64) -> bool {
        if author_id != self.bot_user_id {
            return false;
        }
        invocation.channel == ChannelKind::Direct
            || invocation.user_is_admin
            || self.admins.contains(&invocation.user_id)
            || invocation
                .channel_topic
                .as_deref()
                .map_or(false, |topic| topic_names_user(topic, invocation.user_id))
    }

    async fn get_default(&self, name: Option<&str>) -> Result<Reply> {
        match name {
            Some(name) => {
                let value = self.store.get_field(name).await?;
                Ok(Reply::ephemeral(format!("`{}` is `{}`", name, value)))
            }
            None => {
                let defaults = self.store.get().await;
                let lines: Vec<String> = GenerationDefaults::FIELDS
                    .iter()
                    .filter_map(|field| {
                        defaults.get(field.name).map(|value| {
                            format!("`{}` ({}): `{}`", field.name, field.kind.as_str(), value)
                        })
                    })
                    .collect();
                Ok(Reply::ephemeral(lines.join("\n")))
            }
        }
    }

    async fn set_default(&self, name: &str, raw: &str) -> Result<Reply> {
        let updated = self.store.set(name, raw).await?;
        let value = updated
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_else(|| raw.trim().to_string());
        Ok(Reply::ephemeral(format!("Set default `{}` to `{}`.", name, value)))
    }
}

/// Ids in a topic are whole digit runs; `12` does not match `4812`.
fn topic_names_user(topic: &str, user_id: u64) -> bool {
    let id = user_id.to_string();
    topic
        .split(|c: char| !c.is_ascii_digit())
        .any(|token| token == id)
}

fn error_reply(invocation: &Invocation, command: &str, err: BotError) -> Reply {
    if err.is_user_error() {
        log::info!("[{}] /{} rejected: {}", invocation.id, command, err);
        Reply::ephemeral(err.to_string())
    } else if err.is_remote() {
        log::error!("[{}] /{} failed: {}", invocation.id, command, err);
        Reply::ephemeral(REMOTE_FAILURE)
    } else {
        log::error!("[{}] /{} failed: {}", invocation.id, command, err);
        Reply::ephemeral(INTERNAL_FAILURE)
    }
}
