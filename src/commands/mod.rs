//! Chat command surface: what users can ask for and what the bot answers.
//!
//! The platform binding (gateway, interaction lifecycle, uploads) lives outside
//! the crate. It builds an [`Invocation`], parses or maps the user's input to a
//! [`Command`], and renders the returned [`Reply`].

pub mod handler;
pub mod parser;

use crate::{models::ChannelKind, translator::CreateArgs};
use uuid::Uuid;

pub use handler::{AttachmentClient, AttachmentFetcher, CommandHandler};
pub use parser::parse_command;

/// Who invoked a command and from where.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub id: Uuid,
    pub user_id: u64,
    /// Guild-level administrator permission.
    pub user_is_admin: bool,
    pub channel: ChannelKind,
    pub channel_topic: Option<String>,
}

impl Invocation {
    pub fn new(user_id: u64, channel: ChannelKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_is_admin: false,
            channel,
            channel_topic: None,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.user_is_admin = admin;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.channel_topic = Some(topic.into());
        self
    }
}

/// An image the user attached. `url` is where it can be fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub filename: Option<String>,
    pub url: String,
}

impl ImageRef {
    /// Takes the filename from the last path segment of `url`.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .map(|name| name.split('?').next().unwrap_or(name))
            .filter(|name| !name.is_empty())
            .map(String::from);
        Self { filename, url }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeArgs {
    pub image: ImageRef,
    pub model: Option<String>,
    pub hide: bool,
    pub hide_image: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(CreateArgs),
    SetModel { model: String },
    GetModel,
    Describe(DescribeArgs),
    /// Describe an image, then generate a new one from the description.
    Recreate {
        describe: DescribeArgs,
        overrides: CreateArgs,
    },
    Delete { message_id: u64, author_id: u64 },
    GetDefault { name: Option<String> },
    SetDefault { name: String, value: String },
    Help,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::SetModel { .. } => "setmodel",
            Command::GetModel => "getmodel",
            Command::Describe(_) => "describe",
            Command::Recreate { .. } => "recreate",
            Command::Delete { .. } => "delete",
            Command::GetDefault { .. } => "getdefault",
            Command::SetDefault { .. } => "setdefault",
            Command::Help => "help",
        }
    }

    /// Commands that only make sense inside a guild.
    pub fn guild_only(&self) -> bool {
        matches!(self, Command::SetModel { .. } | Command::GetModel)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Side effect the platform binding should carry out along with the reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyAction {
    DeleteMessage(u64),
}

/// The single response every command produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Only the invoking user sees the reply.
    pub ephemeral: bool,
    pub action: Option<ReplyAction>,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
            ephemeral: false,
            action: None,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            ephemeral: true,
            ..Self::public(content)
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.ephemeral = hidden;
        self
    }

    pub fn with_action(mut self, action: ReplyAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_filename() {
        assert_eq!(
            ImageRef::from_url("https://cdn.example.com/a/b/cat.png?ex=1").filename.as_deref(),
            Some("cat.png")
        );
        assert_eq!(
            ImageRef::from_url("C:\\pics\\dog.jpeg").filename.as_deref(),
            Some("dog.jpeg")
        );
        assert_eq!(ImageRef::from_url("https://cdn.example.com/").filename, None);
    }

    #[test]
    fn test_guild_only_commands() {
        assert!(Command::GetModel.guild_only());
        assert!(Command::SetModel { model: "x".into() }.guild_only());
        assert!(!Command::Help.guild_only());
    }
}
