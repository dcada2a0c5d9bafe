//! Text form of the commands: `/create prompt:a red fox width:640 batch:2`.
//!
//! A value runs until the next recognised `key:` token, so free text such as
//! prompts needs no quoting. Text before the first key belongs to the
//! command's primary argument.

use crate::{
    commands::{Command, DescribeArgs, ImageRef},
    error::{BotError, Result},
    translator::CreateArgs,
};
use std::collections::HashMap;

const CREATE_KEYS: [&str; 13] = [
    "prompt",
    "negative",
    "cfg_scale",
    "width",
    "height",
    "show",
    "seed",
    "steps",
    "batch",
    "sampler",
    "save_image",
    "grid",
    "hires_fix",
];
const DESCRIBE_KEYS: [&str; 4] = ["image", "interrogate_model", "hide", "hide_image"];

pub const HELP_TEXT: &str = "\
Commands:
  create prompt:<text> [negative:] [cfg_scale:] [width:] [height:] [seed:] [steps:] [batch:] [sampler:] [show:] [save_image:] [grid:] [hires_fix:]
  setmodel model:<name>
  getmodel
  describe image:<url or path> [interrogate_model:DeepBooru|CLIP] [hide:] [hide_image:]
  recreate image:<url or path> [interrogate_model:] plus any create option
  delete message_id:<id> message_author:<id>
  getdefault [name:<parameter>]
  setdefault name:<parameter> value:<value>
  help";

/// Parses one line of input. `prefix` is the configured command prefix.
pub fn parse_command(line: &str, prefix: &str) -> Result<Command> {
    let line = line.trim();
    let body = Some(prefix)
        .filter(|prefix| !prefix.is_empty())
        .and_then(|prefix| line.strip_prefix(prefix))
        .or_else(|| line.strip_prefix('/'))
        .unwrap_or(line);
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest),
        None => (body, ""),
    };

    match name.to_lowercase().as_str() {
        "create" => {
            let mut args = Args::split(rest, &CREATE_KEYS, Some("prompt"))?;
            let prompt = args
                .take("prompt")
                .ok_or_else(|| BotError::Validation("`prompt` is required".into()))?;
            let mut create = create_args(&mut args)?;
            create.prompt = prompt;
            Ok(Command::Create(create))
        }
        "setmodel" => {
            let mut args = Args::split(rest, &["model"], Some("model"))?;
            Ok(Command::SetModel {
                model: args.require("model")?,
            })
        }
        "getmodel" => Ok(Command::GetModel),
        "describe" => {
            let mut args = Args::split(rest, &DESCRIBE_KEYS, Some("image"))?;
            Ok(Command::Describe(describe_args(&mut args)?))
        }
        "recreate" => {
            let keys: Vec<&str> = DESCRIBE_KEYS
                .iter()
                .chain(CREATE_KEYS.iter().filter(|k| **k != "prompt"))
                .copied()
                .collect();
            let mut args = Args::split(rest, &keys, Some("image"))?;
            let describe = describe_args(&mut args)?;
            let overrides = create_args(&mut args)?;
            Ok(Command::Recreate {
                describe,
                overrides,
            })
        }
        "delete" => {
            let keys = ["message_id", "message_author"];
            let mut args = Args::split(rest, &keys, Some("message_id"))?;
            Ok(Command::Delete {
                message_id: args.require_u64("message_id")?,
                author_id: args.require_u64("message_author")?,
            })
        }
        "getdefault" => {
            let mut args = Args::split(rest, &["name"], Some("name"))?;
            Ok(Command::GetDefault {
                name: args.take("name"),
            })
        }
        "setdefault" => {
            let mut args = Args::split(rest, &["name", "value"], Some("name"))?;
            Ok(Command::SetDefault {
                name: args.require("name")?,
                value: args.require("value")?,
            })
        }
        "help" | "" => Ok(Command::Help),
        other => Err(BotError::NotFound(format!(
            "Unknown command `{}`. Try `help`.",
            other
        ))),
    }
}

fn create_args(args: &mut Args) -> Result<CreateArgs> {
    Ok(CreateArgs {
        prompt: String::new(),
        negative: args.take("negative"),
        cfg_scale: args.take_f64("cfg_scale")?,
        width: args.take_i64("width")?,
        height: args.take_i64("height")?,
        seed: args.take_i64("seed")?,
        steps: args.take_i64("steps")?,
        batch: args.take_i64("batch")?,
        sampler: args.take("sampler"),
        show: args.take_bool("show")?,
        save_image: args.take_bool("save_image")?,
        grid: args.take_bool("grid")?,
        hires_fix: args.take_bool("hires_fix")?,
    })
}

fn describe_args(args: &mut Args) -> Result<DescribeArgs> {
    Ok(DescribeArgs {
        image: ImageRef::from_url(args.require("image")?),
        model: args.take("interrogate_model"),
        hide: args.take_bool("hide")?.unwrap_or(false),
        hide_image: args.take_bool("hide_image")?.unwrap_or(false),
    })
}

struct Args {
    values: HashMap<String, String>,
}

impl Args {
    /// Values are sliced out of `rest`, so their inner spacing and line
    /// breaks survive; only the ends are trimmed.
    fn split(rest: &str, keys: &[&str], primary: Option<&str>) -> Result<Self> {
        // (key, where its value starts, where its token starts)
        let mut marks: Vec<(&str, usize, usize)> = Vec::new();

        for (start, word) in words(rest) {
            let key = word
                .split_once(':')
                .and_then(|(key, _)| keys.iter().copied().find(|k| *k == key));
            if let Some(key) = key {
                marks.push((key, start + key.len() + 1, start));
            } else if marks.is_empty() {
                match primary {
                    Some(primary) => marks.push((primary, start, start)),
                    None => {
                        return Err(BotError::Validation(format!(
                            "Unexpected text `{}`",
                            word
                        )))
                    }
                }
            }
        }

        let mut values = HashMap::new();
        for (i, (key, value_start, _)) in marks.iter().enumerate() {
            let end = marks.get(i + 1).map_or(rest.len(), |next| next.2);
            values.insert(key.to_string(), unquote(&rest[*value_start..end]).to_string());
        }
        Ok(Self { values })
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(key).filter(|v| !v.is_empty())
    }

    fn require(&mut self, key: &str) -> Result<String> {
        self.take(key)
            .ok_or_else(|| BotError::Validation(format!("`{}` is required", key)))
    }

    fn take_parsed<T: std::str::FromStr>(&mut self, key: &str, kind: &str) -> Result<Option<T>> {
        match self.take(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                BotError::Validation(format!("`{}` must be {}, got `{}`", key, kind, raw))
            }),
        }
    }

    fn take_i64(&mut self, key: &str) -> Result<Option<i64>> {
        self.take_parsed(key, "an integer")
    }

    fn take_f64(&mut self, key: &str) -> Result<Option<f64>> {
        self.take_parsed(key, "a number")
    }

    fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(BotError::Validation(format!(
                    "`{}` must be true or false, got `{}`",
                    key, raw
                ))),
            },
        }
    }

    fn require_u64(&mut self, key: &str) -> Result<u64> {
        self.take_parsed(key, "a numeric id")?
            .ok_or_else(|| BotError::Validation(format!("`{}` is required", key)))
    }
}

/// Whitespace-separated words with their byte offsets in `text`.
fn words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_spaces_in_prompt() {
        let command = parse_command(
            "/create prompt:a red fox in the snow negative:blurry, lowres width:640 batch:2 grid:no",
            "/",
        )
        .unwrap();
        let Command::Create(args) = command else {
            panic!("expected create");
        };
        assert_eq!(args.prompt, "a red fox in the snow");
        assert_eq!(args.negative.as_deref(), Some("blurry, lowres"));
        assert_eq!(args.width, Some(640));
        assert_eq!(args.batch, Some(2));
        assert_eq!(args.grid, Some(false));
        assert_eq!(args.height, None);
    }

    #[test]
    fn test_leading_text_is_the_prompt() {
        let command = parse_command("!create \"a castle: at night\" steps:30", "!").unwrap();
        let Command::Create(args) = command else {
            panic!("expected create");
        };
        assert_eq!(args.prompt, "a castle: at night");
        assert_eq!(args.steps, Some(30));
    }

    #[test]
    fn test_bad_number_is_validation_error() {
        let err = parse_command("/create prompt:x steps:many", "/").unwrap_err();
        assert!(matches!(err, BotError::Validation(_)));
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn test_missing_prompt() {
        assert!(parse_command("/create width:640", "/").is_err());
    }

    #[test]
    fn test_describe_and_recreate() {
        let command =
            parse_command("/describe image:https://cdn.example.com/cat.png hide:true", "/").unwrap();
        assert_eq!(
            command,
            Command::Describe(DescribeArgs {
                image: ImageRef::from_url("https://cdn.example.com/cat.png"),
                model: None,
                hide: true,
                hide_image: false,
            })
        );

        let command = parse_command(
            "/recreate image:pics/dog.jpg interrogate_model:CLIP steps:12",
            "/",
        )
        .unwrap();
        let Command::Recreate {
            describe,
            overrides,
        } = command
        else {
            panic!("expected recreate");
        };
        assert_eq!(describe.model.as_deref(), Some("CLIP"));
        assert_eq!(describe.image.filename.as_deref(), Some("dog.jpg"));
        assert_eq!(overrides.steps, Some(12));
        assert!(overrides.prompt.is_empty());
    }

    #[test]
    fn test_other_commands() {
        assert_eq!(
            parse_command("/setmodel v1-5-pruned", "/").unwrap(),
            Command::SetModel {
                model: "v1-5-pruned".into()
            }
        );
        assert_eq!(parse_command("getmodel", "/").unwrap(), Command::GetModel);
        assert_eq!(
            parse_command("/delete message_id:10 message_author:20", "/").unwrap(),
            Command::Delete {
                message_id: 10,
                author_id: 20
            }
        );
        assert_eq!(
            parse_command("/getdefault", "/").unwrap(),
            Command::GetDefault { name: None }
        );
        assert_eq!(
            parse_command("/setdefault name:sampler value:DPM++ 2M Karras", "/").unwrap(),
            Command::SetDefault {
                name: "sampler".into(),
                value: "DPM++ 2M Karras".into()
            }
        );
        assert_eq!(parse_command("/help", "/").unwrap(), Command::Help);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_command("/dance", "/").unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[test]
    fn test_empty_prefix_still_accepts_slash() {
        let command = parse_command("/create prompt:cat", "").unwrap();
        assert_eq!(command, Command::Create(CreateArgs::new("cat")));
        assert_eq!(parse_command("getmodel", "").unwrap(), Command::GetModel);
    }

    #[test]
    fn test_prompt_keeps_its_spacing() {
        let command = parse_command(
            "/create prompt:masterpiece,\n  a  quiet harbor\tat dawn  width:640",
            "/",
        )
        .unwrap();
        let Command::Create(args) = command else {
            panic!("expected create");
        };
        assert_eq!(args.prompt, "masterpiece,\n  a  quiet harbor\tat dawn");
        assert_eq!(args.width, Some(640));
    }

    #[test]
    fn test_words_offsets() {
        assert_eq!(words("  ab c\nd "), vec![(2, "ab"), (5, "c"), (7, "d")]);
        assert!(words(" \t").is_empty());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("'hi'"), "hi");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }
}
