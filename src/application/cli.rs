#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::env;
use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::IntoEnumIterator;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::HarmBlockThreshold;
use crate::domain::models::HarmCategory;
use crate::domain::models::Message;
use crate::domain::services::actions::help_text;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

/// Directory the debug log is written to when `RUST_LOG` contains `gemchat`.
pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("GEMCHAT_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("gemchat");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!(
        "Created default config file at {}",
        config_file_path.to_string_lossy()
    );
    return Ok(());
}

async fn validate_messages_file(file: &str) -> Result<()> {
    let payload = fs::read_to_string(file).await?;
    let messages = Message::validate_batch(&payload)?;
    println!("{file} contains {} valid messages", messages.len());

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    let mut cmd = Command::new("debug");
    cmd = cmd.about("Debug helpers for Gemchat")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Gemchat with environment variable RUST_LOG=gemchat")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        )
        .subcommand(
            Command::new("validate-messages")
                .about("Validates a JSON file containing an array of chat messages, such as the output of /export.")
                .arg(
                    clap::Arg::new("file")
                        .short('f')
                        .long("file")
                        .help("Path to the JSON file")
                        .required(true),
                )
        );

    return cmd;
}

fn subcommand_chat() -> Command {
    return Command::new("chat").about("Start a new chat session.");
}

fn arg_gemini_token() -> Arg {
    return Arg::new(ConfigKey::GeminiToken.to_string())
        .long(ConfigKey::GeminiToken.to_string())
        .env("GEMINI_API_KEY")
        .hide_env_values(true)
        .num_args(1)
        .help("Gemini API key from Google AI Studio.");
}

fn arg_model() -> Arg {
    return Arg::new(ConfigKey::Model.to_string())
        .short('m')
        .long(ConfigKey::Model.to_string())
        .env("GEMCHAT_MODEL")
        .num_args(1)
        .help(format!(
            "Gemini model to chat with. [default: {}]",
            Config::default(ConfigKey::Model)
        ));
}

fn arg_with_default(key: ConfigKey, env_name: &'static str, help: &str) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_name)
        .num_args(1)
        .help(format!("{help} [default: {}]", Config::default(key)));
}

fn arg_safety(category: HarmCategory) -> Arg {
    let key = category.config_key();
    let (env_name, label) = match category {
        HarmCategory::Harassment => ("GEMCHAT_SAFETY_HARASSMENT", "harassment"),
        HarmCategory::HateSpeech => ("GEMCHAT_SAFETY_HATE_SPEECH", "hate speech"),
        HarmCategory::SexuallyExplicit => (
            "GEMCHAT_SAFETY_SEXUALLY_EXPLICIT",
            "sexually explicit content",
        ),
        HarmCategory::DangerousContent => {
            ("GEMCHAT_SAFETY_DANGEROUS_CONTENT", "dangerous content")
        }
    };

    return arg_with_default(key, env_name, &format!("Block threshold for {label}."))
        .value_parser(PossibleValuesParser::new(HarmBlockThreshold::VARIANTS));
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") || line.starts_with("HOTKEYS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    let mut cmd = Command::new("gemchat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("GEMCHAT_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(arg_gemini_token().global(true))
        .arg(arg_model().global(true))
        .arg(
            arg_with_default(
                ConfigKey::GeminiURL,
                "GEMCHAT_GEMINI_URL",
                "Gemini API URL. Can be swapped to a compatible proxy.",
            )
            .global(true),
        )
        .arg(
            arg_with_default(
                ConfigKey::BackendHealthCheckTimeout,
                "GEMCHAT_BACKEND_HEALTH_CHECK_TIMEOUT",
                "Time to wait in milliseconds before timing out when doing a healthcheck for the Gemini API.",
            )
            .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SystemPrompt.to_string())
                .long(ConfigKey::SystemPrompt.to_string())
                .env("GEMCHAT_SYSTEM_PROMPT")
                .num_args(1)
                .help("Instructions sent to the model ahead of the conversation.")
                .global(true),
        )
        .arg(
            arg_with_default(ConfigKey::Temperature, "GEMCHAT_TEMPERATURE", "Sampling temperature.")
                .global(true),
        )
        .arg(
            arg_with_default(ConfigKey::TopP, "GEMCHAT_TOP_P", "Nucleus sampling threshold.")
                .global(true),
        )
        .arg(
            arg_with_default(ConfigKey::TopK, "GEMCHAT_TOP_K", "Top-k sampling size.")
                .global(true),
        )
        .arg(
            arg_with_default(
                ConfigKey::MaxOutputTokens,
                "GEMCHAT_MAX_OUTPUT_TOKENS",
                "Maximum length of a reply in tokens.",
            )
            .global(true),
        )
        .arg(
            arg_with_default(
                ConfigKey::ResponseMimeType,
                "GEMCHAT_RESPONSE_MIME_TYPE",
                "Output format requested from the model.",
            )
            .global(true),
        );

    for category in HarmCategory::iter() {
        cmd = cmd.arg(arg_safety(category).global(true));
    }

    return cmd;
}

pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = log_dir().join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                Some(("validate-messages", validate_matches)) => {
                    if let Some(file) = validate_matches.get_one::<String>("file") {
                        validate_messages_file(file).await?;
                    }
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
