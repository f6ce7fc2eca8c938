#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::HarmBlockThreshold;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    BackendHealthCheckTimeout,
    ConfigFile,
    GeminiToken,
    GeminiURL,
    MaxOutputTokens,
    Model,
    ResponseMimeType,
    SafetyDangerousContent,
    SafetyHarassment,
    SafetyHateSpeech,
    SafetySexuallyExplicit,
    SystemPrompt,
    Temperature,
    TopK,
    TopP,
    Username,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        if key == ConfigKey::Username {
            let mut user = env::var("USER").unwrap_or_else(|_| return "".to_string());
            if user.is_empty() {
                user = "User".to_string();
            }

            return user;
        }

        if key == ConfigKey::ConfigFile {
            #[cfg(not(target_os = "macos"))]
            let config_dir = dirs::config_dir();
            #[cfg(target_os = "macos")]
            let config_dir = dirs::home_dir().map(|home| return home.join(".config"));

            return config_dir
                .unwrap_or_else(|| return path::PathBuf::from("."))
                .join("gemchat/config.toml")
                .to_string_lossy()
                .to_string();
        }

        let default_threshold = HarmBlockThreshold::BlockMediumAndAbove.to_string();

        let res: &str = match key {
            ConfigKey::BackendHealthCheckTimeout => "1000",
            ConfigKey::GeminiToken => "",
            ConfigKey::GeminiURL => "https://generativelanguage.googleapis.com",
            ConfigKey::MaxOutputTokens => "8192",
            ConfigKey::Model => "gemini-1.5-flash-latest",
            ConfigKey::ResponseMimeType => "text/plain",
            ConfigKey::SafetyDangerousContent => &default_threshold,
            ConfigKey::SafetyHarassment => &default_threshold,
            ConfigKey::SafetyHateSpeech => &default_threshold,
            ConfigKey::SafetySexuallyExplicit => &default_threshold,
            ConfigKey::SystemPrompt => "",
            ConfigKey::Temperature => "1",
            ConfigKey::TopK => "64",
            ConfigKey::TopP => "0.95",

            // Special
            ConfigKey::ConfigFile => "",
            ConfigKey::Username => "",
        };

        return res.to_string();
    }

    /// Layers defaults, the TOML config file, then CLI flags and environment
    /// variables, last one wins.
    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            Config::apply_toml(&cmd, &toml_str)?;
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            username = Config::get(ConfigKey::Username),
            model = Config::get(ConfigKey::Model),
            gemini_url = Config::get(ConfigKey::GeminiURL),
            temperature = Config::get(ConfigKey::Temperature),
            top_p = Config::get(ConfigKey::TopP),
            top_k = Config::get(ConfigKey::TopK),
            max_output_tokens = Config::get(ConfigKey::MaxOutputTokens),
            "config"
        );

        return Ok(());
    }

    fn apply_toml(cmd: &Command, toml_str: &str) -> Result<()> {
        let doc = toml_str.parse::<toml_edit::Document>()?;

        for key in ConfigKey::iter() {
            let val = match doc.get(&key.to_string()) {
                Some(val) => val,
                None => continue,
            };

            // Use clap value parsers to do validation.
            let mut possible_values = vec![];
            if let Some(arg) = cmd
                .get_arguments()
                .find(|e| return e.get_long() == Some(key.to_string().as_str()))
            {
                possible_values = arg
                    .get_possible_values()
                    .iter()
                    .map(|e| return e.get_name().to_string())
                    .collect::<Vec<String>>();
            }

            if let Some(val_int) = val.as_integer() {
                Config::set(key, &val_int.to_string());
            } else if let Some(val_float) = val.as_float() {
                Config::set(key, &val_float.to_string());
            } else if let Some(val_str) = val.as_str() {
                if val_str.is_empty() {
                    continue;
                }
                if !possible_values.is_empty() && !possible_values.contains(&val_str.to_string())
                {
                    bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                }
                Config::set(key, val_str);
            } else {
                bail!(format!(
                    "config.toml has an unsupported value type for key '{key}'"
                ));
            }
        }

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                if key == ConfigKey::Username {
                    return Some(
                        "# Your user name displayed in all chat bubbles.\n# username = \"\""
                            .to_string(),
                    );
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name().to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    description = format!("{description} [possible values: {}]", possible_values);
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<f64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
