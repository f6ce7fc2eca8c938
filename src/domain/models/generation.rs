#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumString;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub fn config_key(&self) -> ConfigKey {
        match self {
            HarmCategory::Harassment => return ConfigKey::SafetyHarassment,
            HarmCategory::HateSpeech => return ConfigKey::SafetyHateSpeech,
            HarmCategory::SexuallyExplicit => return ConfigKey::SafetySexuallyExplicit,
            HarmCategory::DangerousContent => return ConfigKey::SafetyDangerousContent,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    pub fn from_config() -> Result<Vec<SafetySetting>> {
        return SafetySetting::parse(Config::get);
    }

    /// One setting per harm category, read through `get` so callers can
    /// supply values without touching the global config.
    pub fn parse<F: Fn(ConfigKey) -> String>(get: F) -> Result<Vec<SafetySetting>> {
        let mut settings = vec![];
        for category in HarmCategory::iter() {
            let key = category.config_key();
            let threshold = parse_key::<HarmBlockThreshold, _>(&get, key)?;
            settings.push(SafetySetting {
                category,
                threshold,
            });
        }

        return Ok(settings);
    }
}

/// Sampling parameters sent with every request. Loaded once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> GenerationConfig {
        return GenerationConfig {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        };
    }
}

impl GenerationConfig {
    pub fn from_config() -> Result<GenerationConfig> {
        return GenerationConfig::parse(Config::get);
    }

    pub fn parse<F: Fn(ConfigKey) -> String>(get: F) -> Result<GenerationConfig> {
        let config = GenerationConfig {
            temperature: parse_key(&get, ConfigKey::Temperature)?,
            top_p: parse_key(&get, ConfigKey::TopP)?,
            top_k: parse_key(&get, ConfigKey::TopK)?,
            max_output_tokens: parse_key(&get, ConfigKey::MaxOutputTokens)?,
            response_mime_type: get(ConfigKey::ResponseMimeType),
        };

        if !(0.0..=2.0).contains(&config.temperature) {
            bail!("{} must be between 0 and 2", ConfigKey::Temperature);
        }
        if !(0.0..=1.0).contains(&config.top_p) {
            bail!("{} must be between 0 and 1", ConfigKey::TopP);
        }
        if config.top_k == 0 {
            bail!("{} must be at least 1", ConfigKey::TopK);
        }
        if config.max_output_tokens == 0 {
            bail!("{} must be at least 1", ConfigKey::MaxOutputTokens);
        }
        if config.response_mime_type.is_empty() {
            bail!("{} must not be empty", ConfigKey::ResponseMimeType);
        }

        return Ok(config);
    }
}

fn parse_key<T, F>(get: &F, key: ConfigKey) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(ConfigKey) -> String,
{
    let raw = get(key);
    match raw.trim().parse::<T>() {
        Ok(val) => return Ok(val),
        Err(err) => bail!("Invalid value for '{key}': {raw} ({err})"),
    }
}
