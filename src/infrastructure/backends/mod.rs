pub mod gemini;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendRef;

pub struct BackendManager {}

impl BackendManager {
    pub fn get() -> Result<BackendRef> {
        if Config::get(ConfigKey::GeminiToken).is_empty() {
            bail!("No Gemini API key found. Set GEMINI_API_KEY, pass --gemini-token, or add gemini-token to your config file.");
        }

        return Ok(Arc::new(gemini::Gemini::from_config()?));
    }
}
