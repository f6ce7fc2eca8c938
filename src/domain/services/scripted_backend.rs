use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;

use crate::domain::models::Backend;
use crate::domain::models::BackendPrompt;
use crate::domain::models::ChatError;
use crate::domain::models::FragmentStream;

/// In-memory backend that replays a fixed script of fragments.
#[derive(Default)]
pub struct ScriptedBackend {
    pub open_error: Option<ChatError>,
    pub fragments: Vec<Result<String, ChatError>>,
    /// Keep the stream open after the scripted fragments run out.
    pub hang: bool,
    pub models: Vec<String>,
    pub unhealthy: bool,
}

impl ScriptedBackend {
    pub fn replying(fragments: &[&str]) -> ScriptedBackend {
        return ScriptedBackend {
            fragments: fragments.iter().map(|f| return Ok(f.to_string())).collect(),
            ..ScriptedBackend::default()
        };
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn health_check(&self) -> Result<()> {
        if self.unhealthy {
            bail!("Gemini is not reachable");
        }

        return Ok(());
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        return Ok(self.models.clone());
    }

    async fn stream_completion(&self, _prompt: &BackendPrompt) -> Result<FragmentStream, ChatError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }

        let fragments = stream::iter(self.fragments.clone());
        if self.hang {
            return Ok(Box::pin(fragments.chain(stream::pending())));
        }

        return Ok(Box::pin(fragments));
    }
}
