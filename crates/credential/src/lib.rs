//! podium-credential – Token-Dienst ueber HTTP
//!
//! Holt pro Beitrittsversuch ein frisches Token:
//!
//! ```text
//! GET <url>?channelName=<kanal>   ->   { "token": "<string>" }
//! ```
//!
//! Nicht-2xx-Status, Transportfehler, kaputter Body oder leeres Token
//! gelten als Fehlschlag. Tokens werden nie zwischengespeichert.

use std::time::Duration;

use async_trait::async_trait;
use podium_core::{ChannelName, Credential};
use podium_session::CredentialFetcher;
use serde::Deserialize;
use thiserror::Error;

/// Fehler beim Abruf eines Tokens
#[derive(Debug, Error)]
pub enum TokenFehler {
    #[error("Token-Dienst nicht erreichbar: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Token-Dienst antwortet mit HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Antwort des Token-Dienstes unlesbar: {0}")]
    Antwort(#[source] reqwest::Error),

    #[error("Token-Dienst liefert leeres Token")]
    LeeresToken,
}

#[derive(Deserialize)]
struct TokenAntwort {
    token: String,
}

/// [`CredentialFetcher`] gegen einen HTTP-Token-Dienst
pub struct HttpCredentialFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpCredentialFetcher {
    pub fn neu(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("podium/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let url = url.into();
        tracing::info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Token-Dienst konfiguriert");
        Ok(Self { client, url })
    }

    async fn abrufen(&self, kanal: &ChannelName) -> Result<Credential, TokenFehler> {
        let antwort = self
            .client
            .get(&self.url)
            .query(&[("channelName", kanal.as_str())])
            .send()
            .await
            .map_err(TokenFehler::Transport)?;

        let status = antwort.status();
        if !status.is_success() {
            return Err(TokenFehler::Status(status));
        }

        let body: TokenAntwort = antwort.json().await.map_err(TokenFehler::Antwort)?;
        if body.token.trim().is_empty() {
            return Err(TokenFehler::LeeresToken);
        }
        Ok(Credential::new(body.token))
    }
}

#[async_trait]
impl CredentialFetcher for HttpCredentialFetcher {
    async fn fetch(&self, kanal: &ChannelName) -> anyhow::Result<Credential> {
        tracing::debug!(channel = %kanal, "Token anfordern");
        match self.abrufen(kanal).await {
            Ok(credential) => Ok(credential),
            Err(e) => {
                tracing::warn!(channel = %kanal, fehler = %e, "Token-Abruf fehlgeschlagen");
                Err(e.into())
            }
        }
    }
}
