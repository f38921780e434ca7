//! Podium – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging, startet den
//! Session-Task und liest Befehle von stdin.

use std::sync::Arc;

use anyhow::Result;
use podium_app::{config::PodiumConfig, console::HILFE, Konsole};
use podium_core::PeerId;
use podium_credential::HttpCredentialFetcher;
use podium_observability::logging_initialisieren;
use podium_session::{CredentialFetcher, SessionHandle, SimulatedCredentials, SimulatedEngine};
use tokio::io::BufReader;

/// Lokale ID, die die simulierte Engine nach dem Beitritt meldet
const LOKALE_ID: PeerId = PeerId(1);

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("PODIUM_CONFIG").unwrap_or_else(|_| "podium.toml".into());

    let config = PodiumConfig::laden(&config_pfad)?.mit_umgebung();
    logging_initialisieren(&config.logging)?;
    config.pruefen()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Podium wird initialisiert"
    );

    let credentials: Arc<dyn CredentialFetcher> = if config.token.ist_simuliert() {
        tracing::info!("Kein Token-Dienst konfiguriert, verwende simulierte Tokens");
        Arc::new(SimulatedCredentials::neu())
    } else {
        Arc::new(HttpCredentialFetcher::neu(
            config.token.url.clone(),
            config.token.timeout(),
        )?)
    };

    let (engine, ereignisse) = SimulatedEngine::neu(LOKALE_ID, config.sitzung.event_queue);
    tracing::info!(app_id = %config.engine.app_id, "Simulierte Engine gestartet");

    let (handle, task) = SessionHandle::start(
        Arc::new(engine.clone()),
        credentials,
        ereignisse,
        config.sitzung.clone(),
    );

    println!("{HILFE}");
    let konsole = Konsole::neu(handle.clone(), engine);
    let ergebnis = konsole
        .ausfuehren(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    handle.shutdown().await;
    if let Err(e) = task.await {
        tracing::error!(fehler = %e, "Session-Task abgebrochen");
    }
    tracing::info!("Podium beendet");

    ergebnis
}
