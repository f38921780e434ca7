//! Schnittstellen zu den externen Kollaborateuren
//!
//! Die Echtzeit-Engine (Audio-Transport) und der Token-Dienst werden nur ueber
//! diese Traits angesprochen. Beide liefern `anyhow::Result`, die Uebersetzung
//! in [`podium_core::PodiumError`] erfolgt im Koordinator.

use async_trait::async_trait;
use podium_core::{ChannelName, ChannelProfile, Credential, Role};

/// Imperative Befehle an die Echtzeit-Engine
///
/// Ereignisse der Engine laufen nicht ueber diesen Trait, sondern ueber einen
/// `mpsc`-Kanal, den die Implementierung beim Erstellen herausgibt.
#[async_trait]
pub trait RealtimeEngine: Send + Sync + 'static {
    /// Tritt einem Kanal mit dem gegebenen Token bei
    async fn join(&self, credential: &Credential, kanal: &ChannelName, rolle: Role)
        -> anyhow::Result<()>;

    /// Verlaesst den aktuellen Kanal
    async fn leave(&self) -> anyhow::Result<()>;

    /// Setzt die Client-Rolle
    async fn set_role(&self, rolle: Role) -> anyhow::Result<()>;

    /// Aktiviert das Senden von lokalem Audio
    async fn enable_audio(&self) -> anyhow::Result<()>;

    /// Deaktiviert das Senden von lokalem Audio
    async fn disable_audio(&self) -> anyhow::Result<()>;

    /// Setzt das Kanalprofil
    async fn set_channel_profile(&self, profil: ChannelProfile) -> anyhow::Result<()>;

    /// Schaltet zwischen Lautsprecher und Hoermuschel um
    async fn set_speakerphone(&self, aktiv: bool) -> anyhow::Result<()>;
}

/// Liefert pro Beitrittsversuch ein frisches Credential
#[async_trait]
pub trait CredentialFetcher: Send + Sync + 'static {
    async fn fetch(&self, kanal: &ChannelName) -> anyhow::Result<Credential>;
}
