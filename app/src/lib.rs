//! podium-app – Bibliotheks-Root
//!
//! Konfiguration, Zeilenparser und die Konsolen-Schleife, die Eingaben auf
//! den [`SessionHandle`] abbildet. Als Bibliothek getrennt von `main.rs`,
//! damit die Schleife ohne stdin testbar ist.

pub mod config;
pub mod console;

use console::{ConsoleCommand, HILFE};
use podium_core::{EngineEvent, OfflineReason};
use podium_session::{SessionHandle, SimulatedEngine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Verbindet Eingabezeilen mit der Session
pub struct Konsole {
    handle: SessionHandle,
    engine: SimulatedEngine,
}

impl Konsole {
    pub fn neu(handle: SessionHandle, engine: SimulatedEngine) -> Self {
        Self { handle, engine }
    }

    /// Liest Zeilen bis `quit` oder Eingabeende
    pub async fn ausfuehren<R, W>(&self, eingabe: R, mut ausgabe: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut zeilen = eingabe.lines();
        while let Some(zeile) = zeilen.next_line().await? {
            let befehl = match ConsoleCommand::parsen(&zeile) {
                Ok(Some(befehl)) => befehl,
                Ok(None) => continue,
                Err(e) => {
                    ausgabe.write_all(format!("! {e}\n").as_bytes()).await?;
                    continue;
                }
            };
            if befehl == ConsoleCommand::Quit {
                break;
            }
            let antwort = self.befehl_ausfuehren(befehl).await?;
            ausgabe.write_all(antwort.as_bytes()).await?;
            ausgabe.write_all(b"\n").await?;
            ausgabe.flush().await?;
        }
        Ok(())
    }

    async fn befehl_ausfuehren(&self, befehl: ConsoleCommand) -> anyhow::Result<String> {
        let ergebnis = match befehl {
            ConsoleCommand::Join { kanal, rolle } => self.handle.request_join(kanal, rolle).await,
            ConsoleCommand::Leave => self.handle.request_leave().await,
            ConsoleCommand::Ask => self.handle.request_floor().await,
            ConsoleCommand::Done => self.handle.release_floor().await,
            ConsoleCommand::Speaker(aktiv) => self.handle.set_speakerphone(aktiv).await,
            ConsoleCommand::PeerJoin(peer) => {
                self.engine.inject(EngineEvent::PeerJoined { peer }).await?;
                return Ok(format!("Ereignis gesendet: {peer} beitreten"));
            }
            ConsoleCommand::PeerLeave(peer) => {
                self.engine
                    .inject(EngineEvent::PeerLeft {
                        peer,
                        reason: OfflineReason::Quit,
                    })
                    .await?;
                return Ok(format!("Ereignis gesendet: {peer} verlassen"));
            }
            ConsoleCommand::Status => {
                return Ok(serde_json::to_string_pretty(&self.handle.snapshot())?);
            }
            ConsoleCommand::Help => return Ok(HILFE.to_string()),
            ConsoleCommand::Quit => return Ok(String::new()),
        };

        Ok(match ergebnis {
            Ok(()) => {
                let s = self.handle.snapshot();
                let rolle = s.rolle.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                let mut zeile = format!("ok ({:?}, rolle {rolle})", s.zustand);
                if s.rederecht_verfuegbar() {
                    zeile.push_str(if s.rederecht == Some(true) {
                        ", done gibt das Rederecht ab"
                    } else {
                        ", ask fordert das Rederecht an"
                    });
                }
                zeile
            }
            Err(e) => format!("! {e}"),
        })
    }
}
