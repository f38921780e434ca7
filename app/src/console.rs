//! Zeilenbefehle der Konsole
//!
//! ```text
//! join <kanal> [audience|broadcaster]   Kanal beitreten (Standard: audience)
//! leave                                 Kanal verlassen
//! ask                                   Frage stellen (Rederecht anfordern)
//! done                                  Antwort erhalten (Rederecht abgeben)
//! speaker on|off                        Lautsprecher umschalten
//! status                                Aktuellen Zustand als JSON ausgeben
//! peer-join <id>                        Simulierten Teilnehmer beitreten lassen
//! peer-leave <id>                       Simulierten Teilnehmer gehen lassen
//! help                                  Diese Hilfe
//! quit                                  Beenden
//! ```

use podium_core::{PeerId, Role};
use thiserror::Error;

pub const HILFE: &str = "\
join <kanal> [audience|broadcaster]
leave
ask
done
speaker on|off
status
peer-join <id>
peer-leave <id>
help
quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Join { kanal: String, rolle: Role },
    Leave,
    Ask,
    Done,
    Speaker(bool),
    Status,
    PeerJoin(PeerId),
    PeerLeave(PeerId),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EingabeFehler {
    #[error("Unbekannter Befehl '{0}' (help zeigt alle Befehle)")]
    Unbekannt(String),

    #[error("'{befehl}' erwartet: {erwartet}")]
    Argumente {
        befehl: &'static str,
        erwartet: &'static str,
    },

    #[error("Ungueltiger Wert '{wert}': {grund}")]
    Wert { wert: String, grund: String },
}

impl ConsoleCommand {
    /// Parst eine Eingabezeile. Leere Zeilen ergeben `Ok(None)`.
    pub fn parsen(zeile: &str) -> Result<Option<Self>, EingabeFehler> {
        let mut teile = zeile.split_whitespace();
        let Some(befehl) = teile.next() else {
            return Ok(None);
        };
        let argumente: Vec<&str> = teile.collect();

        let cmd = match (befehl.to_ascii_lowercase().as_str(), argumente.as_slice()) {
            ("join", [kanal]) => Self::Join {
                kanal: (*kanal).to_string(),
                rolle: Role::Audience,
            },
            ("join", [kanal, rolle]) => Self::Join {
                kanal: (*kanal).to_string(),
                rolle: rolle.parse().map_err(|e: podium_core::PodiumError| {
                    EingabeFehler::Wert {
                        wert: (*rolle).to_string(),
                        grund: e.to_string(),
                    }
                })?,
            },
            ("join", _) => {
                return Err(EingabeFehler::Argumente {
                    befehl: "join",
                    erwartet: "<kanal> [audience|broadcaster]",
                })
            }
            ("speaker", [wert]) => match wert.to_ascii_lowercase().as_str() {
                "on" | "an" => Self::Speaker(true),
                "off" | "aus" => Self::Speaker(false),
                _ => {
                    return Err(EingabeFehler::Argumente {
                        befehl: "speaker",
                        erwartet: "on|off",
                    })
                }
            },
            ("speaker", _) => {
                return Err(EingabeFehler::Argumente {
                    befehl: "speaker",
                    erwartet: "on|off",
                })
            }
            ("peer-join", [id]) => Self::PeerJoin(peer_parsen(id)?),
            ("peer-leave", [id]) => Self::PeerLeave(peer_parsen(id)?),
            ("peer-join", _) => {
                return Err(EingabeFehler::Argumente {
                    befehl: "peer-join",
                    erwartet: "<id>",
                })
            }
            ("peer-leave", _) => {
                return Err(EingabeFehler::Argumente {
                    befehl: "peer-leave",
                    erwartet: "<id>",
                })
            }
            ("leave", []) => Self::Leave,
            ("ask", []) => Self::Ask,
            ("done", []) => Self::Done,
            ("status", []) => Self::Status,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(EingabeFehler::Unbekannt(zeile.trim().to_string())),
        };
        Ok(Some(cmd))
    }
}

fn peer_parsen(wert: &str) -> Result<PeerId, EingabeFehler> {
    wert.parse::<u32>()
        .map(PeerId)
        .map_err(|e| EingabeFehler::Wert {
            wert: wert.to_string(),
            grund: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(zeile: &str) -> ConsoleCommand {
        ConsoleCommand::parsen(zeile).unwrap().unwrap()
    }

    #[test]
    fn leere_zeile() {
        assert_eq!(ConsoleCommand::parsen("   "), Ok(None));
    }

    #[test]
    fn join_standardrolle_ist_audience() {
        assert_eq!(
            p("join general-chat"),
            ConsoleCommand::Join {
                kanal: "general-chat".into(),
                rolle: Role::Audience
            }
        );
    }

    #[test]
    fn join_mit_rolle() {
        assert_eq!(
            p("JOIN podium Broadcaster"),
            ConsoleCommand::Join {
                kanal: "podium".into(),
                rolle: Role::Broadcaster
            }
        );
    }

    #[test]
    fn join_kurzer_name_wird_durchgereicht() {
        // Kanalname wird erst im Koordinator geprueft
        assert!(matches!(p("join ab"), ConsoleCommand::Join { .. }));
    }

    #[test]
    fn join_falsche_rolle() {
        let e = ConsoleCommand::parsen("join podium moderator").unwrap_err();
        assert!(matches!(e, EingabeFehler::Wert { .. }));
        assert!(ConsoleCommand::parsen("join").is_err());
    }

    #[test]
    fn einfache_befehle() {
        assert_eq!(p("leave"), ConsoleCommand::Leave);
        assert_eq!(p("ask"), ConsoleCommand::Ask);
        assert_eq!(p("done"), ConsoleCommand::Done);
        assert_eq!(p("status"), ConsoleCommand::Status);
        assert_eq!(p("quit"), ConsoleCommand::Quit);
        assert_eq!(p("?"), ConsoleCommand::Help);
    }

    #[test]
    fn lautsprecher() {
        assert_eq!(p("speaker on"), ConsoleCommand::Speaker(true));
        assert_eq!(p("speaker OFF"), ConsoleCommand::Speaker(false));
        assert!(ConsoleCommand::parsen("speaker laut").is_err());
        assert!(ConsoleCommand::parsen("speaker").is_err());
    }

    #[test]
    fn peer_ereignisse() {
        assert_eq!(p("peer-join 42"), ConsoleCommand::PeerJoin(PeerId(42)));
        assert_eq!(p("peer-leave 42"), ConsoleCommand::PeerLeave(PeerId(42)));
        assert!(matches!(
            ConsoleCommand::parsen("peer-join -1"),
            Err(EingabeFehler::Wert { .. })
        ));
    }

    #[test]
    fn unbekannt_und_ueberzaehlige_argumente() {
        assert_eq!(
            ConsoleCommand::parsen("tanzen"),
            Err(EingabeFehler::Unbekannt("tanzen".into()))
        );
        assert!(ConsoleCommand::parsen("leave jetzt").is_err());
    }
}
