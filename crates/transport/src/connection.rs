//! WebSocket-Verbindung zum Voice-Gateway
//!
//! Jede `WsVoiceConnection` fuehrt ihren Handshake in einem eigenen
//! tokio-Task. Gesteuert wird der Task ueber einen watch-Kanal
//! (`Weiter` / `RegionWechsel` / `Schliessen`), sodass Abbau und
//! Migration deterministisch und nicht-blockierend sind.
//!
//! ## State Machine
//! ```text
//! Neu -> Verbindet -> Verbunden
//!          ^   |         |
//!          |   v         v
//!          +-- Wiederholung (Auto-Reconnect)
//!
//! jederzeit: -> RegionWechsel | Geschlossen | Fehlgeschlagen
//! ```

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use voxgate_core::error::{ProtocolError, ProtocolResult};
use voxgate_core::types::{ChannelId, GuildId};
use voxgate_voice::connection::{
    EventArt, VerbindungsId, VerbindungsParameter, VerbindungsZustand, VoiceConnection,
};

use crate::factory::VoiceKontext;
use crate::protocol::{GatewayNachricht, GatewayPayload, ReadyDaten};

/// Frist fuer das Senden des Close-Frames beim Abbau
const CLOSE_FRIST: Duration = Duration::from_secs(1);

/// Steuersignal an den Verbindungs-Task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Steuerung {
    Weiter,
    RegionWechsel,
    Schliessen,
}

/// Wie eine einzelne Gateway-Sitzung endete
enum Ende {
    /// Abbau per Steuersignal
    Gesteuert,
    /// Gateway hat nach Ready geschlossen
    VomServerGetrennt,
}

// ---------------------------------------------------------------------------
// WsVoiceConnection
// ---------------------------------------------------------------------------

/// Voice-Verbindung ueber den Gateway-WebSocket
pub struct WsVoiceConnection {
    inner: Arc<VerbindungInner>,
}

struct VerbindungInner {
    id: VerbindungsId,
    parameter: VerbindungsParameter,
    kontext: Arc<VoiceKontext>,
    runtime: tokio::runtime::Handle,
    zustand: Mutex<VerbindungsZustand>,
    steuerung: watch::Sender<Steuerung>,
    task: Mutex<Option<JoinHandle<()>>>,
    ready: Mutex<Option<ReadyDaten>>,
}

impl WsVoiceConnection {
    pub(crate) fn neu(
        parameter: VerbindungsParameter,
        kontext: Arc<VoiceKontext>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (steuerung, _) = watch::channel(Steuerung::Weiter);
        Self {
            inner: Arc::new(VerbindungInner {
                id: VerbindungsId::new(),
                parameter,
                kontext,
                runtime,
                zustand: Mutex::new(VerbindungsZustand::Neu),
                steuerung,
                task: Mutex::new(None),
                ready: Mutex::new(None),
            }),
        }
    }

    /// UDP-Ziel aus dem letzten Ready (None vor dem Handshake)
    pub fn ready_daten(&self) -> Option<ReadyDaten> {
        self.inner.ready.lock().clone()
    }

    /// Gateway-URL dieser Verbindung
    pub fn url(&self) -> String {
        self.inner.kontext.config.url(&self.inner.parameter.endpunkt)
    }
}

impl VoiceConnection for WsVoiceConnection {
    fn id(&self) -> VerbindungsId {
        self.inner.id
    }

    fn guild_id(&self) -> &GuildId {
        &self.inner.parameter.guild_id
    }

    fn endpunkt(&self) -> &str {
        &self.inner.parameter.endpunkt
    }

    fn kanal_id(&self) -> Option<&ChannelId> {
        self.inner.parameter.kanal_id.as_ref()
    }

    fn zustand(&self) -> VerbindungsZustand {
        *self.inner.zustand.lock()
    }

    fn handshake_starten(&self) {
        let mut task = self.inner.task.lock();
        if task.is_some() || !self.inner.zustand_setzen(VerbindungsZustand::Verbindet) {
            return;
        }
        self.inner.event(EventArt::HandshakeGestartet {
            endpunkt: self.inner.parameter.endpunkt.clone(),
        });

        let steuer_rx = self.inner.steuerung.subscribe();
        let inner = Arc::clone(&self.inner);
        *task = Some(self.inner.runtime.spawn(verbindung_fuehren(inner, steuer_rx)));
    }

    fn region_wechsel_vorbereiten(&self) {
        if !self.inner.zustand_setzen(VerbindungsZustand::RegionWechsel) {
            return;
        }
        tracing::debug!(
            guild_id = %self.inner.parameter.guild_id,
            verbindung = %self.inner.id,
            "Verbindung fuer Region-Wechsel freigegeben"
        );
        self.inner.event(EventArt::RegionWechsel {
            endpunkt: self.inner.parameter.endpunkt.clone(),
        });
        self.inner.steuerung.send_replace(Steuerung::RegionWechsel);
    }

    fn schliessen(&self) {
        {
            let mut zustand = self.inner.zustand.lock();
            if matches!(
                *zustand,
                VerbindungsZustand::Geschlossen | VerbindungsZustand::Fehlgeschlagen
            ) {
                return;
            }
            *zustand = VerbindungsZustand::Geschlossen;
        }
        tracing::debug!(
            guild_id = %self.inner.parameter.guild_id,
            verbindung = %self.inner.id,
            "Verbindung wird geschlossen"
        );
        self.inner.event(EventArt::Geschlossen);
        self.inner.steuerung.send_replace(Steuerung::Schliessen);
    }
}

impl VerbindungInner {
    /// Setzt den Zustand, solange kein Endzustand erreicht ist
    fn zustand_setzen(&self, neu: VerbindungsZustand) -> bool {
        let mut zustand = self.zustand.lock();
        if zustand.ist_beendet() {
            return false;
        }
        *zustand = neu;
        true
    }

    fn event(&self, art: EventArt) {
        self.parameter.event_senden(self.id, art);
    }

    fn verbunden(&self, daten: ReadyDaten) {
        tracing::info!(
            guild_id = %self.parameter.guild_id,
            verbindung = %self.id,
            ssrc = daten.ssrc,
            udp_ip = %daten.ip,
            udp_port = daten.port,
            "Voice-Gateway bereit"
        );
        *self.ready.lock() = Some(daten);
        if self.zustand_setzen(VerbindungsZustand::Verbunden) {
            self.event(EventArt::Verbunden {
                endpunkt: self.parameter.endpunkt.clone(),
            });
        }
    }

    fn fehlgeschlagen(&self, fehler: &ProtocolError) {
        tracing::warn!(
            guild_id = %self.parameter.guild_id,
            verbindung = %self.id,
            fehler = %fehler,
            "Voice-Verbindung fehlgeschlagen"
        );
        if self.zustand_setzen(VerbindungsZustand::Fehlgeschlagen) {
            self.event(EventArt::Fehler {
                grund: fehler.to_string(),
            });
        }
    }

    fn getrennt(&self) {
        if self.zustand_setzen(VerbindungsZustand::Geschlossen) {
            tracing::info!(
                guild_id = %self.parameter.guild_id,
                verbindung = %self.id,
                "Voice-Gateway hat die Verbindung getrennt"
            );
            self.event(EventArt::Geschlossen);
        }
    }
}

// ---------------------------------------------------------------------------
// Verbindungs-Task
// ---------------------------------------------------------------------------

/// Fuehrt Sitzungen bis zum Abbau, mit Wiederholungen bei Auto-Reconnect
async fn verbindung_fuehren(inner: Arc<VerbindungInner>, mut steuerung: watch::Receiver<Steuerung>) {
    let config = &inner.kontext.config;
    let mut versuch: u32 = 0;

    loop {
        if *steuerung.borrow() != Steuerung::Weiter {
            break;
        }

        let fehler = match sitzung(&inner, &mut steuerung).await {
            Ok(Ende::Gesteuert) => break,
            Ok(Ende::VomServerGetrennt) if !inner.parameter.auto_reconnect => {
                inner.getrennt();
                break;
            }
            Ok(Ende::VomServerGetrennt) => {
                // Nach erfolgreichem Ready beginnt die Zaehlung neu
                versuch = 0;
                ProtocolError::transport("Voice-Gateway hat die Verbindung getrennt")
            }
            Err(e) => e,
        };

        if !inner.parameter.auto_reconnect || versuch >= config.max_wiederholungen {
            inner.fehlgeschlagen(&fehler);
            break;
        }
        versuch += 1;
        let wartezeit = config.wartezeit(versuch);
        tracing::info!(
            guild_id = %inner.parameter.guild_id,
            verbindung = %inner.id,
            versuch,
            wartezeit_ms = wartezeit.as_millis() as u64,
            fehler = %fehler,
            "Voice-Gateway wird erneut verbunden"
        );

        tokio::select! {
            _ = tokio::time::sleep(wartezeit) => {}
            _ = steuerung.changed() => {}
        }
        if !inner.zustand_setzen(VerbindungsZustand::Verbindet) {
            break;
        }
    }

    tracing::trace!(verbindung = %inner.id, "Verbindungs-Task beendet");
}

/// Eine Gateway-Sitzung: verbinden, Identify, auf Ready warten, Heartbeats
async fn sitzung(
    inner: &VerbindungInner,
    steuerung: &mut watch::Receiver<Steuerung>,
) -> ProtocolResult<Ende> {
    let config = &inner.kontext.config;
    let url = config.url(&inner.parameter.endpunkt);

    let verbinden = tokio::time::timeout(config.handshake_timeout(), connect_async(url.as_str()));
    let (ws, _) = tokio::select! {
        ergebnis = verbinden => ergebnis
            .map_err(|_| ProtocolError::transport("Timeout beim Verbindungsaufbau"))?
            .map_err(|e| ProtocolError::transport(format!("WebSocket-Verbindung zu {url} fehlgeschlagen: {e}")))?,
        _ = steuerung.changed() => return Ok(Ende::Gesteuert),
    };
    let (mut sink, mut stream) = ws.split();

    let identify = GatewayPayload::identify(
        &inner.parameter.guild_id,
        &inner.kontext.user_id,
        &inner.parameter.session_id,
        &inner.parameter.token,
    )
    .to_json()?;
    sink.send(Message::Text(identify.into()))
        .await
        .map_err(|e| ProtocolError::transport(format!("Identify nicht gesendet: {e}")))?;

    let frist = tokio::time::sleep(config.handshake_timeout());
    tokio::pin!(frist);
    let mut heartbeat: Option<Interval> = None;
    let mut nonce: u64 = 0;
    let mut bereit = false;

    loop {
        tokio::select! {
            nachricht = stream.next() => match nachricht {
                Some(Ok(Message::Text(text))) => {
                    match GatewayPayload::aus_json(text.as_str())?.deuten()? {
                        GatewayNachricht::Hello { heartbeat_intervall } => {
                            let mut intervall = tokio::time::interval(heartbeat_intervall);
                            intervall.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            intervall.reset();
                            heartbeat = Some(intervall);
                        }
                        GatewayNachricht::Ready(daten) => {
                            bereit = true;
                            inner.verbunden(daten);
                        }
                        GatewayNachricht::HeartbeatAck => {
                            tracing::trace!(verbindung = %inner.id, "Heartbeat bestaetigt");
                        }
                        GatewayNachricht::Sonstige(op) => {
                            tracing::trace!(verbindung = %inner.id, op, "Gateway-Nachricht ignoriert");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return if bereit {
                        Ok(Ende::VomServerGetrennt)
                    } else {
                        Err(ProtocolError::transport("Voice-Gateway hat waehrend des Handshakes geschlossen"))
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(ProtocolError::transport(format!("Voice-Gateway-Lesefehler: {e}")));
                }
            },

            _ = heartbeat_tick(&mut heartbeat) => {
                nonce = nonce.wrapping_add(1);
                let payload = GatewayPayload::heartbeat(nonce).to_json()?;
                sink.send(Message::Text(payload.into()))
                    .await
                    .map_err(|e| ProtocolError::transport(format!("Heartbeat nicht gesendet: {e}")))?;
            }

            _ = &mut frist, if !bereit => {
                return Err(ProtocolError::transport("Handshake-Timeout: kein Ready empfangen"));
            }

            Ok(()) = steuerung.changed() => {
                if *steuerung.borrow() != Steuerung::Weiter {
                    let _ = tokio::time::timeout(CLOSE_FRIST, sink.send(Message::Close(None))).await;
                    return Ok(Ende::Gesteuert);
                }
            }
        }
    }
}

async fn heartbeat_tick(intervall: &mut Option<Interval>) {
    match intervall {
        Some(intervall) => {
            intervall.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
