//! Payloads des Voice-Gateways
//!
//! Jede Nachricht ist ein JSON-Objekt `{"op": <u8>, "d": <object>}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use voxgate_core::error::{ProtocolError, ProtocolResult};
use voxgate_core::types::{GuildId, SessionId, UserId};

/// Opcodes des Voice-Gateways
pub mod opcode {
    pub const IDENTIFY: u8 = 0;
    pub const READY: u8 = 2;
    pub const HEARTBEAT: u8 = 3;
    pub const HEARTBEAT_ACK: u8 = 6;
    pub const HELLO: u8 = 8;
}

/// Obergrenze fuer das Heartbeat-Intervall aus Hello
pub const MAX_HEARTBEAT_INTERVALL: Duration = Duration::from_secs(10 * 60);

/// Rohes Gateway-Frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

/// Daten aus Ready (op 2) – Ziel des UDP-Medienpfads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadyDaten {
    pub ssrc: u32,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Gedeutete eingehende Nachricht
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayNachricht {
    Hello { heartbeat_intervall: Duration },
    Ready(ReadyDaten),
    HeartbeatAck,
    /// Fuer den Handshake irrelevanter Opcode
    Sonstige(u8),
}

#[derive(Deserialize)]
struct HelloDaten {
    heartbeat_interval: f64,
}

impl GatewayPayload {
    pub fn identify(
        server_id: &GuildId,
        user_id: &UserId,
        session_id: &SessionId,
        token: &str,
    ) -> Self {
        Self {
            op: opcode::IDENTIFY,
            d: json!({
                "server_id": server_id.as_str(),
                "user_id": user_id.as_str(),
                "session_id": session_id.as_str(),
                "token": token,
            }),
        }
    }

    pub fn heartbeat(nonce: u64) -> Self {
        Self {
            op: opcode::HEARTBEAT,
            d: json!(nonce),
        }
    }

    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self)
            .map_err(|e| ProtocolError::intern(format!("Gateway-Payload nicht serialisierbar: {e}")))
    }

    pub fn aus_json(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ProtocolError::transport(format!("Ungueltiges Gateway-Frame: {e}")))
    }

    /// Deutet das Frame anhand des Opcodes
    pub fn deuten(&self) -> ProtocolResult<GatewayNachricht> {
        match self.op {
            opcode::HELLO => {
                let hello: HelloDaten = serde_json::from_value(self.d.clone())
                    .map_err(|e| ProtocolError::transport(format!("Ungueltiges Hello: {e}")))?;
                let heartbeat_intervall = Duration::try_from_secs_f64(hello.heartbeat_interval / 1000.0)
                    .ok()
                    .filter(|d| !d.is_zero() && *d <= MAX_HEARTBEAT_INTERVALL)
                    .ok_or_else(|| ProtocolError::transport("Hello mit ungueltigem Heartbeat-Intervall"))?;
                Ok(GatewayNachricht::Hello { heartbeat_intervall })
            }
            opcode::READY => {
                let ready: ReadyDaten = serde_json::from_value(self.d.clone())
                    .map_err(|e| ProtocolError::transport(format!("Ungueltiges Ready: {e}")))?;
                Ok(GatewayNachricht::Ready(ready))
            }
            opcode::HEARTBEAT_ACK => Ok(GatewayNachricht::HeartbeatAck),
            op => Ok(GatewayNachricht::Sonstige(op)),
        }
    }
}
