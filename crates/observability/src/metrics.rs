//! Prometheus-kompatible Metriken fuer voxgate
//!
//! Registrierte Metriken:
//! - `voxgate_voice_server_updates_total` – Counter: verarbeitete Updates (uebergang)
//! - `voxgate_voice_server_updates_abgelehnt_total` – Counter: abgelehnte Updates (grund)
//! - `voxgate_verbundene_gilden` – Gauge: Gilden mit verbundener Voice-Verbindung
//! - `voxgate_gilden` – Gauge: Gilden mit Voice-State

use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metriken der Voice-Koordination
#[derive(Clone)]
pub struct VoiceMetrics {
    pub registry: Arc<Registry>,

    pub updates_total: IntCounterVec,
    pub updates_abgelehnt: IntCounterVec,
    pub verbundene_gilden: IntGauge,
    pub gilden: IntGauge,
}

impl VoiceMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let updates_total = IntCounterVec::new(
            Opts::new(
                "voxgate_voice_server_updates_total",
                "Verarbeitete VOICE_SERVER_UPDATE-Notifications",
            ),
            &["uebergang"],
        )?;
        registry.register(Box::new(updates_total.clone()))?;

        let updates_abgelehnt = IntCounterVec::new(
            Opts::new(
                "voxgate_voice_server_updates_abgelehnt_total",
                "Abgelehnte VOICE_SERVER_UPDATE-Notifications",
            ),
            &["grund"],
        )?;
        registry.register(Box::new(updates_abgelehnt.clone()))?;

        let verbundene_gilden = IntGauge::with_opts(Opts::new(
            "voxgate_verbundene_gilden",
            "Gilden mit verbundener Voice-Verbindung",
        ))?;
        registry.register(Box::new(verbundene_gilden.clone()))?;

        let gilden = IntGauge::with_opts(Opts::new(
            "voxgate_gilden",
            "Gilden mit Voice-State",
        ))?;
        registry.register(Box::new(gilden.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            updates_total,
            updates_abgelehnt,
            verbundene_gilden,
            gilden,
        })
    }

    /// Zaehlt ein erfolgreich verarbeitetes Update
    pub fn update_verarbeitet(&self, uebergang: &str) {
        self.updates_total.with_label_values(&[uebergang]).inc();
    }

    /// Zaehlt ein abgelehntes Update
    pub fn update_abgelehnt(&self, grund: &str) {
        self.updates_abgelehnt.with_label_values(&[grund]).inc();
    }

    pub fn gilden_setzen(&self, gilden: usize, verbunden: usize) {
        self.gilden.set(gilden as i64);
        self.verbundene_gilden.set(verbunden as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
