//! Process-wide engine settings.
//!
//! Nodes never read these directly: an [`Engine`](crate::Engine) takes a snapshot
//! when it is built, and nodes take their initial ramp time from that snapshot.

use crate::{Error, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Default ramp time in seconds.
pub const DEFAULT_RAMP_TIME: f64 = 0.0002;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

static GLOBAL: OnceLock<ArcSwap<Settings>> = OnceLock::new();

fn global_slot() -> &'static ArcSwap<Settings> {
    GLOBAL.get_or_init(|| ArcSwap::from_pointee(Settings::default()))
}

/// Configuration consumed by the engine and its nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Render sample rate, used to turn ramp times into ramp lengths.
    pub sample_rate: f64,
    /// Seconds over which an addressed parameter write is interpolated.
    pub ramp_time: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            ramp_time: DEFAULT_RAMP_TIME,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if !self.ramp_time.is_finite() || self.ramp_time < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "ramp_time {} must be a non-negative number of seconds",
                self.ramp_time
            )));
        }
        Ok(())
    }

    /// Snapshot of the process-wide settings.
    pub fn global() -> Arc<Settings> {
        global_slot().load_full()
    }

    /// Replace the process-wide settings.
    ///
    /// Engines that are already built keep the snapshot they took.
    pub fn set_global(settings: Settings) -> Result<()> {
        settings.validate()?;
        tracing::debug!(
            sample_rate = settings.sample_rate,
            ramp_time = settings.ramp_time,
            "Updating process-wide settings"
        );
        global_slot().store(Arc::new(settings));
        Ok(())
    }
}
