//! Control-thread side of the engine.
//!
//! `SequencerHandle` owns the current configuration, publishes complete
//! snapshots through the triple buffer and queues one-shot commands. It never
//! blocks: a full command queue is reported as an error.

use crossbeam_channel::{bounded, Sender, TrySendError};
use euclid_types::{ClockSource, EngineConfig, LaneConfig, LANE_COUNT};

use crate::commands::{EngineCommand, EngineSettings};
use crate::engine::SequencerEngine;
use crate::triple_buffer::{snapshot_channel, SnapshotWriter};

pub struct SequencerHandle {
    config: EngineConfig,
    snapshots: SnapshotWriter<EngineConfig>,
    commands: Sender<EngineCommand>,
}

/// Build a connected handle/engine pair. The engine starts from `config`.
pub fn sequencer_pair(
    config: EngineConfig,
    settings: EngineSettings,
) -> (SequencerHandle, SequencerEngine) {
    let settings = settings.sanitized();
    let config = sanitize_logged(config);
    let (writer, reader) = snapshot_channel(config);
    let (tx, rx) = bounded(settings.command_queue_capacity);
    let engine = SequencerEngine::new(reader, rx, settings);
    log::info!(
        target: "audio::engine",
        "sequencer ready (max block {}, {} lanes)",
        settings.max_block_size,
        LANE_COUNT
    );
    (
        SequencerHandle {
            config,
            snapshots: writer,
            commands: tx,
        },
        engine,
    )
}

/// Sanitize a snapshot, warning when anything had to be clamped.
fn sanitize_logged(config: EngineConfig) -> EngineConfig {
    let clean = config.sanitized();
    if clean != config {
        log::warn!(target: "config", "engine config out of range; values clamped");
    }
    clean
}

impl SequencerHandle {
    /// The configuration most recently published.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the whole configuration.
    pub fn publish(&mut self, config: EngineConfig) {
        self.config = sanitize_logged(config);
        self.snapshots.publish(self.config);
    }

    /// Edit the configuration in place and publish the result.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut config = self.config;
        f(&mut config);
        self.publish(config);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.update(|c| c.global_play = playing);
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.update(|c| c.clock.bpm = bpm);
    }

    pub fn set_clock_source(&mut self, source: ClockSource) {
        log::info!(target: "audio::engine", "clock source: {}", source.name());
        self.update(|c| c.clock.source = source);
    }

    pub fn set_lane(&mut self, index: usize, lane: LaneConfig) -> Result<(), String> {
        if index >= LANE_COUNT {
            return Err(format!("lane {} out of range (0..{})", index, LANE_COUNT));
        }
        self.update(|c| c.lanes[index] = lane);
        Ok(())
    }

    /// Rewind one lane to step 0 at the start of the next block.
    pub fn request_reset(&self, index: usize) -> Result<(), String> {
        if index >= LANE_COUNT {
            return Err(format!("lane {} out of range (0..{})", index, LANE_COUNT));
        }
        self.send(EngineCommand::ResetLane(index))
    }

    pub fn request_reset_all(&self) -> Result<(), String> {
        self.send(EngineCommand::ResetAll)
    }

    fn send(&self, command: EngineCommand) -> Result<(), String> {
        log::debug!(target: "audio::engine", "queue {:?}", command);
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                log::warn!(target: "audio::engine", "command queue full, dropping {:?}", command);
                "command queue full".to_string()
            }
            TrySendError::Disconnected(_) => "engine disconnected".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rejects_bad_lane() {
        let (handle, _engine) = sequencer_pair(EngineConfig::default(), EngineSettings::default());
        assert!(handle.request_reset(6).is_err());
        assert!(handle.request_reset(5).is_ok());
    }

    #[test]
    fn full_queue_is_an_error() {
        let settings = EngineSettings { command_queue_capacity: 2, ..Default::default() };
        let (handle, _engine) = sequencer_pair(EngineConfig::default(), settings);
        assert!(handle.request_reset_all().is_ok());
        assert!(handle.request_reset_all().is_ok());
        assert_eq!(handle.request_reset_all(), Err("command queue full".to_string()));
    }

    #[test]
    fn disconnected_engine_is_an_error() {
        let (handle, engine) = sequencer_pair(EngineConfig::default(), EngineSettings::default());
        drop(engine);
        assert_eq!(handle.request_reset(0), Err("engine disconnected".to_string()));
    }

    #[test]
    fn publish_stores_sanitized_config() {
        let (mut handle, _engine) = sequencer_pair(EngineConfig::default(), EngineSettings::default());
        let mut lane = LaneConfig::default();
        lane.steps = 99;
        handle.set_lane(2, lane).unwrap();
        assert_eq!(handle.config().lanes[2].steps, 32);
        assert!(handle.set_lane(9, lane).is_err());
        handle.set_bpm(-5.0);
        assert_eq!(handle.config().clock.bpm, 120.0);
    }
}
