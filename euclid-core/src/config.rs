use std::path::{Path, PathBuf};

use serde::Deserialize;

use euclid_audio::EngineSettings;
use euclid_types::{
    ArpMode, BassSettings, ClockRole, ClockSettings, ClockSource, EngineConfig, LaneConfig,
    NoteSource, DEFAULT_SAMPLE_RATE, LANE_COUNT, MAX_STEPS,
};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Tempo range accepted from a config file.
const CONFIG_MIN_BPM: f64 = 40.0;
const CONFIG_MAX_BPM: f64 = 300.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    clock: ClockConfig,
    #[serde(default)]
    bass: BassConfig,
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    defaults: LaneEntry,
    #[serde(default)]
    lanes: Vec<LaneEntry>,
}

#[derive(Deserialize, Default)]
struct ClockConfig {
    source: Option<String>,
    role: Option<String>,
    bpm: Option<f64>,
    sample_rate: Option<f64>,
}

#[derive(Deserialize, Default)]
struct BassConfig {
    glide_time: Option<f32>,
    glide_curve: Option<f32>,
    pitch_bend_range: Option<u8>,
    mono_legato: Option<bool>,
}

#[derive(Deserialize, Default)]
struct EngineSection {
    max_block_size: Option<usize>,
    command_queue_capacity: Option<usize>,
}

/// Lane fields as written in `[defaults]` and `[[lanes]]`.
#[derive(Deserialize, Default, Clone)]
struct LaneEntry {
    /// Only meaningful in `[[lanes]]`
    index: Option<usize>,
    active: Option<bool>,
    muted: Option<bool>,
    solo: Option<bool>,
    steps: Option<u8>,
    pulses: Option<u8>,
    swing: Option<f32>,
    microtiming: Option<Vec<f32>>,
    velocity: Option<u8>,
    note_length: Option<f32>,
    arp_active: Option<bool>,
    arp_mode: Option<String>,
    arp_rate_index: Option<u8>,
    arp_note_mask: Option<u8>,
    /// Shorthand for a single-note source
    note: Option<u8>,
    /// "single:N", "scale:ID" or "chord:ID"; wins over `note`
    source: Option<String>,
    midi_channel: Option<u8>,
    output_route: Option<u8>,
}

pub struct Config {
    clock: ClockConfig,
    bass: BassConfig,
    engine: EngineSection,
    defaults: LaneEntry,
    lanes: Vec<LaneEntry>,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::from_file(embedded()),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing or
    /// malformed file leaves the defaults untouched.
    pub fn load_from(path: &Path) -> Self {
        let mut base = embedded();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => {
                    log::info!(target: "config", "loaded {}", path.display());
                    merge_clock(&mut base.clock, user.clock);
                    merge_bass(&mut base.bass, user.bass);
                    merge_engine(&mut base.engine, user.engine);
                    merge_lane(&mut base.defaults, user.defaults);
                    base.lanes.extend(user.lanes);
                }
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        Self::from_file(base)
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            clock: file.clock,
            bass: file.bass,
            engine: file.engine,
            defaults: file.defaults,
            lanes: file.lanes,
        }
    }

    pub fn clock(&self) -> ClockSettings {
        let fallback = ClockSettings::default();
        ClockSettings {
            source: self
                .clock
                .source
                .as_deref()
                .and_then(|s| parse_logged(s, "clock source", parse_clock_source))
                .unwrap_or(fallback.source),
            role: self
                .clock
                .role
                .as_deref()
                .and_then(|s| parse_logged(s, "clock role", parse_clock_role))
                .unwrap_or(fallback.role),
            bpm: self
                .clock
                .bpm
                .filter(|bpm| bpm.is_finite())
                .map(|bpm| bpm.clamp(CONFIG_MIN_BPM, CONFIG_MAX_BPM))
                .unwrap_or(fallback.bpm),
        }
    }

    /// Sample rate used when no host supplies one.
    pub fn sample_rate(&self) -> f64 {
        self.clock
            .sample_rate
            .filter(|sr| sr.is_finite() && *sr > 0.0)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn bass(&self) -> BassSettings {
        let fallback = BassSettings::default();
        BassSettings {
            glide_time: self.bass.glide_time.unwrap_or(fallback.glide_time),
            glide_curve: self.bass.glide_curve.unwrap_or(fallback.glide_curve),
            pitch_bend_range: self
                .bass
                .pitch_bend_range
                .unwrap_or(fallback.pitch_bend_range),
            mono_legato: self.bass.mono_legato.unwrap_or(fallback.mono_legato),
        }
        .sanitized()
    }

    /// Lane configuration after applying `[defaults]` and every matching `[[lanes]]` entry.
    pub fn lane(&self, index: usize) -> LaneConfig {
        let mut lane = LaneConfig::default();
        apply_lane_entry(&mut lane, &self.defaults);
        for entry in self.lanes.iter().filter(|e| e.index == Some(index)) {
            apply_lane_entry(&mut lane, entry);
        }
        lane.sanitized()
    }

    /// Full engine snapshot built from the config. The transport starts stopped.
    pub fn engine_config(&self) -> EngineConfig {
        for entry in &self.lanes {
            match entry.index {
                Some(i) if i < LANE_COUNT => {}
                other => {
                    log::warn!(target: "config", "ignoring lane entry with index {:?}", other)
                }
            }
        }
        EngineConfig {
            clock: self.clock(),
            bass: self.bass(),
            lanes: std::array::from_fn(|i| self.lane(i)),
            global_play: false,
        }
        .sanitized()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let fallback = EngineSettings::default();
        EngineSettings {
            max_block_size: self
                .engine
                .max_block_size
                .unwrap_or(fallback.max_block_size),
            command_queue_capacity: self
                .engine
                .command_queue_capacity
                .unwrap_or(fallback.command_queue_capacity),
        }
        .sanitized()
    }
}

fn embedded() -> ConfigFile {
    match toml::from_str(DEFAULT_CONFIG) {
        Ok(file) => file,
        Err(e) => {
            log::error!(target: "config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("euclid").join("config.toml"))
}

fn merge_clock(base: &mut ClockConfig, user: ClockConfig) {
    if user.source.is_some() {
        base.source = user.source;
    }
    if user.role.is_some() {
        base.role = user.role;
    }
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
}

fn merge_bass(base: &mut BassConfig, user: BassConfig) {
    if user.glide_time.is_some() {
        base.glide_time = user.glide_time;
    }
    if user.glide_curve.is_some() {
        base.glide_curve = user.glide_curve;
    }
    if user.pitch_bend_range.is_some() {
        base.pitch_bend_range = user.pitch_bend_range;
    }
    if user.mono_legato.is_some() {
        base.mono_legato = user.mono_legato;
    }
}

fn merge_engine(base: &mut EngineSection, user: EngineSection) {
    if user.max_block_size.is_some() {
        base.max_block_size = user.max_block_size;
    }
    if user.command_queue_capacity.is_some() {
        base.command_queue_capacity = user.command_queue_capacity;
    }
}

fn merge_lane(base: &mut LaneEntry, user: LaneEntry) {
    macro_rules! take {
        ($($field:ident),*) => {
            $(if user.$field.is_some() {
                base.$field = user.$field;
            })*
        };
    }
    take!(
        index,
        active,
        muted,
        solo,
        steps,
        pulses,
        swing,
        microtiming,
        velocity,
        note_length,
        arp_active,
        arp_mode,
        arp_rate_index,
        arp_note_mask,
        note,
        source,
        midi_channel,
        output_route
    );
}

fn apply_lane_entry(lane: &mut LaneConfig, entry: &LaneEntry) {
    macro_rules! set {
        ($($field:ident),*) => {
            $(if let Some(value) = entry.$field {
                lane.$field = value;
            })*
        };
    }
    set!(
        active,
        muted,
        solo,
        steps,
        pulses,
        swing,
        velocity,
        note_length,
        arp_active,
        arp_rate_index,
        arp_note_mask,
        midi_channel,
        output_route
    );
    if let Some(offsets) = &entry.microtiming {
        lane.microtiming = [0.0; MAX_STEPS];
        for (dst, src) in lane.microtiming.iter_mut().zip(offsets.iter()) {
            *dst = *src;
        }
    }
    if let Some(mode) = entry
        .arp_mode
        .as_deref()
        .and_then(|s| parse_logged(s, "arp mode", parse_arp_mode))
    {
        lane.arp_mode = mode;
    }
    if let Some(note) = entry.note {
        lane.note_source = NoteSource::Single(note);
    }
    if let Some(source) = entry
        .source
        .as_deref()
        .and_then(|s| parse_logged(s, "note source", parse_note_source))
    {
        lane.note_source = source;
    }
}

fn parse_logged<T>(s: &str, what: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(s);
    if parsed.is_none() {
        log::warn!(target: "config", "unknown {} {:?}, using default", what, s);
    }
    parsed
}

fn parse_clock_source(s: &str) -> Option<ClockSource> {
    match s.to_lowercase().as_str() {
        "host" | "daw" => Some(ClockSource::Host),
        "internal" => Some(ClockSource::Internal),
        "external" | "midi" => Some(ClockSource::External),
        _ => None,
    }
}

fn parse_clock_role(s: &str) -> Option<ClockRole> {
    match s.to_lowercase().as_str() {
        "master" => Some(ClockRole::Master),
        "slave" | "follower" => Some(ClockRole::Slave),
        _ => None,
    }
}

fn parse_arp_mode(s: &str) -> Option<ArpMode> {
    match s.to_lowercase().as_str() {
        "up" => Some(ArpMode::Up),
        "down" => Some(ArpMode::Down),
        "updown" | "up-down" | "up_down" => Some(ArpMode::UpDown),
        "random" | "rand" => Some(ArpMode::Random),
        _ => None,
    }
}

fn parse_note_source(s: &str) -> Option<NoteSource> {
    let (kind, value) = match s.split_once(':') {
        Some((kind, value)) => (kind.trim().to_lowercase(), value.trim()),
        None => ("single".to_string(), s.trim()),
    };
    let value: u8 = value.parse().ok()?;
    match kind.as_str() {
        "single" | "note" if value <= 127 => Some(NoteSource::Single(value)),
        "scale" => Some(NoteSource::Scale(value)),
        "chord" => Some(NoteSource::Chord(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_embedded_config() {
        let config = Config::from_file(embedded());
        let engine = config.engine_config();
        assert_eq!(engine.clock.source, ClockSource::Host);
        assert_eq!(engine.clock.role, ClockRole::Slave);
        assert_eq!(engine.clock.bpm, 120.0);
        assert!(!engine.global_play);
        assert_eq!(config.sample_rate(), 44_100.0);
        assert_eq!(engine.bass, BassSettings::default());

        assert_eq!(engine.lanes[0].note_source, NoteSource::Single(36));
        assert_eq!(engine.lanes[0].steps, 16);
        assert_eq!(engine.lanes[1].pulses, 3);
        assert_eq!(engine.lanes[3].note_source, NoteSource::Scale(0));
        assert_eq!(engine.lanes[4].arp_mode, ArpMode::UpDown);
        assert_eq!(engine.lanes[5].midi_channel, 2);
        assert!(engine.lanes.iter().all(|l| l.velocity == 100));

        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn test_user_file_overrides_fields() {
        let file = write_config(
            r#"
[clock]
source = "internal"
bpm = 98.5

[bass]
pitch_bend_range = 2

[defaults]
velocity = 80

[[lanes]]
index = 2
steps = 5
pulses = 2
solo = true
microtiming = [0.1, -0.1]
"#,
        );
        let config = Config::load_from(file.path());
        let engine = config.engine_config();
        assert_eq!(engine.clock.source, ClockSource::Internal);
        assert_eq!(engine.clock.role, ClockRole::Slave);
        assert_eq!(engine.clock.bpm, 98.5);
        assert_eq!(engine.bass.pitch_bend_range, 2);
        assert!(engine.bass.mono_legato);
        assert!(engine.lanes.iter().all(|l| l.velocity == 80));
        assert_eq!(engine.lanes[2].steps, 5);
        assert_eq!(engine.lanes[2].pulses, 2);
        assert!(engine.lanes[2].solo);
        assert_eq!(engine.lanes[2].microtiming[1], -0.1);
        assert_eq!(engine.lanes[2].microtiming[2], 0.0);
        // Embedded lane entries still apply
        assert_eq!(engine.lanes[0].note_source, NoteSource::Single(36));
    }

    #[test]
    fn test_malformed_file_keeps_defaults() {
        let file = write_config("[clock\nsource = ");
        let config = Config::load_from(file.path());
        assert_eq!(config.clock().source, ClockSource::Host);
        assert_eq!(config.lane(1).pulses, 3);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config.clock().bpm, 120.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let file = write_config(
            r#"
[clock]
bpm = 1000.0
source = "sundial"

[engine]
max_block_size = 1
command_queue_capacity = 0

[[lanes]]
index = 0
steps = 40
pulses = 50
note_length = 3.0
midi_channel = 0

[[lanes]]
index = 9
steps = 3
"#,
        );
        let config = Config::load_from(file.path());
        let engine = config.engine_config();
        assert_eq!(engine.clock.bpm, CONFIG_MAX_BPM);
        assert_eq!(engine.clock.source, ClockSource::Host);
        assert_eq!(engine.lanes[0].steps, 32);
        assert_eq!(engine.lanes[0].pulses, 32);
        assert_eq!(engine.lanes[0].note_length, 1.0);
        assert_eq!(engine.lanes[0].midi_channel, 1);
        let settings = config.engine_settings();
        assert_eq!(settings.max_block_size, 16);
        assert_eq!(settings.command_queue_capacity, 1);
    }

    #[test]
    fn test_parse_clock_source() {
        assert_eq!(parse_clock_source("Host"), Some(ClockSource::Host));
        assert_eq!(parse_clock_source("INTERNAL"), Some(ClockSource::Internal));
        assert_eq!(parse_clock_source("midi"), Some(ClockSource::External));
        assert_eq!(parse_clock_source("wall"), None);
    }

    #[test]
    fn test_parse_arp_mode() {
        assert_eq!(parse_arp_mode("up"), Some(ArpMode::Up));
        assert_eq!(parse_arp_mode("Down"), Some(ArpMode::Down));
        assert_eq!(parse_arp_mode("up-down"), Some(ArpMode::UpDown));
        assert_eq!(parse_arp_mode("random"), Some(ArpMode::Random));
        assert_eq!(parse_arp_mode("sideways"), None);
    }

    #[test]
    fn test_parse_note_source() {
        assert_eq!(parse_note_source("64"), Some(NoteSource::Single(64)));
        assert_eq!(parse_note_source("single:40"), Some(NoteSource::Single(40)));
        assert_eq!(parse_note_source("scale:3"), Some(NoteSource::Scale(3)));
        assert_eq!(parse_note_source("Chord: 2"), Some(NoteSource::Chord(2)));
        assert_eq!(parse_note_source("single:200"), None);
        assert_eq!(parse_note_source("drone:1"), None);
        assert_eq!(parse_note_source("scale:x"), None);
    }

    #[test]
    fn test_parse_clock_role() {
        assert_eq!(parse_clock_role("master"), Some(ClockRole::Master));
        assert_eq!(parse_clock_role("Slave"), Some(ClockRole::Slave));
        assert_eq!(parse_clock_role("boss"), None);
    }
}
