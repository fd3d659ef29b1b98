use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use euclid_audio::{sequencer_pair, BlockContext};
use euclid_core::config::Config;
use euclid_core::midi::{encode, parse_message, parse_realtime};
use euclid_types::{ClockMessage, ClockSource, MidiEvent, MidiMessage, TimedClockMessage};

const DEFAULT_BLOCKS: usize = 16;
const DEFAULT_BLOCK_SIZE: usize = 512;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("euclid")
        .join("euclid.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/euclid.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("euclid: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("euclid: failed to initialize logger: {}", e);
        return;
    }

    log::info!("euclid starting (log level: {:?})", log_level);
}

/// Value following `flag`, parsed. Missing or malformed values keep `default`.
fn flag_value<T: FromStr + Copy + std::fmt::Debug>(args: &[String], flag: &str, default: T) -> T {
    let Some(raw) = args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            log::warn!("ignoring malformed {} {:?}, using {:?}", flag, raw, default);
            default
        }
    }
}

/// Parse one clock input line: an absolute sample followed by hex bytes,
/// e.g. `1300 F8`. Blank lines and `#` comments yield `None`.
fn parse_clock_line(line: &str) -> Result<Option<(u64, Vec<ClockMessage>)>, String> {
    let line = line.split('#').next().unwrap_or("").trim();
    let mut fields = line.split_whitespace();
    let Some(sample) = fields.next() else {
        return Ok(None);
    };
    let sample: u64 = sample
        .parse()
        .map_err(|_| format!("bad sample position {:?}", sample))?;
    let bytes = fields
        .map(|b| u8::from_str_radix(b, 16).map_err(|_| format!("bad byte {:?}", b)))
        .collect::<Result<Vec<u8>, String>>()?;

    let clock = parse_realtime(&bytes);
    if clock.is_empty() {
        match parse_message(&bytes) {
            Some(message) => log::warn!("sample {}: ignoring {}", sample, describe(&message)),
            None => log::warn!("sample {}: no clock bytes in {:02X?}", sample, bytes),
        }
    }
    Ok(Some((sample, clock)))
}

/// Read a clock input file into `(sample, message)` pairs sorted by sample.
fn load_clock_input(path: &str) -> std::io::Result<Vec<(u64, ClockMessage)>> {
    let text = std::fs::read_to_string(path)?;
    let mut schedule = Vec::new();
    for (number, line) in text.lines().enumerate() {
        match parse_clock_line(line) {
            Ok(Some((sample, clock))) => schedule.extend(clock.into_iter().map(|kind| (sample, kind))),
            Ok(None) => {}
            Err(e) => log::warn!("{}:{}: {}", path, number + 1, e),
        }
    }
    schedule.sort_by_key(|(sample, _)| *sample);
    Ok(schedule)
}

/// Clock messages falling inside block `block`, as block-relative offsets.
fn block_clock(schedule: &[(u64, ClockMessage)], block: usize, block_size: usize) -> Vec<TimedClockMessage> {
    let start = (block * block_size) as u64;
    let end = start + block_size as u64;
    schedule
        .iter()
        .filter(|(sample, _)| *sample >= start && *sample < end)
        .map(|&(sample, kind)| TimedClockMessage::new((sample - start) as u32, kind))
        .collect()
}

fn describe(message: &MidiMessage) -> String {
    match message {
        MidiMessage::NoteOn { channel, note, velocity } => {
            format!("NoteOn ch={} note={} vel={}", channel, note, velocity)
        }
        MidiMessage::NoteOff { channel, note } => format!("NoteOff ch={} note={}", channel, note),
        MidiMessage::PitchBend { channel, value } => format!("PitchBend ch={} value={}", channel, value),
        MidiMessage::Clock(kind) => format!("Clock {}", kind.name()),
    }
}

fn format_event(block: usize, event: &MidiEvent) -> String {
    let (bytes, len) = encode(&event.message);
    let hex: Vec<String> = bytes[..len].iter().map(|b| format!("{:02X}", b)).collect();
    let lane = event
        .lane
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} {} {} {} {}",
        block,
        event.offset,
        lane,
        event.route,
        describe(&event.message),
        hex.join(" ")
    )
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let blocks = flag_value(&args, "--blocks", DEFAULT_BLOCKS);
    let block_size = flag_value(&args, "--block-size", DEFAULT_BLOCK_SIZE);

    let clock_input = match args.iter().position(|a| a == "--clock-in").and_then(|i| args.get(i + 1)) {
        Some(path) => Some(load_clock_input(path)?),
        None => None,
    };

    let config = Config::load();
    let mut engine_config = config.engine_config();
    engine_config.clock.source = if clock_input.is_some() {
        ClockSource::External
    } else {
        ClockSource::Internal
    };
    engine_config.clock.bpm = flag_value(&args, "--bpm", engine_config.clock.bpm);
    engine_config.global_play = true;

    let sample_rate = config.sample_rate();
    let (_handle, mut engine) = sequencer_pair(engine_config, config.engine_settings());
    log::info!(
        "rendering {} blocks of {} samples at {} Hz, {} bpm",
        blocks,
        block_size,
        sample_rate,
        engine.config().clock.bpm
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let ctx = BlockContext::new(sample_rate, block_size);
    let schedule = clock_input.unwrap_or_default();
    let mut events = Vec::with_capacity(block_size * 4);
    let mut running = engine.is_running();
    for block in 0..blocks {
        events.clear();
        let clock_in = block_clock(&schedule, block, block_size);
        engine.process_block(&ctx, &clock_in, &mut events);
        for event in &events {
            writeln!(out, "{}", format_event(block, event))?;
        }
        if engine.is_running() != running {
            running = engine.is_running();
            log::debug!(
                "transport {} in block {} (sample {})",
                if running { "running" } else { "stopped" },
                block,
                engine.global_sample()
            );
        }
    }
    out.flush()?;

    if engine.dropped_events() > 0 {
        log::warn!("{} events dropped", engine.dropped_events());
    }
    Ok(())
}
