use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, Timelike};
use tracing::{debug, info, warn};

use crate::command::{self, Action, DeviceSettings};
use crate::config::WorkerConfig;
use crate::effects;
use crate::frame::FrameBuffer;
use crate::sink::PatternSink;
use crate::spectrum::{bar_heights, SpectrumAnalyzer};
use crate::{LedMatrixError, Result};

/// Wall-clock fields of the most recently rendered time, kept so a tick
/// can redraw only the groups that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClockSnapshot {
    hour: u32,
    minute: u32,
    second: u32,
}

impl ClockSnapshot {
    fn now() -> Self {
        let now = Local::now();
        Self {
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        }
    }
}

/// Everything behind the device's one mutex. The worker tick and any
/// control call lock it whole, so a redraw and an action never interleave
/// mid-update.
struct DeviceState {
    frame: FrameBuffer,
    settings: DeviceSettings,
    timing: bool,
    waving: bool,
    last_clock: ClockSnapshot,
    wave_history: [u8; 16],
}

/// One registered display: a frame buffer, a worker thread ticking at a
/// fixed cadence, and the locked state both share.
pub struct Device {
    name: String,
    state: Arc<Mutex<DeviceState>>,
    spectrum: Arc<SpectrumAnalyzer>,
    exit: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Device {
    /// Builds the frame buffer, takes the initial clock snapshot and starts
    /// the worker thread. A failed spawn drops everything already built, so
    /// no half-initialized device escapes.
    pub fn spawn(
        name: &str,
        sink: Box<dyn PatternSink>,
        spectrum: Arc<SpectrumAnalyzer>,
        config: WorkerConfig,
    ) -> Result<Self> {
        let state = Arc::new(Mutex::new(DeviceState {
            frame: FrameBuffer::new(sink),
            settings: DeviceSettings::default(),
            timing: false,
            waving: false,
            last_clock: ClockSnapshot::now(),
            wave_history: [0; 16],
        }));
        let exit = Arc::new(AtomicBool::new(false));

        let worker = thread::Builder::new().name(format!("led-{name}")).spawn({
            let state = Arc::clone(&state);
            let exit = Arc::clone(&exit);
            let spectrum = Arc::clone(&spectrum);
            let config = config.clone();
            move || worker_loop(&state, &exit, &spectrum, &config)
        })?;

        info!(name, "device worker started");
        Ok(Self {
            name: name.to_owned(),
            state,
            spectrum,
            exit,
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses and executes one command under the device lock. Brightness
    /// and degree adjustments commit during parsing, so an out-of-range
    /// parameter still resolves to the stored value.
    pub fn control(&self, cmd: &str) -> Result<()> {
        let mut state = self.lock()?;
        let action = command::parse(cmd, &mut state.settings)?;
        debug!(name = %self.name, ?action, "executing");
        execute(&mut state, &action, &self.spectrum)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>> {
        self.state
            .lock()
            .map_err(|_| LedMatrixError::msg("device state has been poisoned"))
    }
}

impl Drop for Device {
    /// Raises the exit flag and waits for the worker to observe it at its
    /// next tick; the worker is never cancelled mid-critical-section.
    fn drop(&mut self) {
        self.exit.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!(name = %self.name, "device worker stopped");
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("name", &self.name).finish()
    }
}

fn worker_loop(
    state: &Mutex<DeviceState>,
    exit: &AtomicBool,
    spectrum: &SpectrumAnalyzer,
    config: &WorkerConfig,
) {
    let mut tick: u64 = 0;

    while !exit.load(Ordering::Relaxed) {
        {
            let Ok(mut state) = state.lock() else {
                break;
            };

            // The clock has one-second resolution; checking every other
            // tick of the half-second cadence is enough.
            if state.timing && tick % 2 == 0 {
                if let Err(err) = sync_clock(&mut state, ClockSnapshot::now()) {
                    warn!(%err, "clock redraw failed");
                }
            }

            if state.waving {
                if let Err(err) = tick_wave(&mut state, spectrum) {
                    warn!(%err, "wave redraw failed");
                }
            }
        }

        thread::sleep(tick_sleep(config));
        tick += 1;
    }

    debug!("worker exiting");
}

/// Time until the next tick boundary, never below the configured floor.
fn tick_sleep(config: &WorkerConfig) -> Duration {
    let period_us = config.tick_millis.saturating_mul(1000).max(1);
    let now_us = u64::from(Local::now().timestamp_subsec_micros());
    let remaining = period_us - (now_us % period_us);
    let floor_us = config.min_sleep_millis.saturating_mul(1000);
    Duration::from_micros(remaining.max(floor_us))
}

/// Redraws only the digit groups whose value changed since the last
/// rendered snapshot, each as an independent partial update.
fn sync_clock(state: &mut DeviceState, now: ClockSnapshot) -> Result<()> {
    let last = state.last_clock;
    let mut changed = false;

    if now.second != last.second {
        effects::draw_seconds(&mut state.frame, now.second)?;
        changed = true;
    }
    if now.minute != last.minute {
        effects::draw_minute(&mut state.frame, now.minute)?;
        changed = true;
    }
    if now.hour != last.hour {
        effects::draw_hour(&mut state.frame, now.hour)?;
        changed = true;
    }

    if changed {
        state.last_clock = now;
    }
    Ok(())
}

/// One wave-mode redraw: bar chart from the amplitude snapshot with the
/// per-bar decay rule, or the random wave while nothing has been fed yet.
fn tick_wave(state: &mut DeviceState, spectrum: &SpectrumAnalyzer) -> Result<()> {
    let amplitudes = spectrum.amplitudes();
    if amplitudes.is_empty() {
        return effects::draw_random_wave(&mut state.frame, state.settings.degree);
    }

    let target = bar_heights(&amplitudes);
    for (slot, bar) in state.wave_history.iter_mut().enumerate() {
        // Rise immediately, fall by at most one row per tick.
        *bar = if target[slot] >= *bar {
            target[slot]
        } else {
            *bar - 1
        };
    }

    let heights = state.wave_history;
    effects::draw_bar_wave(&mut state.frame, &heights, state.settings.degree)
}

fn execute(state: &mut DeviceState, action: &Action, spectrum: &SpectrumAnalyzer) -> Result<()> {
    match action {
        Action::FullyOn => {
            state.timing = false;
            state.waving = false;
            state.frame.blank(true)
        }
        Action::FullyOff => {
            state.timing = false;
            state.waving = false;
            state.frame.clear()
        }
        Action::SetBrightness(level) => state.frame.brightness(*level),
        Action::SetEngine(directive) => state.frame.engine(directive.as_deref().unwrap_or("???")),
        Action::SetBlink(spec) => state.frame.blink(spec.as_deref().unwrap_or("???")),
        Action::ShowTime => {
            state.timing = true;
            state.waving = false;
            let now = ClockSnapshot::now();
            effects::draw_clock(&mut state.frame, now.hour, now.minute, now.second)?;
            state.last_clock = now;
            Ok(())
        }
        Action::ShowWave(_) => {
            state.timing = false;
            state.waving = true;
            tick_wave(state, spectrum)
        }
        Action::ShowLove => effects::draw_heart(&mut state.frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpectrumConfig;
    use crate::sink::MemorySink;

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            tick_millis: 5,
            min_sleep_millis: 1,
        }
    }

    fn analyzer() -> Arc<SpectrumAnalyzer> {
        Arc::new(SpectrumAnalyzer::new(SpectrumConfig::default()))
    }

    fn state(sink: &MemorySink) -> DeviceState {
        DeviceState {
            frame: FrameBuffer::new(Box::new(sink.clone())),
            settings: DeviceSettings::default(),
            timing: false,
            waving: false,
            last_clock: ClockSnapshot {
                hour: 10,
                minute: 30,
                second: 5,
            },
            wave_history: [0; 16],
        }
    }

    #[test]
    fn second_change_redraws_only_the_seconds_bar() {
        let sink = MemorySink::new();
        let mut state = state(&sink);

        sync_clock(
            &mut state,
            ClockSnapshot {
                hour: 10,
                minute: 30,
                second: 6,
            },
        )
        .unwrap();

        let log = sink.snapshot();
        // Seconds go out as 16 incremental word writes; a digit redraw
        // would have produced a full address-prefixed pattern.
        assert_eq!(log.patterns.len(), 16);
        assert!(log.patterns.iter().all(|p| p.len() == 4));
        assert_eq!(state.last_clock.second, 6);
    }

    #[test]
    fn unchanged_time_draws_nothing() {
        let sink = MemorySink::new();
        let mut state = state(&sink);

        let current = state.last_clock;
        sync_clock(&mut state, current).unwrap();

        assert!(sink.snapshot().patterns.is_empty());
    }

    #[test]
    fn minute_rollover_redraws_minutes_and_seconds() {
        let sink = MemorySink::new();
        let mut state = state(&sink);

        sync_clock(
            &mut state,
            ClockSnapshot {
                hour: 10,
                minute: 31,
                second: 0,
            },
        )
        .unwrap();

        let log = sink.snapshot();
        // Two digit flushes on top of the incremental seconds writes.
        let full: Vec<_> = log.patterns.iter().filter(|p| p.starts_with("00 ")).collect();
        assert_eq!(full.len(), 2);
    }

    #[test]
    fn fully_on_blanks_and_clears_both_modes() {
        let sink = MemorySink::new();
        let mut state = state(&sink);
        state.timing = true;
        state.waving = true;

        execute(&mut state, &Action::FullyOn, &analyzer()).unwrap();

        assert!(!state.timing && !state.waving);
        let log = sink.snapshot();
        assert!(log.patterns.last().unwrap().split(' ').skip(1).all(|b| b == "ff"));
    }

    #[test]
    fn show_love_leaves_the_mode_flags_alone() {
        let sink = MemorySink::new();
        let mut state = state(&sink);
        state.timing = true;

        execute(&mut state, &Action::ShowLove, &analyzer()).unwrap();

        assert!(state.timing);
        assert!(!state.waving);
    }

    #[test]
    fn show_time_arms_the_clock_and_snapshots_it() {
        let sink = MemorySink::new();
        let mut state = state(&sink);
        state.waving = true;

        execute(&mut state, &Action::ShowTime, &analyzer()).unwrap();

        assert!(state.timing);
        assert!(!state.waving);

        // Full render: clear plus four digit flushes plus the seconds bar.
        let log = sink.snapshot();
        let full = log.patterns.iter().filter(|p| p.starts_with("00 ")).count();
        assert_eq!(full, 5);
        assert_eq!(log.patterns.len() - full, 16);
    }

    #[test]
    fn absent_engine_payload_falls_back_to_placeholder() {
        let sink = MemorySink::new();
        let mut state = state(&sink);

        execute(&mut state, &Action::SetEngine(None), &analyzer()).unwrap();
        execute(
            &mut state,
            &Action::SetBlink(Some("1Hz".to_owned())),
            &analyzer(),
        )
        .unwrap();

        let log = sink.snapshot();
        assert_eq!(log.engines, vec!["???".to_owned()]);
        assert_eq!(log.blinks, vec!["1Hz".to_owned()]);
    }

    #[test]
    fn wave_bars_rise_immediately_and_decay_slowly() {
        let sink = MemorySink::new();
        let mut state = state(&sink);
        let spectrum = analyzer();

        // Loud tone on the lowest display bin, then silence.
        let loud: Vec<f32> = (0..512)
            .map(|i| 120.0 * (2.0 * std::f32::consts::PI * i as f32 / 512.0).sin())
            .collect();
        spectrum.feed(&loud).unwrap();
        tick_wave(&mut state, &spectrum).unwrap();
        let risen = state.wave_history[0];
        assert!(risen > 1, "bar did not rise: {risen}");

        spectrum.feed(&vec![0.0; 512]).unwrap();
        tick_wave(&mut state, &spectrum).unwrap();
        assert_eq!(state.wave_history[0], risen - 1);
    }

    #[test]
    fn unfed_spectrum_falls_back_to_the_random_wave() {
        let sink = MemorySink::new();
        let mut state = state(&sink);

        tick_wave(&mut state, &analyzer()).unwrap();

        // The random wave always lights the bottom row at degree 0.
        assert!((0..16).all(|x| state.frame.pixel(x, 15)));
    }

    #[test]
    fn device_worker_starts_executes_and_joins() {
        let sink = MemorySink::new();
        let device = Device::spawn(
            "panel.0",
            Box::new(sink.clone()),
            analyzer(),
            fast_config(),
        )
        .unwrap();

        assert_eq!(device.name(), "panel.0");
        device.control("Fully On").unwrap();
        device.control("Brightness 9").unwrap();
        assert!(device.control("No Such Command").is_err());

        drop(device);

        let log = sink.snapshot();
        assert!(!log.patterns.is_empty());
        assert_eq!(log.brightness, vec![9]);
    }
}
