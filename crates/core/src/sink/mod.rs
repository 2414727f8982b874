use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{LedMatrixError, Result};

/// Destination for everything a device pushes out: packed pattern strings,
/// a brightness level, a blink spec and an engine directive.
///
/// The hardware behind the sink is pattern-addressed, so a `pattern` write
/// replaces whatever was shown before; it is never an incremental diff.
pub trait PatternSink: Send {
    fn pattern(&mut self, data: &str) -> Result<()>;
    fn brightness(&mut self, level: u8) -> Result<()>;
    fn blink(&mut self, spec: &str) -> Result<()>;
    fn engine(&mut self, directive: &str) -> Result<()>;
}

/// File-backed sink: one file per channel under a device directory,
/// mirroring the `led_pattern` / `brightness` / `led_blink` / `led_engine`
/// nodes a LED class driver exposes. Every write is flushed immediately.
#[derive(Debug)]
pub struct FileSink {
    pattern: File,
    brightness: File,
    blink: File,
    engine: File,
}

impl FileSink {
    /// Opens (creating if necessary) the four channel files under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            pattern: open_channel(&dir.join("led_pattern"))?,
            brightness: open_channel(&dir.join("brightness"))?,
            blink: open_channel(&dir.join("led_blink"))?,
            engine: open_channel(&dir.join("led_engine"))?,
        })
    }
}

fn open_channel(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).write(true).open(path)?)
}

fn write_flushed(file: &mut File, data: &str) -> Result<()> {
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

impl PatternSink for FileSink {
    fn pattern(&mut self, data: &str) -> Result<()> {
        write_flushed(&mut self.pattern, data)
    }

    fn brightness(&mut self, level: u8) -> Result<()> {
        write_flushed(&mut self.brightness, &level.to_string())
    }

    fn blink(&mut self, spec: &str) -> Result<()> {
        write_flushed(&mut self.blink, spec)
    }

    fn engine(&mut self, directive: &str) -> Result<()> {
        write_flushed(&mut self.engine, directive)
    }
}

/// Everything a [`MemorySink`] has recorded, per channel and in order.
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    pub patterns: Vec<String>,
    pub brightness: Vec<u8>,
    pub blinks: Vec<String>,
    pub engines: Vec<String>,
}

/// In-memory sink that records every write. Clones share the same log, so
/// a test can keep one handle while the device owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn snapshot(&self) -> SinkLog {
        self.log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SinkLog>> {
        self.log
            .lock()
            .map_err(|_| LedMatrixError::msg("sink log has been poisoned"))
    }
}

impl PatternSink for MemorySink {
    fn pattern(&mut self, data: &str) -> Result<()> {
        self.lock()?.patterns.push(data.to_owned());
        Ok(())
    }

    fn brightness(&mut self, level: u8) -> Result<()> {
        self.lock()?.brightness.push(level);
        Ok(())
    }

    fn blink(&mut self, spec: &str) -> Result<()> {
        self.lock()?.blinks.push(spec.to_owned());
        Ok(())
    }

    fn engine(&mut self, directive: &str) -> Result<()> {
        self.lock()?.engines.push(directive.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_writes_all_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::open(dir.path()).unwrap();

        sink.pattern("00 ff 00").unwrap();
        sink.brightness(8).unwrap();
        sink.blink("1Hz").unwrap();
        sink.engine("Start").unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("led_pattern"), "00 ff 00");
        assert_eq!(read("brightness"), "8");
        assert_eq!(read("led_blink"), "1Hz");
        assert_eq!(read("led_engine"), "Start");
    }

    #[test]
    fn memory_sink_shares_its_log_across_clones() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        writer.pattern("00 aa").unwrap();
        writer.brightness(3).unwrap();

        let log = sink.snapshot();
        assert_eq!(log.patterns, vec!["00 aa".to_owned()]);
        assert_eq!(log.brightness, vec![3]);
    }
}
