use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::config::ServiceConfig;
use crate::device::Device;
use crate::sink::{FileSink, PatternSink};
use crate::spectrum::SpectrumAnalyzer;
use crate::{LedMatrixError, Result};

/// Builds the sink for a newly registered device, given its name.
pub type SinkFactory = Box<dyn Fn(&str) -> Result<Box<dyn PatternSink>> + Send + Sync>;

/// Owns the device table, the process-wide spectrum analyzer and the sink
/// factory. One instance per process replaces the ambient globals a
/// C-style service would keep; there is no hidden state beyond it.
///
/// The table itself sits behind its own mutex, so concurrent register and
/// unregister calls on the same name serialize instead of racing.
pub struct LedService {
    config: ServiceConfig,
    devices: Mutex<Vec<Device>>,
    spectrum: Arc<SpectrumAnalyzer>,
    make_sink: SinkFactory,
}

impl LedService {
    /// Service whose devices write to per-name directories under `root`,
    /// one file per sink channel.
    pub fn new(config: ServiceConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::with_sink_factory(
            config,
            Box::new(move |name| Ok(Box::new(FileSink::open(root.join(name))?))),
        )
    }

    /// Service with a custom sink per device; used by tests and the demo.
    pub fn with_sink_factory(config: ServiceConfig, make_sink: SinkFactory) -> Self {
        let spectrum = Arc::new(SpectrumAnalyzer::new(config.spectrum.clone()));
        Self {
            config,
            devices: Mutex::new(Vec::new()),
            spectrum,
            make_sink,
        }
    }

    /// Registers a device under `name`: allocates its frame buffer and
    /// sink, starts its worker and snapshots the clock. Registering an
    /// existing name succeeds without creating a duplicate. When sink or
    /// thread creation fails the slot is left untouched, so a later retry
    /// can succeed.
    pub fn register(&self, name: &str) -> Result<()> {
        let mut devices = self.lock_devices()?;

        if devices.iter().any(|device| device.name() == name) {
            info!(name, "device already registered");
            return Ok(());
        }

        if devices.len() >= self.config.capacity {
            return Err(LedMatrixError::RegistryFull(self.config.capacity));
        }

        let sink = (self.make_sink)(name)?;
        let device = Device::spawn(name, sink, Arc::clone(&self.spectrum), self.config.worker.clone())?;
        devices.push(device);

        info!(name, "registered device");
        Ok(())
    }

    /// Removes the device and waits for its worker to exit, freeing the
    /// slot for reuse. The join happens outside the registry lock so a
    /// slow final tick cannot wedge other registry calls.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let device = {
            let mut devices = self.lock_devices()?;
            let index = devices
                .iter()
                .position(|device| device.name() == name)
                .ok_or_else(|| LedMatrixError::DeviceNotFound(name.to_owned()))?;
            devices.swap_remove(index)
        };

        drop(device);
        info!(name, "unregistered device");
        Ok(())
    }

    /// Looks up the device, interprets the command and executes the
    /// resulting action synchronously.
    pub fn ctrl(&self, name: &str, command: &str) -> Result<()> {
        info!(name, command, "ctrl");

        let devices = self.lock_devices()?;
        let device = devices
            .iter()
            .find(|device| device.name() == name)
            .ok_or_else(|| LedMatrixError::DeviceNotFound(name.to_owned()))?;

        device.control(command)
    }

    /// Streams one block of signed 8-bit samples into the analyzer. Every
    /// device currently in wave mode picks up the new amplitudes on its
    /// next tick.
    pub fn feed(&self, samples: &[u8]) -> Result<()> {
        let samples: Vec<f32> = samples.iter().map(|byte| f32::from(*byte as i8)).collect();
        self.spectrum.feed(&samples)
    }

    /// The process-wide analyzer shared by every device.
    pub fn spectrum(&self) -> &Arc<SpectrumAnalyzer> {
        &self.spectrum
    }

    /// Number of live devices.
    pub fn device_count(&self) -> usize {
        self.lock_devices().map(|devices| devices.len()).unwrap_or(0)
    }

    fn lock_devices(&self) -> Result<MutexGuard<'_, Vec<Device>>> {
        self.devices
            .lock()
            .map_err(|_| LedMatrixError::msg("device table has been poisoned"))
    }
}

impl std::fmt::Debug for LedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedService")
            .field("capacity", &self.config.capacity)
            .field("devices", &self.device_count())
            .finish()
    }
}
