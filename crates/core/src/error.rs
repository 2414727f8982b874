/// Result alias that carries the custom [`LedMatrixError`] type.
pub type Result<T> = std::result::Result<T, LedMatrixError>;

/// Common error type for the core crate.
///
/// Out-of-range brightness or degree parameters are deliberately absent:
/// those resolve to the previously stored value instead of failing, and an
/// out-of-bounds pixel write is a logged no-op rather than an error.
#[derive(Debug, thiserror::Error)]
pub enum LedMatrixError {
    /// The command string matched none of the known prefixes.
    #[error("unrecognized command `{0}`")]
    InvalidCommand(String),
    /// No device is registered under the given name.
    #[error("no device registered as `{0}`")]
    DeviceNotFound(String),
    /// The device table is at capacity.
    #[error("device table is full ({0} slots)")]
    RegistryFull(usize),
    /// Catch-all used for conditions without a dedicated variant, such as a
    /// poisoned lock.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around spectrum transform errors.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl LedMatrixError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for LedMatrixError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LedMatrixError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
