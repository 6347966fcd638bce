use std::fmt;

// === DeliveryError ===

/// Failure of a single request on the page/orchestrator message channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No receiver exists for the target (closed page, stopped orchestrator).
    Unreachable(String),
    /// The receiver exists but did not answer within the reply timeout.
    TimedOut(String),
}

impl DeliveryError {
    /// Whether the target is gone for good rather than merely slow.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DeliveryError::Unreachable(_))
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Unreachable(target) => write!(f, "Target unreachable: {}", target),
            DeliveryError::TimedOut(target) => write!(f, "No reply in time from: {}", target),
        }
    }
}

impl std::error::Error for DeliveryError {}

// === ValidationError ===

/// Rejected control-surface input. Display strings are the user-visible messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The pixel field is missing, not a number, or zero.
    ZeroPixels,
    /// The interval field is missing or not a number.
    IntervalNotANumber(String),
    /// The interval is below one millisecond.
    IntervalTooShort(i64),
    /// The pixel magnitude exceeds 5000.
    PixelsOutOfRange(i64),
    /// The interval exceeds ten minutes.
    IntervalTooLong(i64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroPixels => write!(f, "Scroll pixels must be a non-zero number"),
            ValidationError::IntervalNotANumber(_) | ValidationError::IntervalTooShort(_) => {
                write!(f, "Duration must be at least 1 millisecond")
            }
            ValidationError::PixelsOutOfRange(_) => {
                write!(f, "Scroll pixels should be between -5000 and 5000")
            }
            ValidationError::IntervalTooLong(_) => write!(
                f,
                "Duration should not exceed 600,000 milliseconds (10 minutes)"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// === SettingsError ===

/// Errors related to the persisted default settings record.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The stored or provided settings are out of bounds.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === ControlError ===

/// Errors surfaced to the user by the control surface.
#[derive(Debug)]
pub enum ControlError {
    /// Form input failed validation; nothing was changed.
    Invalid(ValidationError),
    /// Reading or writing the default settings failed.
    Settings(SettingsError),
    /// The orchestrator task is not running.
    OrchestratorUnavailable,
    /// The page did not answer a direct query.
    PageUnavailable(String),
    /// The shortcut command is not known.
    UnknownCommand(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Invalid(err) => write!(f, "{}", err),
            ControlError::Settings(err) => write!(f, "{}", err),
            ControlError::OrchestratorUnavailable => {
                write!(f, "Unable to reach the scroll orchestrator")
            }
            ControlError::PageUnavailable(msg) => write!(f, "Page unavailable: {}", msg),
            ControlError::UnknownCommand(name) => write!(f, "Unknown command: {}", name),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Invalid(err) => Some(err),
            ControlError::Settings(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ControlError {
    fn from(err: ValidationError) -> Self {
        ControlError::Invalid(err)
    }
}

impl From<SettingsError> for ControlError {
    fn from(err: SettingsError) -> Self {
        ControlError::Settings(err)
    }
}

// === HostError ===

/// Errors related to page lifecycle in the headless host.
#[derive(Debug)]
pub enum HostError {
    /// Page with the given ID is not open.
    PageNotFound(String),
    /// The requested viewport geometry is unusable.
    InvalidGeometry(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::PageNotFound(id) => write!(f, "Page not found: {}", id),
            HostError::InvalidGeometry(msg) => write!(f, "Invalid page geometry: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}
