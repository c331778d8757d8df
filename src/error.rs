use core::convert::Infallible;

use crate::journal::RecordError;
use crate::rtc::Register;

/// Everything that can end a round early.
///
/// `B` is the bus error, `I` the input pin error and `J` the journal error.
/// Operations that only touch the RTC leave `I` and `J` at `Infallible`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<B, I = Infallible, J = Infallible> {
    /// The bus transfer failed (NACK, arbitration loss, ...).
    DeviceIo(B),
    /// Reading the button level failed.
    Input(I),
    /// A register held a nibble outside 0..=9.
    DataIntegrity { register: Register, raw: u8 },
    /// A clock-set request carried a field the device cannot hold.
    InvalidDateTime,
    /// The results log could not be written or flushed.
    LogPersistence(J),
    /// A measurement could not be rendered as a log line.
    LogFormat,
}

impl<B> Error<B> {
    /// Lifts an RTC-only error into the wider error of the game loop.
    pub fn widen<I, J>(self) -> Error<B, I, J> {
        match self {
            Error::DeviceIo(e) => Error::DeviceIo(e),
            Error::Input(never) => match never {},
            Error::DataIntegrity { register, raw } => Error::DataIntegrity { register, raw },
            Error::InvalidDateTime => Error::InvalidDateTime,
            Error::LogPersistence(never) => match never {},
            Error::LogFormat => Error::LogFormat,
        }
    }
}

/// Payload-free view of an [`Error`], loggable whatever the payload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    DeviceIo,
    Input,
    DataIntegrity,
    InvalidDateTime,
    LogPersistence,
    LogFormat,
}

impl<B, I, J> Error<B, I, J> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DeviceIo(_) => ErrorKind::DeviceIo,
            Error::Input(_) => ErrorKind::Input,
            Error::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            Error::InvalidDateTime => ErrorKind::InvalidDateTime,
            Error::LogPersistence(_) => ErrorKind::LogPersistence,
            Error::LogFormat => ErrorKind::LogFormat,
        }
    }

    /// Errors after which the loop may start a fresh round.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::LogPersistence(_) | Error::LogFormat)
    }
}

impl<B, I, J> From<RecordError<J>> for Error<B, I, J> {
    fn from(e: RecordError<J>) -> Self {
        match e {
            RecordError::Format => Error::LogFormat,
            RecordError::Journal(e) => Error::LogPersistence(e),
        }
    }
}
