//! Reaction-interval game on a DS3231 real-time clock.
//!
//! The player presses a button to start, presses again when they think the
//! target duration has passed, and the elapsed wall-clock seconds read from
//! the RTC are appended to a CSV journal.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod bcd;
pub mod bus;
pub mod button;
pub mod error;
pub mod game;
pub mod journal;
pub mod paged;
pub mod rtc;
pub mod shutdown;

pub use button::{Polarity, PolledButton, Press, PressRelease};
pub use error::{Error, ErrorKind};
pub use game::{elapsed_seconds, Game, GameConfig, Measurement, RunSummary, State, Step};
pub use journal::{Journal, LogWriter, RecordError, HEADER};
pub use paged::{FlashRegion, PagedError, PagedJournal};
pub use rtc::{DateTime, Ds3231, Register, RegisterSnapshot};
pub use shutdown::Shutdown;
