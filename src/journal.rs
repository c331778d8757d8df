//! Append-only CSV log of finished rounds.
//!
//! The format is fixed: a `timestamp,temps_ecoule` header on an empty log,
//! then one `YYYY-MM-DD HH:MM:SS,<seconds>` line per round.

use crate::game::Measurement;

pub const HEADER: &str = "timestamp,temps_ecoule\n";

/// Longest line: "2099-12-31 23:59:59," plus a u32 and the newline.
const LINE_CAPACITY: usize = 20 + 10 + 1;

/// Byte storage that only ever grows.
pub trait Journal {
    type Error;

    /// Bytes already stored, including any not yet flushed.
    fn len(&mut self) -> Result<usize, Self::Error>;

    fn is_empty(&mut self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Makes every appended byte durable.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Releases the storage. Called once, after a final flush.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Why a round could not be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError<E> {
    /// The line did not fit the line buffer; nothing was appended.
    Format,
    Journal(E),
}

/// Formats one result line into `buf`.
pub fn format_line<'b>(measurement: &Measurement, buf: &'b mut [u8]) -> Option<&'b str> {
    format_no_std::show(
        buf,
        format_args!("{},{}\n", measurement.timestamp, measurement.elapsed_seconds),
    )
    .ok()
}

/// Owns a [`Journal`] for the lifetime of the game.
///
/// Closing consumes the writer, so the journal is closed at most once.
pub struct LogWriter<J> {
    journal: J,
}

impl<J: Journal> LogWriter<J> {
    /// Takes the journal and writes the header if it is empty.
    pub fn open(journal: J) -> Result<Self, J::Error> {
        let mut writer = Self { journal };
        writer.ensure_header()?;
        Ok(writer)
    }

    /// Writes the header only when nothing has been logged yet.
    pub fn ensure_header(&mut self) -> Result<(), J::Error> {
        if self.journal.is_empty()? {
            self.journal.append(HEADER.as_bytes())?;
            self.journal.flush()?;
            debug!("log header written");
        }
        Ok(())
    }

    /// Appends one line and flushes before returning.
    ///
    /// LINE_CAPACITY fits every DateTime the codec can decode; anything wider
    /// is refused rather than truncated.
    pub fn record(&mut self, measurement: &Measurement) -> Result<(), RecordError<J::Error>> {
        let mut buf = [0u8; LINE_CAPACITY];
        let line = format_line(measurement, &mut buf).ok_or(RecordError::Format)?;
        self.journal.append(line.as_bytes()).map_err(RecordError::Journal)?;
        self.journal.flush().map_err(RecordError::Journal)
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// Flushes and closes the journal, handing it back.
    pub fn close(mut self) -> Result<J, J::Error> {
        self.journal.flush()?;
        self.journal.close()?;
        Ok(self.journal)
    }
}
