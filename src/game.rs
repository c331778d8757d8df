//! The interval game: press to start, press to stop, log the elapsed seconds.

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::button::{Polarity, Press, PressRelease};
use crate::error::Error;
use crate::journal::{Journal, LogWriter};
use crate::rtc::{DateTime, Ds3231, SECONDS_PER_DAY};
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GameConfig {
    /// Duration the player tries to hit.
    pub target_seconds: u32,
    /// Sleep between button reads.
    pub poll_interval_ms: u32,
    pub polarity: Polarity,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target_seconds: 15,
            poll_interval_ms: 10,
            polarity: Polarity::ActiveHigh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    WaitingForStart,
    /// Started at `t0` seconds since midnight.
    WaitingForStop { t0: u32 },
    RoundComplete { t0: u32, t1: u32, stopped_at: DateTime },
}

/// One finished round, stamped with the time of the stop press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub timestamp: DateTime,
    pub elapsed_seconds: u32,
}

impl Measurement {
    /// Signed distance from `target`, positive when the player was late.
    pub fn deviation(&self, target: u32) -> i64 {
        self.elapsed_seconds as i64 - target as i64
    }
}

/// What a single state transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Advanced,
    Recorded(Measurement),
    Cancelled,
}

/// Result of [`Game::run`]: the closed journal and how many rounds it got.
pub struct RunSummary<J> {
    pub rounds: u32,
    pub journal: J,
}

/// Seconds from `t0` to `t1`, both seconds since midnight.
///
/// A stop time earlier than the start means midnight passed once. Rounds
/// longer than a day are not representable.
pub fn elapsed_seconds(t0: u32, t1: u32) -> u32 {
    if t1 < t0 {
        t1 + SECONDS_PER_DAY - t0
    } else {
        t1 - t0
    }
}

pub struct Game<'a, I2C, S, J> {
    rtc: Ds3231<I2C>,
    button: S,
    log: LogWriter<J>,
    shutdown: &'a Shutdown,
    config: GameConfig,
    state: State,
}

impl<'a, I2C, E, S, J> Game<'a, I2C, S, J>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    S: PressRelease,
    J: Journal,
{
    pub fn new(
        rtc: Ds3231<I2C>,
        button: S,
        log: LogWriter<J>,
        shutdown: &'a Shutdown,
        config: GameConfig,
    ) -> Self {
        Self {
            rtc,
            button,
            log,
            shutdown,
            config,
            state: State::WaitingForStart,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn wait(&mut self) -> Result<Press, Error<E, S::Error, J::Error>> {
        self.button.wait_for_press_release().map_err(Error::Input)
    }

    fn sample(&mut self) -> Result<DateTime, Error<E, S::Error, J::Error>> {
        self.rtc.now().map_err(Error::widen)
    }

    /// Performs one transition of the round state machine.
    pub fn step(&mut self) -> Result<Step, Error<E, S::Error, J::Error>> {
        match self.state {
            State::WaitingForStart => {
                info!("Press to start ({}s)...", self.config.target_seconds);
                if self.wait()? == Press::Cancelled {
                    return Ok(Step::Cancelled);
                }
                let t0 = self.sample()?.seconds_since_midnight();
                self.state = State::WaitingForStop { t0 };
                Ok(Step::Advanced)
            }
            State::WaitingForStop { t0 } => {
                info!("Press when done.");
                if self.wait()? == Press::Cancelled {
                    self.state = State::WaitingForStart;
                    return Ok(Step::Cancelled);
                }
                let stopped_at = self.sample()?;
                let t1 = stopped_at.seconds_since_midnight();
                self.state = State::RoundComplete { t0, t1, stopped_at };
                Ok(Step::Advanced)
            }
            State::RoundComplete { t0, t1, stopped_at } => {
                self.state = State::WaitingForStart;
                let measurement = Measurement {
                    timestamp: stopped_at,
                    elapsed_seconds: elapsed_seconds(t0, t1),
                };
                self.log.record(&measurement).map_err(Error::from)?;
                info!(
                    "-> {}s ({}s from target)",
                    measurement.elapsed_seconds,
                    measurement.deviation(self.config.target_seconds)
                );
                Ok(Step::Recorded(measurement))
            }
        }
    }

    /// Plays from `WaitingForStart` until a measurement is logged.
    ///
    /// Returns `None` when a shutdown cut the round short. On error the
    /// round is abandoned and the next call starts over.
    pub fn play_round(&mut self) -> Result<Option<Measurement>, Error<E, S::Error, J::Error>> {
        loop {
            let step = self.step().map_err(|e| {
                self.state = State::WaitingForStart;
                e
            })?;
            match step {
                Step::Advanced => {}
                Step::Recorded(measurement) => return Ok(Some(measurement)),
                Step::Cancelled => return Ok(None),
            }
        }
    }

    /// Plays rounds until a shutdown is requested, then closes the log.
    ///
    /// Bus, input and decoding failures drop the current round and the game
    /// goes on. A log failure closes the log and ends the game.
    pub fn run(mut self) -> Result<RunSummary<J>, Error<E, S::Error, J::Error>> {
        let mut rounds = 0;
        while !self.shutdown.is_requested() {
            match self.play_round() {
                Ok(Some(_)) => rounds += 1,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!("round abandoned: {}", e.kind());
                }
                Err(e) => {
                    error!("log write failed, stopping: {}", e.kind());
                    // The write error is the one worth reporting
                    let _ = self.log.close();
                    return Err(e);
                }
            }
        }

        let journal = self.log.close().map_err(Error::LogPersistence)?;
        info!("stopped after {} rounds", rounds);
        Ok(RunSummary { rounds, journal })
    }
}
