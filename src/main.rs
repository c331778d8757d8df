#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;
use rtic::app;

use interval_game::Shutdown;

mod flash;

/// Set by the stop button, polled by the game.
static SHUTDOWN: Shutdown = Shutdown::new();

mod config {
    use interval_game::{DateTime, GameConfig, Polarity};

    pub const I2C_FREQ_KHZ: u32 = 400;

    /// Game button on GP22 wired to 3V3, so pressed reads high.
    pub const GAME: GameConfig = GameConfig {
        target_seconds: 15,
        poll_interval_ms: 10,
        polarity: Polarity::ActiveHigh,
    };

    /// Written to the RTC at boot when set, e.g. to fix a fresh module.
    pub const CLOCK_SET: Option<DateTime> = None;
}

/// Hands control back to the attached debugger, which ends the session cleanly.
fn exit() -> ! {
    loop {
        cortex_m::asm::bkpt();
    }
}

#[app(device = rp_pico::hal::pac, peripherals = true)]
mod app {
    use super::*;
    use cortex_m::delay::Delay;
    use interval_game::{bus, Ds3231, Game, LogWriter, PolledButton};
    use rp_pico::hal::{
        clocks::{init_clocks_and_plls, Clock},
        fugit::RateExtU32,
        gpio::{
            bank0::{Gpio14, Gpio15, Gpio21, Gpio22},
            FunctionI2C, FunctionSio, Interrupt, Pin, PullDown, PullUp, SioInput,
        },
        pac,
        sio::Sio,
        watchdog::Watchdog,
        I2C,
    };

    use crate::flash::{FlashJournal, Rp2040Flash};

    // RTC bus: I2C1 with SDA on GP14 and SCL on GP15
    type Sda = Pin<Gpio14, FunctionI2C, PullUp>;
    type Scl = Pin<Gpio15, FunctionI2C, PullUp>;
    type RtcBus = I2C<pac::I2C1, (Sda, Scl)>;
    type GameButton = Pin<Gpio22, FunctionSio<SioInput>, PullDown>;
    type StopButton = Pin<Gpio21, FunctionSio<SioInput>, PullUp>;
    type FirmwareGame =
        Game<'static, RtcBus, PolledButton<'static, GameButton, Delay>, FlashJournal>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        // Taken by idle, which has to own the game to run it
        game: Option<FirmwareGame>,
        stop: StopButton,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let mut pac = ctx.device;
        let mut watchdog = Watchdog::new(pac.WATCHDOG);
        let sio = Sio::new(pac.SIO);

        let external_xtal_freq_hz = 12_000_000u32;
        let clocks = init_clocks_and_plls(
            external_xtal_freq_hz,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok()
        .unwrap();

        let pins = rp_pico::Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        defmt::println!("=== 15 second game ===");

        let sda: Sda = pins.gpio14.reconfigure();
        let scl: Scl = pins.gpio15.reconfigure();
        let mut i2c = I2C::i2c1(
            pac.I2C1,
            sda,
            scl,
            config::I2C_FREQ_KHZ.kHz(),
            &mut pac.RESETS,
            &clocks.system_clock,
        );

        // Expect 0x68 (RTC) and 0x57 (EEPROM on the same module)
        let found = bus::scan(&mut i2c);
        defmt::println!("I2C devices: {=[u8]:#x}", found.as_slice());

        let mut rtc = Ds3231::new(i2c);
        if let Some(time) = config::CLOCK_SET {
            if let Err(e) = rtc.set_datetime(&time) {
                defmt::warn!("RTC set failed: {}", e.kind());
            }
        }
        match rtc.now() {
            Ok(now) => {
                let mut buf = [0u8; 19];
                let text = format_no_std::show(&mut buf, format_args!("{}", now)).unwrap_or("?");
                defmt::println!("RTC time: {=str}", text);
            }
            Err(e) => defmt::warn!("RTC read failed: {}", e.kind()),
        }

        let journal = Rp2040Flash::journal();
        for line in journal.stored_log().split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
            defmt::println!("log: {=str}", core::str::from_utf8(line).unwrap_or("?"));
        }
        let log = LogWriter::open(journal).unwrap();

        let button: GameButton = pins.gpio22.into_pull_down_input();
        let delay = Delay::new(ctx.core.SYST, clocks.system_clock.freq().to_Hz());
        let button = PolledButton::new(
            button,
            delay,
            config::GAME.polarity,
            config::GAME.poll_interval_ms,
            &SHUTDOWN,
        );

        // Stop button on GP21 to ground
        let stop: StopButton = pins.gpio21.into_pull_up_input();
        stop.set_interrupt_enabled(Interrupt::EdgeLow, true);

        let game = Game::new(rtc, button, log, &SHUTDOWN, config::GAME);

        (
            Shared {},
            Local {
                game: Some(game),
                stop,
            },
            init::Monotonics(),
        )
    }

    #[idle(local = [game])]
    fn idle(ctx: idle::Context) -> ! {
        let Some(game) = ctx.local.game.take() else {
            exit()
        };

        match game.run() {
            Ok(summary) => defmt::println!(
                "Stopped after {=u32} rounds, log saved: flash @ {=u32:#x} ({=usize} bytes)",
                summary.rounds,
                summary.journal.storage().address(),
                summary.journal.stored_log().len(),
            ),
            Err(e) => defmt::error!("Game aborted: {}", e.kind()),
        }

        exit()
    }

    // Hardware Task: GPIO Interrupt (Stop Button)
    #[task(binds = IO_IRQ_BANK0, priority = 1, local = [stop])]
    fn stop_pressed(ctx: stop_pressed::Context) {
        // One request is enough, keep bounces out
        ctx.local.stop.set_interrupt_enabled(Interrupt::EdgeLow, false);
        ctx.local.stop.clear_interrupt(Interrupt::EdgeLow);

        defmt::info!("stop requested, finishing current round");
        SHUTDOWN.request();
    }
}
