//! spectral-ble firmware entry point.
//!
//! Brings up the AS7265x on TWIM0, enables the SoftDevice and spawns:
//! - `softdevice_task`: SoftDevice event pump
//! - `peripheral_task`: advertising and GATT serving
//! - `app_task`: the single application loop (link events + sampling)

#![no_std]
#![no_main]

use defmt::{error, info, unwrap};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::peripherals::TWISPI0;
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::bind_interrupts;
use embassy_time::{Delay, Duration, Instant, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

use spectral_ble::ble::dispatcher::dispatch;
use spectral_ble::ble::session::LinkSession;
use spectral_ble::ble::softdevice::{
    enable_softdevice, peripheral_task, softdevice_task, Server, SoftDeviceLink, LINK_EVENTS,
};
use spectral_ble::config::ERROR_BLINK_MS;
use spectral_ble::scheduler::SampleScheduler;
use spectral_ble::sensor::as7265x::As7265x;
use spectral_ble::{Error, LinkError};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<TWISPI0>;
});

type Sensor = As7265x<Twim<'static, TWISPI0>, Delay>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("spectral-ble starting");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(Priority::P2);

    // LED1 is active-low.
    let mut led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    let mut i2c_config = twim::Config::default();
    i2c_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, i2c_config);

    let (sensor, sd, server) = match bring_up(i2c) {
        Ok(parts) => parts,
        Err(e) => {
            error!("bring-up failed: {}", e);
            fatal_blink(led).await
        }
    };
    led.set_low();

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(peripheral_task(sd, server)));
    unwrap!(spawner.spawn(app_task(
        SoftDeviceLink::new(server),
        SampleScheduler::new(sensor)
    )));
}

/// Sensor first, so a missing sensor never enables the radio.
fn bring_up(
    i2c: Twim<'static, TWISPI0>,
) -> Result<(Sensor, &'static Softdevice, &'static Server), Error> {
    let sensor = As7265x::init(i2c, Delay)?;

    let sd = enable_softdevice();
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = Server::new(sd).map_err(|_| LinkError::ServiceRegistration)?;
    let server: &'static Server = SERVER.init(server);

    Ok((sensor, sd, server))
}

/// Link events and sample firings, one at a time.
#[embassy_executor::task]
async fn app_task(mut link: SoftDeviceLink, mut scheduler: SampleScheduler<Sensor>) -> ! {
    let mut session = LinkSession::new();
    let period = Duration::from_millis(scheduler.period().as_millis() as u64);
    let mut deadline = Instant::now() + period;

    loop {
        match select(LINK_EVENTS.receive(), Timer::at(deadline)).await {
            Either::First(event) => dispatch(event, &mut session, &mut link),
            Either::Second(()) => {
                scheduler.fire(&session, &mut link);
                // Re-armed after the firing, never catching up.
                deadline = Instant::now() + period;
            }
        }
    }
}

async fn fatal_blink(mut led: Output<'static>) -> ! {
    loop {
        led.toggle();
        Timer::after_millis(ERROR_BLINK_MS).await;
    }
}
