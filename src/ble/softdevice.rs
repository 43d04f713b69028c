//! SoftDevice S140 link stack (peripheral role).
//!
//! [`peripheral_task`] owns the radio: it advertises when told to, serves
//! the GATT server on the one accepted link, and reports everything that
//! happens as [`LinkEvent`]s on [`LINK_EVENTS`]. The application loop talks
//! back through [`SoftDeviceLink`], which only signals the task or notifies
//! on an existing connection, so none of its calls block.

use core::cell::Cell;
use core::mem;

use embassy_futures::select::{select, select3, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};

use super::{LinkEvent, LinkHandle, LinkStack};
use crate::config::{
    ADV_RETRY_MS, ATT_MTU_DEFAULT, ATT_MTU_MAX, BLE_ADV_INTERVAL, BLE_CONN_INTERVAL_MAX,
    BLE_CONN_INTERVAL_MIN, BLE_SLAVE_LATENCY, BLE_SUP_TIMEOUT, DEVICE_NAME,
    LINK_EVENT_QUEUE_DEPTH, MAX_PAYLOAD_LEN, MTU_POLL_MS, SPECTRAL_SERVICE_UUID_LE,
};
use crate::error::LinkError;

// ═══════════════════════════════════════════════════════════════════════════
// GATT
// ═══════════════════════════════════════════════════════════════════════════

#[nrf_softdevice::gatt_service(uuid = "5b1e0001-7c3a-4f6e-9d2b-2a1f0c3e8d41")]
pub struct SpectralService {
    /// Latest sample as `"<tag>:<value> "` text.
    #[characteristic(uuid = "5b1e0002-7c3a-4f6e-9d2b-2a1f0c3e8d41", read, notify)]
    pub channels: Vec<u8, MAX_PAYLOAD_LEN>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub spectral: SpectralService,
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared state
// ═══════════════════════════════════════════════════════════════════════════

/// Stack → application events, in arrival order.
pub static LINK_EVENTS: Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_QUEUE_DEPTH> =
    Channel::new();

#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
enum AdvertiseCommand {
    Start,
    Stop,
}

static ADVERTISE: Signal<CriticalSectionRawMutex, AdvertiseCommand> = Signal::new();

/// Latest CCCD value written on the current link. A burst of writes
/// collapses to the last one, so none is lost to a full event queue.
static SUBSCRIPTION: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Handle of the link the SoftDevice currently holds open.
static CURRENT: Mutex<CriticalSectionRawMutex, Cell<Option<LinkHandle>>> =
    Mutex::new(Cell::new(None));

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_128(ServiceList::Complete, &[SPECTRAL_SERVICE_UUID_LE])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload =
    LegacyAdvertisementBuilder::new().full_name(DEVICE_NAME).build();

// ═══════════════════════════════════════════════════════════════════════════
// SoftDevice configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Enable the SoftDevice for a single peripheral link.
pub fn enable_softdevice() -> &'static mut Softdevice {
    let config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: ATT_MTU_MAX,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    Softdevice::enable(&config)
}

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

// ═══════════════════════════════════════════════════════════════════════════
// LinkStack
// ═══════════════════════════════════════════════════════════════════════════

/// [`LinkStack`] handed to the application loop.
pub struct SoftDeviceLink {
    server: &'static Server,
}

impl SoftDeviceLink {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }
}

impl LinkStack for SoftDeviceLink {
    fn start_advertising(&mut self) -> Result<(), LinkError> {
        ADVERTISE.signal(AdvertiseCommand::Start);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), LinkError> {
        ADVERTISE.signal(AdvertiseCommand::Stop);
        Ok(())
    }

    fn notify(&mut self, handle: LinkHandle, payload: &[u8]) -> Result<(), LinkError> {
        let conn = Connection::from_handle(handle).ok_or(LinkError::Disconnected)?;
        let value: Vec<u8, MAX_PAYLOAD_LEN> =
            Vec::from_slice(payload).map_err(|_| LinkError::PayloadTooLarge)?;
        self.server.spectral.channels_notify(&conn, &value)?;
        Ok(())
    }

    fn current_handle(&self) -> Option<LinkHandle> {
        CURRENT.lock(|c| c.get())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Peripheral task
// ═══════════════════════════════════════════════════════════════════════════

/// Advertise on command, serve one link at a time, report link events.
#[embassy_executor::task]
pub async fn peripheral_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    defmt::info!("BLE stack ready, address {}", nrf_softdevice::ble::get_address(sd));
    LINK_EVENTS
        .send(LinkEvent::StackState { operational: true })
        .await;

    let mut advertising = false;
    loop {
        if !advertising {
            match ADVERTISE.wait().await {
                AdvertiseCommand::Start => advertising = true,
                AdvertiseCommand::Stop => continue,
            }
        }

        let config = peripheral::Config {
            interval: BLE_ADV_INTERVAL,
            ..Default::default()
        };
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        match select(
            peripheral::advertise_connectable(sd, adv, &config),
            ADVERTISE.wait(),
        )
        .await
        {
            Either::First(Ok(conn)) => {
                advertising = false;
                serve(server, conn).await;
            }
            Either::First(Err(e)) => {
                defmt::warn!("advertise_connectable failed: {:?}, retrying", e);
                Timer::after(Duration::from_millis(ADV_RETRY_MS)).await;
            }
            Either::Second(AdvertiseCommand::Stop) => advertising = false,
            // Already advertising; the dropped future is simply restarted.
            Either::Second(AdvertiseCommand::Start) => {}
        }
    }
}

/// Run the GATT server on `conn` until the link drops.
async fn serve(server: &Server, conn: Connection) {
    let Some(handle) = conn.handle() else {
        return;
    };

    CURRENT.lock(|c| c.set(Some(handle)));
    // A value latched on the previous link must not leak into this one.
    SUBSCRIPTION.reset();
    LINK_EVENTS.send(LinkEvent::Connected { handle }).await;
    request_conn_params(&conn);

    let gatt = gatt_server::run(&conn, server, |e| match e {
        ServerEvent::Spectral(SpectralServiceEvent::ChannelsCccdWrite { notifications }) => {
            SUBSCRIPTION.signal(notifications);
        }
    });

    // Only the GATT server ever completes: the watchers never return.
    let _ = select3(
        gatt,
        watch_mtu(&conn, handle),
        forward_subscription(handle),
    )
    .await;
    defmt::info!("link {} closed", handle);

    CURRENT.lock(|c| c.set(None));
    LINK_EVENTS.send(LinkEvent::Disconnected { handle }).await;
}

/// Queue the latched subscription state as a link event.
async fn forward_subscription(handle: LinkHandle) -> ! {
    loop {
        let enabled = SUBSCRIPTION.wait().await;
        LINK_EVENTS
            .send(LinkEvent::SubscriptionChanged { handle, enabled })
            .await;
    }
}

/// Report the ATT MTU whenever the central finishes an exchange.
async fn watch_mtu(conn: &Connection, handle: LinkHandle) -> ! {
    let mut reported = ATT_MTU_DEFAULT;
    loop {
        Timer::after(Duration::from_millis(MTU_POLL_MS)).await;
        let mtu = conn.att_mtu();
        if mtu != reported {
            reported = mtu;
            LINK_EVENTS
                .send(LinkEvent::MtuExchanged { handle, mtu })
                .await;
        }
    }
}

fn request_conn_params(conn: &Connection) {
    let params = raw::ble_gap_conn_params_t {
        min_conn_interval: BLE_CONN_INTERVAL_MIN,
        max_conn_interval: BLE_CONN_INTERVAL_MAX,
        slave_latency: BLE_SLAVE_LATENCY,
        conn_sup_timeout: BLE_SUP_TIMEOUT,
    };
    if let Err(e) = conn.set_conn_params(params) {
        defmt::warn!("set_conn_params failed: {:?}", e);
    }
}
