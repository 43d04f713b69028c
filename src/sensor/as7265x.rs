//! AS7265x triad spectral sensor driver (blocking I²C).
//!
//! The triad exposes a single I²C slave (the AS72651) behind which all
//! device registers are *virtual*. Every virtual access goes through three
//! physical registers:
//!
//! ```text
//! 0x00 STATUS  bit 1 = TX_VALID (write register busy)
//!              bit 0 = RX_VALID (read register holds data)
//! 0x01 WRITE   virtual register address (bit 7 set for a write), then data
//! 0x02 READ    data of the last requested virtual register
//! ```
//!
//! Calibrated results are six 32-bit big-endian IEEE floats per device; the
//! device whose results are visible is chosen through `DEV_SELECT_CONTROL`.
//! Every status poll is bounded by `SENSOR_POLL_ATTEMPTS`, which bounds the
//! duration of every public call.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::{SensorSource, SpectralSample, CHANNEL_COUNT};
use crate::config::{
    SENSOR_GAIN, SENSOR_I2C_ADDR, SENSOR_INTEGRATION_CYCLES, SENSOR_POLL_ATTEMPTS,
    SENSOR_POLL_DELAY_US,
};
use crate::error::SensorError;

// Physical registers
const STATUS_REG: u8 = 0x00;
const WRITE_REG: u8 = 0x01;
const READ_REG: u8 = 0x02;

const TX_VALID: u8 = 0x02;
const RX_VALID: u8 = 0x01;

// Virtual registers
const HW_VERSION_HIGH: u8 = 0x00;
const CONFIG: u8 = 0x04;
const INTEGRATION_TIME: u8 = 0x05;
const CAL_START: u8 = 0x14;
const DEV_SELECT_CONTROL: u8 = 0x4F;

/// Device type reported by the AS72651 in `HW_VERSION_HIGH`.
const DEVICE_TYPE: u8 = 0x40;

// CONFIG fields
const CONFIG_DATA_RDY: u8 = 1 << 1;
const CONFIG_BANK_MASK: u8 = 0b0000_1100;
const CONFIG_GAIN_MASK: u8 = 0b0011_0000;
const MODE_6CHAN_CONTINUOUS: u8 = 0b10;

/// DEV_SELECT_CONTROL bits 4/5: slave 1 (visible) / slave 2 (UV) detected.
const SLAVES_PRESENT: u8 = 0b0011_0000;

/// One of the three dies of the triad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    /// AS72651, channels R S T U V W.
    Nir = 0x00,
    /// AS72652, channels G H I J K L.
    Visible = 0x01,
    /// AS72653, channels A B C D E F.
    Uv = 0x02,
}

impl Device {
    /// Position in the sample of each of the device's six calibrated results.
    const fn slots(self) -> [usize; 6] {
        match self {
            Device::Nir => [8, 10, 12, 13, 14, 15],
            Device::Visible => [6, 7, 9, 11, 16, 17],
            Device::Uv => [0, 1, 2, 3, 4, 5],
        }
    }
}

const DEVICES: [Device; 3] = [Device::Nir, Device::Visible, Device::Uv];

/// An initialised AS7265x triad.
///
/// The only constructor is [`As7265x::init`], so holding a value proves the
/// sensor answered and is measuring.
pub struct As7265x<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> As7265x<I2C, D> {
    /// Probe the triad and start continuous six-channel measurements.
    pub fn init(i2c: I2C, delay: D) -> Result<Self, SensorError> {
        let mut sensor = Self { i2c, delay };

        let device_type = sensor.read_virtual(HW_VERSION_HIGH)?;
        if device_type != DEVICE_TYPE {
            error!("AS7265x: unexpected device type {=u8:#x}", device_type);
            return Err(SensorError::UnknownDevice(device_type));
        }

        let select = sensor.read_virtual(DEV_SELECT_CONTROL)?;
        if select & SLAVES_PRESENT != SLAVES_PRESENT {
            error!("AS7265x: slave devices missing ({=u8:#x})", select);
            return Err(SensorError::MissingSlaves);
        }

        sensor.write_virtual(INTEGRATION_TIME, SENSOR_INTEGRATION_CYCLES)?;

        let config = sensor.read_virtual(CONFIG)?;
        let config = (config & !(CONFIG_GAIN_MASK | CONFIG_BANK_MASK))
            | ((SENSOR_GAIN << 4) & CONFIG_GAIN_MASK)
            | ((MODE_6CHAN_CONTINUOUS << 2) & CONFIG_BANK_MASK);
        sensor.write_virtual(CONFIG, config)?;

        info!(
            "AS7265x ready (gain={}, integration={} cycles)",
            SENSOR_GAIN, SENSOR_INTEGRATION_CYCLES
        );
        Ok(sensor)
    }

    #[cfg(test)]
    fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        Ok(self.read_virtual(CONFIG)? & CONFIG_DATA_RDY != 0)
    }

    fn select_device(&mut self, device: Device) -> Result<(), SensorError> {
        self.write_virtual(DEV_SELECT_CONTROL, device as u8)
    }

    fn read_calibrated_value(&mut self, reg: u8) -> Result<f32, SensorError> {
        let mut bytes = [0u8; 4];
        for (offset, byte) in (0u8..).zip(bytes.iter_mut()) {
            *byte = self.read_virtual(reg + offset)?;
        }
        Ok(f32::from_be_bytes(bytes))
    }

    fn read_status(&mut self) -> Result<u8, SensorError> {
        let mut status = [0u8; 1];
        self.i2c
            .write_read(SENSOR_I2C_ADDR, &[STATUS_REG], &mut status)
            .map_err(|_| SensorError::Bus)?;
        Ok(status[0])
    }

    /// Poll STATUS until `(status & mask != 0) == set`.
    fn wait_status(&mut self, mask: u8, set: bool) -> Result<u8, SensorError> {
        for _ in 0..SENSOR_POLL_ATTEMPTS {
            let status = self.read_status()?;
            if (status & mask != 0) == set {
                return Ok(status);
            }
            self.delay.delay_us(SENSOR_POLL_DELAY_US);
        }
        Err(SensorError::Timeout)
    }

    fn write_physical(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(SENSOR_I2C_ADDR, &[reg, value])
            .map_err(|_| SensorError::Bus)
    }

    fn read_physical(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(SENSOR_I2C_ADDR, &[reg], &mut value)
            .map_err(|_| SensorError::Bus)?;
        Ok(value[0])
    }

    fn read_virtual(&mut self, vreg: u8) -> Result<u8, SensorError> {
        // Drop a stale byte left in READ so the answer below is ours.
        if self.read_status()? & RX_VALID != 0 {
            self.read_physical(READ_REG)?;
        }
        self.wait_status(TX_VALID, false)?;
        self.write_physical(WRITE_REG, vreg)?;
        self.wait_status(RX_VALID, true)?;
        self.read_physical(READ_REG)
    }

    fn write_virtual(&mut self, vreg: u8, value: u8) -> Result<(), SensorError> {
        self.wait_status(TX_VALID, false)?;
        self.write_physical(WRITE_REG, vreg | 0x80)?;
        self.wait_status(TX_VALID, false)?;
        self.write_physical(WRITE_REG, value)
    }
}

impl<I2C: I2c, D: DelayNs> SensorSource for As7265x<I2C, D> {
    fn is_ready(&mut self) -> bool {
        match self.data_ready() {
            Ok(ready) => ready,
            Err(e) => {
                warn!("AS7265x: status read failed: {}", e);
                false
            }
        }
    }

    fn read_calibrated(&mut self) -> Result<SpectralSample, SensorError> {
        let mut values = [0.0f32; CHANNEL_COUNT];
        for device in DEVICES {
            self.select_device(device)?;
            for (reg, slot) in (CAL_START..).step_by(4).zip(device.slots()) {
                values[slot] = self.read_calibrated_value(reg)?;
            }
        }
        Ok(SpectralSample::new(values))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    /// In-memory AS7265x speaking the virtual register protocol.
    struct FakeTriad {
        vregs: [[u8; 256]; 3],
        selected: usize,
        pending_write: Option<u8>,
        read_value: Option<u8>,
        last_reg: u8,
        slaves: u8,
        fail_bus: bool,
        tx_stuck: bool,
        virtual_writes: Vec<(u8, u8)>,
    }

    impl FakeTriad {
        fn new() -> Self {
            let mut vregs = [[0u8; 256]; 3];
            vregs[0][HW_VERSION_HIGH as usize] = DEVICE_TYPE;
            Self {
                vregs,
                selected: 0,
                pending_write: None,
                read_value: None,
                last_reg: 0,
                slaves: SLAVES_PRESENT,
                fail_bus: false,
                tx_stuck: false,
                virtual_writes: Vec::new(),
            }
        }

        fn set_calibrated(&mut self, device: Device, index: usize, value: f32) {
            let base = CAL_START as usize + index * 4;
            self.vregs[device as usize][base..base + 4].copy_from_slice(&value.to_be_bytes());
        }

        /// Calibrated results follow DEV_SELECT_CONTROL, everything else
        /// lives on the master.
        fn device_for(&self, vreg: u8) -> usize {
            if (CAL_START..CAL_START + 24).contains(&vreg) {
                self.selected
            } else {
                0
            }
        }

        fn vreg_read(&self, vreg: u8) -> u8 {
            if vreg == DEV_SELECT_CONTROL {
                return self.slaves | self.selected as u8;
            }
            self.vregs[self.device_for(vreg)][vreg as usize]
        }

        fn status(&self) -> u8 {
            let mut status = 0;
            if self.tx_stuck {
                status |= TX_VALID;
            }
            if self.read_value.is_some() {
                status |= RX_VALID;
            }
            status
        }

        fn write_reg(&mut self, value: u8) {
            match self.pending_write.take() {
                Some(vreg) if vreg == DEV_SELECT_CONTROL => self.selected = value as usize,
                Some(vreg) => {
                    self.virtual_writes.push((vreg, value));
                    let device = self.device_for(vreg);
                    self.vregs[device][vreg as usize] = value;
                }
                None if value & 0x80 != 0 => self.pending_write = Some(value & 0x7F),
                None => self.read_value = Some(self.vreg_read(value)),
            }
        }
    }

    impl ErrorType for FakeTriad {
        type Error = ErrorKind;
    }

    impl I2c for FakeTriad {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, SENSOR_I2C_ADDR);
            if self.fail_bus {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => match bytes {
                        [reg] => self.last_reg = *reg,
                        [WRITE_REG, value] => self.write_reg(*value),
                        other => panic!("unexpected write {:?}", other),
                    },
                    Operation::Read(buf) => {
                        buf[0] = match self.last_reg {
                            STATUS_REG => self.status(),
                            READ_REG => self.read_value.take().unwrap_or(0xFF),
                            reg => panic!("read from register {reg}"),
                        };
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn init_configures_gain_mode_and_integration() {
        let sensor = As7265x::init(FakeTriad::new(), NoDelay).unwrap();
        let (bus, _) = sensor.release();
        assert!(bus
            .virtual_writes
            .contains(&(INTEGRATION_TIME, SENSOR_INTEGRATION_CYCLES)));
        let config = bus.vregs[0][CONFIG as usize];
        assert_eq!((config & CONFIG_GAIN_MASK) >> 4, SENSOR_GAIN);
        assert_eq!((config & CONFIG_BANK_MASK) >> 2, MODE_6CHAN_CONTINUOUS);
    }

    #[test]
    fn init_rejects_unknown_device() {
        let mut bus = FakeTriad::new();
        bus.vregs[0][HW_VERSION_HIGH as usize] = 0x3F;
        assert_eq!(
            As7265x::init(bus, NoDelay).err(),
            Some(SensorError::UnknownDevice(0x3F))
        );
    }

    #[test]
    fn init_rejects_missing_slaves() {
        let mut bus = FakeTriad::new();
        bus.slaves = 0b0001_0000; // UV die not detected
        assert_eq!(
            As7265x::init(bus, NoDelay).err(),
            Some(SensorError::MissingSlaves)
        );
    }

    #[test]
    fn init_reports_bus_failure() {
        let mut bus = FakeTriad::new();
        bus.fail_bus = true;
        assert_eq!(As7265x::init(bus, NoDelay).err(), Some(SensorError::Bus));
    }

    #[test]
    fn busy_write_register_times_out() {
        let mut bus = FakeTriad::new();
        bus.tx_stuck = true;
        assert_eq!(As7265x::init(bus, NoDelay).err(), Some(SensorError::Timeout));
    }

    #[test]
    fn data_ready_follows_config_bit() {
        let mut sensor = As7265x::init(FakeTriad::new(), NoDelay).unwrap();
        assert!(!sensor.is_ready());

        sensor.i2c.vregs[0][CONFIG as usize] |= CONFIG_DATA_RDY;
        assert!(sensor.is_ready());
    }

    #[test]
    fn bus_error_reads_as_not_ready() {
        let mut sensor = As7265x::init(FakeTriad::new(), NoDelay).unwrap();
        sensor.i2c.vregs[0][CONFIG as usize] |= CONFIG_DATA_RDY;
        sensor.i2c.fail_bus = true;
        assert!(!sensor.is_ready());
    }

    #[test]
    fn calibrated_values_land_in_wavelength_order() {
        let mut bus = FakeTriad::new();
        // UV A = 1.5, visible G = 2.25, NIR R = 3.0, visible L = 4.75, NIR W = -1.0
        bus.set_calibrated(Device::Uv, 0, 1.5);
        bus.set_calibrated(Device::Visible, 0, 2.25);
        bus.set_calibrated(Device::Nir, 0, 3.0);
        bus.set_calibrated(Device::Visible, 5, 4.75);
        bus.set_calibrated(Device::Nir, 5, -1.0);

        let mut sensor = As7265x::init(bus, NoDelay).unwrap();
        let sample = sensor.read_calibrated().unwrap();
        let values = sample.values();

        assert_eq!(values[0], 1.5); // A
        assert_eq!(values[6], 2.25); // G
        assert_eq!(values[8], 3.0); // R
        assert_eq!(values[17], 4.75); // L
        assert_eq!(values[15], -1.0); // W
        assert_eq!(values[1], 0.0);
    }

    #[test]
    fn stale_read_byte_is_discarded() {
        let mut bus = FakeTriad::new();
        bus.read_value = Some(0xAA);
        let sensor = As7265x::init(bus, NoDelay);
        assert!(sensor.is_ok());
    }
}
