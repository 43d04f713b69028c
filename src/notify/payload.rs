//! Notification payload formatting.
//!
//! Wire format (ASCII):
//! ```text
//! "A:412.3 B:87.0 C:1203.9 ... L:55.1 "
//!  └tag┘└value, fixed decimals┘ trailing space after every tuple
//! ```
//!
//! Tuples appear in wavelength order. When the full payload does not fit
//! the link, only the leading whole tuples that fit are kept; a tuple is
//! never cut in half. Whole numbers are used only when not even the first
//! tuple fits at full precision, so a sample is never sent empty.

use core::fmt::Write;

use heapless::String;

use crate::config::{ATT_NOTIFY_OVERHEAD, MAX_PAYLOAD_LEN, VALUE_PRECISION};
use crate::sensor::{SpectralSample, CHANNEL_COUNT};

/// Room for one `"<tag>:<value> "` tuple. `-f32::MAX` at one decimal is
/// 42 characters, so any reading fits.
const TUPLE_CAPACITY: usize = 48;

/// A formatted notification value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    text: String<MAX_PAYLOAD_LEN>,
    channels: usize,
    precision: usize,
}

impl Payload {
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of channel tuples carried.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decimal places used for every value.
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// All channels present at full precision.
    pub fn is_full(&self) -> bool {
        self.channels == CHANNEL_COUNT && self.precision == VALUE_PRECISION
    }
}

/// Largest notification value a link with `transfer_unit` can carry.
pub fn payload_limit(transfer_unit: u16) -> usize {
    usize::from(transfer_unit.saturating_sub(ATT_NOTIFY_OVERHEAD)).min(MAX_PAYLOAD_LEN)
}

/// Format `sample` into at most `limit` bytes.
pub fn format_payload(sample: &SpectralSample, limit: usize) -> Payload {
    let limit = limit.min(MAX_PAYLOAD_LEN);

    let payload = format_at(sample, VALUE_PRECISION, limit);
    if payload.channels > 0 || VALUE_PRECISION == 0 {
        return payload;
    }
    format_at(sample, 0, limit)
}

fn format_at(sample: &SpectralSample, precision: usize, limit: usize) -> Payload {
    let mut text = String::new();
    let mut channels = 0;

    for (tag, value) in sample.channels() {
        let mut tuple: String<TUPLE_CAPACITY> = String::new();
        if write!(tuple, "{}:{:.*} ", tag, precision, value).is_err() {
            tuple.clear();
            if write!(tuple, "{}:ovf ", tag).is_err() {
                continue;
            }
        }
        if text.len() + tuple.len() > limit || text.push_str(&tuple).is_err() {
            break;
        }
        channels += 1;
    }

    Payload {
        text,
        channels,
        precision,
    }
}
