//! Fuzz target: payload encoder and decoder
//!
//! Builds a reading from arbitrary raw channel values, encodes it, and
//! checks the decoder recovers identity and sequence and never yields a
//! finite value for a sentinel channel. Arbitrary bytes are also fed
//! straight to the decoder, which must reject or accept without panicking.
//!
//! cargo fuzz run fuzz_payload

#![no_main]

use airq_gateway::adapters::device_id::DeviceIdentity;
use airq_gateway::app::measurement::CombinedReading;
use airq_gateway::app::payload::{Channel, PAYLOAD_LEN, decode_payload, encode_payload};
use airq_gateway::sensors::{Co2Reading, ParticulateReading, U16_INVALID};
use libfuzzer_sys::fuzz_target;

fn u16_at(data: &[u8], i: usize) -> u16 {
    u16::from_be_bytes([data[i], data[i + 1]])
}

fn i32_at(data: &[u8], i: usize) -> i32 {
    i32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
}

fuzz_target!(|data: &[u8]| {
    let _ = decode_payload(data);

    if data.len() < 38 {
        return;
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[..6]);
    let identity = DeviceIdentity::new(mac);
    let combined = CombinedReading {
        particulate: ParticulateReading {
            pm1p0: u16_at(data, 6),
            pm2p5: u16_at(data, 8),
            pm4p0: u16_at(data, 10),
            pm10p0: u16_at(data, 12),
            humidity: u16_at(data, 14) as i16,
            temperature: u16_at(data, 16) as i16,
            voc_index: u16_at(data, 18) as i16,
            nox_index: u16_at(data, 20) as i16,
        },
        co2: Co2Reading {
            co2: u16_at(data, 22),
            temperature: i32_at(data, 24),
            humidity: i32_at(data, 28),
        },
        sequence: u16_at(data, 32),
    };

    let payload = encode_payload(&identity, &combined);
    assert_eq!(payload.len(), PAYLOAD_LEN);
    let decoded = decode_payload(&payload).expect("encoder output must decode");
    assert_eq!(decoded.identity, identity);
    assert_eq!(decoded.sequence, combined.sequence);
    if combined.co2.co2 == U16_INVALID {
        assert!(decoded.get(Channel::Co2).is_none());
    }
    if combined.particulate.pm2p5 == U16_INVALID {
        assert!(decoded.get(Channel::Pm2p5).is_none());
    }
});
