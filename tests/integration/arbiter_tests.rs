//! Advertising slot sharing between data and name bursts.

use airq_gateway::app::advertising::AdvertisingSlot;
use airq_gateway::app::payload::decode_payload;
use airq_gateway::config::GatewayConfig;
use airq_gateway::error::SensorError;

use crate::mock_hw::{MockPeripheral, MockRadio, OnAir, RadioCall, Rig, particulate_sample};

fn sampling_rig(radio: MockRadio) -> Rig {
    Rig::start_with(
        &GatewayConfig::default(),
        MockPeripheral::present(Ok(particulate_sample())),
        MockPeripheral::absent(),
        radio,
    )
    .unwrap()
}

fn on_air_sequence(radio: &MockRadio) -> u16 {
    match radio.on_air() {
        Some(OnAir::Data(payload)) => decode_payload(&payload).unwrap().sequence,
        other => panic!("expected data on air, got {:?}", other),
    }
}

#[test]
fn publish_puts_data_on_air() {
    let mut rig = sampling_rig(MockRadio::ready());
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Off);

    rig.tick(1000);

    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Data);
    assert_eq!(rig.radio.on_air_interval(), Some(338));
    assert_eq!(on_air_sequence(&rig.radio), 1);
}

#[test]
fn name_burst_pre_empts_and_data_is_rebuilt() {
    let mut rig = sampling_rig(MockRadio::ready());
    rig.tick(1000);
    rig.tick(1900);
    rig.tick(2800);
    let before = on_air_sequence(&rig.radio);
    assert_eq!(before, 3);

    // Burst period elapses: name on air within one tick.
    rig.tick(3011);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::NameBurst);
    assert_eq!(rig.radio.on_air(), Some(OnAir::Name("AirQ CAFE".into())));
    assert_eq!(rig.radio.on_air_interval(), Some(32));

    // Burst end: data rebuilt from the shared state with a fresh sequence.
    rig.tick(3111);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Data);
    assert_eq!(on_air_sequence(&rig.radio), before + 1);
    assert_eq!(rig.radio.on_air_interval(), Some(338));
}

#[test]
fn publish_during_burst_replaces_name() {
    let config = GatewayConfig {
        name_burst_duration_ms: 800,
        ..GatewayConfig::default()
    };
    let mut rig = Rig::start_with(
        &config,
        MockPeripheral::present(Ok(particulate_sample())),
        MockPeripheral::absent(),
        MockRadio::ready(),
    )
    .unwrap();
    rig.tick(1000);
    rig.tick(1900);
    rig.tick(2800);
    rig.tick(3011);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::NameBurst);

    // Sample at 3700 lands inside the 3011..3811 burst.
    rig.tick(3700);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Data);
    assert_eq!(on_air_sequence(&rig.radio), 4);

    // Burst end still fires and rebuilds.
    rig.tick(3811);
    assert_eq!(on_air_sequence(&rig.radio), 5);
}

#[test]
fn burst_without_data_goes_quiet() {
    let mut rig = Rig::start(
        MockPeripheral::present(Err(SensorError::NotReady)),
        MockPeripheral::absent(),
    )
    .unwrap();

    rig.tick(3011);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::NameBurst);

    rig.tick(3111);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Off);
    assert_eq!(rig.radio.on_air(), None);
    assert_eq!(rig.radio.calls().last(), Some(&RadioCall::Stop));
}

#[test]
fn radio_not_ready_drops_transmits_but_uplink_still_sees_payloads() {
    let radio = MockRadio::default();
    let mut rig = sampling_rig(radio.clone());

    rig.tick(1000);
    // Overdue poll and the name burst both fire here.
    rig.tick(3011);

    assert!(radio.calls().is_empty());
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Off);
    assert_eq!(rig.uplink.sent().len(), 2);

    // Gate opens: the next publish goes out.
    radio.set_ready(true);
    rig.tick(3011 + 900);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Data);
}

#[test]
fn radio_failure_leaves_slot_off() {
    let radio = MockRadio::ready();
    radio.fail_starts(true);
    let mut rig = sampling_rig(radio);

    rig.tick(1000);
    assert_eq!(rig.sub.advertising_slot(), AdvertisingSlot::Off);
    assert_eq!(rig.uplink.sent().len(), 1);
}
