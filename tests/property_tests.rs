//! Property-based tests for the charge park machines and the payload codec.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use chargepark::bus::{decode, Bus, InMemoryBus, ProtocolError, Subscription};
use chargepark::domain::{
    charger, signal_led, Charger, ChargerMachine, ChargerSettings, ChargerTrigger, LedTrigger,
    SignalLed, CHARGER_ID, SIGNAL_LED_ID,
};
use chargepark::notify::MemoryIndicator;
use chargepark::{Args, Driver, Trigger};
use proptest::prelude::*;
use std::sync::Arc;

const MONITOR_TOPIC: &str = "park/charger_monitor";

fn charge_park() -> (Driver, Subscription, MemoryIndicator) {
    let bus = Arc::new(InMemoryBus::new());
    let inbox = bus.subscribe(MONITOR_TOPIC).unwrap();
    let panel = MemoryIndicator::new();
    let driver = Driver::with_runtime("property", None);
    driver
        .register(signal_led::machine(SignalLed::new(panel.clone())).unwrap())
        .unwrap();
    driver
        .register(
            charger::machine(Charger::new(
                bus,
                MONITOR_TOPIC,
                SIGNAL_LED_ID,
                ChargerSettings::default(),
            ))
            .unwrap(),
        )
        .unwrap();
    (driver, inbox, panel)
}

fn charger_values(driver: &Driver) -> (i64, i64, i64) {
    driver
        .inspect(CHARGER_ID, |m: &ChargerMachine| {
            let c = m.object();
            (c.percentage(), c.goal(), c.initial_percentage())
        })
        .unwrap()
}

prop_compose! {
    fn unhandled_when_available()(
        variant in 0..4u8,
        p in 0..=100i64,
        g in 0..=100i64,
    ) -> (ChargerTrigger, Args) {
        match variant {
            0 => (ChargerTrigger::DisconnectPlug, Args::none()),
            1 => (ChargerTrigger::SetupSuccess, Args::none()),
            2 => (ChargerTrigger::ChargingFinished, Args::none()),
            _ => (ChargerTrigger::Config, Args::from([p, g])),
        }
    }
}

prop_compose! {
    fn led_trigger()(variant in 0..3u8) -> LedTrigger {
        match variant {
            0 => LedTrigger::SignalAvailable,
            1 => LedTrigger::SignalOccupied,
            _ => LedTrigger::SignalSoonAvailable,
        }
    }
}

proptest! {
    #[test]
    fn unhandled_triggers_leave_the_charger_untouched(
        events in prop::collection::vec(unhandled_when_available(), 0..20)
    ) {
        let (driver, mut inbox, _panel) = charge_park();
        let before = charger_values(&driver);

        for (trigger, args) in &events {
            driver.send(trigger.name(), CHARGER_ID, args.clone());
        }

        prop_assert_eq!(driver.state_of(CHARGER_ID), Some("s_available"));
        prop_assert_eq!(charger_values(&driver), before);
        prop_assert!(inbox.try_recv().is_none());
        prop_assert_eq!(driver.stats().ignored, events.len() as u64);
    }

    #[test]
    fn percentage_never_exceeds_goal(
        initial in 0..=100i64,
        extra in 0..=100i64,
        ticks in 1..60usize,
    ) {
        let goal = (initial + extra).min(100);
        let (driver, _inbox, _panel) = charge_park();
        driver.send("connect_plug", CHARGER_ID, Args::none());
        driver.send("webserver_charger_config", CHARGER_ID, Args::from([initial, goal]));

        for _ in 0..ticks {
            driver.send("status", CHARGER_ID, Args::none());
            let (percentage, goal_now, _) = charger_values(&driver);
            prop_assert!(percentage <= goal_now);
        }

        let (percentage, _, _) = charger_values(&driver);
        if percentage == goal {
            prop_assert_eq!(driver.state_of(CHARGER_ID), Some("s_connected_finished_charging"));
        }
    }

    #[test]
    fn ticks_never_panic_for_any_configuration(
        initial in any::<i64>(),
        goal in any::<i64>(),
        ticks in 1..5usize,
    ) {
        let (driver, _inbox, _panel) = charge_park();
        driver.send("connect_plug", CHARGER_ID, Args::none());
        driver.send("webserver_charger_config", CHARGER_ID, Args::from([initial, goal]));

        for _ in 0..ticks {
            driver.send("status", CHARGER_ID, Args::none());
        }

        prop_assert_eq!(driver.stats().panicked, 0);
        let (percentage, goal_now, _) = charger_values(&driver);
        prop_assert!(percentage <= goal_now);
    }

    #[test]
    fn at_most_one_lamp_is_ever_lit(
        triggers in prop::collection::vec(led_trigger(), 0..40)
    ) {
        let panel = MemoryIndicator::new();
        let driver = Driver::with_runtime("led", None);
        driver
            .register(signal_led::machine(SignalLed::new(panel.clone())).unwrap())
            .unwrap();

        for trigger in &triggers {
            driver.send(trigger.name(), SIGNAL_LED_ID, Args::none());
            prop_assert!(panel.lit().len() <= 1);
        }
        prop_assert!(panel.max_simultaneously_lit() <= 1);
    }

    #[test]
    fn codec_rejects_config_with_wrong_arity(
        values in prop::collection::vec(0..1000i64, 0..6)
    ) {
        prop_assume!(values.len() != 2);
        let mut payload = ChargerTrigger::Config.name().to_string();
        for value in &values {
            payload.push(',');
            payload.push_str(&value.to_string());
        }

        let result = decode::<ChargerTrigger>(payload.as_bytes());
        let is_arity_error = matches!(
            result,
            Err(ProtocolError::Arity { expected: 2, received, .. }) if received == values.len()
        );
        prop_assert!(is_arity_error);
    }

    #[test]
    fn codec_accepts_any_pair_of_integers(percentage in any::<i64>(), goal in any::<i64>()) {
        let payload = format!("webserver_charger_config,{percentage},{goal}");
        let (trigger, args) = decode::<ChargerTrigger>(payload.as_bytes()).unwrap();
        prop_assert_eq!(trigger, ChargerTrigger::Config);
        prop_assert_eq!(args, Args::from([percentage, goal]));
    }
}
