//! Process assembly.
//!
//! A charge park process runs one driver with the monitor, the status light
//! and the charger, fed from the charger and monitor topics. A car process
//! runs its own driver with the car. The two only meet on the bus.

use crate::bus::{Bus, BusAdapter};
use crate::config::{DashboardConfig, ParkConfig};
use crate::core::{Args, Trigger};
use crate::domain::{
    car, charger, monitor, signal_led, Car, CarTrigger, Charger, ChargerMonitor, ChargerSettings,
    ChargerTrigger, MonitorTrigger, SignalLed, CAR_ID, CHARGER_ID, MONITOR_ID, SIGNAL_LED_ID,
};
use crate::driver::Driver;
use crate::error::Result;
use crate::notify::{HttpDashboard, IndicatorPanel, LogReporter, StatusReporter};
use crate::web::ApiState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Reporter for the configured dashboard: HTTP when enabled, log-only otherwise.
pub fn dashboard_reporter(
    config: &DashboardConfig,
    runtime: &Handle,
) -> Result<Arc<dyn StatusReporter>> {
    if config.enabled {
        Ok(Arc::new(HttpDashboard::spawn(config, runtime)?))
    } else {
        info!("Dashboard disabled, status reports are only logged");
        Ok(Arc::new(LogReporter))
    }
}

/// The charger side: monitor, status light and charger on one driver.
pub struct ChargePark {
    driver: Driver,
    adapter: BusAdapter,
    bus: Arc<dyn Bus>,
    charger_topic: String,
}

impl ChargePark {
    /// Register the machines and start listening. Requires a tokio runtime.
    pub fn start(
        config: &ParkConfig,
        bus: Arc<dyn Bus>,
        reporter: Arc<dyn StatusReporter>,
        panel: impl IndicatorPanel + 'static,
    ) -> Result<Self> {
        let driver = Driver::new("charge_park");

        driver.register(monitor::machine(ChargerMonitor::new(reporter))?)?;
        driver.register(signal_led::machine(SignalLed::new(panel))?)?;
        driver.register(charger::machine(Charger::new(
            Arc::clone(&bus),
            config.bus.monitor_topic.clone(),
            SIGNAL_LED_ID,
            ChargerSettings::from(&config.charger),
        ))?)?;

        let adapter = BusAdapter::new(driver.clone());
        adapter.route::<ChargerTrigger>(bus.as_ref(), &config.bus.charger_topic, CHARGER_ID)?;
        adapter.route::<MonitorTrigger>(bus.as_ref(), &config.bus.monitor_topic, MONITOR_ID)?;

        info!(
            charger_topic = %config.bus.charger_topic,
            monitor_topic = %config.bus.monitor_topic,
            "Charge park started"
        );
        Ok(Self {
            driver,
            adapter,
            bus,
            charger_topic: config.bus.charger_topic.clone(),
        })
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn adapter(&self) -> &BusAdapter {
        &self.adapter
    }

    /// State for the configuration endpoint, publishing to this park's charger.
    pub fn api_state(&self) -> ApiState {
        ApiState::new(Arc::clone(&self.bus), &self.charger_topic)
    }

    pub fn shutdown(&self) {
        self.adapter.shutdown();
        self.driver.shutdown();
    }
}

/// The car side, with the operator's plug toggle.
pub struct CarStation {
    driver: Driver,
    adapter: BusAdapter,
    connected: AtomicBool,
}

impl CarStation {
    /// Register the car and listen on the car topic. Requires a tokio runtime.
    pub fn start(config: &ParkConfig, bus: Arc<dyn Bus>) -> Result<Self> {
        let driver = Driver::new("car");
        driver.register(car::machine(Car::new(
            Arc::clone(&bus),
            config.bus.charger_topic.clone(),
        ))?)?;

        let adapter = BusAdapter::new(driver.clone());
        adapter.route::<CarTrigger>(bus.as_ref(), &config.bus.car_topic, CAR_ID)?;

        info!(car_topic = %config.bus.car_topic, "Car started");
        Ok(Self {
            driver,
            adapter,
            connected: AtomicBool::new(false),
        })
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn connect(&self) {
        self.send(CarTrigger::Connect);
    }

    pub fn disconnect(&self) {
        self.send(CarTrigger::Disconnect);
    }

    /// Send whichever of connect/disconnect comes next, starting with connect.
    pub fn toggle(&self) -> CarTrigger {
        let trigger = if self.connected.fetch_xor(true, Ordering::AcqRel) {
            CarTrigger::Disconnect
        } else {
            CarTrigger::Connect
        };
        self.send(trigger);
        trigger
    }

    /// The trigger the next [`toggle`](Self::toggle) will send.
    pub fn next_toggle(&self) -> CarTrigger {
        if self.connected.load(Ordering::Acquire) {
            CarTrigger::Disconnect
        } else {
            CarTrigger::Connect
        }
    }

    pub fn shutdown(&self) {
        self.adapter.shutdown();
        self.driver.shutdown();
    }

    fn send(&self, trigger: CarTrigger) {
        self.driver.send(trigger.name(), CAR_ID, Args::none());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;

    #[tokio::test]
    async fn toggle_alternates_starting_with_connect() {
        let bus = Arc::new(InMemoryBus::new());
        let config = ParkConfig::default();
        let mut charger_inbox = bus.subscribe(&config.bus.charger_topic).unwrap();
        let station = CarStation::start(&config, bus).unwrap();

        assert_eq!(station.next_toggle(), CarTrigger::Connect);
        assert_eq!(station.toggle(), CarTrigger::Connect);
        assert_eq!(station.toggle(), CarTrigger::Disconnect);
        assert_eq!(station.toggle(), CarTrigger::Connect);

        let payloads: Vec<_> = std::iter::from_fn(|| charger_inbox.try_recv())
            .map(|m| m.payload)
            .collect();
        assert_eq!(
            payloads,
            vec![
                b"connect_plug".to_vec(),
                b"disconnect_plug".to_vec(),
                b"connect_plug".to_vec()
            ]
        );
    }

    #[tokio::test]
    async fn charge_park_registers_three_machines() {
        let bus = Arc::new(InMemoryBus::new());
        let park = ChargePark::start(
            &ParkConfig::default(),
            bus.clone(),
            Arc::new(LogReporter),
            crate::notify::ConsoleIndicator::default(),
        )
        .unwrap();

        let mut ids: Vec<_> = park
            .driver()
            .machine_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec![CHARGER_ID, MONITOR_ID, SIGNAL_LED_ID]);
        assert_eq!(park.adapter().listener_count(), 2);
        assert_eq!(bus.subscriber_count(), 2);

        park.shutdown();
        assert!(park.driver().is_closed());
    }

    #[test]
    fn start_outside_a_runtime_fails_cleanly() {
        let result = CarStation::start(&ParkConfig::default(), Arc::new(InMemoryBus::new()));
        assert!(result.is_err());
    }
}
