//! The charging point.
//!
//! `available -> connected_setup_in_progress -> connected_charging ->
//! connected_finished_charging -> available`. While charging, a repeating
//! `status` timer drives the simulated battery towards the configured goal.

use super::monitor::MonitorTrigger;
use super::signal_led::LedTrigger;
use super::{publish, CHARGER_ID};
use crate::builder::{transition, BuildError, MachineBuilder, StateBuilder};
use crate::bus::{Bus, Message};
use crate::config::ChargerConfig;
use crate::core::Args;
use crate::driver::MachineId;
use crate::engine::{ActionContext, MachineDefinition, MachineInstance};
use crate::timer::TimerMode;
use crate::{state_enum, trigger_enum};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the charging tick timer; expiries arrive as the `status` trigger.
pub const STATUS_TIMER: &str = "status";

state_enum! {
    pub enum ChargerState {
        Available => "s_available",
        SetupInProgress => "s_connected_setup_in_progress",
        Charging => "s_connected_charging",
        FinishedCharging => "s_connected_finished_charging",
    }
}

trigger_enum! {
    pub enum ChargerTrigger {
        ConnectPlug => "connect_plug",
        DisconnectPlug => "disconnect_plug",
        SetupSuccess => "setup_success",
        ChargingFinished => "charging_finished",
        /// percentage, goal
        Config => "webserver_charger_config" (Int, Int),
        Status => "status",
    }
}

pub type ChargerMachine = MachineInstance<ChargerState, ChargerTrigger, Charger>;

/// Simulation parameters of one charger.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargerSettings {
    pub tick_interval: Duration,
    pub step: i64,
    pub soon_available_threshold: f64,
    pub initial_percentage: i64,
    pub goal: i64,
}

impl Default for ChargerSettings {
    fn default() -> Self {
        Self::from(&ChargerConfig::default())
    }
}

impl From<&ChargerConfig> for ChargerSettings {
    fn from(config: &ChargerConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            step: config.step,
            soon_available_threshold: config.soon_available_threshold,
            initial_percentage: config.initial_percentage,
            goal: config.goal,
        }
    }
}

pub struct Charger {
    bus: Arc<dyn Bus>,
    monitor_topic: String,
    signal_led: MachineId,
    settings: ChargerSettings,
    initial_charging_percentage: i64,
    charging_percentage: i64,
    charging_goal: i64,
}

impl Charger {
    /// `signal_led` names the status light on the same driver.
    pub fn new(
        bus: Arc<dyn Bus>,
        monitor_topic: impl Into<String>,
        signal_led: impl Into<MachineId>,
        settings: ChargerSettings,
    ) -> Self {
        Self {
            bus,
            monitor_topic: monitor_topic.into(),
            signal_led: signal_led.into(),
            initial_charging_percentage: settings.initial_percentage,
            charging_percentage: settings.initial_percentage,
            charging_goal: settings.goal,
            settings,
        }
    }

    pub fn percentage(&self) -> i64 {
        self.charging_percentage
    }

    pub fn goal(&self) -> i64 {
        self.charging_goal
    }

    pub fn initial_percentage(&self) -> i64 {
        self.initial_charging_percentage
    }

    /// Progress ratio compared against the soon-available threshold.
    ///
    /// `(percentage - initial) / (goal / initial)`. Unverified: this is not the
    /// fraction of the remaining charge, and it is not monotonic in the goal.
    /// With `initial == 0` the divisor is infinite (NaN if the goal is zero as
    /// well), so the threshold is never crossed.
    pub fn progress(&self) -> f64 {
        let delta = self
            .charging_percentage
            .saturating_sub(self.initial_charging_percentage) as f64;
        delta / (self.charging_goal as f64 / self.initial_charging_percentage as f64)
    }

    fn notify_monitor(&self, trigger: MonitorTrigger, args: Args) {
        publish(
            self.bus.as_ref(),
            &self.monitor_topic,
            Message::of(trigger, args),
        );
    }

    fn connect_plug(&mut self, ctx: &mut ActionContext<'_>) {
        self.notify_monitor(MonitorTrigger::ChargerConnect, Args::none());
        ctx.send(LedTrigger::SignalOccupied, &self.signal_led, Args::none());
    }

    fn disconnect_plug(&mut self, ctx: &mut ActionContext<'_>) {
        self.notify_monitor(MonitorTrigger::ChargerDisconnect, Args::none());
        ctx.send(LedTrigger::SignalAvailable, &self.signal_led, Args::none());
    }

    fn configure(&mut self, ctx: &mut ActionContext<'_>, args: &Args) {
        let (Some(percentage), Some(goal)) = (args.int(0), args.int(1)) else {
            return;
        };
        self.initial_charging_percentage = percentage;
        self.charging_percentage = percentage;
        self.charging_goal = goal;
        info!(machine = %ctx.machine_id(), percentage, goal, "Charger configured");
        ctx.send_self(ChargerTrigger::SetupSuccess, Args::none());
    }

    fn start_charging(&mut self, ctx: &mut ActionContext<'_>) {
        ctx.start_timer(STATUS_TIMER, self.settings.tick_interval, TimerMode::Repeating);
    }

    fn stop_charging(&mut self, ctx: &mut ActionContext<'_>) {
        ctx.stop_timer(STATUS_TIMER);
    }

    /// One charging tick: advance, report, and signal completion or near-completion.
    fn status(&mut self, ctx: &mut ActionContext<'_>) {
        self.charging_percentage = self
            .charging_percentage
            .saturating_add(self.settings.step)
            .min(self.charging_goal);
        self.notify_monitor(
            MonitorTrigger::ChargerStatus,
            Args::from([self.charging_percentage, self.charging_goal]),
        );
        debug!(
            machine = %ctx.machine_id(),
            percentage = self.charging_percentage,
            goal = self.charging_goal,
            "Charging status"
        );

        if self.charging_percentage == self.charging_goal {
            ctx.send_self(ChargerTrigger::ChargingFinished, Args::none());
        }
        if self.progress() > self.settings.soon_available_threshold {
            ctx.send(LedTrigger::SignalSoonAvailable, &self.signal_led, Args::none());
        }
    }

    fn finished_charging(&mut self) {
        self.notify_monitor(MonitorTrigger::ChargerFinished, Args::none());
    }
}

/// Disconnecting while charging has no transition; the car has to wait for
/// the charge to finish.
pub fn definition(
) -> Result<Arc<MachineDefinition<ChargerState, ChargerTrigger, Charger>>, BuildError> {
    use ChargerState::*;
    use ChargerTrigger::*;

    let definition = MachineBuilder::new(CHARGER_ID)
        .initial(Available)
        .on_init(|_c: &mut Charger, ctx| info!(machine = %ctx.machine_id(), "Init"))
        .plain_state(Available)
        .state(
            SetupInProgress,
            StateBuilder::new()
                .entry(|c: &mut Charger, ctx| c.connect_plug(ctx))
                .on(Config, |c: &mut Charger, ctx, args: &Args| c.configure(ctx, args)),
        )
        .state(
            Charging,
            StateBuilder::new()
                .entry(|c: &mut Charger, ctx| c.start_charging(ctx))
                .on(Status, |c: &mut Charger, ctx, _args: &Args| c.status(ctx))
                .exit(|c: &mut Charger, ctx| c.stop_charging(ctx)),
        )
        .state(
            FinishedCharging,
            StateBuilder::new().entry(|c: &mut Charger, _ctx| c.finished_charging()),
        )
        .transition(transition(Available, ConnectPlug, SetupInProgress))?
        .transition(transition(SetupInProgress, SetupSuccess, Charging))?
        .transition(transition(Charging, ChargingFinished, FinishedCharging))?
        .transition(
            transition(SetupInProgress, DisconnectPlug, Available)
                .effect(|c: &mut Charger, ctx, _args: &Args| c.disconnect_plug(ctx)),
        )?
        .transition(
            transition(FinishedCharging, DisconnectPlug, Available)
                .effect(|c: &mut Charger, ctx, _args: &Args| c.disconnect_plug(ctx)),
        )?
        .build()?;
    Ok(Arc::new(definition))
}

pub fn machine(charger: Charger) -> Result<ChargerMachine, BuildError> {
    Ok(MachineInstance::new(CHARGER_ID, definition()?, charger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InMemoryBus, Subscription};
    use crate::domain::{signal_led, SignalLed, SIGNAL_LED_ID};
    use crate::driver::Driver;
    use crate::notify::{IndicatorColor, MemoryIndicator};

    const MONITOR_TOPIC: &str = "park/charger_monitor";

    struct Fixture {
        driver: Driver,
        monitor_inbox: Subscription,
        panel: MemoryIndicator,
    }

    impl Fixture {
        fn new(driver: Driver) -> Self {
            let bus = Arc::new(InMemoryBus::new());
            let monitor_inbox = bus.subscribe(MONITOR_TOPIC).unwrap();
            let panel = MemoryIndicator::new();
            driver
                .register(signal_led::machine(SignalLed::new(panel.clone())).unwrap())
                .unwrap();
            let charger =
                Charger::new(bus, MONITOR_TOPIC, SIGNAL_LED_ID, ChargerSettings::default());
            driver.register(machine(charger).unwrap()).unwrap();
            Self {
                driver,
                monitor_inbox,
                panel,
            }
        }

        fn detached() -> Self {
            Self::new(Driver::with_runtime("charger", None))
        }

        fn send(&self, trigger: &str, args: Args) {
            self.driver.send(trigger, CHARGER_ID, args);
        }

        fn state(&self) -> Option<&'static str> {
            self.driver.state_of(CHARGER_ID)
        }

        fn charger<R>(&self, f: impl FnOnce(&Charger) -> R) -> R {
            self.driver
                .inspect(CHARGER_ID, |m: &ChargerMachine| f(m.object()))
                .unwrap()
        }

        fn published(&mut self) -> Vec<String> {
            let mut published = Vec::new();
            while let Some(message) = self.monitor_inbox.try_recv() {
                published.push(String::from_utf8(message.payload).unwrap());
            }
            published
        }
    }

    #[test]
    fn starts_available_with_default_values() {
        let fixture = Fixture::detached();
        assert_eq!(fixture.state(), Some("s_available"));
        assert_eq!(fixture.charger(|c| (c.percentage(), c.goal())), (20, 20));
    }

    #[test]
    fn connect_then_configure_starts_charging() {
        let mut fixture = Fixture::detached();

        fixture.send("connect_plug", Args::none());
        assert_eq!(fixture.state(), Some("s_connected_setup_in_progress"));
        assert_eq!(fixture.panel.color(), IndicatorColor::Red);

        fixture.send("webserver_charger_config", Args::from([20, 100]));
        assert_eq!(fixture.state(), Some("s_connected_charging"));
        assert_eq!(fixture.charger(|c| c.percentage()), 20);
        assert_eq!(fixture.charger(|c| c.goal()), 100);
        assert_eq!(fixture.published(), vec!["charger_connect"]);
    }

    #[test]
    fn tick_reaching_goal_finishes_charging() {
        let mut fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([95, 100]));
        fixture.published();

        fixture.send("status", Args::none());

        assert_eq!(fixture.charger(|c| c.percentage()), 100);
        assert_eq!(fixture.state(), Some("s_connected_finished_charging"));
        assert_eq!(
            fixture.published(),
            vec!["charger_status,100,100", "charger_finished"]
        );
    }

    #[test]
    fn percentage_is_clamped_to_goal() {
        let fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([98, 100]));
        fixture.send("status", Args::none());
        assert_eq!(fixture.charger(|c| c.percentage()), 100);
    }

    #[test]
    fn tick_near_integer_limit_saturates_and_finishes() {
        let fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([i64::MAX - 1, i64::MAX]));

        fixture.send("status", Args::none());

        assert_eq!(fixture.charger(|c| c.percentage()), i64::MAX);
        assert_eq!(fixture.state(), Some("s_connected_finished_charging"));
        assert_eq!(fixture.driver.stats().panicked, 0);
    }

    #[test]
    fn extreme_configuration_does_not_panic() {
        let fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([i64::MAX, i64::MIN]));

        fixture.send("status", Args::none());

        assert_eq!(fixture.charger(|c| c.percentage()), i64::MIN);
        assert_eq!(fixture.state(), Some("s_connected_finished_charging"));
        assert_eq!(fixture.driver.stats().panicked, 0);
    }

    #[test]
    fn disconnect_while_available_is_a_no_op() {
        let mut fixture = Fixture::detached();
        fixture.send("disconnect_plug", Args::none());
        fixture.send("disconnect_plug", Args::none());

        assert_eq!(fixture.state(), Some("s_available"));
        assert!(fixture.published().is_empty());
        assert_eq!(fixture.panel.color(), IndicatorColor::Green);
    }

    #[test]
    fn disconnect_during_setup_returns_to_available() {
        let mut fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("disconnect_plug", Args::none());

        assert_eq!(fixture.state(), Some("s_available"));
        assert_eq!(
            fixture.published(),
            vec!["charger_connect", "charger_disconnect"]
        );
        // the light has no occupied -> available transition
        assert_eq!(fixture.panel.color(), IndicatorColor::Red);
    }

    #[test]
    fn configuration_outside_setup_is_ignored() {
        let fixture = Fixture::detached();
        fixture.send("webserver_charger_config", Args::from([50, 90]));
        assert_eq!(fixture.state(), Some("s_available"));
        assert_eq!(fixture.charger(|c| c.goal()), 20);
    }

    #[test]
    fn progress_past_threshold_turns_light_yellow() {
        let fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([20, 100]));

        // (25 - 20) / (100 / 20) = 1.0
        fixture.send("status", Args::none());
        assert_eq!(fixture.panel.color(), IndicatorColor::PulsatingYellow);
    }

    #[test]
    fn zero_initial_percentage_never_signals_soon_available() {
        let fixture = Fixture::detached();
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([0, 100]));
        fixture.send("status", Args::none());

        assert_eq!(fixture.charger(|c| c.progress()), 0.0);
        assert_eq!(fixture.panel.color(), IndicatorColor::Red);
    }

    #[tokio::test(start_paused = true)]
    async fn status_timer_drives_charging_to_completion() {
        let mut fixture = Fixture::new(Driver::new("charger"));
        fixture.send("connect_plug", Args::none());
        fixture.send("webserver_charger_config", Args::from([90, 100]));
        assert!(fixture.driver.timers().is_active(&CHARGER_ID.into(), STATUS_TIMER));

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(fixture.state(), Some("s_connected_finished_charging"));
        assert_eq!(fixture.charger(|c| c.percentage()), 100);
        assert_eq!(fixture.driver.timers().active(), 0);
        assert_eq!(
            fixture.published(),
            vec![
                "charger_connect",
                "charger_status,95,100",
                "charger_status,100,100",
                "charger_finished",
            ]
        );
    }
}
