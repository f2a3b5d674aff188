//! Output sinks driven by machine actions: the dashboard and the status light.

pub mod dashboard;
pub mod indicator;

pub use dashboard::{
    ChargingState, DashboardError, DashboardStats, HttpDashboard, LogReporter, MemoryReporter,
    StatusReport, StatusReporter,
};
pub use indicator::{ConsoleIndicator, IndicatorColor, IndicatorPanel, Lamp, MemoryIndicator};
