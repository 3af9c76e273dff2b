//! Metrics collection and registry.

use crate::session::{CameraSessionManager, ManagerStats};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of manager state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Cameras in the latest discovery.
    pub available_cameras: usize,
    /// Sessions currently open.
    pub active_sessions: usize,
    /// Whether periodic discovery runs.
    pub polling: bool,
    /// Whether a capture is outstanding.
    pub capturing: bool,
    /// Operation counters.
    pub stats: ManagerStats,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of the manager.
    pub fn from_manager(manager: &CameraSessionManager) -> Self {
        Self {
            available_cameras: manager.available_cameras().len(),
            active_sessions: manager.sessions().len(),
            polling: manager.is_polling(),
            capturing: manager.is_capturing(),
            stats: manager.stats(),
        }
    }
}

/// Prometheus metrics registry for camera session monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // State gauges
    available_cameras: IntGauge,
    active_sessions: IntGauge,
    polling: IntGauge,
    capturing: IntGauge,

    // Operation counters
    detections: IntCounter,
    detection_failures: IntCounter,
    connects: IntCounter,
    connect_failures: IntCounter,
    disconnects: IntCounter,
    disconnect_failures: IntCounter,
    captures: IntCounter,
    capture_failures: IntCounter,
    setting_changes: IntCounter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Advances a counter to `target`; counters never go backwards.
fn catch_up(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all camera metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let available_cameras = gauge(
            &registry,
            "usb_camera_available",
            "Cameras reported by the latest discovery",
        )?;
        let active_sessions = gauge(
            &registry,
            "usb_camera_active_sessions",
            "Open camera sessions",
        )?;
        let polling = gauge(
            &registry,
            "usb_camera_polling",
            "Periodic discovery status (1=running, 0=stopped)",
        )?;
        let capturing = gauge(
            &registry,
            "usb_camera_capture_in_progress",
            "Capture status (1=capturing, 0=idle)",
        )?;

        let detections = counter(
            &registry,
            "usb_camera_detections_total",
            "Successful discovery requests",
        )?;
        let detection_failures = counter(
            &registry,
            "usb_camera_detection_failures_total",
            "Failed discovery requests",
        )?;
        let connects = counter(
            &registry,
            "usb_camera_connects_total",
            "Sessions opened",
        )?;
        let connect_failures = counter(
            &registry,
            "usb_camera_connect_failures_total",
            "Failed or rejected connect attempts",
        )?;
        let disconnects = counter(
            &registry,
            "usb_camera_disconnects_total",
            "Sessions closed",
        )?;
        let disconnect_failures = counter(
            &registry,
            "usb_camera_disconnect_failures_total",
            "Failed disconnect requests",
        )?;
        let captures = counter(
            &registry,
            "usb_camera_captures_total",
            "Photos captured",
        )?;
        let capture_failures = counter(
            &registry,
            "usb_camera_capture_failures_total",
            "Failed capture attempts",
        )?;
        let setting_changes = counter(
            &registry,
            "usb_camera_setting_changes_total",
            "Camera settings written",
        )?;

        Ok(Self {
            registry,
            available_cameras,
            active_sessions,
            polling,
            capturing,
            detections,
            detection_failures,
            connects,
            connect_failures,
            disconnects,
            disconnect_failures,
            captures,
            capture_failures,
            setting_changes,
        })
    }

    /// Updates all metrics from a snapshot of manager state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.available_cameras.set(snapshot.available_cameras as i64);
        self.active_sessions.set(snapshot.active_sessions as i64);
        self.polling.set(i64::from(snapshot.polling));
        self.capturing.set(i64::from(snapshot.capturing));

        let stats = &snapshot.stats;
        catch_up(&self.detections, stats.detections);
        catch_up(&self.detection_failures, stats.detection_failures);
        catch_up(&self.connects, stats.connects);
        catch_up(&self.connect_failures, stats.connect_failures);
        catch_up(&self.disconnects, stats.disconnects);
        catch_up(&self.disconnect_failures, stats.disconnect_failures);
        catch_up(&self.captures, stats.captures);
        catch_up(&self.capture_failures, stats.capture_failures);
        catch_up(&self.setting_changes, stats.setting_changes);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
