use anyhow::Result;
use log::{debug, info};
use parking_lot::Mutex;
use std::fmt::Write;
use watchout_fusion::danger::DistanceTier;
use watchout_fusion::utils::BoundingBox;
use watchout_fusion::{DangerVerdict, DepartureSignal, RoadClass};

/// What the orchestrator hands to the alert side for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub frame_index: u64,
    pub current_road: RoadClass,
    /// `None` means the frame was all clear.
    pub verdict: Option<DangerVerdict>,
    /// Original detector box of the reported obstacle, for drawing.
    pub bbox: Option<BoundingBox<f32>>,
}

pub trait AlertSink: Send + Sync {
    /// Must accept a departure, an obstacle and an all-clear alert.
    /// An all-clear says nothing; a sink may use it to forget earlier announcements.
    fn alert(&self, alert: &Alert) -> Result<()>;
}

/// Spoken-style sentence for an alert, `None` when there is nothing to say.
pub fn describe(alert: &Alert) -> Option<String> {
    let verdict = alert.verdict.as_ref()?;
    let mut description = String::new();

    match verdict {
        DangerVerdict::Departure(DepartureSignal::Roadway) => {
            write!(description, "Warning: you are on the roadway, step back").ok()?;
        }
        DangerVerdict::Departure(DepartureSignal::Crosswalk) => {
            write!(description, "Warning: you are leaving the crosswalk").ok()?;
        }
        DangerVerdict::Obstacle(hazard) => {
            let range = match hazard.tier {
                DistanceTier::Near => "very close",
                DistanceTier::Mid => "approaching",
                DistanceTier::Far => "ahead",
            };
            let mut name = hazard.class.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            write!(description, "{name} {range}, {}", hazard.zone).ok()?;
        }
    }

    Some(description)
}

/// Logs every alert, skipping an announcement identical to the previous one.
#[derive(Debug, Default)]
pub struct LogAlertSink {
    last: Mutex<Option<String>>,
}

impl LogAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `alert` and returns what was said, `None` when it was all clear or a repeat.
    /// An all-clear alert forgets the last announcement.
    pub fn announce(&self, alert: &Alert) -> Option<String> {
        let mut last = self.last.lock();
        let Some(text) = describe(alert) else {
            *last = None;
            return None;
        };

        if last.as_deref() == Some(text.as_str()) {
            debug!("[frame {}] repeated: {text}", alert.frame_index);
            return None;
        }

        match &alert.bbox {
            Some(bbox) => info!(
                "[frame {}] {text} (box {:.0},{:.0} {:.0}x{:.0})",
                alert.frame_index,
                bbox.left(),
                bbox.top(),
                bbox.width(),
                bbox.height()
            ),
            None => info!("[frame {}] {text}", alert.frame_index),
        }
        *last = Some(text.clone());
        Some(text)
    }
}

impl AlertSink for LogAlertSink {
    fn alert(&self, alert: &Alert) -> Result<()> {
        self.announce(alert);
        Ok(())
    }
}
