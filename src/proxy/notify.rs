//! Push alert handling.
//!
//! Independent of the caching state machine: an inbound push payload is
//! rendered verbatim into a user-visible alert with a fixed icon and badge.

use tracing::info;

/// Icon shown on every alert.
pub const ALERT_ICON: &str = "/assets/icons/icon-192.png";
/// Badge shown on every alert.
pub const ALERT_BADGE: &str = "/assets/icons/badge-72.png";

/// A user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub body: String,
  pub icon: &'static str,
  pub badge: &'static str,
}

/// Where alerts are displayed.
pub trait AlertSink: Send + Sync {
  fn show(&self, alert: &Alert);
}

/// Default sink that surfaces alerts through the log.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
  fn show(&self, alert: &Alert) {
    info!(body = %alert.body, icon = alert.icon, badge = alert.badge, "Push alert");
  }
}

/// Render an inbound push payload as an alert.
pub fn handle_push(payload: &str, sink: &dyn AlertSink) {
  sink.show(&Alert {
    body: payload.to_string(),
    icon: ALERT_ICON,
    badge: ALERT_BADGE,
  });
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  struct CapturingSink {
    shown: Mutex<Vec<Alert>>,
  }

  impl AlertSink for CapturingSink {
    fn show(&self, alert: &Alert) {
      self.shown.lock().unwrap().push(alert.clone());
    }
  }

  #[test]
  fn payload_is_rendered_verbatim_with_fixed_chrome() {
    let sink = CapturingSink {
      shown: Mutex::new(Vec::new()),
    };

    handle_push("Town hall moved to 7pm", &sink);

    let shown = sink.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].body, "Town hall moved to 7pm");
    assert_eq!(shown[0].icon, ALERT_ICON);
    assert_eq!(shown[0].badge, ALERT_BADGE);
  }
}
