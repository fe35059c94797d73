//! System notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notify_rust::Notification;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, error};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::{APP_NAME, APP_NAME_PRETTY};

/// Send a system notification with a summary and body.
pub fn notify(summary: &str, body: &str) {
    Notification::new()
        .appname(APP_NAME)
        .summary(&format!("{} - {}", APP_NAME_PRETTY, summary))
        .body(body)
        .show()
        .map_err(|e| error!("Failed to send notification: {}", e))
        .ok();
}

/// Visitor to extract the message and binding id from tracing events.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    id: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "id" => self.id = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

/// Tracing layer that sends notifications for warnings and errors.
#[derive(Debug, Clone)]
pub struct NotificationLayer {
    enabled: Arc<AtomicBool>,
}

impl Default for NotificationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationLayer {
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Turn notifications on or off. Shared by every clone of the layer.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

fn should_notify(level: Level) -> Option<&'static str> {
    match level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for NotificationLayer {
    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        let level = *event.metadata().level();

        if let Some(summary) = should_notify(level) {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);

            if let Some(message) = visitor.message {
                match visitor.id {
                    Some(id) => notify(summary, &format!("{} ({})", message, id)),
                    None => notify(summary, &message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_warnings_and_errors_notify() {
        assert_eq!(should_notify(Level::ERROR), Some("error"));
        assert_eq!(should_notify(Level::WARN), Some("warning"));
        assert_eq!(should_notify(Level::INFO), None);
        assert_eq!(should_notify(Level::DEBUG), None);
    }

    #[test]
    fn test_switch_is_shared_between_clones() {
        let layer = NotificationLayer::new();
        let clone = layer.clone();
        clone.set_enabled(false);
        assert!(!layer.enabled.load(Ordering::Relaxed));
    }
}
