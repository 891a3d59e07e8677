use notify_rust::Notification;

use crate::{
    error::{Result, TimerError},
    service::{AlarmNotification, DismissAction, Importance, NotificationChannel, Notifier},
};

const APP_NAME: &str = "Roosty Timer";
const DISMISS_ACTION: &str = "dismiss";

/// Desktop notifications through notify-rust.
///
/// On freedesktop systems the notification stays up until acted on and its
/// Dismiss button reaches back into the service.
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    enabled: bool,
    importance: Option<Importance>,
    posted: Option<u32>,
}

impl DesktopNotifier {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    fn build(&self, notification: &AlarmNotification) -> Notification {
        let mut builder = Notification::new();
        builder
            .appname(APP_NAME)
            .summary(&notification.title)
            .body(&notification.body)
            .icon("alarm-clock");
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            use notify_rust::{Hint, Timeout, Urgency};
            let urgency = match self.importance {
                Some(Importance::High) => Urgency::Critical,
                _ => Urgency::Normal,
            };
            builder
                .urgency(urgency)
                .hint(Hint::Category("alarm".to_string()))
                .hint(Hint::Resident(true))
                .timeout(Timeout::Never)
                .action(DISMISS_ACTION, &notification.dismiss_label);
        }
        builder
    }
}

impl Notifier for DesktopNotifier {
    fn ensure_channel(&mut self, channel: &NotificationChannel) {
        if self.importance.is_none() {
            log::debug!("using notification channel {}", channel.name);
            self.importance = Some(channel.importance);
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn post(&mut self, notification: &AlarmNotification, on_dismiss: DismissAction) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let handle = self
            .build(notification)
            .show()
            .map_err(|e| TimerError::Notification(e.to_string()))?;
        self.posted = Some(handle.id());
        std::thread::spawn(move || {
            handle.wait_for_action(|action| {
                if action == DISMISS_ACTION {
                    on_dismiss();
                }
            });
        });
        Ok(())
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn post(&mut self, notification: &AlarmNotification, _on_dismiss: DismissAction) -> Result<()> {
        // no actions here, the window has its own Dismiss button
        if self.enabled {
            self.build(notification)
                .show()
                .map_err(|e| TimerError::Notification(e.to_string()))?;
        }
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(_id) = self.posted.take() else {
            return;
        };
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // replacing by id and closing the replacement closes the original
            let mut builder = Notification::new();
            builder.appname(APP_NAME).id(_id);
            match builder.show() {
                Ok(handle) => handle.close(),
                Err(e) => log::warn!("couldn't withdraw notification: {e}"),
            }
        }
    }
}
