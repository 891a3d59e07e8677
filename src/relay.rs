use crate::{
    prefs::{Prefs, KEY_TRIGGER_TIME},
    scheduler::ExpiryTarget,
    service::AlarmService,
};

/// Hands a fired wake over to the presentation service.
///
/// Needs nothing from the UI, so a timer still rings with no window attached.
pub struct ExpiryRelay {
    prefs: Prefs,
    service: AlarmService,
}

impl ExpiryRelay {
    #[must_use]
    pub const fn new(prefs: Prefs, service: AlarmService) -> Self {
        Self { prefs, service }
    }
}

impl ExpiryTarget for ExpiryRelay {
    fn on_expired(&self, deadline: i64) {
        // a Start that landed after this wake owns the slot now
        match self.prefs.remove_if_eq(KEY_TRIGGER_TIME, deadline) {
            Ok(true) => {}
            Ok(false) => log::debug!("deadline {deadline} was already replaced"),
            Err(e) => log::error!("couldn't clear trigger time: {e}"),
        }
        self.service.start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        communication::Broadcaster,
        service::{fakes, ServiceState},
    };

    fn relay() -> (tempfile::TempDir, Prefs, AlarmService, ExpiryRelay) {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = Prefs::new(dir.path().join("prefs.toml"));
        let (_host, presenter) = fakes::presenter();
        let service = AlarmService::new(presenter, Broadcaster::new(), prefs.clone());
        let relay = ExpiryRelay::new(prefs.clone(), service.clone());
        (dir, prefs, service, relay)
    }

    #[test]
    fn clears_deadline_then_rings() {
        let (_dir, prefs, service, relay) = relay();
        prefs.put_i64(KEY_TRIGGER_TIME, 42).unwrap();
        relay.on_expired(42);
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), None);
        assert_eq!(service.state(), ServiceState::Presenting);
    }

    #[test]
    fn stale_wake_keeps_newer_deadline() {
        let (_dir, prefs, service, relay) = relay();
        prefs.put_i64(KEY_TRIGGER_TIME, 99).unwrap();
        relay.on_expired(42);
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), Some(99));
        assert_eq!(service.state(), ServiceState::Presenting);
    }
}
