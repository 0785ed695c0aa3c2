use std::cell::Cell;

use serde_yaml::Value;

use crate::error::SettingsError;
use crate::settings::{SettingKey, SettingsProxy, Subscription, WatchCallback};

/// A settings proxy whose storage is unreachable. Every read fails and
/// watches never fire.
#[derive(Default)]
pub struct FailingSettings {
    reads: Cell<usize>,
}

impl FailingSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl SettingsProxy for FailingSettings {
    fn get_item(&self, key: SettingKey) -> Result<Option<Value>, SettingsError> {
        self.reads.set(self.reads.get() + 1);
        Err(SettingsError::Unavailable(format!(
            "storage offline while reading {}",
            key.as_str()
        )))
    }

    fn watch(&mut self, _key: SettingKey, _callback: WatchCallback) -> Subscription {
        Subscription::detached()
    }
}
