use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::debounce::{HOVER_CLOSE_GRACE, HOVER_OPEN_DELAY};
use crate::error::SettingsError;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = ".kanjigo_settings.yaml";
const VERSION_KEY: &str = "version";

/// What a qualifying text selection does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupMode {
    Off,
    #[default]
    Immediate,
    Button,
}

/// Keys the content script reads and watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    PopupMode,
    HoverMode,
    Blacklist,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [
        SettingKey::PopupMode,
        SettingKey::HoverMode,
        SettingKey::Blacklist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::PopupMode => "popupMode",
            SettingKey::HoverMode => "hoverMode",
            SettingKey::Blacklist => "blacklist",
        }
    }

    fn yaml_key(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

/// The shapes a persisted blacklist has been stored in over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlacklistValue {
    List(Vec<Value>),
    Map(Mapping),
    Single(String),
}

impl BlacklistValue {
    /// Flatten into trimmed, non-empty entries in stored order. Mapping keys
    /// are ignored; non-string items are skipped.
    pub fn into_entries(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            BlacklistValue::List(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            BlacklistValue::Map(map) => map
                .into_iter()
                .filter_map(|(_, value)| value.as_str().map(str::to_string))
                .collect(),
            BlacklistValue::Single(entry) => vec![entry],
        };

        raw.into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    }
}

pub fn parse_popup_mode(value: &Value) -> Option<PopupMode> {
    serde_yaml::from_value(value.clone()).ok()
}

pub fn parse_hover_mode(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Normalize whatever is stored under `blacklist` into an entry list.
/// Absent, null and unrecognized values all mean "no entries".
pub fn parse_blacklist(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => match serde_yaml::from_value::<BlacklistValue>(value.clone()) {
            Ok(blacklist) => blacklist.into_entries(),
            Err(e) => {
                warn!("Ignoring unrecognized blacklist value {value:?}: {e}");
                Vec::new()
            }
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default = "default_hover_open_delay_ms")]
    pub hover_open_delay_ms: u64,
    #[serde(default = "default_hover_close_grace_ms")]
    pub hover_close_grace_ms: u64,
}

fn default_hover_open_delay_ms() -> u64 {
    HOVER_OPEN_DELAY.as_millis() as u64
}

fn default_hover_close_grace_ms() -> u64 {
    HOVER_CLOSE_GRACE.as_millis() as u64
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hover_open_delay_ms: default_hover_open_delay_ms(),
            hover_close_grace_ms: default_hover_close_grace_ms(),
        }
    }
}

impl Timing {
    pub fn hover_open_delay(&self) -> Duration {
        Duration::from_millis(self.hover_open_delay_ms)
    }

    pub fn hover_close_grace(&self) -> Duration {
        Duration::from_millis(self.hover_close_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub popup_mode: PopupMode,

    #[serde(default)]
    pub hover_mode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<BlacklistValue>,

    #[serde(default)]
    pub timing: Timing,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            popup_mode: PopupMode::default(),
            hover_mode: false,
            blacklist: None,
            timing: Timing::default(),
        }
    }
}

impl Settings {
    /// Lenient typed view over a raw key/value mapping. Fields that fail to
    /// parse keep their defaults.
    pub fn from_mapping(values: &Mapping) -> Self {
        let get = |key: &str| values.get(Value::String(key.to_string()));
        let defaults = Settings::default();

        Settings {
            version: get(VERSION_KEY)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.version),
            popup_mode: get(SettingKey::PopupMode.as_str())
                .and_then(parse_popup_mode)
                .unwrap_or(defaults.popup_mode),
            hover_mode: get(SettingKey::HoverMode.as_str())
                .and_then(parse_hover_mode)
                .unwrap_or(defaults.hover_mode),
            blacklist: get(SettingKey::Blacklist.as_str())
                .and_then(|value| serde_yaml::from_value(value.clone()).ok()),
            timing: get("timing")
                .and_then(|value| serde_yaml::from_value(value.clone()).ok())
                .unwrap_or(defaults.timing),
        }
    }

    pub fn blacklist_entries(&self) -> Vec<String> {
        self.blacklist
            .clone()
            .map(BlacklistValue::into_entries)
            .unwrap_or_default()
    }
}

/// Called with `(new, old)` whenever a watched key changes. `None` means the
/// key is absent.
pub type WatchCallback = Box<dyn FnMut(Option<&Value>, Option<&Value>)>;

struct Watcher {
    id: u64,
    key: SettingKey,
    callback: Rc<RefCell<WatchCallback>>,
}

/// Change listeners for a settings backend. Clones share the same list.
#[derive(Clone, Default)]
pub struct WatcherRegistry {
    watchers: Rc<RefCell<Vec<Watcher>>>,
    next_id: Rc<Cell<u64>>,
}

impl WatcherRegistry {
    pub fn subscribe(&self, key: SettingKey, callback: WatchCallback) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.watchers.borrow_mut().push(Watcher {
            id,
            key,
            callback: Rc::new(RefCell::new(callback)),
        });
        Subscription {
            id,
            watchers: Rc::downgrade(&self.watchers),
        }
    }

    /// Call every watcher of `key`. The list is snapshotted first, so
    /// callbacks may subscribe or drop subscriptions; those changes apply from
    /// the next notification. A callback that triggers its own key again is
    /// skipped for the nested call.
    pub fn notify(&self, key: SettingKey, new: Option<&Value>, old: Option<&Value>) {
        let callbacks: Vec<_> = self
            .watchers
            .borrow()
            .iter()
            .filter(|w| w.key == key)
            .map(|w| Rc::clone(&w.callback))
            .collect();

        for callback in callbacks {
            match callback.try_borrow_mut() {
                Ok(mut callback) => (*callback)(new, old),
                Err(_) => warn!("Skipping re-entrant notification for {}", key.as_str()),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a watch callback registered. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    watchers: Weak<RefCell<Vec<Watcher>>>,
}

impl Subscription {
    /// A subscription that is not attached to anything, for backends that
    /// never change.
    pub fn detached() -> Self {
        Self {
            id: 0,
            watchers: Weak::new(),
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(watchers) = self.watchers.upgrade()
            && let Ok(mut watchers) = watchers.try_borrow_mut()
        {
            watchers.retain(|w| w.id != self.id);
        }
    }
}

/// Read/notify contract the content script consumes.
pub trait SettingsProxy {
    fn get_item(&self, key: SettingKey) -> Result<Option<Value>, SettingsError>;

    fn watch(&mut self, key: SettingKey, callback: WatchCallback) -> Subscription;
}

/// Settings kept as a YAML mapping, optionally persisted to a file.
pub struct YamlSettingsStore {
    path: Option<PathBuf>,
    values: Mapping,
    watchers: WatcherRegistry,
}

impl YamlSettingsStore {
    pub fn in_memory(settings: &Settings) -> Self {
        Self {
            path: None,
            values: settings_to_mapping(settings),
            watchers: WatcherRegistry::default(),
        }
    }

    /// Open `~/.kanjigo_settings.yaml`, creating it with defaults if missing.
    pub fn open_default() -> Result<Self, SettingsError> {
        let path = settings_path().ok_or(SettingsError::NoHomeDir)?;
        Self::open(path)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        if !path.exists() {
            info!("Settings file not found at {path:?}, creating with defaults");
            let store = Self {
                path: Some(path),
                values: settings_to_mapping(&Settings::default()),
                watchers: WatcherRegistry::default(),
            };
            store.save()?;
            return Ok(store);
        }

        let mut values = read_mapping(&path)?;
        debug!("Loaded settings from {path:?}");

        let version = values
            .get(Value::String(VERSION_KEY.to_string()))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let store_needs_save = version < u64::from(CURRENT_VERSION);
        if store_needs_save {
            migrate_settings(&mut values, version);
        }

        let store = Self {
            path: Some(path),
            values,
            watchers: WatcherRegistry::default(),
        };
        if store_needs_save {
            store.save()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> Settings {
        Settings::from_mapping(&self.values)
    }

    pub fn timing(&self) -> Timing {
        self.settings().timing
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Store `value` under `key`, persist, and notify watchers if it changed.
    pub fn set_item(&mut self, key: SettingKey, value: Value) -> Result<(), SettingsError> {
        let old = self.values.insert(key.yaml_key(), value.clone());
        if old.as_ref() == Some(&value) {
            return Ok(());
        }

        self.save()?;
        self.watchers.notify(key, Some(&value), old.as_ref());
        Ok(())
    }

    pub fn remove_item(&mut self, key: SettingKey) -> Result<(), SettingsError> {
        let Some(old) = self.values.remove(key.yaml_key()) else {
            return Ok(());
        };

        self.save()?;
        self.watchers.notify(key, None, Some(&old));
        Ok(())
    }

    /// Re-read the backing file and notify watchers of keys that changed on
    /// disk. In-memory stores have nothing to reload.
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let fresh = read_mapping(&path)?;
        let previous = std::mem::replace(&mut self.values, fresh);

        for key in SettingKey::ALL {
            let old = previous.get(key.yaml_key());
            let new = self.values.get(key.yaml_key());
            if old != new {
                debug!("Setting {} changed on disk", key.as_str());
                self.watchers.notify(key, new, old);
            }
        }
        Ok(())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = generate_settings_yaml(&self.values)?;
        match fs::write(path, content) {
            Ok(()) => {
                debug!("Saved settings to {path:?}");
                Ok(())
            }
            Err(source) => {
                error!("Failed to save settings to {path:?}: {source}");
                Err(SettingsError::Write {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

impl SettingsProxy for YamlSettingsStore {
    fn get_item(&self, key: SettingKey) -> Result<Option<Value>, SettingsError> {
        Ok(self.values.get(key.yaml_key()).cloned())
    }

    fn watch(&mut self, key: SettingKey, callback: WatchCallback) -> Subscription {
        self.watchers.subscribe(key, callback)
    }
}

fn settings_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(SETTINGS_FILENAME))
}

fn settings_to_mapping(settings: &Settings) -> Mapping {
    match serde_yaml::to_value(settings) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(other) => {
            warn!("Settings serialized to a non-mapping value {other:?}");
            Mapping::new()
        }
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            Mapping::new()
        }
    }
}

fn read_mapping(path: &Path) -> Result<Mapping, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(SettingsError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn migrate_settings(values: &mut Mapping, from_version: u64) {
    info!("Migrating settings from v{from_version} to v{CURRENT_VERSION}");

    // Version 0 files predate the version key; their layout is identical.

    values.insert(
        Value::String(VERSION_KEY.to_string()),
        Value::Number(u64::from(CURRENT_VERSION).into()),
    );
}

fn generate_settings_yaml(values: &Mapping) -> Result<String, SettingsError> {
    let mut content = String::from(SETTINGS_TEMPLATE);
    content.push_str(&serde_yaml::to_string(values)?);
    Ok(content)
}

const SETTINGS_TEMPLATE: &str = r#"# ============================================================================
# Kanji Go settings
# ============================================================================
# popupMode:  off | immediate | button
#             What selecting Japanese text does. "button" shows a small
#             confirm button first.
# hoverMode:  true | false
#             Look up a single kanji after the pointer rests on it.
# blacklist:  Hostnames or URLs where no popup ever appears. Subdomains
#             match too. A list, a mapping of name -> host, or one string.
#
# Example:
#   blacklist:
#     - example.com
#     - https://mail.google.com/
#   timing:
#     hoverOpenDelayMs: 300
#     hoverCloseGraceMs: 500

"#;
