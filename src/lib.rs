// Export modules for use in tests
pub mod charset;
pub mod content_script;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod placement;
pub mod replay;
pub mod settings;
pub mod sim;
pub mod site_policy;
// Test utilities - only available when test-utils feature is enabled or during tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the pieces a page integration needs
pub use content_script::{
    ContentScript, DomEvent, NodeId, PageHost, PointerInsideRegion, SurfaceRenderer,
};
pub use engine::{ActiveSurface, EngineEvent, EngineState, SurfaceKind, step};
pub use settings::{PopupMode, SettingKey, Settings, SettingsProxy, YamlSettingsStore};
pub use site_policy::{Blacklist, is_blacklisted};
