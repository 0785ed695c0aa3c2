pub mod failing_settings;
pub mod test_helpers;
