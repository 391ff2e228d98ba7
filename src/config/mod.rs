pub mod application_settings;

pub use application_settings::{
    BatchSettings, ClassifierSettings, FallbackPolicy, ScannerSettings, Settings, SettingsError,
};
