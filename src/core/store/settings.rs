use std::future::Future;

use serde::{Deserialize, Serialize};

/// Application settings carried with the board data: theme, optional app-lock
/// PIN and profile name. Passed through [`crate::core::store::BoardStore`]
/// rather than living in ambient globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub pin: Option<String>,
    pub profile_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: "system".to_owned(),
            pin: None,
            profile_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub pin: Option<Option<String>>,
    pub profile_name: Option<String>,
}

impl Settings {
    pub(crate) fn merged(&self, update: SettingsUpdate) -> Settings {
        let mut next = self.clone();
        if let Some(theme) = update.theme {
            next.theme = theme;
        }
        if let Some(pin) = update.pin {
            next.pin = pin;
        }
        if let Some(profile_name) = update.profile_name {
            next.profile_name = profile_name;
        }
        next
    }
}

pub trait SettingsStore {
    fn read_settings(&self) -> impl Future<Output = anyhow::Result<Settings>>;
    fn write_settings(&self, settings: &Settings) -> impl Future<Output = anyhow::Result<()>>;
}
