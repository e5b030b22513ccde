use crate::manager::{
    GoNoGoConfig, GoOnlyConfig, Gratings, Gratings2Afc, Gratings2AfcConfig, GratingsConfig,
    GratingsGoNoGo, GratingsGoOnly, TrialManager,
};
use rigex_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Trial-manager configuration, tagged by paradigm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "paradigm", rename_all = "kebab-case")]
pub enum ManagerConfig {
    Gratings(GratingsConfig),
    #[serde(rename = "gratings-2afc")]
    Gratings2Afc(Gratings2AfcConfig),
    GoNoGo(GoNoGoConfig),
    GoOnly(GoOnlyConfig),
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig::Gratings(GratingsConfig::default())
    }
}

impl ManagerConfig {
    pub fn paradigm(&self) -> &'static str {
        match self {
            ManagerConfig::Gratings(_) => "gratings",
            ManagerConfig::Gratings2Afc(_) => "gratings-2afc",
            ManagerConfig::GoNoGo(_) => "go-no-go",
            ManagerConfig::GoOnly(_) => "go-only",
        }
    }

    /// Validates the configuration and builds the manager.
    pub fn build(self) -> Result<Box<dyn TrialManager>, ConfigError> {
        Ok(match self {
            ManagerConfig::Gratings(c) => Box::new(Gratings::new(c)?),
            ManagerConfig::Gratings2Afc(c) => Box::new(Gratings2Afc::new(c)?),
            ManagerConfig::GoNoGo(c) => Box::new(GratingsGoNoGo::new(c)?),
            ManagerConfig::GoOnly(c) => Box::new(GratingsGoOnly::new(c)?),
        })
    }
}
