use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::rights::{GrantedRights, Right, RightsProvider};

/// Configuration for the requisition tools.
///
/// Holds the rights of the acting user and display preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Rights granted to the acting user, per program.
    rights: GrantedRights,

    /// Whether column listings also include columns that are not displayed
    /// for the requisition's status.
    pub show_hidden_columns: bool,
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The rights granted to the acting user.
    #[must_use]
    pub const fn rights(&self) -> &GrantedRights {
        &self.rights
    }

    /// Grants a right for a program.
    ///
    /// Returns `true` if the grant is new.
    pub fn grant(&mut self, right: Right, program_code: impl Into<String>) -> bool {
        self.rights.grant(right, program_code)
    }
}

impl RightsProvider for Config {
    fn has_right(&self, right: Right, program_code: &str) -> bool {
        self.rights.has_right(right, program_code)
    }
}

/// A right granted for one program, as written in the configuration file.
#[derive(Debug, Serialize, Deserialize)]
struct Grant {
    right: Right,
    program_code: String,
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        show_hidden_columns: bool,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rights: Vec<Grant>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                rights,
                show_hidden_columns,
            } => Self {
                rights: rights
                    .into_iter()
                    .map(|grant| (grant.right, grant.program_code))
                    .collect(),
                show_hidden_columns,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            rights: config
                .rights
                .iter()
                .map(|(right, program_code)| Grant {
                    right,
                    program_code: program_code.to_string(),
                })
                .collect(),
            show_hidden_columns: config.show_hidden_columns,
        }
    }
}
