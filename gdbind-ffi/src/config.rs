/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};

use crate::{BindingError, InitLevel};

/// How much validation the binding performs on object access.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Safeguards {
    /// No instance-ID validation on dereference. Accessing a destroyed object is undefined behavior.
    Disengaged,

    /// Validate instance IDs of handles that are not reference-counted.
    #[default]
    Balanced,

    /// Validate every handle on every access, including reference-counted and lifetime-bound parents.
    Strict,
}

/// Process-wide settings of the binding, fixed when the library is loaded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Only register classes in the editor when they are marked as tools.
    pub tool_only_in_editor: bool,

    /// First init level at which the extension is initialized.
    pub min_level: InitLevel,

    pub safeguards: Safeguards,

    /// Resolve all method binds of a level as soon as the level starts, instead of on first use.
    pub eager_method_tables: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            tool_only_in_editor: false,
            min_level: InitLevel::Scene,
            safeguards: Safeguards::default(),
            eager_method_tables: true,
        }
    }
}

impl BindingConfig {
    /// Parses a configuration document; absent fields keep their default.
    pub fn from_json(json: &str) -> Result<Self, BindingError> {
        serde_json::from_str(json).map_err(|e| BindingError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        // Serialization of plain enums and bools cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validates_instance_ids(&self) -> bool {
        self.safeguards >= Safeguards::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BindingConfig::from_json(r#"{ "safeguards": "strict" }"#).expect("valid config");

        assert_eq!(config.safeguards, Safeguards::Strict);
        assert_eq!(config.min_level, InitLevel::Scene);
        assert!(config.eager_method_tables);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = BindingConfig::from_json(r#"{ "safegaurds": "strict" }"#).unwrap_err();
        assert!(matches!(err, BindingError::Config(msg) if msg.contains("safegaurds")));
    }

    #[test]
    fn json_round_trip() {
        let config = BindingConfig {
            tool_only_in_editor: true,
            min_level: InitLevel::Core,
            safeguards: Safeguards::Disengaged,
            eager_method_tables: false,
        };

        let parsed = BindingConfig::from_json(&config.to_json()).expect("valid config");
        assert_eq!(parsed, config);
        assert!(!parsed.validates_instance_ids());
    }
}
