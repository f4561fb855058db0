/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Method descriptors in the shape of the engine's `extension_api.json`.
//!
//! Only the parts needed to resolve method binds are modeled; all other keys of the document are ignored.

use serde::Deserialize;

use crate::BindingError;

#[derive(Clone, Debug, Deserialize)]
pub struct ExtensionApi {
    #[serde(default)]
    pub classes: Vec<ApiClass>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiClass {
    pub name: String,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub methods: Vec<ApiMethod>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiMethod {
    pub name: String,

    /// Virtual methods have no hash; they are not resolvable through the method-bind lookup.
    #[serde(default)]
    pub hash: Option<i64>,

    #[serde(default)]
    pub is_virtual: bool,

    #[serde(default)]
    pub is_static: bool,
}

impl ExtensionApi {
    pub fn from_json(json: &str) -> Result<Self, BindingError> {
        serde_json::from_str(json).map_err(|e| BindingError::Config(format!("extension API: {e}")))
    }

    pub fn class(&self, name: &str) -> Option<&ApiClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl ApiClass {
    /// Methods that can be called through a method bind.
    pub fn bindable_methods(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.methods
            .iter()
            .filter(|m| !m.is_virtual)
            .filter_map(|m| m.hash.map(|hash| (m.name.as_str(), hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = r#"{
        "header": { "version_major": 4 },
        "classes": [
            {
                "name": "Control",
                "inherits": "CanvasItem",
                "api_type": "core",
                "methods": [
                    { "name": "_has_point", "is_virtual": true, "is_const": true },
                    { "name": "set_size", "hash": 2436320129 },
                    { "name": "get_size", "hash": 3341600327, "is_const": true }
                ]
            },
            { "name": "Object" }
        ]
    }"#;

    #[test]
    fn parse_api_document() {
        let api = ExtensionApi::from_json(API).expect("valid document");

        let control = api.class("Control").expect("Control present");
        assert_eq!(control.inherits.as_deref(), Some("CanvasItem"));

        let methods: Vec<_> = control.bindable_methods().collect();
        assert_eq!(methods, vec![("set_size", 2436320129), ("get_size", 3341600327)]);

        assert!(api.class("Object").expect("Object present").methods.is_empty());
        assert!(api.class("Node").is_none());
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = ExtensionApi::from_json("{ \"classes\": 5 }").unwrap_err();
        assert!(matches!(err, BindingError::Config(_)));
    }
}
