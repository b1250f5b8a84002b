// Copyright 2022 The Plugbus Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The metadata record a plugin reports about itself during the probe.

use std::fmt;

/// Describes a plugin, as reported by the plugin itself when invoked
/// with `-init`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Identifies the plugin uniquely within one plugin folder.
    pub id: String,
    pub plugin_type: PluginType,
    /// An opaque string, conventionally JSON. The core never interprets
    /// it; the host uses it to bind the plugin to an external trigger.
    #[serde(default)]
    pub metadata: String,
}

/// How a plugin expects to be run.
///
/// Only `OneShot` is fully implemented; `DataSource` is accepted
/// metadata, but such plugins are skipped during registration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    OneShot,
    DataSource,
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PluginType::OneShot => write!(f, "one_shot"),
            PluginType::DataSource => write!(f, "data_source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_wire_format() {
        let json = r#"{"id":"superplugin","plugin_type":"one_shot","metadata":"{\"command\":\"rand\"}"}"#;
        let info: PluginInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "superplugin");
        assert_eq!(info.plugin_type, PluginType::OneShot);
        assert_eq!(info.metadata, r#"{"command":"rand"}"#);
        // metadata bytes survive a round trip untouched
        assert_eq!(serde_json::to_string(&info).unwrap(), json);
    }

    #[test]
    fn metadata_defaults_to_empty() {
        let info: PluginInfo =
            serde_json::from_str(r#"{"id":"p","plugin_type":"data_source"}"#).unwrap();
        assert_eq!(info.metadata, "");
        assert_eq!(info.plugin_type, PluginType::DataSource);
    }
}
