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

//! The plugin-side convention of this host: one subcommand per plugin.
//!
//! A plugin announces the subcommand it serves through its metadata;
//! the host shell binds the command name to the plugin and invokes it
//! with the command as the first argument.

use plugbus_plugin_lib::{Client, Error, Plugin, PluginInfo, PluginType};

use crate::actions::ClientActions;

/// What this host expects in `PluginInfo::metadata`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    pub command: String,
}

/// Wraps [`Plugin`] for plugins that serve exactly one subcommand.
pub struct SubcommandPlugin {
    info: PluginInfo,
    command: String,
}

impl SubcommandPlugin {
    pub fn new<S: Into<String>>(id: S, command: S) -> SubcommandPlugin {
        let command = command.into();
        let metadata =
            serde_json::to_string(&CommandMetadata { command: command.clone() }).unwrap();
        let info =
            PluginInfo { id: id.into(), plugin_type: PluginType::OneShot, metadata };
        SubcommandPlugin { info, command }
    }

    /// Runs the plugin. `f` is invoked with the generated call shims
    /// when the host dispatches this plugin's subcommand.
    pub fn run<F>(self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&ClientActions, &[String]) -> Result<(), Error>,
    {
        let command = self.command;
        Plugin::new(self.info).run(|client, args| {
            if args.first().map(String::as_str) == Some(command.as_str()) {
                f(&ClientActions::new(client.clone()), &args[1..])
            } else {
                warn!("invoked without the '{}' subcommand, args {:?}", command, args);
                Ok(())
            }
        })
    }
}
