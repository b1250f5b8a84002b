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

//! The demonstration CLI shell.
//!
//! Every registered plugin contributes one subcommand, taken from its
//! metadata. `sample-host rand` spawns whichever plugin bound `rand`
//! and serves it until it exits.

use std::collections::BTreeMap;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use plugbus_core_lib::{Error, Host, OneShotAction, PluginCatalog, PluginInfo};
use plugbus_sample_host::actions::HostActions;
use plugbus_sample_host::api::App;
use plugbus_sample_host::plugin::CommandMetadata;

/// Binds each registered plugin to the subcommand named in its
/// metadata.
struct CliHost {
    commands: Mutex<BTreeMap<String, OneShotAction>>,
}

impl Host for CliHost {
    fn register_one_shot(&self, info: &PluginInfo, action: OneShotAction) -> Result<(), Error> {
        let meta: CommandMetadata = serde_json::from_str(&info.metadata).map_err(|err| {
            Error::Register(info.id.clone(), format!("metadata is not a command binding: {}", err))
        })?;
        let mut commands = self.commands.lock().unwrap();
        if commands.contains_key(&meta.command) {
            let msg = format!("subcommand '{}' is already bound", meta.command);
            return Err(Error::Register(info.id.clone(), msg));
        }
        log::info!("plugin '{}' provides subcommand '{}'", info.id, meta.command);
        commands.insert(meta.command, action);
        Ok(())
    }
}

fn plugin_dir() -> PathBuf {
    match env::var("PLUGBUS_SAMPLE_PLUGINS") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("./plugins"),
    }
}

fn setup_logging() -> Result<(), fern::InitError> {
    let level = match env::var("PLUGBUS_LOG") {
        Ok(level) => level.parse().unwrap_or(log::LevelFilter::Info),
        Err(_) => log::LevelFilter::Warn,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

fn main() {
    if let Err(err) = setup_logging() {
        eprintln!("warning: could not set up logging: {:?}", err);
    }

    let actions = Arc::new(HostActions { api0_app_ref: Arc::new(Mutex::new(App::new())) });
    let catalog = PluginCatalog::new(plugin_dir(), actions);
    let host = CliHost { commands: Mutex::new(BTreeMap::new()) };
    if let Err(err) = catalog.probe(&host) {
        // a broken plugin costs its own subcommand, nothing else
        log::warn!("some plugins were not registered: {}", err);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let commands = host.commands.lock().unwrap();
    match args.first() {
        Some(command) => match commands.get(command) {
            Some(action) => {
                if let Err(err) = action(&args) {
                    eprintln!("sample-host: {}: {}", command, err);
                    process::exit(1);
                }
            }
            None => {
                eprintln!("sample-host: unknown subcommand '{}'", command);
                process::exit(2);
            }
        },
        None => {
            eprintln!("usage: sample-host <subcommand> [args…]");
            if commands.is_empty() {
                eprintln!("no plugins found in {:?}", plugin_dir());
            } else {
                let names: Vec<&str> = commands.keys().map(String::as_str).collect();
                eprintln!("available subcommands: {}", names.join(", "));
            }
            process::exit(2);
        }
    }
}
