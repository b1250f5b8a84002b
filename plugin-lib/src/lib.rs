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

//! The library base for plugbus plugins.
//!
//! A plugin binary builds its [`PluginInfo`], wraps it in a [`Plugin`],
//! and calls [`Plugin::run`]. When the host probes the binary with
//! `-init`, the info is written to stdout as JSON and the process exits;
//! otherwise a [`Client`] is connected over the process stdio and the
//! plugin's own handler runs.
//!
//! Stdout belongs to the protocol. Anything a plugin wants to log goes
//! to stderr ([`setup_logging`]) or through the host's
//! `HostControl.Print`.

#[macro_use]
extern crate log;
extern crate chrono;
extern crate fern;
extern crate plugbus_core_lib;
extern crate plugbus_rpc;
extern crate serde;
extern crate serde_json;

mod client;

pub use crate::client::Client;
pub use plugbus_core_lib::{PluginInfo, PluginType};
pub use plugbus_rpc::Error;

use std::env;
use std::io::{self, Write};
use std::process;

/// A plugin's entry point.
pub struct Plugin {
    info: PluginInfo,
}

impl Plugin {
    pub fn new(info: PluginInfo) -> Plugin {
        Plugin { info }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Runs the plugin.
    ///
    /// With `-init` among the arguments, the plugin info is marshalled
    /// to stdout (no trailing newline) and the process exits 0.
    /// Otherwise `f` is invoked with a connected [`Client`] and the
    /// process arguments after the program name.
    pub fn run<F>(self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&Client, &[String]) -> Result<(), Error>,
    {
        let args: Vec<String> = env::args().collect();
        if args.iter().skip(1).any(|arg| arg == "-init") {
            self.write_info(&mut io::stdout());
            process::exit(0);
        }
        let client = Client::stdio();
        f(&client, &args[1..])
    }

    /// Marshals the plugin info to `out`, with no trailing newline.
    ///
    /// Split out of [`Plugin::run`] so it can be exercised without
    /// exiting the process.
    pub fn write_info<W: Write>(&self, out: &mut W) {
        let info = serde_json::to_string(&self.info).unwrap();
        // any failure here must not reach stdout; the probe output
        // has to stay clean
        if write!(out, "{}", info).and_then(|_| out.flush()).is_err() {
            process::exit(1);
        }
    }
}

/// Directs `log` output to stderr, the only stream a plugin may chat on.
///
/// The level is read from the `PLUGBUS_LOG` environment variable
/// (`error`, `warn`, `info`, `debug` or `trace`), defaulting to `info`.
pub fn setup_logging() -> Result<(), fern::InitError> {
    let level = match env::var("PLUGBUS_LOG") {
        Ok(level) => level.parse().unwrap_or(log::LevelFilter::Info),
        Err(_) => log::LevelFilter::Info,
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
    debug!("plugin logging initialized, level {}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_is_marshalled_without_trailing_newline() {
        let plugin = Plugin::new(PluginInfo {
            id: "superplugin".into(),
            plugin_type: PluginType::OneShot,
            metadata: r#"{"command":"rand"}"#.into(),
        });
        let mut out = Vec::new();
        plugin.write_info(&mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(!text.ends_with('\n'));
        assert_eq!(
            text,
            r#"{"id":"superplugin","plugin_type":"one_shot","metadata":"{\"command\":\"rand\"}"}"#
        );
    }
}
