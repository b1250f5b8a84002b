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

//! A one-shot plugin serving the `rand` subcommand: asks the host for a
//! random number and reports it back through the `Print` built-in.

use std::process;

use plugbus_plugin_lib::setup_logging;
use plugbus_sample_host::plugin::SubcommandPlugin;

fn main() {
    if let Err(err) = setup_logging() {
        eprintln!("warning: could not set up logging: {:?}", err);
    }

    let plugin = SubcommandPlugin::new("superplugin", "rand");
    let outcome = plugin.run(|actions, args| {
        let bound = match args.first().map(|raw| raw.parse::<i64>()) {
            Some(Ok(bound)) => bound,
            Some(Err(_)) | None => 100,
        };
        let k = actions.get_random_int(bound)?;
        actions.print(&format!("your random number: {}", k))?;
        log::debug!("drew {} below {}", k, bound);
        Ok(())
    });

    if let Err(err) = outcome {
        log::error!("plugin failed: {}", err);
        process::exit(1);
    }
}
