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

//! A demonstration plugbus host.
//!
//! The host exposes the actions on [`api::App`] to its plugins, and
//! binds each plugin's metadata (`{"command": …}`) to a subcommand of
//! the CLI shell in `main.rs`. Plugins link against this crate to use
//! the generated [`actions::ClientActions`] shims and the
//! [`plugin::SubcommandPlugin`] convention.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
extern crate plugbus_core_lib;
extern crate plugbus_plugin_lib;
extern crate plugbus_rpc;
extern crate rand;
extern crate serde;
extern crate serde_json;

pub mod api;
pub mod plugin;

// Regenerate with:
//
//     plugbus generate actions -o src/gen -p actions \
//         --allow-structs --allow-slices sample-host
#[path = "gen/actions.rs"]
pub mod actions;
