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

//! The host side of plugbus.
//!
//! A host points a [`PluginCatalog`] at a folder of standalone plugin
//! executables. The catalog probes every candidate with `-init` to learn
//! its [`PluginInfo`], registers each one-shot plugin with the
//! host-provided [`Host`] implementation, and, when a registered action
//! is invoked, spawns the plugin again for a json-rpc session over the
//! child's stdin/stdout.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
extern crate crossbeam_utils;
extern crate plugbus_rpc;
extern crate serde;
extern crate serde_json;

mod catalog;
mod control;
mod errors;
mod host;
mod manifest;
mod session;

pub use crate::catalog::{PluginCatalog, PluginHandle, PROBE_TIMEOUT};
pub use crate::control::{HostControl, PrintRequest, PrintResponse};
pub use crate::errors::{Error, ErrorList};
pub use crate::host::{Host, OneShotAction};
pub use crate::manifest::{PluginInfo, PluginType};
