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

//! The interface a host implements to receive plugin registrations.

use crate::errors::Error;
use crate::manifest::PluginInfo;

/// Invoking this runs one session of a registered plugin: the executable
/// is spawned with the given arguments and served until it exits.
pub type OneShotAction = Box<dyn Fn(&[String]) -> Result<(), Error> + Send + Sync>;

/// Implemented by the embedding host.
///
/// The catalog calls `register_one_shot` once per successfully probed
/// one-shot plugin. The host is free to bind the action to any external
/// trigger: a CLI subcommand, a scheduled event, an HTTP route.
pub trait Host: Send + Sync {
    fn register_one_shot(&self, info: &PluginInfo, action: OneShotAction) -> Result<(), Error>;
}
