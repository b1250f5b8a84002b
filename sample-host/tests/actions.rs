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

//! Exercises the generated dispatch surface end to end, over an
//! in-memory session.

#[macro_use]
extern crate serde_json;
extern crate plugbus_rpc;
extern crate plugbus_sample_host;

use std::sync::{Arc, Mutex};
use std::thread;

use plugbus_plugin_lib::Client;
use plugbus_rpc::test_utils::duplex_pair;
use plugbus_rpc::{Dispatch, RpcLoop, ServiceRegistry};
use plugbus_sample_host::actions::{ClientActions, HostActions};
use plugbus_sample_host::api::{App, Summary};

fn host_actions() -> Arc<HostActions> {
    Arc::new(HostActions { api0_app_ref: Arc::new(Mutex::new(App::new())) })
}

#[test]
fn dispatch_decodes_and_forwards() {
    let actions = host_actions();
    let result = actions.dispatch("get_random_int", json!({"n": 10})).unwrap();
    let k = result["res0"].as_i64().unwrap();
    assert!(k >= 0 && k < 10);
}

#[test]
fn dispatch_surfaces_method_errors() {
    let actions = host_actions();
    let err = actions.dispatch("get_random_int", json!({"n": 0})).unwrap_err();
    assert!(err.message().contains("positive"), "{}", err);
}

#[test]
fn dispatch_rejects_unknown_methods_and_bad_params() {
    let actions = host_actions();
    assert!(actions.dispatch("reboot", json!({})).is_err());
    assert!(actions.dispatch("get_random_int", json!({"n": "ten"})).is_err());
}

/// A full in-memory session: generated client shims on one end, the
/// generated dispatch struct served on the other.
#[test]
fn client_shims_round_trip() {
    let (host_end, plugin_end) = duplex_pair();
    thread::spawn(move || {
        let mut registry = ServiceRegistry::new();
        let actions: Arc<dyn Dispatch> = host_actions();
        registry.register("Host", actions).unwrap();
        let (reader, writer) = host_end.into_split();
        let mut rpc_loop = RpcLoop::new(writer);
        let _ = rpc_loop.mainloop(move || reader, &mut registry);
    });

    let actions = ClientActions::new(Client::new(plugin_end));
    let k = actions.get_random_int(10).unwrap();
    assert!(k >= 0 && k < 10);

    let summary = actions.summarize(vec![3, 1, 2]).unwrap();
    assert_eq!(summary, Summary { count: 3, sum: 6, min: 1, max: 3 });

    assert!(actions.get_random_int(-1).is_err());
}
