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

#[macro_use]
extern crate serde_json;
extern crate plugbus_rpc;

use std::sync::Arc;
use std::thread;

use serde_json::Value;

use plugbus_rpc::test_utils::{duplex_pair, test_channel, ChannelReader, DummyWriter};
use plugbus_rpc::{
    ClientOnlyHandler, Dispatch, Duplex, Error, Handler, RemoteError, RpcCall, RpcCtx, RpcLoop,
    RpcPeer, ServiceRegistry,
};

/// Handler that responds to requests with whatever params they sent.
struct EchoHandler;

impl Handler for EchoHandler {
    fn handle_request(&mut self, _ctx: &RpcCtx, rpc: RpcCall) -> Result<Value, RemoteError> {
        if rpc.method == "Host.fail" {
            Err(RemoteError::new("told to fail"))
        } else {
            Ok(rpc.params)
        }
    }
}

/// Runs a server with the given handler on one end of a duplex pair and
/// returns a connected client peer plus the threads' join handles.
fn spawn_session<H>(mut handler: H) -> (RpcPeer, thread::JoinHandle<()>, thread::JoinHandle<()>)
where
    H: Handler + Send + 'static,
{
    let (server_end, client_end) = duplex_pair();
    let server = thread::spawn(move || {
        let (reader, writer) = server_end.into_split();
        let mut rpc_loop = RpcLoop::new(writer);
        let _ = rpc_loop.mainloop(move || reader, &mut handler);
    });

    let (reader, writer) = client_end.into_split();
    let mut rpc_loop: RpcLoop<DummyWriter> = RpcLoop::new(writer);
    let peer = rpc_loop.get_peer();
    let client = thread::spawn(move || {
        let _ = rpc_loop.mainloop(move || reader, &mut ClientOnlyHandler);
    });
    (peer, server, client)
}

#[test]
fn test_call_round_trip() {
    let (peer, _server, _client) = spawn_session(EchoHandler);
    let result = peer.send_rpc_request("Host.echo", &json!({"n": 10})).unwrap();
    assert_eq!(result, json!({"n": 10}));
}

#[test]
fn test_remote_error() {
    let (peer, _server, _client) = spawn_session(EchoHandler);
    match peer.send_rpc_request("Host.fail", &json!({})) {
        Err(Error::RemoteError(err)) => assert_eq!(err.message(), "told to fail"),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_concurrent_calls() {
    // one session, many callers: every response must reach exactly the
    // caller whose request shares its id.
    let (peer, _server, _client) = spawn_session(EchoHandler);
    let mut callers = Vec::new();
    for i in 0..100 {
        let peer = peer.clone();
        callers.push(thread::spawn(move || {
            let result = peer.send_rpc_request("Host.echo", &json!({"call": i})).unwrap();
            assert_eq!(result, json!({"call": i}));
        }));
    }
    for caller in callers {
        caller.join().unwrap();
    }
}

#[test]
fn test_disconnect_fails_pending_and_later_calls() {
    // a client whose peer never answers and then hangs up
    let (_tx, reader): (DummyWriter, ChannelReader) = plugbus_rpc::test_utils::channel_stream();
    let (out_tx, mut out_rx) = test_channel();
    let mut rpc_loop = RpcLoop::new(out_tx);
    let peer = rpc_loop.get_peer();
    let looper = thread::spawn(move || {
        let _ = rpc_loop.mainloop(move || reader, &mut ClientOnlyHandler);
    });

    let caller = {
        let peer = peer.clone();
        thread::spawn(move || peer.send_rpc_request("Host.echo", &json!({})))
    };
    // the request goes out, then the read side is torn down
    let req = out_rx.next_timeout(std::time::Duration::from_secs(1));
    assert!(req.is_some());
    drop(_tx);
    looper.join().unwrap();

    match caller.join().unwrap() {
        Err(Error::PeerDisconnect) => (),
        other => panic!("{:?}", other),
    }
    match peer.send_rpc_request("Host.echo", &json!({})) {
        Err(Error::PeerDisconnect) => (),
        other => panic!("{:?}", other),
    }
    assert!(peer.is_disconnected());
}

#[test]
fn test_out_of_order_responses() {
    // hand-crafted peer: answer the second request first
    let (host_tx, mut host_rx) = test_channel();
    let (wire_tx, wire_rx) = plugbus_rpc::test_utils::channel_stream();
    let mut rpc_loop = RpcLoop::new(host_tx);
    let peer = rpc_loop.get_peer();
    let looper = thread::spawn(move || {
        let _ = rpc_loop.mainloop(move || wire_rx, &mut ClientOnlyHandler);
    });

    let first = {
        let peer = peer.clone();
        thread::spawn(move || peer.send_rpc_request("Host.echo", &json!({"tag": "a"})))
    };
    let req_a = host_rx
        .next_timeout(std::time::Duration::from_secs(1))
        .unwrap()
        .unwrap();
    let second = {
        let peer = peer.clone();
        thread::spawn(move || peer.send_rpc_request("Host.echo", &json!({"tag": "b"})))
    };
    let req_b = host_rx
        .next_timeout(std::time::Duration::from_secs(1))
        .unwrap()
        .unwrap();

    let (id_a, id_b) = (req_a.get_id().unwrap(), req_b.get_id().unwrap());
    use std::io::Write;
    let mut wire_tx = wire_tx;
    writeln!(wire_tx, r#"{{"result":{{"for":"b"}},"error":null,"id":{}}}"#, id_b).unwrap();
    writeln!(wire_tx, r#"{{"result":{{"for":"a"}},"error":null,"id":{}}}"#, id_a).unwrap();

    assert_eq!(second.join().unwrap().unwrap(), json!({"for": "b"}));
    assert_eq!(first.join().unwrap().unwrap(), json!({"for": "a"}));

    drop(wire_tx);
    looper.join().unwrap();
}

struct Doubler;

impl Dispatch for Doubler {
    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
        match method {
            "double" => {
                let n = params["n"].as_i64().unwrap_or(0);
                Ok(json!({ "res0": n * 2 }))
            }
            _ => Err(RemoteError::method_not_found(method)),
        }
    }
}

#[test]
fn test_registry_session() {
    let mut registry = ServiceRegistry::new();
    registry.register("Host", Arc::new(Doubler)).unwrap();
    let (peer, _server, _client) = spawn_session(registry);

    let result = peer.send_rpc_request("Host.double", &json!({"n": 21})).unwrap();
    assert_eq!(result, json!({"res0": 42}));

    match peer.send_rpc_request("Ghost.double", &json!({"n": 1})) {
        Err(Error::RemoteError(_)) => (),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_duplex_endpoint_reads_and_writes() {
    let (mine, theirs) = duplex_pair();
    let mut mine: Duplex<ChannelReader, DummyWriter> = mine;
    let mut theirs: Duplex<ChannelReader, DummyWriter> = theirs;

    use std::io::{BufRead, Write};
    writeln!(mine, "{{\"ping\":1}}").unwrap();
    let mut line = String::new();
    theirs.read_line(&mut line).unwrap();
    assert_eq!(line, "{\"ping\":1}\n");

    writeln!(theirs, "{{\"pong\":2}}").unwrap();
    line.clear();
    mine.read_line(&mut line).unwrap();
    assert_eq!(line, "{\"pong\":2}\n");
}
