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

//! The plugin-side RPC client.

use std::io::{self, BufRead, BufReader, Write};
use std::thread;

use serde::de::DeserializeOwned;
use serde::Serialize;

use plugbus_core_lib::{PrintRequest, PrintResponse};
use plugbus_rpc::{ClientOnlyHandler, Duplex, Error, RpcLoop, RpcPeer};

/// A connected client. Cloning is cheap; all clones issue calls on the
/// same session, and concurrent calls from several threads are matched
/// to their responses by id.
#[derive(Clone)]
pub struct Client {
    peer: RpcPeer,
}

impl Client {
    /// Connects over the process's own stdin/stdout. The boundary
    /// factory: nothing below this call knows about stdio.
    pub fn stdio() -> Client {
        Client::new(Duplex::new(BufReader::new(io::stdin()), io::stdout()))
    }

    /// Connects over an arbitrary duplex endpoint. The response router
    /// runs on a background thread for the life of the connection.
    pub fn new<R, W>(endpoint: Duplex<R, W>) -> Client
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let (reader, writer) = endpoint.into_split();
        let mut rpc_loop = RpcLoop::new(writer);
        let peer = rpc_loop.get_peer();
        thread::spawn(move || {
            if let Err(err) = rpc_loop.mainloop(move || reader, &mut ClientOnlyHandler) {
                warn!("client connection closed: {}", err);
            }
        });
        Client { peer }
    }

    /// Calls a host method and blocks until the response arrives or the
    /// transport fails.
    ///
    /// An unqualified name is looked up in the `Host` namespace; pass a
    /// full `Service.method` name to reach anything else.
    pub fn call<A, R>(&self, method: &str, args: &A) -> Result<R, Error>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let method = if method.contains('.') {
            method.to_string()
        } else {
            format!("Host.{}", method)
        };
        let params = serde_json::to_value(args).map_err(Error::Json)?;
        let result = self.peer.send_rpc_request(&method, &params)?;
        serde_json::from_value(result).map_err(Error::Json)
    }

    /// Prints `text` on the host's standard output.
    pub fn print(&self, text: &str) -> Result<(), Error> {
        let _reply: PrintResponse =
            self.call("HostControl.Print", &PrintRequest { text: text.to_string() })?;
        Ok(())
    }

    /// Whether the host has closed the session.
    pub fn is_disconnected(&self) -> bool {
        self.peer.is_disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_derive::{Deserialize, Serialize};
    use serde_json::Value;

    use plugbus_core_lib::HostControl;
    use plugbus_rpc::test_utils::duplex_pair;
    use plugbus_rpc::{Dispatch, RemoteError, RpcLoop, ServiceRegistry};

    #[derive(Serialize)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Deserialize)]
    struct AddResponse {
        res0: i64,
    }

    struct Adder;

    impl Dispatch for Adder {
        fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
            match method {
                "add" => {
                    let (a, b) = (params["a"].as_i64().unwrap(), params["b"].as_i64().unwrap());
                    Ok(serde_json::json!({ "res0": a + b }))
                }
                _ => Err(RemoteError::method_not_found(method)),
            }
        }
    }

    fn connect_to_host() -> Client {
        let (host_end, plugin_end) = duplex_pair();
        thread::spawn(move || {
            let mut registry = ServiceRegistry::new();
            registry.register("Host", Arc::new(Adder)).unwrap();
            registry
                .register("HostControl", Arc::new(HostControl::with_writer(Box::new(io::sink()))))
                .unwrap();
            let (reader, writer) = host_end.into_split();
            let mut rpc_loop = RpcLoop::new(writer);
            let _ = rpc_loop.mainloop(move || reader, &mut registry);
        });
        Client::new(plugin_end)
    }

    #[test]
    fn typed_call_prepends_host_namespace() {
        let client = connect_to_host();
        let reply: AddResponse = client.call("add", &AddRequest { a: 20, b: 22 }).unwrap();
        assert_eq!(reply.res0, 42);
    }

    #[test]
    fn qualified_call_reaches_builtins() {
        let client = connect_to_host();
        client.print("hello").unwrap();
    }

    #[test]
    fn handler_error_surfaces_as_remote_error() {
        let client = connect_to_host();
        let result: Result<AddResponse, Error> = client.call("subtract", &AddRequest { a: 1, b: 2 });
        match result {
            Err(Error::RemoteError(_)) => (),
            other => panic!("{:?}", other.map(|r| r.res0)),
        }
    }
}
