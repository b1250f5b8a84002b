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

//! Generic RPC handling, used on both sides of a host/plugin session.
//!
//! Messages are single JSON objects delimited by newlines. A request
//! carries a `method` of the form `Service.method`, a `params` array
//! holding exactly one object, and a numeric `id`; the matching response
//! carries the same `id`, a `result` object, and an `error` string that is
//! `null` on success.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_json;
extern crate crossbeam_utils;

mod dispatch;
mod error;
mod parse;
mod rpc_loop;
mod rpc_peer;
mod stream;
pub mod test_utils;

pub use crate::dispatch::{Dispatch, RegisterError, ServiceRegistry};
pub use crate::error::{Error, ReadError, RemoteError};
pub use crate::parse::{MessageReader, Response, RpcObject};
pub use crate::rpc_loop::RpcLoop;
pub use crate::rpc_peer::{Peer, RawPeer, RpcPeer};
pub use crate::stream::Duplex;

use serde_json::Value;

/// An inbound request, after the envelope has been unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    /// The fully qualified `Service.method` name.
    pub method: String,
    /// The single positional parameter object.
    pub params: Value,
}

/// The environment a request is handled in. Gives handlers access to the
/// peer, so that they can issue calls of their own while serving.
pub struct RpcCtx<'a> {
    peer: &'a RpcPeer,
}

impl<'a> RpcCtx<'a> {
    pub fn get_peer(&self) -> &RpcPeer {
        self.peer
    }
}

/// The handler side of an RPC connection, called for each inbound request.
pub trait Handler {
    fn handle_request(&mut self, ctx: &RpcCtx, rpc: RpcCall) -> Result<Value, RemoteError>;
}

/// A handler for endpoints that only issue calls, such as a plugin's
/// client. Any inbound request is answered with a method-not-found error.
pub struct ClientOnlyHandler;

impl Handler for ClientOnlyHandler {
    fn handle_request(&mut self, _ctx: &RpcCtx, rpc: RpcCall) -> Result<Value, RemoteError> {
        warn!("unexpected inbound request '{}' on a client-only peer", rpc.method);
        Err(RemoteError::method_not_found(&rpc.method))
    }
}
