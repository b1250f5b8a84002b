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

//! Statically dispatched method tables, grouped into named services.
//!
//! The wire method name has the form `Service.method`; the registry
//! resolves the service, and the service's `Dispatch` impl (typically
//! generated) decodes the params into the concrete request type.

use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RemoteError;
use crate::{Handler, RpcCall, RpcCtx};

/// A set of methods callable under one service name.
pub trait Dispatch: Send + Sync {
    /// Invokes `method` with the decoded positional parameter object,
    /// returning the result object or an error string for the wire.
    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError>;
}

/// A failed service registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterError {
    service: String,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "service '{}' is already registered", self.service)
    }
}

impl error::Error for RegisterError {}

/// Routes inbound requests to named services.
#[derive(Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Arc<dyn Dispatch>>,
}

impl ServiceRegistry {
    pub fn new() -> ServiceRegistry {
        ServiceRegistry { services: BTreeMap::new() }
    }

    /// Registers a service under `name`. Registering the same name twice
    /// is an error.
    pub fn register(&mut self, name: &str, service: Arc<dyn Dispatch>) -> Result<(), RegisterError> {
        if self.services.contains_key(name) {
            return Err(RegisterError { service: name.to_string() });
        }
        self.services.insert(name.to_string(), service);
        Ok(())
    }
}

impl Handler for ServiceRegistry {
    fn handle_request(&mut self, _ctx: &RpcCtx, rpc: RpcCall) -> Result<Value, RemoteError> {
        let dot = match rpc.method.find('.') {
            Some(dot) => dot,
            None => {
                let msg = format!("method '{}' is not of the form 'Service.method'", rpc.method);
                return Err(RemoteError::new(msg));
            }
        };
        let (service, method) = (&rpc.method[..dot], &rpc.method[dot + 1..]);
        match self.services.get(service) {
            Some(handler) => handler.dispatch(method, rpc.params),
            None => Err(RemoteError::method_not_found(&rpc.method)),
        }
    }
}
