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

//! Reading messages from the wire, and parsing them into RPC objects.

use std::io::BufRead;

use serde_json::Value;

use crate::error::{ReadError, RemoteError};
use crate::RpcCall;

/// The result side of an RPC exchange: either the `result` object or the
/// peer's `error` string.
pub type Response = Result<Value, RemoteError>;

/// Reads and parses newline-delimited JSON messages from a stream.
///
/// The reader owns its line buffer, so repeated reads reuse one
/// allocation. Empty lines between frames are skipped.
#[derive(Debug, Default)]
pub struct MessageReader(String);

impl MessageReader {
    /// Attempts to read the next complete frame from the stream.
    ///
    /// Returns `ReadError::Disconnect` when the stream reaches
    /// end-of-file.
    pub fn next<R: BufRead>(&mut self, reader: &mut R) -> Result<RpcObject, ReadError> {
        loop {
            self.0.clear();
            let _ = reader.read_line(&mut self.0)?;
            if self.0.is_empty() {
                return Err(ReadError::Disconnect);
            }
            if !self.0.trim().is_empty() {
                break;
            }
        }
        self.parse(&self.0)
    }

    /// Parses a single message. Exposed for testing.
    pub fn parse(&self, s: &str) -> Result<RpcObject, ReadError> {
        let val = serde_json::from_str::<Value>(s)?;
        if !val.is_object() {
            Err(ReadError::NotObject)
        } else {
            Ok(RpcObject(val))
        }
    }
}

/// A parsed but not yet classified message.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcObject(pub Value);

impl RpcObject {
    pub fn get_id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    pub fn get_method(&self) -> Option<&str> {
        self.0.get("method").and_then(Value::as_str)
    }

    /// A message without a `method` but with an `id` is a response.
    pub fn is_response(&self) -> bool {
        self.0.get("method").is_none() && self.0.get("id").is_some()
    }

    /// Converts the message into a request, unwrapping the one-element
    /// `params` array.
    pub fn into_rpc(self) -> Result<(u64, RpcCall), ReadError> {
        let id = match self.get_id() {
            Some(id) => id,
            None => return Err(ReadError::Malformed("request has no numeric 'id'".into())),
        };
        let method = match self.get_method() {
            Some(m) => m.to_string(),
            None => return Err(ReadError::Malformed("request has no 'method'".into())),
        };
        let mut obj = match self.0 {
            Value::Object(obj) => obj,
            _ => return Err(ReadError::NotObject),
        };
        let params = match obj.remove("params") {
            Some(Value::Array(mut args)) => {
                if args.len() != 1 {
                    let msg = format!("expected exactly one positional param, got {}", args.len());
                    return Err(ReadError::Malformed(msg));
                }
                args.remove(0)
            }
            Some(_) => return Err(ReadError::Malformed("'params' is not an array".into())),
            None => return Err(ReadError::Malformed("request has no 'params'".into())),
        };
        Ok((id, RpcCall { method, params }))
    }

    /// Converts the message into a response, validating that the `error`
    /// and `result` fields are consistent.
    ///
    /// An error is signalled by a non-empty `error` string; otherwise the
    /// `result` value (possibly `null`) is the outcome.
    pub fn into_response(self) -> Result<Response, String> {
        let mut obj = match self.0 {
            Value::Object(obj) => obj,
            _ => return Err("response is not an object".into()),
        };
        let result = obj.remove("result");
        match obj.remove("error") {
            Some(Value::String(msg)) => {
                if msg.is_empty() {
                    Err("response 'error' is an empty string".into())
                } else {
                    Ok(Err(RemoteError::new(msg)))
                }
            }
            Some(Value::Null) | None => Ok(Ok(result.unwrap_or(Value::Null))),
            Some(_) => Err("response 'error' is neither null nor a string".into()),
        }
    }
}
