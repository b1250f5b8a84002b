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

use std::error;
use std::fmt;
use std::io;

/// Errors that can occur when sending an RPC.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred on the underlying communication channel.
    Io(io::Error),
    /// A value could not be encoded to, or decoded from, JSON on this
    /// side of the channel.
    Json(serde_json::Error),
    /// The peer closed its connection.
    PeerDisconnect,
    /// The peer sent a response containing the id, but it was malformed.
    InvalidResponse,
    /// The peer returned an error.
    RemoteError(RemoteError),
}

/// An error string reported by the remote peer, carried in the `error`
/// field of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError(String);

impl RemoteError {
    pub fn new<S: Into<String>>(message: S) -> RemoteError {
        RemoteError(message.into())
    }

    pub fn method_not_found(method: &str) -> RemoteError {
        RemoteError(format!("method '{}' not found", method))
    }

    pub fn invalid_params<E: fmt::Display>(err: E) -> RemoteError {
        RemoteError(format!("invalid params: {}", err))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur in the process of receiving an RPC.
#[derive(Debug)]
pub enum ReadError {
    /// An error occurred in the underlying stream.
    Io(io::Error),
    /// The message was not valid JSON.
    Json(serde_json::Error),
    /// The message was valid JSON, but did not parse to an object.
    NotObject,
    /// The message was an object, but not a valid request or response.
    Malformed(String),
    /// The peer closed its connection.
    Disconnect,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "I/O error on the rpc channel: {}", err),
            Error::Json(ref err) => write!(f, "JSON error: {}", err),
            Error::PeerDisconnect => write!(f, "peer closed the connection"),
            Error::InvalidResponse => write!(f, "peer sent a malformed response"),
            Error::RemoteError(ref err) => write!(f, "remote error: {}", err),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReadError::Io(ref err) => write!(f, "I/O error reading stream: {}", err),
            ReadError::Json(ref err) => write!(f, "error parsing json: {}", err),
            ReadError::NotObject => write!(f, "json frame is not an object"),
            ReadError::Malformed(ref msg) => write!(f, "malformed rpc message: {}", msg),
            ReadError::Disconnect => write!(f, "stream closed"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Json(ref err) => Some(err),
            _ => None,
        }
    }
}

impl error::Error for RemoteError {}

impl error::Error for ReadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ReadError::Io(ref err) => Some(err),
            ReadError::Json(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Error {
        Error::RemoteError(err)
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> RemoteError {
        RemoteError(err.to_string())
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> ReadError {
        ReadError::Io(err)
    }
}

impl From<serde_json::Error> for ReadError {
    fn from(err: serde_json::Error) -> ReadError {
        ReadError::Json(err)
    }
}
