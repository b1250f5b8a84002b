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

//! Host-side error kinds, and the aggregate collected during probing.

use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use plugbus_rpc::ReadError;

#[derive(Debug)]
pub enum Error {
    /// The plugin folder could not be read.
    Discovery(io::Error),
    /// A plugin executable could not be spawned.
    Spawn(PathBuf, io::Error),
    /// A plugin exited nonzero during the metadata probe.
    ProbeExit(PathBuf, Option<i32>),
    /// The probe output was not a valid `PluginInfo` object.
    ProbeDecode(PathBuf, serde_json::Error),
    /// The probe did not complete within the timeout.
    ProbeTimeout(PathBuf),
    /// Two plugins reported the same id; the later one loses.
    DuplicateId(String),
    /// The host rejected the registration of a plugin.
    Register(String, String),
    /// A session was requested for an id that is not registered.
    UnknownPlugin(String),
    /// A plugin exited nonzero at the end of a session.
    SessionExit(String, Option<i32>),
    /// A service could not be registered on the session's rpc server.
    RpcRegister(String),
    /// The session's rpc server stopped on a decode failure.
    Rpc(ReadError),
    /// Any other I/O failure while managing a child process.
    Io(io::Error),
    /// Several per-plugin errors, accumulated over one probe pass.
    Probe(ErrorList),
}

/// A list of per-plugin errors. Individual failures never abort the
/// probing of sibling plugins; they are collected and reported together.
#[derive(Debug, Default)]
pub struct ErrorList(pub Vec<Error>);

impl ErrorList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Discovery(ref err) => write!(f, "error reading plugin folder: {}", err),
            Error::Spawn(ref path, ref err) => {
                write!(f, "error spawning plugin {:?}: {}", path, err)
            }
            Error::ProbeExit(ref path, code) => {
                write!(f, "plugin {:?} exited with status {:?} during probe", path, code)
            }
            Error::ProbeDecode(ref path, ref err) => {
                write!(f, "plugin {:?} sent invalid plugin info: {}", path, err)
            }
            Error::ProbeTimeout(ref path) => {
                write!(f, "plugin {:?} did not answer the probe in time", path)
            }
            Error::DuplicateId(ref id) => {
                write!(f, "a plugin with the id '{}' is already registered", id)
            }
            Error::Register(ref id, ref msg) => {
                write!(f, "host rejected registration of plugin '{}': {}", id, msg)
            }
            Error::UnknownPlugin(ref id) => write!(f, "no registered plugin with id '{}'", id),
            Error::SessionExit(ref id, code) => {
                write!(f, "plugin '{}' exited with status {:?}", id, code)
            }
            Error::RpcRegister(ref msg) => write!(f, "error registering rpc service: {}", msg),
            Error::Rpc(ref err) => write!(f, "rpc error: {}", err),
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
            Error::Probe(ref errors) => write!(f, "{}", errors),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} plugin(s) failed:", self.0.len())?;
        for err in &self.0 {
            writeln!(f, "  {}", err)?;
        }
        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Discovery(ref err) | Error::Spawn(_, ref err) | Error::Io(ref err) => Some(err),
            Error::ProbeDecode(_, ref err) => Some(err),
            Error::Rpc(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
