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
use std::path::PathBuf;

/// An opt-in rule for composite parameter shapes. Each gates one family
/// of type expressions; generation fails on a gated shape unless the
/// matching flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Structs,
    Pointers,
    Slices,
}

impl Policy {
    pub fn flag(self) -> &'static str {
        match self {
            Policy::Structs => "--allow-structs",
            Policy::Pointers => "--allow-pointers",
            Policy::Slices => "--allow-slices",
        }
    }
}

/// Errors that stop generation. All of them are fatal: the generator
/// reports the first offending method and gives up.
#[derive(Debug)]
pub enum GenError {
    Io(PathBuf, io::Error),
    /// A source file did not parse.
    Parse(PathBuf, syn::Error),
    /// The project manifest was missing or unusable.
    Manifest(PathBuf, String),
    /// A parameter or result type is not expressible on the wire.
    TypeNotSupported { ty: String, policy: Option<Policy> },
    /// An annotated method's receiver shape is not supported.
    UnsupportedReceiver { method: String },
    /// An annotated method does not return `Result`, so it has no error
    /// channel.
    NotResult { method: String },
    /// A parameter pattern is not a plain identifier.
    UnnamedParam { method: String },
    /// Running the source formatter failed.
    Format(String),
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GenError::Io(ref path, ref err) => write!(f, "{:?}: {}", path, err),
            GenError::Parse(ref path, ref err) => write!(f, "error parsing {:?}: {}", path, err),
            GenError::Manifest(ref path, ref msg) => write!(f, "error reading {:?}: {}", path, msg),
            GenError::TypeNotSupported { ref ty, policy } => match policy {
                Some(policy) => {
                    write!(f, "type '{}' is not supported (enable it with {})", ty, policy.flag())
                }
                None => write!(f, "type '{}' is not supported", ty),
            },
            GenError::UnsupportedReceiver { ref method } => {
                write!(f, "method '{}' has an unsupported receiver; only &self and &mut self work", method)
            }
            GenError::NotResult { ref method } => {
                write!(f, "method '{}' must return Result so the host can report errors", method)
            }
            GenError::UnnamedParam { ref method } => {
                write!(f, "method '{}' has a pattern parameter; only named parameters work", method)
            }
            GenError::Format(ref msg) => write!(f, "formatting the generated file failed: {}", msg),
        }
    }
}

impl error::Error for GenError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            GenError::Io(_, ref err) => Some(err),
            GenError::Parse(_, ref err) => Some(err),
            _ => None,
        }
    }
}
