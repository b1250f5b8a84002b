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

//! The fixed `HostControl` service, registered on every session.

use std::io::{self, Write};
use std::sync::Mutex;

use serde_json::Value;

use plugbus_rpc::{Dispatch, RemoteError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrintRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintResponse {}

/// Built-in methods every plugin can call, regardless of what actions
/// the host exposes.
///
/// `Print` writes a line of text to the host's standard output. The
/// plugin cannot use its own stdout for this, since that stream carries
/// the rpc protocol.
pub struct HostControl {
    out: Mutex<Box<dyn Write + Send>>,
}

impl HostControl {
    pub fn new() -> HostControl {
        HostControl::with_writer(Box::new(io::stdout()))
    }

    /// Uses `out` instead of the process stdout. For tests, mostly.
    pub fn with_writer(out: Box<dyn Write + Send>) -> HostControl {
        HostControl { out: Mutex::new(out) }
    }

    fn print(&self, args: PrintRequest) -> Result<PrintResponse, RemoteError> {
        let mut out = self.out.lock().unwrap();
        // A closed stdout is an error result, never a panic.
        writeln!(out, "{}", args.text)
            .and_then(|_| out.flush())
            .map_err(|err| RemoteError::new(err.to_string()))?;
        Ok(PrintResponse {})
    }
}

impl Default for HostControl {
    fn default() -> HostControl {
        HostControl::new()
    }
}

impl Dispatch for HostControl {
    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
        match method {
            "Print" => {
                let args: PrintRequest =
                    serde_json::from_value(params).map_err(RemoteError::invalid_params)?;
                let reply = self.print(args)?;
                serde_json::to_value(reply).map_err(RemoteError::from)
            }
            _ => Err(RemoteError::method_not_found(method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// A writer handing its bytes to a shared buffer.
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_writes_line_to_host_stdout() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let control = HostControl::with_writer(Box::new(SharedBuf(buf.clone())));
        let result = control
            .dispatch("Print", serde_json::json!({"text": "hello from a plugin"}))
            .unwrap();
        assert_eq!(result, serde_json::json!({}));
        assert_eq!(&*buf.lock().unwrap(), b"hello from a plugin\n");
    }

    #[test]
    fn print_surfaces_write_errors() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let control = HostControl::with_writer(Box::new(Closed));
        let err = control
            .dispatch("Print", serde_json::json!({"text": "x"}))
            .unwrap_err();
        assert!(err.message().contains("stdout closed"));
    }

    #[test]
    fn unknown_method() {
        let control = HostControl::with_writer(Box::new(io::sink()));
        assert!(control.dispatch("Reboot", serde_json::json!({})).is_err());
    }
}
