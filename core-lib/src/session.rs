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

//! One-shot plugin sessions: spawn the executable, serve RPC over its
//! stdio, wait for it to exit.

use std::io::BufReader;
use std::process::{Command, Stdio};
use std::sync::Arc;

use plugbus_rpc::{Duplex, RpcLoop, ServiceRegistry};

use crate::catalog::CatalogState;
use crate::control::HostControl;
use crate::errors::Error;

/// Runs one session of the registered plugin `id`.
///
/// The child's stdin and stdout carry the protocol; stderr is inherited
/// so plugin diagnostics land in the host's log. The session ends when
/// the child closes its pipes and terminates; the first fatal error
/// (serve failure, then exit status) is the result.
pub(crate) fn run_one_shot(state: &Arc<CatalogState>, id: &str, args: &[String]) -> Result<(), Error> {
    let exec_path = {
        let plugins = state.plugins.lock().unwrap();
        match plugins.get(id) {
            Some(handle) => handle.exec_path.clone(),
            None => return Err(Error::UnknownPlugin(id.to_string())),
        }
    };

    // Assemble the dispatch table before the child exists, so a
    // registration failure cannot leak a running process.
    let mut registry = ServiceRegistry::new();
    registry
        .register("Host", state.actions.clone())
        .map_err(|err| Error::RpcRegister(err.to_string()))?;
    registry
        .register("HostControl", Arc::new(HostControl::new()))
        .map_err(|err| Error::RpcRegister(err.to_string()))?;

    info!("starting one-shot session for plugin '{}'", id);
    let mut child = Command::new(&exec_path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|err| Error::Spawn(exec_path.clone(), err))?;
    let child_stdin = child.stdin.take().unwrap();
    let child_stdout = child.stdout.take().unwrap();

    let endpoint = Duplex::new(BufReader::new(child_stdout), child_stdin);
    let (reader, writer) = endpoint.into_split();
    let mut rpc_loop = RpcLoop::new(writer);
    let serve_result = rpc_loop.mainloop(move || reader, &mut registry);

    // Release our ends of the pipes before reaping: a child still blocked
    // reading stdin observes end-of-stream and can exit.
    drop(rpc_loop);
    let status = child.wait().map_err(Error::Io)?;
    serve_result.map_err(Error::Rpc)?;
    if !status.success() {
        return Err(Error::SessionExit(id.to_string(), status.code()));
    }
    debug!("plugin '{}' session finished", id);
    Ok(())
}
