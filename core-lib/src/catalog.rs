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

//! `PluginCatalog` handles discovering, probing, and registering plugins.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_utils::thread::scope;

use plugbus_rpc::Dispatch;

use crate::errors::{Error, ErrorList};
use crate::host::{Host, OneShotAction};
use crate::manifest::{PluginInfo, PluginType};
use crate::session;

/// How long a plugin gets to answer the `-init` probe before it is
/// killed and dropped.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Pairs a plugin's probed info with the path to its executable.
#[derive(Debug, Clone)]
pub struct PluginHandle {
    pub info: PluginInfo,
    pub exec_path: PathBuf,
}

pub(crate) struct CatalogState {
    plugin_dir: PathBuf,
    probe_timeout: Duration,
    pub(crate) actions: Arc<dyn Dispatch>,
    /// The id registry. Mutated only during probing; the probe threads
    /// are the only writers.
    pub(crate) plugins: Mutex<BTreeMap<String, PluginHandle>>,
}

/// A catalog of the plugins found in one plugin folder.
///
/// Cloning is cheap and all clones share one registry; the per-plugin
/// actions handed to the host each keep the catalog alive.
pub struct PluginCatalog {
    inner: Arc<CatalogState>,
}

impl Clone for PluginCatalog {
    fn clone(&self) -> Self {
        PluginCatalog { inner: self.inner.clone() }
    }
}

impl PluginCatalog {
    /// Creates a catalog over `plugin_dir`. `actions` is the host's
    /// action service, registered under the `Host` namespace of every
    /// session.
    pub fn new<P: Into<PathBuf>>(plugin_dir: P, actions: Arc<dyn Dispatch>) -> PluginCatalog {
        PluginCatalog::with_timeout(plugin_dir, actions, PROBE_TIMEOUT)
    }

    pub fn with_timeout<P: Into<PathBuf>>(
        plugin_dir: P,
        actions: Arc<dyn Dispatch>,
        probe_timeout: Duration,
    ) -> PluginCatalog {
        PluginCatalog {
            inner: Arc::new(CatalogState {
                plugin_dir: plugin_dir.into(),
                probe_timeout,
                actions,
                plugins: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Probes every candidate in the plugin folder, in parallel, and
    /// registers the valid one-shot plugins with `host`.
    ///
    /// The registry is rebuilt from scratch, so probing an unchanged
    /// folder twice yields the same set. A failing plugin never aborts
    /// the probing of its siblings; all per-plugin failures are returned
    /// together as `Error::Probe` once every candidate has been handled.
    pub fn probe(&self, host: &dyn Host) -> Result<(), Error> {
        let candidates = self.enumerate()?;
        self.inner.plugins.lock().unwrap().clear();

        let (tx, rx) = mpsc::channel();
        scope(|s| {
            for path in candidates {
                let tx = tx.clone();
                let catalog = self.clone();
                s.spawn(move |_| {
                    if let Err(err) = catalog.probe_one(&path, host) {
                        let _ = tx.send(err);
                    }
                });
            }
            drop(tx);
        })
        .unwrap();

        let errors: Vec<Error> = rx.try_iter().collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Probe(ErrorList(errors)))
        }
    }

    /// Runs one session of the registered plugin `id`, spawning its
    /// executable with `args`. Blocks until the child exits.
    pub fn run_one_shot(&self, id: &str, args: &[String]) -> Result<(), Error> {
        session::run_one_shot(&self.inner, id, args)
    }

    /// A snapshot of the probed infos, ordered by id.
    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.inner.plugins.lock().unwrap().values().map(|h| h.info.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<PluginHandle> {
        self.inner.plugins.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.plugins.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists the probe candidates: folder entries that are not
    /// directories and not `.gitkeep`. Anything else is only found out
    /// to be a non-plugin when its probe fails.
    fn enumerate(&self) -> Result<Vec<PathBuf>, Error> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.inner.plugin_dir).map_err(Error::Discovery)? {
            let entry = entry.map_err(Error::Discovery)?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir && entry.file_name() != ".gitkeep" {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        Ok(candidates)
    }

    fn probe_one(&self, exec_path: &Path, host: &dyn Host) -> Result<(), Error> {
        let info = self.probe_exec(exec_path)?;
        match info.plugin_type {
            PluginType::OneShot => self.register(info, exec_path, host),
            other => {
                info!(
                    "skipping plugin '{}' at {:?}: plugin type '{}' is not runnable",
                    info.id, exec_path, other
                );
                Ok(())
            }
        }
    }

    fn register(&self, info: PluginInfo, exec_path: &Path, host: &dyn Host) -> Result<(), Error> {
        {
            let mut plugins = self.inner.plugins.lock().unwrap();
            if plugins.contains_key(&info.id) {
                warn!(
                    "duplicate plugin id '{}' reported by {:?}; keeping the first registration",
                    info.id, exec_path
                );
                return Err(Error::DuplicateId(info.id.clone()));
            }
            let handle = PluginHandle { info: info.clone(), exec_path: exec_path.to_owned() };
            plugins.insert(info.id.clone(), handle);
        }

        let action = self.one_shot_action(&info.id);
        if let Err(err) = host.register_one_shot(&info, action) {
            self.inner.plugins.lock().unwrap().remove(&info.id);
            return Err(err);
        }
        info!("registered one-shot plugin '{}' from {:?}", info.id, exec_path);
        Ok(())
    }

    fn one_shot_action(&self, id: &str) -> OneShotAction {
        let inner = self.inner.clone();
        let id = id.to_string();
        Box::new(move |args| session::run_one_shot(&inner, &id, args))
    }

    /// Spawns `exec_path -init`, reads its stdout to completion, and
    /// decodes the result. The configured timeout is authoritative: a
    /// child that neither finishes writing nor exits in time is killed.
    fn probe_exec(&self, exec_path: &Path) -> Result<PluginInfo, Error> {
        let mut child = Command::new(exec_path)
            .arg("-init")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| Error::Spawn(exec_path.to_owned(), err))?;
        let mut stdout = child.stdout.take().unwrap();

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let res = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(res);
        });

        let output = match rx.recv_timeout(self.inner.probe_timeout) {
            Ok(Ok(buf)) => buf,
            Ok(Err(err)) => {
                kill_and_reap(&mut child);
                let _ = reader.join();
                return Err(Error::Io(err));
            }
            Err(_) => {
                kill_and_reap(&mut child);
                let _ = reader.join();
                return Err(Error::ProbeTimeout(exec_path.to_owned()));
            }
        };
        let _ = reader.join();

        // The output is complete, but bound the exit wait as well: a
        // plugin that closes stdout and loops must not stall the probe.
        let deadline = Instant::now() + self.inner.probe_timeout;
        let status = match wait_deadline(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_and_reap(&mut child);
                return Err(Error::ProbeTimeout(exec_path.to_owned()));
            }
            Err(err) => {
                kill_and_reap(&mut child);
                return Err(Error::Io(err));
            }
        };
        if !status.success() {
            return Err(Error::ProbeExit(exec_path.to_owned(), status.code()));
        }
        serde_json::from_slice(&output).map_err(|err| Error::ProbeDecode(exec_path.to_owned(), err))
    }
}

fn wait_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
