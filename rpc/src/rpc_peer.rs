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

//! The peer side of an RPC connection: sending requests, matching
//! responses by id, and writing replies.

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};

use serde_json::Value;

use crate::error::Error;
use crate::parse::Response;
use crate::{ReadError, RpcCall};

/// An object-safe handle to the peer, for passing across API boundaries
/// without naming the concrete writer type.
pub trait Peer: Send + Sync + 'static {
    fn box_clone(&self) -> RpcPeer;
    /// Sends a request and blocks until the matching response arrives or
    /// the transport fails.
    fn send_rpc_request(&self, method: &str, params: &Value) -> Result<Value, Error>;
    /// Whether the read side of this connection has shut down.
    fn is_disconnected(&self) -> bool;
}

pub type RpcPeer = Box<dyn Peer>;

impl Clone for RpcPeer {
    fn clone(&self) -> RpcPeer {
        self.box_clone()
    }
}

/// An item routed from the read loop to the dispatch loop.
pub(crate) enum QueueItem {
    Request(u64, RpcCall),
    /// The read loop has finished, with its final status.
    Done(Result<(), ReadError>),
}

struct RpcState<W: Write> {
    rx_queue: Mutex<VecDeque<QueueItem>>,
    rx_cvar: Condvar,
    writer: Mutex<W>,
    id: AtomicUsize,
    pending: Mutex<BTreeMap<u64, mpsc::Sender<Result<Value, Error>>>>,
    disconnected: AtomicBool,
}

/// The concrete peer over a writer `W`. Cheap to clone; all clones share
/// one connection's state.
pub struct RawPeer<W: Write + Send + 'static>(Arc<RpcState<W>>);

impl<W: Write + Send + 'static> Clone for RawPeer<W> {
    fn clone(&self) -> Self {
        RawPeer(self.0.clone())
    }
}

impl<W: Write + Send + 'static> Peer for RawPeer<W> {
    fn box_clone(&self) -> RpcPeer {
        Box::new(self.clone())
    }

    fn send_rpc_request(&self, method: &str, params: &Value) -> Result<Value, Error> {
        if self.is_disconnected() {
            return Err(Error::PeerDisconnect);
        }
        let id = self.0.id.fetch_add(1, Ordering::Relaxed) as u64;
        let (tx, rx) = mpsc::channel();
        self.0.pending.lock().unwrap().insert(id, tx);
        let req = json!({
            "method": method,
            "params": [params],
            "id": id,
        });
        if let Err(err) = self.send(&req) {
            self.0.pending.lock().unwrap().remove(&id);
            return Err(Error::Io(err));
        }
        // the read loop may have shut down between the first check and
        // the insert; its sweep of pending calls could have missed ours
        if self.is_disconnected() {
            self.0.pending.lock().unwrap().remove(&id);
            return Err(Error::PeerDisconnect);
        }
        match rx.recv() {
            Ok(resp) => resp,
            // The sender was dropped without a response; the read loop
            // shut down while this call was in flight.
            Err(_) => Err(Error::PeerDisconnect),
        }
    }

    fn is_disconnected(&self) -> bool {
        self.0.disconnected.load(Ordering::Relaxed)
    }
}

impl<W: Write + Send + 'static> RawPeer<W> {
    pub(crate) fn new(writer: W) -> Self {
        RawPeer(Arc::new(RpcState {
            rx_queue: Mutex::new(VecDeque::new()),
            rx_cvar: Condvar::new(),
            writer: Mutex::new(writer),
            id: AtomicUsize::new(1),
            pending: Mutex::new(BTreeMap::new()),
            disconnected: AtomicBool::new(false),
        }))
    }

    fn send(&self, v: &Value) -> Result<(), io::Error> {
        let mut s = serde_json::to_string(v).unwrap();
        s.push('\n');
        let mut writer = self.0.writer.lock().unwrap();
        writer.write_all(s.as_bytes())?;
        writer.flush()
    }

    /// Writes a response frame. Write failures are logged rather than
    /// surfaced; the read loop will observe the broken pipe shortly.
    pub(crate) fn respond(&self, result: Response, id: u64) {
        let frame = match result {
            Ok(result) => json!({
                "result": result,
                "error": Value::Null,
                "id": id,
            }),
            Err(err) => json!({
                "result": Value::Null,
                "error": err.message(),
                "id": id,
            }),
        };
        if let Err(err) = self.send(&frame) {
            warn!("error {} sending response to RPC {}", err, id);
        }
    }

    /// Routes a response to the call that is waiting on its id.
    pub(crate) fn handle_response(&self, id: u64, resp: Response) {
        let tx = self.0.pending.lock().unwrap().remove(&id);
        match tx {
            Some(tx) => {
                let _ = tx.send(resp.map_err(Error::RemoteError));
            }
            None => warn!("id {} not found in pending", id),
        }
    }

    /// Fails the pending call with the given id; used when a response
    /// arrived but could not be interpreted.
    pub(crate) fn fail_response(&self, id: u64) {
        if let Some(tx) = self.0.pending.lock().unwrap().remove(&id) {
            let _ = tx.send(Err(Error::InvalidResponse));
        }
    }

    /// Marks the connection as closed and fails every in-flight call.
    pub(crate) fn disconnect(&self) {
        self.0.disconnected.store(true, Ordering::Relaxed);
        let mut pending = self.0.pending.lock().unwrap();
        let ids: Vec<u64> = pending.keys().cloned().collect();
        for id in ids {
            if let Some(tx) = pending.remove(&id) {
                let _ = tx.send(Err(Error::PeerDisconnect));
            }
        }
    }

    pub(crate) fn put_rx(&self, item: QueueItem) {
        let mut queue = self.0.rx_queue.lock().unwrap();
        queue.push_back(item);
        self.0.rx_cvar.notify_one();
    }

    pub(crate) fn get_rx(&self) -> QueueItem {
        let mut queue = self.0.rx_queue.lock().unwrap();
        loop {
            match queue.pop_front() {
                Some(item) => return item,
                None => queue = self.0.rx_cvar.wait(queue).unwrap(),
            }
        }
    }
}
