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

//! The main read/dispatch loop shared by both ends of a connection.

use std::io::{BufRead, Write};

use crossbeam_utils::thread;

use crate::parse::MessageReader;
use crate::rpc_peer::{QueueItem, RawPeer};
use crate::{Handler, ReadError, RpcCtx, RpcPeer};

/// A structure holding the state of a main loop for handling RPC's.
pub struct RpcLoop<W: Write + Send + 'static> {
    peer: RawPeer<W>,
}

impl<W: Write + Send + 'static> RpcLoop<W> {
    /// Creates a new `RpcLoop` with the given output stream (which is
    /// used for sending requests and responses).
    pub fn new(writer: W) -> Self {
        RpcLoop { peer: RawPeer::new(writer) }
    }

    /// Gets a reference to the peer.
    pub fn get_raw_peer(&self) -> RawPeer<W> {
        self.peer.clone()
    }

    pub fn get_peer(&self) -> RpcPeer {
        Box::new(self.peer.clone())
    }

    /// Starts the event loop, reading lines from the reader until
    /// end-of-file or a fatal error.
    ///
    /// The stream is produced inside the loop's read thread by the
    /// `rf` closure, so non-`Send` readers (a locked stdin, say) can be
    /// constructed where they are used.
    ///
    /// Inbound responses are matched to their pending calls on the read
    /// thread; inbound requests are handed to `handler` on the calling
    /// thread, and the handler's outcome is written back as the response.
    ///
    /// Returns `Ok(())` when the peer closes the connection in an orderly
    /// fashion, otherwise the first read error. Any decode failure stops
    /// the loop.
    pub fn mainloop<R, RF, H>(&mut self, rf: RF, handler: &mut H) -> Result<(), ReadError>
    where
        R: BufRead,
        RF: Send + FnOnce() -> R,
        H: Handler,
    {
        let exit = thread::scope(|scope| {
            let peer = self.get_raw_peer();
            scope.spawn(move |_| {
                let mut stream = rf();
                let mut reader = MessageReader::default();
                loop {
                    match reader.next(&mut stream) {
                        Ok(obj) => {
                            if obj.is_response() {
                                match obj.get_id() {
                                    Some(id) => match obj.into_response() {
                                        Ok(resp) => peer.handle_response(id, resp),
                                        Err(msg) => {
                                            warn!("invalid response for id {}: {}", id, msg);
                                            peer.fail_response(id);
                                        }
                                    },
                                    None => warn!("dropping response with non-numeric id"),
                                }
                            } else {
                                match obj.into_rpc() {
                                    Ok((id, call)) => peer.put_rx(QueueItem::Request(id, call)),
                                    Err(err) => {
                                        peer.put_rx(QueueItem::Done(Err(err)));
                                        break;
                                    }
                                }
                            }
                        }
                        Err(ReadError::Disconnect) => {
                            peer.put_rx(QueueItem::Done(Ok(())));
                            break;
                        }
                        Err(err) => {
                            peer.put_rx(QueueItem::Done(Err(err)));
                            break;
                        }
                    }
                }
                // fail any calls still waiting on a response
                peer.disconnect();
            });

            let boxed_peer: RpcPeer = self.get_peer();
            let ctx = RpcCtx { peer: &boxed_peer };
            loop {
                match self.peer.get_rx() {
                    QueueItem::Request(id, call) => {
                        let result = handler.handle_request(&ctx, call);
                        self.peer.respond(result, id);
                    }
                    QueueItem::Done(res) => return res,
                }
            }
        });
        exit.unwrap()
    }
}
