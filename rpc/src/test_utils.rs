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

//! Types and helpers used for testing.

use std::io::{self, BufRead, Cursor, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use crate::parse::{MessageReader, RpcObject};
use crate::rpc_peer::RawPeer;
use crate::stream::Duplex;
use crate::{ReadError, RpcPeer};

/// Wraps an instance of `mpsc::Sender`, implementing `Write`.
///
/// This lets the tx side of an mpsc::channel serve as the destination
/// stream for an RPC loop.
pub struct DummyWriter(Sender<String>);

/// Wraps an instance of `mpsc::Receiver`, providing convenience methods
/// for parsing received messages.
pub struct DummyReader(MessageReader, Receiver<String>);

/// The rx side of an mpsc::channel, implementing `BufRead` so it can
/// serve as the source stream for an RPC loop.
pub struct ChannelReader {
    rx: Receiver<String>,
    buf: Vec<u8>,
    pos: usize,
}

/// Returns a `(DummyWriter, DummyReader)` pair.
pub fn test_channel() -> (DummyWriter, DummyReader) {
    let (tx, rx) = channel();
    (DummyWriter(tx), DummyReader(MessageReader::default(), rx))
}

/// Returns a `(DummyWriter, ChannelReader)` pair: everything written on
/// one end can be read, as a stream, on the other.
pub fn channel_stream() -> (DummyWriter, ChannelReader) {
    let (tx, rx) = channel();
    (DummyWriter(tx), ChannelReader { rx, buf: Vec::new(), pos: 0 })
}

/// Returns two crossed duplex endpoints; frames written on one are read
/// on the other, in both directions.
pub fn duplex_pair() -> (Duplex<ChannelReader, DummyWriter>, Duplex<ChannelReader, DummyWriter>) {
    let (a_tx, b_rx) = channel_stream();
    let (b_tx, a_rx) = channel_stream();
    (Duplex::new(a_rx, a_tx), Duplex::new(b_rx, b_tx))
}

/// A peer over a writer that discards everything; useful when a test
/// needs an `RpcCtx` but never talks to the other side.
pub fn dummy_peer() -> RpcPeer {
    Box::new(RawPeer::new(io::sink()))
}

/// Given a string type, returns a `Cursor<Vec<u8>>`, which implements
/// `BufRead`.
pub fn make_reader<S: AsRef<str>>(s: S) -> Cursor<Vec<u8>> {
    Cursor::new(s.as_ref().as_bytes().to_vec())
}

impl DummyReader {
    /// Attempts to read a message, returning `None` if the wait exceeds
    /// `timeout`.
    ///
    /// This method makes no assumptions about the contents of the
    /// message, and does no error handling.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Result<RpcObject, ReadError>> {
        self.1.recv_timeout(timeout).ok().map(|s| self.0.parse(&s))
    }

    /// Reads and parses a response object.
    ///
    /// # Panics
    ///
    /// Panics if a non-response message is received, or if no message
    /// is received after a reasonable time.
    pub fn expect_response(&mut self) -> crate::Response {
        let resp = self
            .next_timeout(Duration::from_secs(1))
            .expect("response should be received")
            .map_err(|e| e.to_string())
            .and_then(|r| r.into_response());

        match resp {
            Err(msg) => panic!("Error waiting for response: {}", msg),
            Ok(resp) => resp,
        }
    }
}

impl Write for DummyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8(buf.to_vec()).unwrap();
        self.0
            .send(s)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{:?}", err)))
            .map(|_| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ChannelReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.buf.len() {
            match self.rx.recv() {
                Ok(s) => {
                    self.buf = s.into_bytes();
                    self.pos = 0;
                }
                // all writers gone: end of stream
                Err(_) => return Ok(&[]),
            }
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt;
    }
}
