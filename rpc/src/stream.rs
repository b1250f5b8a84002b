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

//! Coupling a read half and a write half into one duplex endpoint.
//!
//! The transport itself never names stdin or stdout; callers build a
//! `Duplex` at the process boundary (over their own stdio, or over a
//! child's pipes) and hand it to the RPC machinery.

use std::io::{self, BufRead, Read, Write};

/// A combined stream over independent read and write halves.
pub struct Duplex<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Duplex<R, W> {
    pub fn new(reader: R, writer: W) -> Duplex<R, W> {
        Duplex { reader, writer }
    }

    /// Takes the endpoint apart so that the halves can live on different
    /// threads.
    pub fn into_split(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Releases both halves, flushing the write side first. The first
    /// failure is returned; the halves are dropped either way.
    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<R: BufRead, W: Write> Read for Duplex<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<R: BufRead, W: Write> BufRead for Duplex<R, W> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl<R: BufRead, W: Write> Write for Duplex<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_and_write_halves() {
        let reader = Cursor::new(b"hello\nworld\n".to_vec());
        let writer: Vec<u8> = Vec::new();
        let mut duplex = Duplex::new(reader, writer);

        let mut line = String::new();
        duplex.read_line(&mut line).unwrap();
        assert_eq!(line, "hello\n");

        duplex.write_all(b"reply\n").unwrap();
        let (mut reader, writer) = duplex.into_split();
        assert_eq!(writer, b"reply\n");

        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "world\n");
    }

    #[test]
    fn close_flushes_writer() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let duplex = Duplex::new(Cursor::new(Vec::new()), FailingWriter);
        let err = duplex.close().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
