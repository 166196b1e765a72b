// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! io functions
use crate::error::*;
use std::io::{ErrorKind, Read, Write};

/// Read data from reader to buf until buf is full or EOF is hit, and return
/// the number of bytes read. Interrupted reads are retried.
pub fn loop_read<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let size = buf.len();
    let mut pos = 0;
    while pos < size {
        let read_size = match reader.read(&mut buf[pos..]) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context(IoSnafu),
        };

        if read_size == 0 {
            break;
        }
        pos += read_size;
    }
    Ok(pos)
}

/// Read data from reader to buf. If buf is full, succeeds, otherwise fails.
pub fn loop_read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let n = loop_read(reader, buf)?;

    if n != buf.len() {
        return Err(Error::ShortRead {
            got: n,
            want: buf.len(),
        });
    }

    Ok(())
}

/// Write the whole buf to writer. Interrupted writes are retried.
pub fn loop_write<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut pos = 0;
    while pos < buf.len() {
        match writer.write(&buf[pos..]) {
            Ok(0) => {
                return Err(Error::Io {
                    source: std::io::Error::from(ErrorKind::WriteZero),
                })
            }
            Ok(n) => pos += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context(IoSnafu),
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{Cursor, Seek};

    /// Reader handing out at most `chunk` bytes per call, interrupting every
    /// other call.
    struct Choppy {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        interrupt: bool,
    }

    impl Read for Choppy {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn loop_read_test() {
        let mut file = tempfile::tempfile().unwrap();
        loop_write(&mut file, b"0123456789abcdef").unwrap();
        file.rewind().unwrap();

        let mut buf = [0; 38];
        assert_eq!(16, loop_read(&mut file, &mut buf).unwrap());
        assert_eq!(&buf[..16], b"0123456789abcdef");

        file.rewind().unwrap();
        let mut buf = [0; 10];
        assert_eq!(10, loop_read(&mut file, &mut buf).unwrap());

        let mut buf = [0; 6];
        loop_read_exact(&mut file, &mut buf).unwrap();
        assert_eq!(&buf, b"abcdef");

        let mut buf = [0; 1];
        assert!(matches!(
            loop_read_exact(&mut file, &mut buf),
            Err(Error::ShortRead { got: 0, want: 1 })
        ));
    }

    #[test]
    fn loop_read_interrupted_test() {
        let mut reader = Choppy {
            data: (0..100u8).collect(),
            pos: 0,
            chunk: 7,
            interrupt: false,
        };
        let mut buf = [0u8; 64];
        loop_read_exact(&mut reader, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), (0..64u8).collect::<Vec<u8>>());
    }

    #[test]
    fn loop_write_test() {
        let mut cursor = Cursor::new(Vec::new());
        loop_write(&mut cursor, b"abcdefg").unwrap();
        loop_write(&mut cursor, b"").unwrap();
        assert_eq!(cursor.into_inner(), b"abcdefg");
    }
}
