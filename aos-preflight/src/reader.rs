//! Buffered line readers for plain, gzip and BGZF compressed text inputs.

use crate::error::{PreflightError, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// BGZF blocks are gzip members with the FEXTRA flag and a `BC` subfield.
fn is_bgzf(header: &[u8]) -> bool {
    header.len() >= 14
        && header[..2] == GZIP_MAGIC
        && header[3] & 0x04 != 0
        && header[12] == b'B'
        && header[13] == b'C'
}

/// Open `path` for line-oriented reading, sniffing compression from the
/// leading bytes rather than the extension.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut header = [0u8; 18];
    let n = {
        let mut sniff = File::open(path).map_err(|e| PreflightError::io(path, e))?;
        read_prefix(&mut sniff, &mut header).map_err(|e| PreflightError::io(path, e))?
    };
    let header = &header[..n];

    let file = File::open(path).map_err(|e| PreflightError::io(path, e))?;
    if is_bgzf(header) {
        Ok(Box::new(BufReader::new(noodles::bgzf::io::Reader::new(file))))
    } else if header.len() >= 2 && header[..2] == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

// read_exact fails on files shorter than the sniffed prefix, so fill what we can.
fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
