//! Write-ahead log collaborator.
//!
//! A buffer only needs one thing from the log: "make everything up to this
//! LSN durable before I write my page". That contract is the
//! [`WriteAheadLog`] trait. [`LogManager`] is a small file-backed
//! implementation that stores opaque, length-prefixed records.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{trace, warn};
use parking_lot::Mutex;

use crate::common::{Error, Lsn, Result};

/// Durable-flush contract consumed by [`Buffer::flush`](crate::Buffer).
pub trait WriteAheadLog: Send + Sync {
    /// Return only once every record with an LSN `<= lsn` is durable.
    ///
    /// An error means nothing can be assumed durable; the caller must not
    /// write pages covered by `lsn`.
    fn flush(&self, lsn: Lsn) -> Result<()>;
}

const LEN_PREFIX: usize = 4;

/// File-backed log with append buffering and on-demand durability.
///
/// # Format
/// Records are appended as `[len: u32 big-endian][bytes]`. The n-th record
/// in the file has LSN `n`.
///
/// # Recovery
/// A torn record at the end of the file (from an interrupted write) is cut
/// off when the log is opened, so later records land right after the last
/// complete one.
pub struct LogManager {
    inner: Mutex<LogInner>,
}

struct LogInner {
    file: File,
    /// Encoded records not yet durable. Only cleared after a successful
    /// `sync_all`.
    pending: Vec<u8>,
    next_lsn: u64,
    last_flushed: Option<Lsn>,
}

impl LogManager {
    /// Open (or create) the log file at `path`.
    ///
    /// Existing records are counted so new LSNs continue after them.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let (records, end) = Self::decode(&mut file)?;
        let len = file.metadata()?.len();
        if len > end {
            warn!("discarding {} bytes of torn log tail", len - end);
            file.set_len(end)?;
            file.sync_all()?;
        }

        let records = records.len() as u64;
        let last_flushed = records.checked_sub(1).map(Lsn::new);

        Ok(Self {
            inner: Mutex::new(LogInner {
                file,
                pending: Vec::new(),
                next_lsn: records,
                last_flushed,
            }),
        })
    }

    /// Buffer a record and return its LSN. The record is not durable until
    /// a [`flush`](WriteAheadLog::flush) covering the LSN.
    pub fn append(&self, record: &[u8]) -> Lsn {
        let mut inner = self.inner.lock();
        inner
            .pending
            .extend_from_slice(&(record.len() as u32).to_be_bytes());
        inner.pending.extend_from_slice(record);

        let lsn = Lsn::new(inner.next_lsn);
        inner.next_lsn += 1;
        lsn
    }

    /// Highest LSN known to be durable.
    pub fn last_flushed(&self) -> Option<Lsn> {
        self.inner.lock().last_flushed
    }

    /// Read back every durable record, in LSN order.
    pub fn records(&self) -> Result<Vec<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::decode(&mut inner.file).map(|(records, _)| records)
    }

    /// Decode complete records from the start of `file`.
    ///
    /// Also returns the byte offset just past the last complete record.
    fn decode(file: &mut File) -> Result<(Vec<Vec<u8>>, u64)> {
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut pos = 0;
        while pos + LEN_PREFIX <= bytes.len() {
            let mut len = [0u8; LEN_PREFIX];
            len.copy_from_slice(&bytes[pos..pos + LEN_PREFIX]);
            let start = pos + LEN_PREFIX;
            let end = start + u32::from_be_bytes(len) as usize;
            if end > bytes.len() {
                break;
            }
            records.push(bytes[start..end].to_vec());
            pos = end;
        }
        Ok((records, pos as u64))
    }
}

impl WriteAheadLog for LogManager {
    fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.last_flushed.is_some_and(|durable| durable >= lsn) {
            return Ok(());
        }
        if lsn.0 >= inner.next_lsn {
            return Err(Error::LogFlush(format!("{} was never appended", lsn)));
        }

        let start = inner.file.seek(SeekFrom::End(0))?;
        let written = inner
            .file
            .write_all(&inner.pending)
            .and_then(|()| inner.file.sync_all());
        if let Err(err) = written {
            // Keep the records pending and drop whatever part reached the file.
            if let Err(truncate) = inner.file.set_len(start) {
                warn!("could not roll back partial log write: {}", truncate);
            }
            return Err(err.into());
        }
        inner.pending.clear();

        let durable = Lsn::new(inner.next_lsn - 1);
        inner.last_flushed = Some(durable);
        trace!("log durable through {}", durable);
        Ok(())
    }
}
