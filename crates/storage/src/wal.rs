// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sentinel_core::BusEvent;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt entry at offset {offset}: {detail}")]
    Corrupt { offset: u64, detail: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One durable log entry: a bus event tagged with its write-side sequence
/// number.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub seq: u64,
    pub event: BusEvent,
}

/// Append-only log file of length-prefixed JSON [`BusEvent`] records.
///
/// Wire format per record: 8-byte big-endian sequence number, 4-byte
/// big-endian payload length, then the JSON payload — a length-prefixed
/// length-prefix envelope (`oj-wire`'s wire format), generalized with an
/// explicit sequence number so `entries_after` doesn't need a separate
/// index.
pub struct Wal {
    file: File,
    write_seq: u64,
    processed_seq: u64,
}

impl Wal {
    /// Open (creating if absent) the WAL at `path`. `processed_seq` is the
    /// caller's last-acknowledged sequence (e.g. a snapshot cursor); entries
    /// at or below it are skipped by [`Wal::next_unprocessed`].
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        let write_seq = Self::scan_last_seq(&file)?;
        Ok(Self { file, write_seq, processed_seq })
    }

    #[allow(clippy::expect_used)]
    fn scan_last_seq(file: &File) -> Result<u64, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut last = 0u64;
        loop {
            let mut header = [0u8; 12];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let seq = u64::from_be_bytes(header[0..8].try_into().expect("8 bytes"));
            let len = u32::from_be_bytes(header[8..12].try_into().expect("4 bytes")) as usize;
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload)?;
            last = seq;
        }
        Ok(last)
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Append `event`, returning its assigned sequence number. Buffered;
    /// call [`Wal::flush`] to guarantee durability.
    pub fn append(&mut self, event: &BusEvent) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let payload = serde_json::to_vec(event)?;
        let mut record = Vec::with_capacity(12 + payload.len());
        record.extend_from_slice(&seq.to_be_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        record.extend_from_slice(&payload);
        self.file.write_all(&record)?;
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        Ok(())
    }

    /// Mark `seq` (and everything before it) as processed; future calls to
    /// `entries_after`/`next_unprocessed` treat it as backlog already
    /// delivered.
    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Read every entry with `seq > processed_seq`, oldest first, without
    /// advancing the cursor.
    pub fn next_unprocessed(&self) -> Result<Option<Entry>, WalError> {
        Ok(self.entries_after(self.processed_seq)?.into_iter().next())
    }

    /// Read every entry with `seq > since`, oldest first. Used to serve a
    /// reconnecting durable subscriber's backlog request.
    #[allow(clippy::expect_used)]
    pub fn entries_after(&self, since: u64) -> Result<Vec<Entry>, WalError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut out = Vec::new();
        let mut offset = 0u64;
        loop {
            let mut header = [0u8; 12];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let seq = u64::from_be_bytes(header[0..8].try_into().expect("8 bytes"));
            let len = u32::from_be_bytes(header[8..12].try_into().expect("4 bytes")) as usize;
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload)?;
            if seq > since {
                let event: BusEvent = serde_json::from_slice(&payload).map_err(|e| {
                    WalError::Corrupt { offset, detail: e.to_string() }
                })?;
                out.push(Entry { seq, event });
            }
            offset += 12 + len as u64;
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
