//! Message channel between a running test body and the runner.
//!
//! One channel serves a whole test case run. It is backed by an anonymous temporary file so it survives any
//! behaviour of the sending side: a forked child inherits the descriptor, appends newline-delimited JSON records,
//! and may die at any point; the runner reads whatever complete records reached the file once the child is gone.
//!
//! ## Semantics
//!
//! - Checkpoints overwrite: only the latest one received is retained.
//! - Failures do not: the first failure received is retained and later ones are ignored.
//! - Every receive consumes its slot, so nothing leaks into the next test function.
//! - Every receive also truncates the backing file; it never holds more than one test function's records.
//! - A truncated trailing record (sender killed mid-write) or a malformed record is dropped.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::FileExt;

use isocheck_core::Checkpoint;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// One wire record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Checkpoint { file: String, line: i32 },
    Failure { message: String },
}

/// Receiving end, owned by the runner for the duration of one test case.
#[derive(Debug)]
pub struct Channel {
    file: File,
    checkpoint: Option<Checkpoint>,
    failure: Option<String>,
}

impl Channel {
    /// Allocate a fresh channel.
    pub fn create() -> HarnessResult<Self> {
        let file = tempfile::tempfile().map_err(HarnessError::ChannelAlloc)?;
        tracing::trace!("allocated message channel");
        Ok(Self {
            file,
            checkpoint: None,
            failure: None,
        })
    }

    /// Hand out a sending end sharing this channel's storage.
    pub fn sender(&self) -> HarnessResult<Sender> {
        let file = self.file.try_clone().map_err(HarnessError::ChannelAlloc)?;
        Ok(Sender { file })
    }

    /// Last checkpoint sent since the previous receive, or the unknown sentinel.
    pub fn receive_checkpoint(&mut self) -> HarnessResult<Checkpoint> {
        self.drain()?;
        Ok(self.checkpoint.take().unwrap_or_default())
    }

    /// First failure sent since the previous receive; `None` means no failure was reported.
    pub fn receive_failure(&mut self) -> HarnessResult<Option<String>> {
        self.drain()?;
        Ok(self.failure.take())
    }

    /// Release the channel. Never fails, whatever state the sender left behind.
    pub fn destroy(self) {
        tracing::trace!(unread_bytes = self.pending_bytes(), "destroying message channel");
    }

    fn pending_bytes(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }

    /// Fold every record written so far into the slots, then empty the file.
    ///
    /// Only called while no sender is writing: the forked child has been reaped or the inline body has returned.
    /// Senders seek to the end before each write, so they continue at offset 0 afterwards.
    fn drain(&mut self) -> HarnessResult<()> {
        let end = self.file.metadata().map_err(HarnessError::ChannelIo)?.len();
        if end == 0 {
            return Ok(());
        }

        let mut buf = vec![0u8; end as usize];
        self.file.read_exact_at(&mut buf, 0).map_err(HarnessError::ChannelIo)?;
        self.file.set_len(0).map_err(HarnessError::ChannelIo)?;

        let (complete, tail) = match buf.iter().rposition(|b| *b == b'\n') {
            Some(idx) => buf.split_at(idx + 1),
            None => buf.split_at(0),
        };
        if !tail.is_empty() {
            tracing::warn!(bytes = tail.len(), "dropping truncated channel record");
        }

        for line in complete.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            match serde_json::from_slice::<Record>(line) {
                Ok(record) => self.accept(record),
                Err(err) => tracing::warn!(%err, "dropping malformed channel record"),
            }
        }
        Ok(())
    }

    fn accept(&mut self, record: Record) {
        match record {
            Record::Checkpoint { file, line } => self.checkpoint = Some(Checkpoint::new(file, line)),
            Record::Failure { message } => {
                if self.failure.is_none() {
                    self.failure = Some(message);
                } else {
                    tracing::debug!(%message, "ignoring failure after the first");
                }
            }
        }
    }
}

/// Sending end, used by exactly one executing test body at a time.
#[derive(Debug)]
pub struct Sender {
    file: File,
}

impl Sender {
    pub fn send_checkpoint(&self, file: &str, line: i32) -> io::Result<()> {
        self.send(&Record::Checkpoint {
            file: file.to_string(),
            line,
        })
    }

    pub fn send_failure(&self, message: &str) -> io::Result<()> {
        self.send(&Record::Failure {
            message: message.to_string(),
        })
    }

    fn send(&self, record: &Record) -> io::Result<()> {
        let mut bytes = serde_json::to_vec(record).map_err(io::Error::other)?;
        bytes.push(b'\n');
        let mut file = &self.file;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&bytes)
    }

    /// Append raw bytes, bypassing record framing.
    #[cfg(test)]
    fn send_raw(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_channel_yields_sentinel_and_none() {
        let mut channel = Channel::create().unwrap();
        assert_eq!(channel.receive_checkpoint().unwrap(), Checkpoint::unknown());
        assert_eq!(channel.receive_failure().unwrap(), None);
    }

    #[test]
    fn test_latest_checkpoint_wins() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_checkpoint("a.rs", 1).unwrap();
        sender.send_checkpoint("a.rs", 2).unwrap();
        sender.send_checkpoint("b.rs", 30).unwrap();

        assert_eq!(channel.receive_checkpoint().unwrap(), Checkpoint::new("b.rs", 30));
    }

    #[test]
    fn test_first_failure_wins() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_failure("first").unwrap();
        sender.send_failure("second").unwrap();

        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_receive_consumes_between_test_functions() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_checkpoint("t.rs", 5).unwrap();
        sender.send_failure("boom").unwrap();
        assert_eq!(channel.receive_checkpoint().unwrap().line, 5);
        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("boom"));

        // Next test function on the same channel sent nothing.
        assert!(channel.receive_checkpoint().unwrap().is_unknown());
        assert_eq!(channel.receive_failure().unwrap(), None);

        sender.send_failure("again").unwrap();
        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("again"));
    }

    #[test]
    fn test_receiving_checkpoint_first_keeps_failure_for_later() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_failure("kept").unwrap();
        sender.send_checkpoint("t.rs", 9).unwrap();

        assert_eq!(channel.receive_checkpoint().unwrap().line, 9);
        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_checkpoint("t.rs", 3).unwrap();
        sender.send_raw(br#"{"kind":"failure","mess"#).unwrap();

        assert_eq!(channel.receive_checkpoint().unwrap().line, 3);
        assert_eq!(channel.receive_failure().unwrap(), None);

        // The garbage must not corrupt records written afterwards.
        sender.send_failure("clean").unwrap();
        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("clean"));
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_raw(b"not json\n").unwrap();
        sender.send_failure("after").unwrap();

        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("after"));
    }

    #[test]
    fn test_receive_empties_backing_file() {
        let mut channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();

        for round in 0..3 {
            for line in 0..1_000 {
                sender.send_checkpoint("loop.rs", line).unwrap();
            }
            sender.send_failure("stop").unwrap();

            assert_eq!(channel.receive_checkpoint().unwrap(), Checkpoint::new("loop.rs", 999), "round {}", round);
            assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("stop"));
            assert_eq!(channel.pending_bytes(), 0, "round {}", round);
        }
    }

    #[test]
    fn test_destroy_with_unread_records() {
        let channel = Channel::create().unwrap();
        let sender = channel.sender().unwrap();
        sender.send_failure("never read").unwrap();
        channel.destroy();
        // The sender may outlive the receiver without error.
        sender.send_checkpoint("t.rs", 1).unwrap();
    }
}
