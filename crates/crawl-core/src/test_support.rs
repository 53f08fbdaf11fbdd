//! Hand-written fakes shared by the unit tests.

use std::collections::VecDeque;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::mqtt::{Remote, Transport};

/// I2C bus that records writes and answers reads from a script.
///
/// A scripted `None` makes that read NACK, like a Si7021 still converting.
#[derive(Debug, Default)]
pub struct FakeI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: VecDeque<Option<Vec<u8>>>,
    pub fail_writes: bool,
}

impl FakeI2c {
    pub fn respond(&mut self, bytes: &[u8]) {
        self.reads.push_back(Some(bytes.to_vec()));
    }

    pub fn nack_read(&mut self) {
        self.reads.push_back(None);
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if self.fail_writes {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    self.writes.push((address, bytes.to_vec()));
                }
                Operation::Read(buffer) => match self.reads.pop_front().flatten() {
                    Some(bytes) => {
                        let len = bytes.len().min(buffer.len());
                        buffer[..len].copy_from_slice(&bytes[..len]);
                    }
                    None => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
                },
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls_ms.push(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.calls_ms.push(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls_ms.push(ms);
    }
}

/// In-memory MQTT transport. Reads come from `inbound`; an empty queue is EOF.
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub opened: Vec<Remote>,
    /// Scripted `open` outcomes, `Ok` once exhausted.
    pub open_results: VecDeque<Result<(), embedded_io_async::ErrorKind>>,
    pub open: bool,
    pub writes: Vec<Vec<u8>>,
    pub inbound: VecDeque<u8>,
    pub fail_writes: bool,
    pub read_error: Option<embedded_io_async::ErrorKind>,
    /// Reads never complete, like a broker that accepted TCP and went quiet.
    pub stall_reads: bool,
}

impl FakeTransport {
    /// Queue a CONNACK with the given return code.
    pub fn connack(&mut self, code: u8) {
        self.inbound.extend([0x20, 0x02, 0x00, code]);
    }
}

impl embedded_io_async::ErrorType for FakeTransport {
    type Error = embedded_io_async::ErrorKind;
}

impl embedded_io_async::Read for FakeTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if let Some(e) = self.read_error {
            return Err(e);
        }
        if self.stall_reads {
            core::future::pending::<()>().await;
        }
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io_async::ReadReady for FakeTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbound.is_empty())
    }
}

impl embedded_io_async::Write for FakeTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes || !self.open {
            return Err(embedded_io_async::ErrorKind::BrokenPipe);
        }
        self.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for FakeTransport {
    async fn open(&mut self, remote: &Remote) -> Result<(), Self::Error> {
        self.opened.push(*remote);
        let result = self.open_results.pop_front().unwrap_or(Ok(()));
        self.open = result.is_ok();
        result
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
