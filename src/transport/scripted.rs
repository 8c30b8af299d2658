//! In-memory transport that replays a fixed sequence of receive results.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use super::Transport;
use crate::error::{CamwireError, Result};

pub(crate) enum Step {
    Data(Vec<u8>),
    Fail,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: VecDeque<Step>,
    pub sent: Vec<Vec<u8>>,
    pub receive_calls: usize,
    pub timeouts: Vec<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes delivered by one or more receives.
    ///
    /// A step larger than the caller's buffer is split across calls.
    pub fn data(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Data(bytes.as_ref().to_vec()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(mut self) -> Self {
        self.steps.push_back(Step::Fail);
        self
    }

    fn next_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    bytes.drain(..n);
                    self.steps.push_front(Step::Data(bytes));
                }
                Ok(n)
            }
            Some(Step::Fail) => Err(CamwireError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "scripted failure",
            ))),
            None => Ok(0),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send {
        self.sent.push(bytes.to_vec());
        std::future::ready(Ok(()))
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<usize>> + Send {
        self.receive_calls += 1;
        self.timeouts.push(timeout);
        std::future::ready(self.next_read(buf))
    }
}
