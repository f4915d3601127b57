//! Scripted connector and stream for exercising the client without sockets.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{ErrorKind, Write};
use std::rc::Rc;

use lmcpwire_transport::{Connector, TransportError};

/// What one `write` call on a [`MockStream`] does.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteStep {
    /// Accept at most this many bytes.
    Accept(usize),
    /// Report that zero bytes were written.
    Zero,
    /// Fail with this error kind.
    Fail(ErrorKind),
}

/// What one connect attempt does.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    Refuse,
    Stream(Vec<WriteStep>),
}

pub(crate) struct MockStream {
    steps: VecDeque<WriteStep>,
    wire: Rc<RefCell<Vec<u8>>>,
    writes: Rc<Cell<usize>>,
    drops: Rc<Cell<usize>>,
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writes.set(self.writes.get() + 1);
        match self.steps.pop_front() {
            Some(WriteStep::Accept(max)) => {
                let n = max.min(buf.len());
                self.wire.borrow_mut().extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Some(WriteStep::Zero) => Ok(0),
            Some(WriteStep::Fail(kind)) => Err(std::io::Error::from(kind)),
            None => {
                self.wire.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Hands out [`MockStream`]s per plan; once the plans run out every connect
/// succeeds with a stream that accepts everything.
#[derive(Default)]
pub(crate) struct MockConnector {
    plans: RefCell<VecDeque<Plan>>,
    pub attempts: Cell<usize>,
    /// Bytes that reached any stream, in order.
    pub wire: Rc<RefCell<Vec<u8>>>,
    /// Total `write` calls across all streams.
    pub writes: Rc<Cell<usize>>,
    /// Streams dropped (closed) so far.
    pub drops: Rc<Cell<usize>>,
}

impl MockConnector {
    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        Self {
            plans: RefCell::new(plans.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn received(&self) -> Vec<u8> {
        self.wire.borrow().clone()
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(&self) -> lmcpwire_transport::Result<MockStream> {
        self.attempts.set(self.attempts.get() + 1);
        let plan = self
            .plans
            .borrow_mut()
            .pop_front()
            .unwrap_or(Plan::Stream(Vec::new()));

        match plan {
            Plan::Refuse => Err(TransportError::Connect {
                addr: "mock".to_string(),
                source: std::io::Error::from(ErrorKind::ConnectionRefused),
            }),
            Plan::Stream(steps) => Ok(MockStream {
                steps: steps.into(),
                wire: Rc::clone(&self.wire),
                writes: Rc::clone(&self.writes),
                drops: Rc::clone(&self.drops),
            }),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
