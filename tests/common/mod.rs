//! Shared test utilities for dbscope integration tests
#![allow(dead_code)]

use dbscope::{Connection, ConnectOptions, DatabaseUrl, Engine, EngineFactory};
use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;

/// Something the fake toolkit was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Engine `id` was built with these options
    Created(usize, ConnectOptions),
    /// Engine `id` opened connection `conn`
    Connected { engine: usize, conn: usize },
    /// Connection `conn` was closed
    Closed(usize),
    /// Engine `id` was disposed
    Disposed(usize),
}

/// Error produced by the fake toolkit
#[derive(Debug, Error, PartialEq, Eq)]
#[error("fake toolkit failure during {0}")]
pub struct FakeError(pub &'static str);

/// Ordered record of toolkit calls, shared by all fakes of one test
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Rc<RefCell<Vec<Event>>>,
    next_id: Rc<Cell<usize>>,
}

impl Journal {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, matcher: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| matcher(event)).count()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn next_id(&self) -> usize {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    pub id: usize,
    journal: Journal,
    fail_close: bool,
}

impl Connection for FakeConnection {
    type Error = FakeError;

    fn close(self) -> Result<(), FakeError> {
        self.journal.record(Event::Closed(self.id));
        if self.fail_close {
            return Err(FakeError("close"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeEngine {
    pub id: usize,
    journal: Journal,
    fail_connect: bool,
    fail_close: bool,
}

impl FakeEngine {
    /// An engine built outside the handler
    pub fn standalone(journal: &Journal) -> Self {
        Self {
            id: journal.next_id(),
            journal: journal.clone(),
            fail_connect: false,
            fail_close: false,
        }
    }
}

impl Engine for FakeEngine {
    type Connection = FakeConnection;
    type Error = FakeError;

    fn connect(&self) -> Result<FakeConnection, FakeError> {
        if self.fail_connect {
            return Err(FakeError("connect"));
        }
        let conn = self.journal.next_id();
        self.journal.record(Event::Connected {
            engine: self.id,
            conn,
        });
        Ok(FakeConnection {
            id: conn,
            journal: self.journal.clone(),
            fail_close: self.fail_close,
        })
    }

    fn dispose(self) -> Result<(), FakeError> {
        self.journal.record(Event::Disposed(self.id));
        Ok(())
    }
}

/// Factory for fake engines
///
/// Understands the options `fail_create`, `fail_connect` and `fail_close`.
#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    pub journal: Journal,
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn create_engine(
        &self,
        _url: &DatabaseUrl,
        options: &ConnectOptions,
    ) -> Result<FakeEngine, FakeError> {
        let flag = |key: &str| options.get_bool(key).ok().flatten().unwrap_or(false);
        if flag("fail_create") {
            return Err(FakeError("create"));
        }
        let id = self.journal.next_id();
        self.journal.record(Event::Created(id, options.clone()));
        Ok(FakeEngine {
            id,
            journal: self.journal.clone(),
            fail_connect: flag("fail_connect"),
            fail_close: flag("fail_close"),
        })
    }
}

pub fn sqlite_url() -> DatabaseUrl {
    DatabaseUrl::parse("sqlite:///mem.db").unwrap()
}

/// In-memory sink for formatted tracing output
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Run `f` with a subscriber writing INFO and above into this capture
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Indexes of the first line containing each needle, in needle order
    pub fn positions(&self, needles: &[&str]) -> Vec<Option<usize>> {
        let lines = self.lines();
        needles
            .iter()
            .map(|needle| lines.iter().position(|line| line.contains(needle)))
            .collect()
    }
}

pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
