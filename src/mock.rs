//! Scripted serial port for the unit tests.
//!
//! The mock behaves like a modem on a buffered UART: each command line
//! (or payload terminator) written to it releases the next scripted reply
//! into the receive buffer, where the engine's polling reader picks it
//! up. `late_reply` entries arrive only after a delay, emulating a reply
//! that straggles in after its window has already closed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_time::{Duration, Instant};

use crate::command::END_OF_DATA;
use crate::config::Config;
use crate::traits::SerialPort;

/// Config with response windows shrunk far enough that full-window reads
/// keep the test-suite fast.
pub fn fast_config() -> Config {
    Config::new()
        .retry_delay(Duration::from_millis(20))
        .poll_interval(Duration::from_millis(1))
        .probe_timeout(Duration::from_millis(30))
        .command_timeout(Duration::from_millis(30))
        .connect_timeout(Duration::from_millis(40))
        .attach_timeout(Duration::from_millis(40))
        .activation_timeout(Duration::from_millis(40))
}

#[derive(Debug)]
pub struct IoError;

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

/// Everything that happened on the port, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Write(Vec<u8>),
    Read(Vec<u8>),
}

enum Script {
    Reply(Vec<u8>),
    Late(Vec<u8>, Duration),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    rx: VecDeque<u8>,
    script: VecDeque<Script>,
    late: Vec<(Instant, Vec<u8>)>,
    fail_writes: bool,
}

impl State {
    fn deliver_due(&mut self) {
        let now = Instant::now();
        let mut i = 0;
        while i < self.late.len() {
            if self.late[i].0 <= now {
                let (_, bytes) = self.late.remove(i);
                self.rx.extend(bytes);
            } else {
                i += 1;
            }
        }
    }
}

pub struct MockPort {
    state: Rc<RefCell<State>>,
}

/// Shared view into a [`MockPort`]'s state, usable while the port itself
/// is moved into (or mutably borrowed by) a client.
pub struct MockHandle {
    state: Rc<RefCell<State>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
        }
    }

    /// Queue a reply window; it becomes readable right after the next
    /// command line or payload terminator goes out.
    pub fn reply(self, bytes: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .script
            .push_back(Script::Reply(bytes.to_vec()));
        self
    }

    /// Queue a reply that only shows up `delay` after its triggering
    /// write: too late for that exchange's window.
    pub fn late_reply(self, bytes: &[u8], delay: Duration) -> Self {
        self.state
            .borrow_mut()
            .script
            .push_back(Script::Late(bytes.to_vec(), delay));
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Rc::clone(&self.state),
        }
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.handle().writes()
    }
}

impl MockHandle {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes.clone()),
                Event::Read(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl SerialPort for MockPort {
    type Error = IoError;

    fn write(&mut self, buf: &[u8]) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(IoError);
        }
        state.events.push(Event::Write(buf.to_vec()));
        if buf.ends_with(b"\r") || buf == &[END_OF_DATA] {
            if let Some(entry) = state.script.pop_front() {
                match entry {
                    Script::Reply(bytes) => state.rx.extend(bytes),
                    Script::Late(bytes, delay) => {
                        let due = Instant::now() + delay;
                        state.late.push((due, bytes));
                    }
                }
            }
        }
        Ok(())
    }

    fn available(&mut self) -> Result<usize, IoError> {
        let mut state = self.state.borrow_mut();
        state.deliver_due();
        Ok(state.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let mut state = self.state.borrow_mut();
        let n = buf.len().min(state.rx.len());
        for slot in &mut buf[..n] {
            *slot = state.rx.pop_front().unwrap();
        }
        state.events.push(Event::Read(buf[..n].to_vec()));
        Ok(n)
    }
}
