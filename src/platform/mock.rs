// src/platform/mock.rs

use crate::error::{Error, Result};
use crate::platform::{EventQueue, Platform, Window};
use crate::types::{Event, Size, WindowId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Native side of the mock: events the "server" will report on later polls.
#[derive(Debug, Default)]
pub struct MockServer {
    pending: VecDeque<Event>,
    polls: usize,
}

pub struct MockPlatform {
    server: Rc<RefCell<MockServer>>,
    queue: EventQueue,
    next_id: u64,
    fail_polls: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            server: Rc::new(RefCell::new(MockServer::default())),
            queue: EventQueue::new(),
            next_id: 1,
            fail_polls: false,
        }
    }

    /// Simulates an event arriving from the window system.
    pub fn push_native_event(&mut self, event: Event) {
        self.server.borrow_mut().pending.push_back(event);
    }

    pub fn fail_polls(&mut self) {
        self.fail_polls = true;
    }

    pub fn poll_count(&self) -> usize {
        self.server.borrow().polls
    }
}

impl Platform for MockPlatform {
    fn create_window(&mut self, size: Size, title: &str) -> Result<Box<dyn Window>> {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        Ok(Box::new(MockWindow {
            id,
            size,
            title: title.to_string(),
        }))
    }

    fn send_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    fn poll_event(&mut self) -> Result<Option<Event>> {
        if self.fail_polls {
            return Err(Error::general("connection lost"));
        }
        let mut server = self.server.borrow_mut();
        server.polls += 1;
        self.queue.extend(server.pending.drain(..));
        Ok(self.queue.pop())
    }
}

pub struct MockWindow {
    id: WindowId,
    size: Size,
    title: String,
}

impl Window for MockWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn size(&self) -> Result<Size> {
        Ok(self.size)
    }

    fn set_size(&mut self, size: Size) -> Result<()> {
        self.size = size;
        Ok(())
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.title = title.to_string();
        Ok(())
    }
}
