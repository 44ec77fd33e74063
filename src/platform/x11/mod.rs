// src/platform/x11/mod.rs

//! X11 backend.
//!
//! - `connection`: the XCB connection (opened through Xlib for GLX) and event polling.
//! - `window`: plain windows and their size/title properties.
//! - `glx`: windows with a bound OpenGL context.
//! - `event`: translation of native events into `Event`s.
//!
//! `X11Platform` ties these to the `Platform` trait.

pub mod connection;
pub mod event;
pub mod glx;
pub mod window;


use log::{debug, info};

use crate::config::GlConfig;
use crate::error::Result;
use crate::platform::{EventQueue, Platform};
use crate::types::{Event, Size};
use connection::Connection;
use glx::GlWindow;
use window::Window;

/// `Platform` implementation over an X server.
#[derive(Debug)]
pub struct X11Platform {
    connection: Connection,
    queue: EventQueue,
}

impl X11Platform {
    pub fn new() -> Result<Self> {
        let connection = Connection::new()?;
        Ok(Self {
            connection,
            queue: EventQueue::new(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Creates a window with a current GLX context. X11 only.
    pub fn create_gl_window(
        &mut self,
        size: Size,
        title: &str,
        config: &GlConfig,
    ) -> Result<GlWindow> {
        let window = self.connection.create_gl_window(size, config)?;
        window.window().set_title(title)?;
        Ok(window)
    }

    fn create_plain_window(&self, size: Size, title: &str) -> Result<Window> {
        let window = self.connection.create_window(size)?;
        window.set_title(title)?;
        info!("Created window {} titled '{}'", window.id(), title);
        Ok(window)
    }
}

impl Platform for X11Platform {
    fn create_window(&mut self, size: Size, title: &str) -> Result<Box<dyn crate::platform::Window>> {
        Ok(Box::new(self.create_plain_window(size, title)?))
    }

    fn send_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    fn poll_event(&mut self) -> Result<Option<Event>> {
        while let Some(event) = self.connection.poll_event()? {
            self.queue.push(event);
        }
        let event = self.queue.pop();
        if let Some(event) = &event {
            debug!("X11Platform: delivering {:?}", event);
        }
        Ok(event)
    }
}
