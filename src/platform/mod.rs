// src/platform/mod.rs

//! Cross-platform facade over the native window systems.
//!
//! `Platform` and `Window` are the only types an application needs. One
//! concrete backend is chosen at compile time and exposed as `NativePlatform`:
//! Cocoa on macOS, X11 (XCB + GLX) everywhere else.

use crate::error::Result;
use crate::types::{Event, Size, WindowId};
use log::{debug, trace};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::Duration;

#[cfg(target_os = "macos")]
pub mod cocoa;
#[cfg(test)]
pub mod mock;
#[cfg(not(target_os = "macos"))]
pub mod x11;

#[cfg(target_os = "macos")]
pub type NativePlatform = cocoa::CocoaPlatform;
#[cfg(not(target_os = "macos"))]
pub type NativePlatform = x11::X11Platform;

/// A native window owned by a backend.
///
/// Every accessor is a direct native call; nothing is cached.
pub trait Window {
    fn id(&self) -> WindowId;

    fn size(&self) -> Result<Size>;

    fn set_size(&mut self, size: Size) -> Result<()>;

    /// Current title, or an empty string when the native property is unreadable.
    fn title(&self) -> String;

    fn set_title(&mut self, title: &str) -> Result<()>;
}

impl std::fmt::Debug for dyn Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window").field("id", &self.id()).finish()
    }
}

/// A connection to the native window system.
pub trait Platform {
    fn create_window(&mut self, size: Size, title: &str) -> Result<Box<dyn Window>>;

    /// Queues an event to be returned by a later `poll_event`.
    fn send_event(&mut self, event: Event);

    /// Non-blocking: collects pending native events, then returns the oldest
    /// queued event, or `None` when nothing is pending.
    fn poll_event(&mut self) -> Result<Option<Event>>;
}

/// Connects to the window system of the target platform.
pub fn connect() -> Result<NativePlatform> {
    NativePlatform::new()
}

/// FIFO of events shared by native translation and `Platform::send_event`.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        trace!("EventQueue: push {:?}", event);
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Extend<Event> for EventQueue {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}

/// Polls `platform` and hands each event to `handler` until it breaks.
///
/// Sleeps for `poll_interval` whenever the queue is empty. Native errors end
/// the loop and are returned.
pub fn run<P, F>(platform: &mut P, poll_interval: Duration, mut handler: F) -> Result<()>
where
    P: Platform + ?Sized,
    F: FnMut(Event) -> ControlFlow<()>,
{
    debug!("Entering event loop (poll interval {:?})", poll_interval);
    loop {
        match platform.poll_event()? {
            Some(event) => {
                if handler(event).is_break() {
                    debug!("Event handler requested exit");
                    return Ok(());
                }
            }
            None => {
                if !poll_interval.is_zero() {
                    std::thread::sleep(poll_interval);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
