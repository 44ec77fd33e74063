// src/platform/x11/connection.rs

use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;
use xcb::{x, Xid};

use super::event::{next_translated, EventTranslator, PollError, WmAtoms};
use super::glx::GlWindow;
use super::window::Window;
use crate::config::GlConfig;
use crate::error::{Error, Result};
use crate::types::{Event, Size};

/// State shared between a connection and the windows created from it.
///
/// Windows hold an `Rc` to this, so the display stays open for as long as
/// any of them is alive.
pub struct Shared {
    conn: xcb::Connection,
    screen_num: i32,
    atoms: WmAtoms,
    /// Windows destroyed by their owner since the last poll.
    released: RefCell<Vec<u32>>,
}

impl Shared {
    pub fn xcb(&self) -> &xcb::Connection {
        &self.conn
    }

    pub fn screen_num(&self) -> i32 {
        self.screen_num
    }

    pub fn atoms(&self) -> &WmAtoms {
        &self.atoms
    }

    /// The Xlib display underneath the XCB connection, for GLX calls.
    ///
    /// Valid for as long as this `Shared` is alive.
    pub fn raw_display(&self) -> *mut ::x11::xlib::Display {
        self.conn.get_raw_dpy()
    }

    pub fn screen(&self) -> Result<&x::Screen> {
        self.conn
            .get_setup()
            .roots()
            .nth(self.screen_num as usize)
            .ok_or_else(|| Error::general("Unable to get first screen"))
    }

    /// Records that the application destroyed `window` itself.
    pub fn note_released(&self, window: u32) {
        self.released.borrow_mut().push(window);
    }

    fn take_released(&self) -> Vec<u32> {
        std::mem::take(&mut *self.released.borrow_mut())
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("screen_num", &self.screen_num)
            .field("atoms", &self.atoms)
            .finish()
    }
}

/// Connection to the X server, opened through Xlib so that GLX can share it.
///
/// XCB owns the event queue. The display is closed when the last reference
/// (this connection or any window created from it) is dropped.
#[derive(Debug)]
pub struct Connection {
    shared: Rc<Shared>,
    translator: RefCell<EventTranslator>,
}

impl Connection {
    /// Connects to the display named by `DISPLAY` and selects its default screen.
    pub fn new() -> Result<Self> {
        info!("Establishing X11 server connection.");

        let (conn, screen_num) = xcb::Connection::connect_with_xlib_display().map_err(|e| {
            debug!("connect_with_xlib_display failed: {}", e);
            Error::CannotConnect
        })?;
        conn.set_event_queue_owner(xcb::EventQueueOwner::Xcb);
        debug!("Connected, default screen number: {}", screen_num);

        let atoms = WmAtoms {
            protocols: intern_atom(&conn, b"WM_PROTOCOLS")?.resource_id(),
            delete_window: intern_atom(&conn, b"WM_DELETE_WINDOW")?.resource_id(),
        };
        debug!("Interned WM atoms: {:?}", atoms);

        let shared = Shared {
            conn,
            screen_num,
            atoms,
            released: RefCell::new(Vec::new()),
        };
        // Fail early rather than on the first window.
        let screen = shared.screen()?;
        debug!(
            "Screen root {:?}, root visual {}, {}x{} px",
            screen.root(),
            screen.root_visual(),
            screen.width_in_pixels(),
            screen.height_in_pixels()
        );

        info!("X11 server connection established successfully.");
        Ok(Self {
            shared: Rc::new(shared),
            translator: RefCell::new(EventTranslator::new()),
        })
    }

    pub fn shared(&self) -> &Rc<Shared> {
        &self.shared
    }

    pub fn create_window(&self, size: Size) -> Result<Window> {
        Window::new(Rc::clone(&self.shared), size)
    }

    pub fn create_gl_window(&self, size: Size, config: &GlConfig) -> Result<GlWindow> {
        GlWindow::new(Rc::clone(&self.shared), size, config)
    }

    /// Returns the next translatable event without blocking.
    ///
    /// Native events with no translation, and X errors for earlier unchecked
    /// requests, are consumed and skipped.
    pub fn poll_event(&self) -> Result<Option<Event>> {
        let mut translator = self.translator.borrow_mut();
        for window in self.shared.take_released() {
            translator.window_released(window);
        }
        next_translated(
            || self.shared.conn.poll_for_event().map_err(PollError::from),
            &mut translator,
            &self.shared.atoms,
        )
    }
}

fn intern_atom(conn: &xcb::Connection, name: &[u8]) -> Result<x::Atom> {
    let cookie = conn.send_request(&x::InternAtom {
        only_if_exists: false,
        name,
    });
    Ok(conn.wait_for_reply(cookie)?.atom())
}
