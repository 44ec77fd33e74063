// src/platform/x11/window.rs

use log::{debug, info, trace, warn};
use std::rc::Rc;
use xcb::{x, Xid, XidNew};

use super::connection::Shared;
use crate::error::{Error, Result};
use crate::types::{Size, WindowId};

/// Border width requested at creation; window managers usually override it.
const BORDER_WIDTH: u16 = 10;

/// Upper bound for title reads, in 32-bit units.
const MAX_PROPERTY_LENGTH: u32 = 1024;

/// An X11 window.
///
/// Size and title accessors are single protocol requests; nothing is cached.
/// The window is destroyed on the server when this value is dropped.
#[derive(Debug)]
pub struct Window {
    shared: Rc<Shared>,
    id: x::Window,
}

impl Window {
    /// Creates and maps an input/output window on the default screen.
    pub fn new(shared: Rc<Shared>, size: Size) -> Result<Self> {
        let (width, height) = size.to_u16_pair();
        info!("Creating X11 window: {}x{}px", width, height);

        let conn = shared.xcb();
        let screen = shared.screen()?;
        let id: x::Window = conn.generate_id();

        let cookie = conn.send_request_checked(&x::CreateWindow {
            depth: x::COPY_FROM_PARENT as u8,
            wid: id,
            parent: screen.root(),
            x: 0,
            y: 0,
            width,
            height,
            border_width: BORDER_WIDTH,
            class: x::WindowClass::InputOutput,
            visual: screen.root_visual(),
            value_list: &[x::Cw::EventMask(
                x::EventMask::KEY_PRESS
                    | x::EventMask::KEY_RELEASE
                    | x::EventMask::BUTTON_PRESS
                    | x::EventMask::BUTTON_RELEASE
                    | x::EventMask::POINTER_MOTION
                    | x::EventMask::STRUCTURE_NOTIFY,
            )],
        });
        conn.check_request(cookie)?;
        debug!("X window created (ID: {:#x})", id.resource_id());

        let window = Self::from_id(shared, id);
        window.register_delete_protocol()?;
        window.map()?;
        Ok(window)
    }

    /// Wraps a window that was created elsewhere; it is destroyed on drop.
    pub fn from_id(shared: Rc<Shared>, id: x::Window) -> Self {
        Self { shared, id }
    }

    pub fn xid(&self) -> x::Window {
        self.id
    }

    pub fn id(&self) -> WindowId {
        WindowId(self.id.resource_id() as u64)
    }

    /// Asks the window manager to send `WM_DELETE_WINDOW` instead of killing the client.
    pub fn register_delete_protocol(&self) -> Result<()> {
        let atoms = self.shared.atoms();
        // SAFETY: both ids were returned by InternAtom on this connection.
        let (protocols, delete_window) = unsafe {
            (
                x::Atom::new(atoms.protocols),
                x::Atom::new(atoms.delete_window),
            )
        };
        let cookie = self.shared.xcb().send_request_checked(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window: self.id,
            property: protocols,
            r#type: x::ATOM_ATOM,
            data: &[delete_window],
        });
        self.shared.xcb().check_request(cookie)?;
        debug!("WM_PROTOCOLS (WM_DELETE_WINDOW) registered.");
        Ok(())
    }

    pub fn map(&self) -> Result<()> {
        self.shared.xcb().send_request(&x::MapWindow { window: self.id });
        self.shared.flush()
    }

    pub fn size(&self) -> Result<Size> {
        let conn = self.shared.xcb();
        let cookie = conn.send_request(&x::GetGeometry {
            drawable: x::Drawable::Window(self.id),
        });
        let reply = conn.wait_for_reply(cookie)?;
        Ok(Size::new(reply.width() as f64, reply.height() as f64))
    }

    pub fn set_size(&self, size: Size) -> Result<()> {
        let (width, height) = size.to_u16_pair();
        trace!(
            "Resizing window {:#x} to {}x{}",
            self.id.resource_id(),
            width,
            height
        );
        self.shared.xcb().send_request(&x::ConfigureWindow {
            window: self.id,
            value_list: &[
                x::ConfigWindow::Width(width as u32),
                x::ConfigWindow::Height(height as u32),
            ],
        });
        self.shared.flush()
    }

    /// Reads `WM_NAME`. Returns an empty string if the property is missing or unreadable.
    pub fn title(&self) -> String {
        match self.string_property(x::ATOM_WM_NAME) {
            Ok(title) => title,
            Err(e) => {
                warn!(
                    "Failed to read WM_NAME of window {:#x}: {}",
                    self.id.resource_id(),
                    e
                );
                String::new()
            }
        }
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.set_string_property(x::ATOM_WM_NAME, title)?;
        debug!("Window title set to: {}", title);
        Ok(())
    }

    fn string_property(&self, property: x::Atom) -> Result<String> {
        let conn = self.shared.xcb();
        let cookie = conn.send_request(&x::GetProperty {
            delete: false,
            window: self.id,
            property,
            r#type: x::ATOM_STRING,
            long_offset: 0,
            long_length: MAX_PROPERTY_LENGTH,
        });
        let reply = conn.wait_for_reply(cookie)?;
        ensure_text_property(reply.r#type(), reply.format())?;
        Ok(String::from_utf8_lossy(reply.value::<u8>()).into_owned())
    }

    fn set_string_property(&self, property: x::Atom, value: &str) -> Result<()> {
        let cookie = self.shared.xcb().send_request_checked(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window: self.id,
            property,
            r#type: x::ATOM_STRING,
            data: value.as_bytes(),
        });
        self.shared.xcb().check_request(cookie)?;
        self.shared.flush()
    }
}

impl crate::platform::Window for Window {
    fn id(&self) -> WindowId {
        Window::id(self)
    }

    fn size(&self) -> Result<Size> {
        Window::size(self)
    }

    fn set_size(&mut self, size: Size) -> Result<()> {
        Window::set_size(self, size)
    }

    fn title(&self) -> String {
        Window::title(self)
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        Window::set_title(self, title)
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        info!("Destroying X11 window (ID: {:#x}).", self.id.resource_id());
        self.shared.note_released(self.id.resource_id());
        self.shared
            .xcb()
            .send_request(&x::DestroyWindow { window: self.id });
        if let Err(e) = self.shared.flush() {
            warn!("Flush after DestroyWindow failed: {}", e);
        }
    }
}

/// Only 8-bit `STRING` property values decode as text.
fn ensure_text_property(r#type: x::Atom, format: u8) -> Result<()> {
    if r#type != x::ATOM_STRING || format != 8 {
        return Err(Error::general("Unable to coerce reply to string"));
    }
    Ok(())
}
