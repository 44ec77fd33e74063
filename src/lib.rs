// src/lib.rs

//! swim: a thin cross-platform window shim.
//!
//! Opens a connection to the native window system (X11 through XCB/Xlib, or
//! Cocoa on macOS), creates windows, polls input events and, on X11, binds an
//! OpenGL context to a window through GLX.
//!
//! ```no_run
//! use swim::{Event, Platform, Size};
//!
//! # fn main() -> swim::Result<()> {
//! let mut platform = swim::connect()?;
//! let _window = platform.create_window(Size::new(640.0, 480.0), "hello")?;
//! while let Some(event) = platform.poll_event()? {
//!     if let Event::Quit = event {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod platform;
pub mod types;

pub use error::{Error, Result};
pub use platform::{connect, run, EventQueue, NativePlatform, Platform, Window};
pub use types::{Event, MouseButton, Size, WindowId};
