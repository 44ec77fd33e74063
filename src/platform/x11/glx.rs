// src/platform/x11/glx.rs

//! An X11 window with an OpenGL context bound through GLX.
//!
//! GLX needs the Xlib display, which is why `Connection` is opened through
//! Xlib and hands the event queue to XCB. Everything window-related (creation,
//! colormap, mapping) still goes through XCB.

use libc::{c_int, c_ulong};
use log::{debug, info, trace, warn};
use std::ffi::CStr;
use std::ptr;
use std::rc::Rc;
use xcb::{x, Xid};

use ::x11::glx::{
    self, GLX_BLUE_SIZE, GLX_DOUBLEBUFFER, GLX_DRAWABLE_TYPE, GLX_GREEN_SIZE, GLX_RED_SIZE,
    GLX_RENDER_TYPE, GLX_RGBA_BIT, GLX_RGBA_TYPE, GLX_VISUAL_ID, GLX_WINDOW_BIT,
    GLX_X_RENDERABLE,
};
use ::x11::xlib;

use super::connection::Shared;
use super::window::Window;
use crate::config::GlConfig;
use crate::error::{Error, Result};
use crate::types::{Size, WindowId};

// GL tokens.
const GL_VERSION: u32 = 0x1F02;
const GL_COLOR_BUFFER_BIT: u32 = 0x0000_4000;

type GlClearColorFn = unsafe extern "C" fn(f32, f32, f32, f32);
type GlClearFn = unsafe extern "C" fn(u32);
type GlViewportFn = unsafe extern "C" fn(i32, i32, i32, i32);
type GlGetStringFn = unsafe extern "C" fn(u32) -> *const u8;

/// The GL entry points this module calls, resolved with `glXGetProcAddress`.
#[derive(Clone, Copy)]
struct GlFunctions {
    clear_color: GlClearColorFn,
    clear: GlClearFn,
    viewport: GlViewportFn,
    get_string: GlGetStringFn,
}

impl GlFunctions {
    fn load() -> Result<Self> {
        // SAFETY: each name is paired with the C signature it has in the GL 1.0 ABI.
        unsafe {
            Ok(Self {
                clear_color: load_proc(b"glClearColor\0")?,
                clear: load_proc(b"glClear\0")?,
                viewport: load_proc(b"glViewport\0")?,
                get_string: load_proc(b"glGetString\0")?,
            })
        }
    }
}

/// Resolves a GL function by NUL-terminated name.
///
/// # Safety
///
/// `F` must be the function pointer type matching the named entry point.
unsafe fn load_proc<F: Copy>(name: &'static [u8]) -> Result<F> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<unsafe extern "C" fn()>());
    match glx::glXGetProcAddress(name.as_ptr()) {
        Some(f) => Ok(std::mem::transmute_copy::<unsafe extern "C" fn(), F>(&f)),
        None => Err(Error::general(format!(
            "Unable to load GL function {}",
            String::from_utf8_lossy(&name[..name.len() - 1])
        ))),
    }
}

/// Owns a `GLXContext`; destroyed on drop.
struct ContextGuard {
    shared: Rc<Shared>,
    context: glx::GLXContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let display = self.shared.raw_display();
        debug!("Destroying GLX context {:p}", self.context);
        // SAFETY: the display is alive (we hold `shared`) and the context was created on it.
        unsafe {
            // Leave another window's current context alone.
            if glx::glXGetCurrentContext() == self.context {
                glx::glXMakeContextCurrent(display, 0, 0, ptr::null_mut());
            }
            glx::glXDestroyContext(display, self.context);
        }
    }
}

/// Owns an X colormap; freed on drop.
struct ColormapGuard {
    shared: Rc<Shared>,
    colormap: x::Colormap,
}

impl Drop for ColormapGuard {
    fn drop(&mut self) {
        self.shared.xcb().send_request(&x::FreeColormap {
            cmap: self.colormap,
        });
    }
}

/// Owns a `GLXWindow`; destroyed on drop.
struct GlxWindowGuard {
    shared: Rc<Shared>,
    drawable: glx::GLXWindow,
}

impl Drop for GlxWindowGuard {
    fn drop(&mut self) {
        debug!("Destroying GLX window {:#x}", self.drawable);
        // SAFETY: the display is alive and the drawable was created on it.
        unsafe { glx::glXDestroyWindow(self.shared.raw_display(), self.drawable) };
    }
}

/// A window whose drawable has a current GLX context.
///
/// Teardown order follows field order: GLX drawable, X window, colormap,
/// context.
pub struct GlWindow {
    drawable: GlxWindowGuard,
    window: Window,
    _colormap: ColormapGuard,
    context: ContextGuard,
    gl: GlFunctions,
    clear_color: [f32; 4],
}

impl GlWindow {
    pub fn new(shared: Rc<Shared>, size: Size, config: &GlConfig) -> Result<Self> {
        let (width, height) = size.to_u16_pair();
        info!("Creating GLX window: {}x{}px", width, height);

        let display = shared.raw_display();
        let screen_num = shared.screen_num();
        let fb_config = choose_fb_config(display, screen_num, config.double_buffered)?;

        let mut visual_id: c_int = 0;
        // SAFETY: `fb_config` came from glXChooseFBConfig on this display.
        unsafe { glx::glXGetFBConfigAttrib(display, fb_config, GLX_VISUAL_ID, &mut visual_id) };
        if visual_id == 0 {
            return Err(Error::general("Framebuffer config has no X visual"));
        }
        let depth = visual_depth(display, fb_config)?;
        debug!(
            "Using framebuffer config with visual {:#x}, depth {}",
            visual_id, depth
        );

        // SAFETY: as above; no share list, direct rendering requested.
        let context = unsafe {
            glx::glXCreateNewContext(
                display,
                fb_config,
                GLX_RGBA_TYPE,
                ptr::null_mut(),
                xlib::True,
            )
        };
        if context.is_null() {
            return Err(Error::general("Unable to create GLX Context"));
        }
        let context = ContextGuard {
            shared: Rc::clone(&shared),
            context,
        };

        let conn = shared.xcb();
        let screen = shared.screen()?;
        let visual = visual_id as x::Visualid;

        let colormap: x::Colormap = conn.generate_id();
        conn.send_request(&x::CreateColormap {
            alloc: x::ColormapAlloc::None,
            mid: colormap,
            window: screen.root(),
            visual,
        });
        let colormap = ColormapGuard {
            shared: Rc::clone(&shared),
            colormap,
        };

        let window_id: x::Window = conn.generate_id();
        let cookie = conn.send_request_checked(&x::CreateWindow {
            depth,
            wid: window_id,
            parent: screen.root(),
            x: 0,
            y: 0,
            width,
            height,
            border_width: 0,
            class: x::WindowClass::InputOutput,
            visual,
            value_list: &[
                x::Cw::BackPixel(screen.white_pixel()),
                x::Cw::BorderPixel(screen.white_pixel()),
                x::Cw::EventMask(
                    x::EventMask::EXPOSURE
                        | x::EventMask::KEY_PRESS
                        | x::EventMask::KEY_RELEASE
                        | x::EventMask::STRUCTURE_NOTIFY,
                ),
                x::Cw::Colormap(colormap.colormap),
            ],
        });
        conn.check_request(cookie)?;
        let window = Window::from_id(Rc::clone(&shared), window_id);

        // SAFETY: the X window exists and was created with the config's visual.
        let drawable = unsafe {
            glx::glXCreateWindow(
                display,
                fb_config,
                window_id.resource_id() as c_ulong,
                ptr::null(),
            )
        };
        if drawable == 0 {
            // `window`, `colormap` and `context` are released by their drops.
            return Err(Error::general("Unable to create GLX window"));
        }
        let drawable = GlxWindowGuard {
            shared: Rc::clone(&shared),
            drawable,
        };

        window.register_delete_protocol()?;
        window.map()?;

        let gl_window = Self {
            drawable,
            window,
            _colormap: colormap,
            context,
            gl: GlFunctions::load()?,
            clear_color: config.clear_color,
        };
        gl_window.make_current()?;
        // SAFETY: the context is current on this thread.
        unsafe { (gl_window.gl.viewport)(0, 0, width as i32, height as i32) };
        info!("GL Version: {}", gl_window.gl_version());
        Ok(gl_window)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn make_current(&self) -> Result<()> {
        // SAFETY: drawable and context belong to the display held by `shared`.
        let ok = unsafe {
            glx::glXMakeContextCurrent(
                self.context.shared.raw_display(),
                self.drawable.drawable,
                self.drawable.drawable,
                self.context.context,
            )
        };
        if ok == 0 {
            return Err(Error::general("Unable to make GLX context current"));
        }
        Ok(())
    }

    /// `GL_VERSION` of the current context, or an empty string if unavailable.
    pub fn gl_version(&self) -> String {
        // SAFETY: called with this window's context current; the returned
        // string is static and NUL-terminated.
        unsafe {
            let version = (self.gl.get_string)(GL_VERSION);
            if version.is_null() {
                warn!("glGetString(GL_VERSION) returned null");
                return String::new();
            }
            CStr::from_ptr(version as *const libc::c_char)
                .to_string_lossy()
                .into_owned()
        }
    }

    pub fn clear(&self, rgba: [f32; 4]) {
        // SAFETY: GL calls on the current context.
        unsafe {
            (self.gl.clear_color)(rgba[0], rgba[1], rgba[2], rgba[3]);
            (self.gl.clear)(GL_COLOR_BUFFER_BIT);
        }
    }

    pub fn swap_buffers(&self) {
        // SAFETY: drawable belongs to the display held by `shared`.
        unsafe { glx::glXSwapBuffers(self.drawable.shared.raw_display(), self.drawable.drawable) };
    }

    /// Clears to the configured colour and presents.
    pub fn draw(&self) {
        trace!("GlWindow::draw {:?}", self.clear_color);
        self.clear(self.clear_color);
        self.swap_buffers();
    }
}

impl crate::platform::Window for GlWindow {
    fn id(&self) -> WindowId {
        self.window.id()
    }

    fn size(&self) -> Result<Size> {
        self.window.size()
    }

    fn set_size(&mut self, size: Size) -> Result<()> {
        self.window.set_size(size)?;
        let (width, height) = size.to_u16_pair();
        self.make_current()?;
        // SAFETY: the context was just made current.
        unsafe { (self.gl.viewport)(0, 0, width as i32, height as i32) };
        Ok(())
    }

    fn title(&self) -> String {
        self.window.title()
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.window.set_title(title)
    }
}

/// Depth of the X visual behind `fb_config`; the window must be created with it.
fn visual_depth(display: *mut xlib::Display, fb_config: glx::GLXFBConfig) -> Result<u8> {
    // SAFETY: `fb_config` came from glXChooseFBConfig on this display; the
    // returned info is freed before leaving.
    unsafe {
        let info = glx::glXGetVisualFromFBConfig(display, fb_config);
        if info.is_null() {
            return Err(Error::general("Framebuffer config has no X visual"));
        }
        let depth = (*info).depth;
        xlib::XFree(info as *mut _);
        u8::try_from(depth).map_err(|_| Error::general(format!("Invalid visual depth {}", depth)))
    }
}

/// Picks the first RGBA, window-capable configuration on `screen_num`.
fn choose_fb_config(
    display: *mut xlib::Display,
    screen_num: i32,
    double_buffered: bool,
) -> Result<glx::GLXFBConfig> {
    let attributes = [
        GLX_X_RENDERABLE,
        1,
        GLX_DRAWABLE_TYPE,
        GLX_WINDOW_BIT,
        GLX_RENDER_TYPE,
        GLX_RGBA_BIT,
        GLX_DOUBLEBUFFER,
        double_buffered as c_int,
        GLX_RED_SIZE,
        8,
        GLX_GREEN_SIZE,
        8,
        GLX_BLUE_SIZE,
        8,
        0,
    ];
    let mut count: c_int = 0;
    // SAFETY: the attribute list is zero-terminated; the returned array is freed below.
    unsafe {
        let configs =
            glx::glXChooseFBConfig(display, screen_num, attributes.as_ptr(), &mut count);
        if configs.is_null() || count <= 0 {
            if !configs.is_null() {
                xlib::XFree(configs as *mut _);
            }
            return Err(Error::general("Unable to get framebuffer configs"));
        }
        debug!("{} matching framebuffer configs", count);
        let first = *configs;
        xlib::XFree(configs as *mut _);
        Ok(first)
    }
}

impl std::fmt::Debug for GlWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlWindow")
            .field("window", &self.window)
            .field("drawable", &self.drawable.drawable)
            .finish()
    }
}

