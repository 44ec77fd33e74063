// src/platform/cocoa/window.rs

//! `NSWindow` wrapper and its delegate.
//!
//! The delegate is a runtime-registered `NSObject` subclass. It cannot reach
//! the platform object, so it reports closes through the thread-local
//! pending queue that `CocoaPlatform::poll_event` drains.

#![allow(unused_unsafe)]

use log::{debug, info, trace};
use objc2::rc::{Allocated, Retained};
use objc2::runtime::{AnyObject, Sel};
use objc2::{class, msg_send, msg_send_id, sel};
use objc2_app_kit::{NSBackingStoreType, NSWindow, NSWindowStyleMask};
use objc2_foundation::{MainThreadMarker, NSObject, NSPoint, NSRect, NSSize, NSString};

use super::push_pending;
use crate::error::Result;
use crate::types::{Event, Size, WindowId};

const DELEGATE_CLASS_NAME: &str = "SwimWindowDelegate";

// NSTrackingAreaOptions
const TRACKING_MOUSE_ENTERED_AND_EXITED: usize = 0x01;
const TRACKING_MOUSE_MOVED: usize = 0x02;
const TRACKING_ACTIVE_ALWAYS: usize = 0x80;
const TRACKING_IN_VISIBLE_RECT: usize = 0x200;

/// Identity of a window object: its address.
pub(super) fn window_id_of(window: *const AnyObject) -> WindowId {
    WindowId(window as usize as u64)
}

/// Replaces the content view's tracking areas with one covering `bounds`.
unsafe fn update_tracking_area(window: &NSWindow, bounds: NSRect) {
    let view: *mut AnyObject = msg_send![window, contentView];
    if view.is_null() {
        return;
    }
    let view = &*view;

    let existing: Retained<AnyObject> = msg_send_id![view, trackingAreas];
    let count: usize = msg_send![&existing, count];
    for i in (0..count).rev() {
        let area: *mut AnyObject = msg_send![&existing, objectAtIndex: i];
        let () = msg_send![view, removeTrackingArea: area];
    }

    let options = TRACKING_ACTIVE_ALWAYS
        | TRACKING_IN_VISIBLE_RECT
        | TRACKING_MOUSE_ENTERED_AND_EXITED
        | TRACKING_MOUSE_MOVED;
    let area: Allocated<AnyObject> = msg_send_id![class!(NSTrackingArea), alloc];
    let area: Retained<AnyObject> = msg_send_id![
        area,
        initWithRect: bounds,
        options: options,
        owner: window,
        userInfo: std::ptr::null_mut::<AnyObject>()
    ];
    let () = msg_send![view, addTrackingArea: &*area];
    trace!("Tracking area updated to {:?}", bounds.size);
}

fn register_delegate_class() {
    use objc2::declare::ClassBuilder;
    use std::sync::Once;

    static REGISTER_ONCE: Once = Once::new();
    REGISTER_ONCE.call_once(|| {
        let mut builder = ClassBuilder::new(DELEGATE_CLASS_NAME, class!(NSObject))
            .expect("Failed to create SwimWindowDelegate class");

        // windowWillClose:
        unsafe extern "C" fn window_will_close(
            _this: &NSObject,
            _cmd: Sel,
            notification: *mut NSObject,
        ) {
            if notification.is_null() {
                return;
            }
            let window: *mut AnyObject = msg_send![&*notification, object];
            let id = window_id_of(window);
            info!("SwimWindowDelegate::windowWillClose: window {}", id);
            push_pending(Event::WindowClosed(id));
        }
        unsafe {
            builder.add_method(
                sel!(windowWillClose:),
                window_will_close as unsafe extern "C" fn(&NSObject, Sel, *mut NSObject),
            );
        }

        // windowWillResize:toSize:
        unsafe extern "C" fn window_will_resize(
            _this: &NSObject,
            _cmd: Sel,
            sender: *mut NSWindow,
            frame_size: NSSize,
        ) -> NSSize {
            if let Some(window) = sender.as_ref() {
                update_tracking_area(window, NSRect::new(NSPoint::new(0.0, 0.0), frame_size));
            }
            frame_size
        }
        unsafe {
            builder.add_method(
                sel!(windowWillResize:toSize:),
                window_will_resize
                    as unsafe extern "C" fn(&NSObject, Sel, *mut NSWindow, NSSize) -> NSSize,
            );
        }

        let _cls = builder.register();
        debug!("Registered NSWindowDelegate subclass: {}", DELEGATE_CLASS_NAME);
    });
}

/// A titled, closable, resizable `NSWindow`.
pub struct CocoaWindow {
    window: Retained<NSWindow>,
    _delegate: Retained<NSObject>,
}

impl CocoaWindow {
    pub fn new(mtm: MainThreadMarker, size: Size, title: &str) -> Result<Self> {
        register_delegate_class();

        unsafe {
            let content_rect = NSRect::new(
                NSPoint::new(0.0, 0.0),
                NSSize::new(size.width, size.height),
            );
            let style_mask = NSWindowStyleMask::Titled
                | NSWindowStyleMask::Closable
                | NSWindowStyleMask::Resizable;

            let window = NSWindow::initWithContentRect_styleMask_backing_defer(
                mtm.alloc(),
                content_rect,
                style_mask,
                NSBackingStoreType::Buffered,
                true,
            );
            // The wrapper owns the window; AppKit must not release it on close.
            window.setReleasedWhenClosed(false);
            window.setTitle(&NSString::from_str(title));
            window.setAcceptsMouseMovedEvents(true);

            let delegate: Retained<NSObject> = msg_send_id![class!(SwimWindowDelegate), new];
            let delegate_obj: &AnyObject = &delegate;
            let _: () = msg_send![&window, setDelegate: delegate_obj];

            update_tracking_area(&window, window.frame());
            window.makeKeyAndOrderFront(None);

            let created = Self {
                window,
                _delegate: delegate,
            };
            info!("NSWindow {} created titled '{}'", created.id(), title);
            Ok(created)
        }
    }

    pub fn id(&self) -> WindowId {
        window_id_of(Retained::as_ptr(&self.window) as *const AnyObject)
    }

    pub fn ns_window(&self) -> &NSWindow {
        &self.window
    }
}

impl crate::platform::Window for CocoaWindow {
    fn id(&self) -> WindowId {
        CocoaWindow::id(self)
    }

    fn size(&self) -> Result<Size> {
        let frame = unsafe { self.window.frame() };
        Ok(Size::new(frame.size.width, frame.size.height))
    }

    fn set_size(&mut self, size: Size) -> Result<()> {
        let mut frame = unsafe { self.window.frame() };
        frame.size.width = size.width;
        frame.size.height = size.height;
        unsafe { self.window.setFrame_display(frame, true) };
        Ok(())
    }

    fn title(&self) -> String {
        unsafe { self.window.title() }.to_string()
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        unsafe { self.window.setTitle(&NSString::from_str(title)) };
        Ok(())
    }
}

impl Drop for CocoaWindow {
    fn drop(&mut self) {
        debug!("Dropping NSWindow {}", self.id());
        unsafe {
            let _: () = msg_send![&self.window, setDelegate: std::ptr::null_mut::<AnyObject>()];
        }
        unsafe { self.window.orderOut(None) };
    }
}
