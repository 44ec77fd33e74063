// src/platform/cocoa/mod.rs

//! Cocoa backend using objc2.
//!
//! `NSApplication` is set up once per process. Events are pulled from AppKit
//! without blocking, translated, and forwarded back to `NSApp` so window
//! management keeps working.

#![allow(unused_unsafe)]

pub mod window;

use log::{debug, info, trace};
use objc2::rc::{Allocated, Retained};
use objc2::runtime::{AnyObject, Bool, Sel};
use objc2::{class, msg_send, msg_send_id, sel};
use objc2_app_kit::{
    NSApplication, NSApplicationActivationPolicy, NSEvent, NSEventMask, NSEventType,
};
use objc2_foundation::{MainThreadMarker, NSDate, NSDefaultRunLoopMode, NSObject, NSString};
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::platform::{EventQueue, Platform};
use crate::types::{Event, MouseButton, Size};
use window::{window_id_of, CocoaWindow};

const MENU_TARGET_CLASS_NAME: &str = "SwimMenuTarget";

thread_local! {
    /// Events raised from AppKit callbacks (delegates, menu actions).
    static PENDING: RefCell<VecDeque<Event>> = RefCell::new(VecDeque::new());
}

pub(crate) fn push_pending(event: Event) {
    PENDING.with(|pending| pending.borrow_mut().push_back(event));
}

fn drain_pending(queue: &mut EventQueue) {
    PENDING.with(|pending| queue.extend(pending.borrow_mut().drain(..)));
}

/// Mouse button an AppKit mouse event type refers to.
pub fn button_for(event_type: NSEventType) -> Option<MouseButton> {
    match event_type {
        NSEventType::LeftMouseDown | NSEventType::LeftMouseUp | NSEventType::LeftMouseDragged => {
            Some(MouseButton::Left)
        }
        NSEventType::RightMouseDown
        | NSEventType::RightMouseUp
        | NSEventType::RightMouseDragged => Some(MouseButton::Right),
        NSEventType::OtherMouseDown
        | NSEventType::OtherMouseUp
        | NSEventType::OtherMouseDragged => Some(MouseButton::Middle),
        _ => None,
    }
}

fn register_menu_target_class() {
    use objc2::declare::ClassBuilder;
    use std::sync::Once;

    static REGISTER_ONCE: Once = Once::new();
    REGISTER_ONCE.call_once(|| {
        let mut builder = ClassBuilder::new(MENU_TARGET_CLASS_NAME, class!(NSObject))
            .expect("Failed to create SwimMenuTarget class");

        // quit: enqueues Quit instead of terminating the process.
        unsafe extern "C" fn quit(_this: &NSObject, _cmd: Sel, _sender: *mut AnyObject) {
            info!("SwimMenuTarget::quit: requested from menu");
            push_pending(Event::Quit);
        }
        unsafe {
            builder.add_method(
                sel!(quit:),
                quit as unsafe extern "C" fn(&NSObject, Sel, *mut AnyObject),
            );
        }

        // toggleFullScreen: forwards to the key window.
        unsafe extern "C" fn toggle_full_screen(
            _this: &NSObject,
            _cmd: Sel,
            sender: *mut AnyObject,
        ) {
            let app: *mut AnyObject = msg_send![class!(NSApplication), sharedApplication];
            let key_window: *mut AnyObject = msg_send![&*app, keyWindow];
            if let Some(window) = key_window.as_ref() {
                let () = msg_send![window, toggleFullScreen: sender];
            }
        }
        unsafe {
            builder.add_method(
                sel!(toggleFullScreen:),
                toggle_full_screen as unsafe extern "C" fn(&NSObject, Sel, *mut AnyObject),
            );
        }

        let _cls = builder.register();
        debug!("Registered menu target class: {}", MENU_TARGET_CLASS_NAME);
    });
}

/// `Platform` implementation over AppKit. Must live on the main thread.
pub struct CocoaPlatform {
    mtm: MainThreadMarker,
    queue: EventQueue,
    _menu_target: Retained<NSObject>,
}

impl CocoaPlatform {
    pub fn new() -> Result<Self> {
        let mtm = MainThreadMarker::new()
            .ok_or_else(|| Error::general("CocoaPlatform must be created on the main thread"))?;
        Self::init_app(mtm);
        register_menu_target_class();
        let menu_target = unsafe { Self::create_app_menus(mtm) };
        Ok(Self {
            mtm,
            queue: EventQueue::new(),
            _menu_target: menu_target,
        })
    }

    /// Activates `NSApplication` once per process.
    fn init_app(mtm: MainThreadMarker) {
        use std::sync::Once;

        static LAUNCH_ONCE: Once = Once::new();
        LAUNCH_ONCE.call_once(|| unsafe {
            let app = NSApplication::sharedApplication(mtm);
            app.setActivationPolicy(NSApplicationActivationPolicy::Regular);
            let _: () = msg_send![&app, activateIgnoringOtherApps: Bool::YES];
            let _: () = msg_send![&app, finishLaunching];
            info!("NSApplication initialized");
        });
    }

    unsafe fn create_app_menus(mtm: MainThreadMarker) -> Retained<NSObject> {
        let target: Retained<NSObject> = msg_send_id![class!(SwimMenuTarget), new];

        let menu_bar: Retained<AnyObject> = msg_send_id![class!(NSMenu), new];
        let app_menu_item: Retained<AnyObject> = msg_send_id![class!(NSMenuItem), new];
        let () = msg_send![&menu_bar, addItem: &*app_menu_item];

        let app_menu: Retained<AnyObject> = msg_send_id![class!(NSMenu), new];
        let full_screen = Self::menu_item("Toggle Full Screen", sel!(toggleFullScreen:), "f");
        let () = msg_send![&full_screen, setTarget: &*target];
        let () = msg_send![&app_menu, addItem: &*full_screen];

        let quit = Self::menu_item("Quit", sel!(quit:), "q");
        let () = msg_send![&quit, setTarget: &*target];
        let () = msg_send![&app_menu, addItem: &*quit];

        let () = msg_send![&app_menu_item, setSubmenu: &*app_menu];

        let app = NSApplication::sharedApplication(mtm);
        let () = msg_send![&app, setMainMenu: &*menu_bar];
        debug!("Application menu installed");
        target
    }

    unsafe fn menu_item(title: &str, action: Sel, key: &str) -> Retained<AnyObject> {
        let title = NSString::from_str(title);
        let key = NSString::from_str(key);
        let item: Allocated<AnyObject> = msg_send_id![class!(NSMenuItem), alloc];
        msg_send_id![
            item,
            initWithTitle: &*title,
            action: action,
            keyEquivalent: &*key
        ]
    }

    /// Pulls every pending `NSEvent`, translating and forwarding each one.
    fn pump_cocoa_events(&mut self) {
        unsafe {
            let app = NSApplication::sharedApplication(self.mtm);
            let distant_past = NSDate::distantPast();
            loop {
                let event = app.nextEventMatchingMask_untilDate_inMode_dequeue(
                    NSEventMask::Any,
                    Some(&distant_past),
                    &NSDefaultRunLoopMode,
                    true,
                );
                let Some(event) = event else {
                    break;
                };

                if let Some(translated) = Self::convert_event(&event) {
                    self.queue.push(translated);
                }
                trace!("cocoa: Dispatching event to NSApp via sendEvent");
                let _: () = msg_send![&app, sendEvent: &*event];
                // Delegate callbacks triggered by this event come after it.
                drain_pending(&mut self.queue);
            }
        }
        drain_pending(&mut self.queue);
    }

    fn convert_event(event: &NSEvent) -> Option<Event> {
        unsafe {
            let event_type = event.r#type();
            match event_type {
                NSEventType::KeyDown => Some(Event::KeyDown {
                    key_code: event.keyCode(),
                }),
                NSEventType::KeyUp => Some(Event::KeyUp {
                    key_code: event.keyCode(),
                }),
                NSEventType::MouseMoved => {
                    let location = event.locationInWindow();
                    let window: *mut AnyObject = msg_send![event, window];
                    Some(Event::MouseMoved {
                        delta: (event.deltaX(), event.deltaY()),
                        absolute: (location.x, location.y),
                        window: (!window.is_null()).then(|| window_id_of(window)),
                    })
                }
                NSEventType::LeftMouseDown
                | NSEventType::RightMouseDown
                | NSEventType::OtherMouseDown => button_for(event_type).map(Event::MouseDown),
                NSEventType::LeftMouseUp | NSEventType::RightMouseUp | NSEventType::OtherMouseUp => {
                    button_for(event_type).map(Event::MouseUp)
                }
                NSEventType::LeftMouseDragged
                | NSEventType::RightMouseDragged
                | NSEventType::OtherMouseDragged => button_for(event_type).map(Event::MouseDragged),
                _ => None,
            }
        }
    }
}

impl Platform for CocoaPlatform {
    fn create_window(&mut self, size: Size, title: &str) -> Result<Box<dyn crate::platform::Window>> {
        Ok(Box::new(CocoaWindow::new(self.mtm, size, title)?))
    }

    fn send_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    fn poll_event(&mut self) -> Result<Option<Event>> {
        self.pump_cocoa_events();
        Ok(self.queue.pop())
    }
}
