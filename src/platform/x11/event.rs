// src/platform/x11/event.rs

//! Translation of XCB events into `Event`s.
//!
//! Decoding is split from translation: `decode` flattens an `xcb::Event` into
//! a `NativeInput` carrying only the fields we read, and `EventTranslator`
//! turns that into at most one `Event`. The translator keeps the little
//! pointer state X11 does not report directly (motion deltas, which button a
//! drag belongs to).
//!
//! `next_translated` is the read loop behind `Connection::poll_event`.

use bitflags::bitflags;
use log::{trace, warn};
use std::collections::{HashMap, HashSet};
use xcb::{x, Xid};

use crate::error::{Error, Result};
use crate::types::{Event, MouseButton, WindowId};

bitflags! {
    /// Mouse buttons held while the pointer moves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeldButtons: u8 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
    }
}

impl HeldButtons {
    pub fn from_key_but_mask(state: x::KeyButMask) -> Self {
        let mut held = HeldButtons::empty();
        if state.contains(x::KeyButMask::BUTTON1) {
            held |= HeldButtons::LEFT;
        }
        if state.contains(x::KeyButMask::BUTTON2) {
            held |= HeldButtons::MIDDLE;
        }
        if state.contains(x::KeyButMask::BUTTON3) {
            held |= HeldButtons::RIGHT;
        }
        held
    }

    /// The button a drag is reported for: left, then right, then middle.
    pub fn primary(self) -> Option<MouseButton> {
        if self.contains(HeldButtons::LEFT) {
            Some(MouseButton::Left)
        } else if self.contains(HeldButtons::RIGHT) {
            Some(MouseButton::Right)
        } else if self.contains(HeldButtons::MIDDLE) {
            Some(MouseButton::Middle)
        } else {
            None
        }
    }
}

/// Interned atoms needed to recognise a window manager close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmAtoms {
    pub protocols: u32,
    pub delete_window: u32,
}

/// The fields of a native event that translation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeInput {
    KeyPress {
        key_code: u8,
    },
    KeyRelease {
        key_code: u8,
    },
    ButtonPress {
        button: u8,
    },
    ButtonRelease {
        button: u8,
    },
    Motion {
        window: u32,
        x: i16,
        y: i16,
        held: HeldButtons,
    },
    ClientMessage {
        window: u32,
        message_type: u32,
        data0: u32,
    },
    Destroyed {
        window: u32,
    },
    /// Any response type we do not translate.
    Other,
}

/// Flattens an XCB event.
pub fn decode(event: &xcb::Event) -> NativeInput {
    match event {
        xcb::Event::X(x::Event::KeyPress(ev)) => NativeInput::KeyPress {
            key_code: ev.detail(),
        },
        xcb::Event::X(x::Event::KeyRelease(ev)) => NativeInput::KeyRelease {
            key_code: ev.detail(),
        },
        xcb::Event::X(x::Event::ButtonPress(ev)) => NativeInput::ButtonPress {
            button: ev.detail(),
        },
        xcb::Event::X(x::Event::ButtonRelease(ev)) => NativeInput::ButtonRelease {
            button: ev.detail(),
        },
        xcb::Event::X(x::Event::MotionNotify(ev)) => NativeInput::Motion {
            window: ev.event().resource_id(),
            x: ev.event_x(),
            y: ev.event_y(),
            held: HeldButtons::from_key_but_mask(ev.state()),
        },
        xcb::Event::X(x::Event::ClientMessage(ev)) => {
            let data0 = match ev.data() {
                x::ClientMessageData::Data32(words) => words[0],
                _ => 0,
            };
            NativeInput::ClientMessage {
                window: ev.window().resource_id(),
                message_type: ev.r#type().resource_id(),
                data0,
            }
        }
        xcb::Event::X(x::Event::DestroyNotify(ev)) => NativeInput::Destroyed {
            window: ev.window().resource_id(),
        },
        _ => NativeInput::Other,
    }
}

/// Failure of a single `poll_for_event` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// An X error reply to an earlier unchecked request. The connection is
    /// still usable.
    Protocol(String),
    /// The connection itself failed.
    Fatal(Error),
}

impl From<xcb::Error> for PollError {
    fn from(err: xcb::Error) -> Self {
        match err {
            xcb::Error::Protocol(proto) => PollError::Protocol(format!("{:?}", proto)),
            xcb::Error::Connection(conn) => PollError::Fatal(conn.into()),
        }
    }
}

/// Reads native events from `next` until one translates or the queue is empty.
///
/// Untranslatable events and protocol errors are consumed and skipped; only
/// a connection failure is returned as an error.
pub fn next_translated<F>(
    mut next: F,
    translator: &mut EventTranslator,
    atoms: &WmAtoms,
) -> Result<Option<Event>>
where
    F: FnMut() -> std::result::Result<Option<xcb::Event>, PollError>,
{
    loop {
        match next() {
            Ok(Some(native)) => {
                let input = decode(&native);
                if let Some(event) = translator.translate(input, atoms) {
                    return Ok(Some(event));
                }
                trace!("Dropped untranslated X11 event: {:?}", input);
            }
            Ok(None) => return Ok(None),
            Err(PollError::Protocol(e)) => {
                warn!("Ignoring X error for an earlier request: {}", e);
            }
            Err(PollError::Fatal(e)) => return Err(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventTranslator {
    last_positions: HashMap<u32, (f64, f64)>,
    close_requested: HashSet<u32>,
    released: HashSet<u32>,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a window the application destroyed itself. Its DestroyNotify
    /// will not be reported as a close.
    pub fn window_released(&mut self, window: u32) {
        self.released.insert(window);
        self.last_positions.remove(&window);
    }

    /// Maps one native input to an event. Unrecognised inputs yield `None`.
    pub fn translate(&mut self, input: NativeInput, atoms: &WmAtoms) -> Option<Event> {
        let event = match input {
            NativeInput::KeyPress { key_code } => Some(Event::KeyDown {
                key_code: key_code as u16,
            }),
            NativeInput::KeyRelease { key_code } => Some(Event::KeyUp {
                key_code: key_code as u16,
            }),
            NativeInput::ButtonPress { button } => {
                MouseButton::from_x11_button(button).map(Event::MouseDown)
            }
            NativeInput::ButtonRelease { button } => {
                MouseButton::from_x11_button(button).map(Event::MouseUp)
            }
            NativeInput::Motion { window, x, y, held } => {
                let absolute = (x as f64, y as f64);
                let delta = match self.last_positions.insert(window, absolute) {
                    Some((last_x, last_y)) => (absolute.0 - last_x, absolute.1 - last_y),
                    None => (0.0, 0.0),
                };
                match held.primary() {
                    Some(button) => Some(Event::MouseDragged(button)),
                    None => Some(Event::MouseMoved {
                        delta,
                        absolute,
                        window: Some(WindowId(window as u64)),
                    }),
                }
            }
            NativeInput::ClientMessage {
                window,
                message_type,
                data0,
            } => {
                if message_type == atoms.protocols && data0 == atoms.delete_window {
                    self.close_requested.insert(window);
                    Some(Event::WindowClosed(WindowId(window as u64)))
                } else {
                    None
                }
            }
            NativeInput::Destroyed { window } => {
                self.last_positions.remove(&window);
                let requested = self.close_requested.remove(&window);
                let released = self.released.remove(&window);
                // Already reported through the close request, or dropped by the application.
                if requested || released {
                    None
                } else {
                    Some(Event::WindowClosed(WindowId(window as u64)))
                }
            }
            NativeInput::Other => None,
        };
        trace!("X11 input {:?} -> {:?}", input, event);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use xcb::XidNew;

    const ATOMS: WmAtoms = WmAtoms {
        protocols: 301,
        delete_window: 302,
    };

    fn motion(x: i16, y: i16, held: HeldButtons) -> NativeInput {
        NativeInput::Motion {
            window: 0x600001,
            x,
            y,
            held,
        }
    }

    #[test_log::test]
    fn keys_carry_their_keycode() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(NativeInput::KeyPress { key_code: 38 }, &ATOMS),
            Some(Event::KeyDown { key_code: 38 })
        );
        assert_eq!(
            translator.translate(NativeInput::KeyRelease { key_code: 255 }, &ATOMS),
            Some(Event::KeyUp { key_code: 255 })
        );
    }

    #[test_log::test]
    fn buttons_translate_and_wheel_is_dropped() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(NativeInput::ButtonPress { button: 1 }, &ATOMS),
            Some(Event::MouseDown(MouseButton::Left))
        );
        assert_eq!(
            translator.translate(NativeInput::ButtonRelease { button: 3 }, &ATOMS),
            Some(Event::MouseUp(MouseButton::Right))
        );
        assert_eq!(
            translator.translate(NativeInput::ButtonPress { button: 2 }, &ATOMS),
            Some(Event::MouseDown(MouseButton::Middle))
        );
        assert_eq!(
            translator.translate(NativeInput::ButtonPress { button: 4 }, &ATOMS),
            None
        );
        assert_eq!(
            translator.translate(NativeInput::ButtonRelease { button: 5 }, &ATOMS),
            None
        );
    }

    #[test_log::test]
    fn first_motion_has_zero_delta_then_deltas_accumulate() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(motion(10, 20, HeldButtons::empty()), &ATOMS),
            Some(Event::MouseMoved {
                delta: (0.0, 0.0),
                absolute: (10.0, 20.0),
                window: Some(WindowId(0x600001)),
            })
        );
        assert_eq!(
            translator.translate(motion(13, 18, HeldButtons::empty()), &ATOMS),
            Some(Event::MouseMoved {
                delta: (3.0, -2.0),
                absolute: (13.0, 18.0),
                window: Some(WindowId(0x600001)),
            })
        );
    }

    #[test_log::test]
    fn motion_with_a_held_button_is_a_drag() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(motion(1, 1, HeldButtons::RIGHT), &ATOMS),
            Some(Event::MouseDragged(MouseButton::Right))
        );
        assert_eq!(
            translator.translate(motion(2, 2, HeldButtons::RIGHT | HeldButtons::LEFT), &ATOMS),
            Some(Event::MouseDragged(MouseButton::Left))
        );
        // Drags still update the position used for the next delta.
        assert_eq!(
            translator.translate(motion(5, 7, HeldButtons::empty()), &ATOMS),
            Some(Event::MouseMoved {
                delta: (3.0, 5.0),
                absolute: (5.0, 7.0),
                window: Some(WindowId(0x600001)),
            })
        );
    }

    #[test_log::test]
    fn held_buttons_follow_the_core_state_mask() {
        let held = HeldButtons::from_key_but_mask(
            x::KeyButMask::BUTTON2 | x::KeyButMask::SHIFT | x::KeyButMask::BUTTON3,
        );
        assert_eq!(held, HeldButtons::MIDDLE | HeldButtons::RIGHT);
        assert_eq!(held.primary(), Some(MouseButton::Right));
        assert_eq!(HeldButtons::MIDDLE.primary(), Some(MouseButton::Middle));
        assert_eq!(HeldButtons::empty().primary(), None);
    }

    #[test_log::test]
    fn delete_window_request_closes_once() {
        let mut translator = EventTranslator::new();
        let request = NativeInput::ClientMessage {
            window: 0x600001,
            message_type: ATOMS.protocols,
            data0: ATOMS.delete_window,
        };
        assert_eq!(
            translator.translate(request, &ATOMS),
            Some(Event::WindowClosed(WindowId(0x600001)))
        );
        // The application destroys the window in response; no second close.
        assert_eq!(
            translator.translate(NativeInput::Destroyed { window: 0x600001 }, &ATOMS),
            None
        );
    }

    #[test_log::test]
    fn unrequested_destroy_reports_a_close() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(NativeInput::Destroyed { window: 0x600002 }, &ATOMS),
            Some(Event::WindowClosed(WindowId(0x600002)))
        );
    }

    #[test_log::test]
    fn other_client_messages_and_inputs_are_dropped() {
        let mut translator = EventTranslator::new();
        let unrelated = NativeInput::ClientMessage {
            window: 0x600001,
            message_type: 999,
            data0: ATOMS.delete_window,
        };
        assert_eq!(translator.translate(unrelated, &ATOMS), None);
        let ping = NativeInput::ClientMessage {
            window: 0x600001,
            message_type: ATOMS.protocols,
            data0: 777,
        };
        assert_eq!(translator.translate(ping, &ATOMS), None);
        assert_eq!(translator.translate(NativeInput::Other, &ATOMS), None);
    }

    #[test_log::test]
    fn released_window_destroy_is_not_a_close() {
        let mut translator = EventTranslator::new();
        translator.window_released(0x600003);
        assert_eq!(
            translator.translate(NativeInput::Destroyed { window: 0x600003 }, &ATOMS),
            None
        );
        // The mark is consumed; a later window reusing the id closes normally.
        assert_eq!(
            translator.translate(NativeInput::Destroyed { window: 0x600003 }, &ATOMS),
            Some(Event::WindowClosed(WindowId(0x600003)))
        );
    }

    #[test_log::test]
    fn motion_deltas_are_tracked_per_window() {
        let mut translator = EventTranslator::new();
        translator.translate(motion(10, 10, HeldButtons::empty()), &ATOMS);
        let other = NativeInput::Motion {
            window: 0x700001,
            x: 200,
            y: 150,
            held: HeldButtons::empty(),
        };
        assert_eq!(
            translator.translate(other, &ATOMS),
            Some(Event::MouseMoved {
                delta: (0.0, 0.0),
                absolute: (200.0, 150.0),
                window: Some(WindowId(0x700001)),
            })
        );
        assert_eq!(
            translator.translate(motion(12, 9, HeldButtons::empty()), &ATOMS),
            Some(Event::MouseMoved {
                delta: (2.0, -1.0),
                absolute: (12.0, 9.0),
                window: Some(WindowId(0x600001)),
            })
        );
    }

    fn window(id: u32) -> x::Window {
        // SAFETY: the id is only compared, never sent to a server.
        unsafe { x::Window::new(id) }
    }

    fn key_press(key_code: u8) -> xcb::Event {
        xcb::Event::X(x::Event::KeyPress(x::KeyPressEvent::new(
            key_code,
            x::CURRENT_TIME,
            window(0x100),
            window(0x600001),
            x::Window::none(),
            0,
            0,
            0,
            0,
            x::KeyButMask::empty(),
            true,
        )))
    }

    fn expose() -> xcb::Event {
        xcb::Event::X(x::Event::Expose(x::ExposeEvent::new(
            window(0x600001),
            0,
            0,
            640,
            480,
            0,
        )))
    }

    #[test_log::test]
    fn decode_reads_key_and_button_details() {
        assert_eq!(decode(&key_press(38)), NativeInput::KeyPress { key_code: 38 });

        let release = xcb::Event::X(x::Event::ButtonRelease(x::ButtonReleaseEvent::new(
            3,
            x::CURRENT_TIME,
            window(0x100),
            window(0x600001),
            x::Window::none(),
            0,
            0,
            5,
            5,
            x::KeyButMask::BUTTON3,
            true,
        )));
        assert_eq!(decode(&release), NativeInput::ButtonRelease { button: 3 });
    }

    #[test_log::test]
    fn decode_reads_motion_position_and_held_buttons() {
        let motion = xcb::Event::X(x::Event::MotionNotify(x::MotionNotifyEvent::new(
            x::Motion::Normal,
            x::CURRENT_TIME,
            window(0x100),
            window(0x600001),
            x::Window::none(),
            110,
            220,
            10,
            20,
            x::KeyButMask::BUTTON1 | x::KeyButMask::CONTROL,
            true,
        )));
        assert_eq!(
            decode(&motion),
            NativeInput::Motion {
                window: 0x600001,
                x: 10,
                y: 20,
                held: HeldButtons::LEFT,
            }
        );
    }

    #[test_log::test]
    fn decode_reads_close_requests_and_destroys() {
        let request = xcb::Event::X(x::Event::ClientMessage(x::ClientMessageEvent::new(
            window(0x600001),
            // SAFETY: compared only.
            unsafe { x::Atom::new(ATOMS.protocols) },
            x::ClientMessageData::Data32([ATOMS.delete_window, 0, 0, 0, 0]),
        )));
        assert_eq!(
            decode(&request),
            NativeInput::ClientMessage {
                window: 0x600001,
                message_type: ATOMS.protocols,
                data0: ATOMS.delete_window,
            }
        );

        let destroyed = xcb::Event::X(x::Event::DestroyNotify(x::DestroyNotifyEvent::new(
            window(0x600001),
            window(0x600001),
        )));
        assert_eq!(decode(&destroyed), NativeInput::Destroyed { window: 0x600001 });
        assert_eq!(decode(&expose()), NativeInput::Other);
    }

    type Polled = std::result::Result<Option<xcb::Event>, PollError>;

    fn feed(results: Vec<Polled>) -> impl FnMut() -> Polled {
        let mut results: VecDeque<Polled> = results.into();
        move || results.pop_front().unwrap_or(Ok(None))
    }

    #[test_log::test]
    fn read_loop_skips_untranslated_events_and_x_errors() {
        let mut translator = EventTranslator::new();
        let mut next = feed(vec![
            Err(PollError::Protocol("BadValue".into())),
            Ok(Some(expose())),
            Ok(Some(key_press(9))),
            Ok(Some(key_press(10))),
        ]);
        assert_eq!(
            next_translated(&mut next, &mut translator, &ATOMS),
            Ok(Some(Event::KeyDown { key_code: 9 }))
        );
        assert_eq!(
            next_translated(&mut next, &mut translator, &ATOMS),
            Ok(Some(Event::KeyDown { key_code: 10 }))
        );
        assert_eq!(next_translated(&mut next, &mut translator, &ATOMS), Ok(None));
    }

    #[test_log::test]
    fn read_loop_stops_on_an_empty_queue() {
        let mut translator = EventTranslator::new();
        let mut next = feed(vec![Ok(Some(expose())), Ok(None), Ok(Some(key_press(9)))]);
        assert_eq!(next_translated(&mut next, &mut translator, &ATOMS), Ok(None));
        assert_eq!(
            next_translated(&mut next, &mut translator, &ATOMS),
            Ok(Some(Event::KeyDown { key_code: 9 }))
        );
    }

    #[test_log::test]
    fn read_loop_returns_connection_failures() {
        let mut translator = EventTranslator::new();
        let mut next = feed(vec![
            Err(PollError::Fatal(Error::CannotConnect)),
            Ok(Some(key_press(9))),
        ]);
        assert_eq!(
            next_translated(&mut next, &mut translator, &ATOMS),
            Err(Error::CannotConnect)
        );
    }

    #[test_log::test]
    fn connection_errors_are_fatal_for_polling() {
        assert_eq!(
            PollError::from(xcb::Error::Connection(xcb::ConnError::Connection)),
            PollError::Fatal(Error::CannotConnect)
        );
    }
}
