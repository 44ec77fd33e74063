// src/platform/tests.rs

use super::mock::MockPlatform;
use super::*;
use crate::error::Error;
use crate::types::MouseButton;

#[test_log::test]
fn event_queue_is_first_in_first_out() {
    let mut queue = EventQueue::new();
    assert!(queue.is_empty());
    queue.push(Event::KeyDown { key_code: 38 });
    queue.push(Event::KeyUp { key_code: 38 });
    queue.push(Event::Quit);
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop(), Some(Event::KeyDown { key_code: 38 }));
    assert_eq!(queue.pop(), Some(Event::KeyUp { key_code: 38 }));
    assert_eq!(queue.pop(), Some(Event::Quit));
    assert_eq!(queue.pop(), None);
}

#[test_log::test]
fn sent_events_come_back_from_poll() {
    let mut platform = MockPlatform::new();
    platform.send_event(Event::Quit);
    assert_eq!(platform.poll_event().unwrap(), Some(Event::Quit));
    assert_eq!(platform.poll_event().unwrap(), None);
}

#[test_log::test]
fn sent_events_precede_native_events_collected_later() {
    let mut platform = MockPlatform::new();
    platform.send_event(Event::MouseDown(MouseButton::Left));
    platform.push_native_event(Event::MouseUp(MouseButton::Left));
    assert_eq!(
        platform.poll_event().unwrap(),
        Some(Event::MouseDown(MouseButton::Left))
    );
    assert_eq!(
        platform.poll_event().unwrap(),
        Some(Event::MouseUp(MouseButton::Left))
    );
}

#[test_log::test]
fn windows_get_distinct_ids_and_keep_their_properties() {
    let mut platform = MockPlatform::new();
    let mut first = platform
        .create_window(Size::new(320.0, 240.0), "first")
        .unwrap();
    let second = platform
        .create_window(Size::new(100.0, 100.0), "second")
        .unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(first.title(), "first");
    assert_eq!(first.size().unwrap(), Size::new(320.0, 240.0));

    first.set_title("renamed").unwrap();
    first.set_size(Size::new(800.0, 600.0)).unwrap();
    assert_eq!(first.title(), "renamed");
    assert_eq!(first.size().unwrap(), Size::new(800.0, 600.0));
}

#[test_log::test]
fn run_delivers_events_in_order_until_handler_breaks() {
    let mut platform = MockPlatform::new();
    platform.push_native_event(Event::KeyDown { key_code: 24 });
    platform.push_native_event(Event::KeyUp { key_code: 24 });
    platform.push_native_event(Event::Quit);
    platform.push_native_event(Event::KeyDown { key_code: 25 });

    let mut seen = Vec::new();
    run(&mut platform, Duration::ZERO, |event| {
        let stop = event.is_terminal();
        seen.push(event);
        if stop {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![
            Event::KeyDown { key_code: 24 },
            Event::KeyUp { key_code: 24 },
            Event::Quit,
        ]
    );
    // The event after Quit stays queued.
    assert_eq!(
        platform.poll_event().unwrap(),
        Some(Event::KeyDown { key_code: 25 })
    );
}

#[test_log::test]
fn run_polls_once_per_event() {
    let mut platform = MockPlatform::new();
    platform.send_event(Event::KeyDown { key_code: 9 });
    platform.send_event(Event::Quit);
    let mut calls = 0;
    run(&mut platform, Duration::from_millis(1), |event| {
        calls += 1;
        if event.is_terminal() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .unwrap();
    assert_eq!(calls, 2);
    assert_eq!(platform.poll_count(), 2);
}

#[test_log::test]
fn run_returns_native_errors() {
    let mut platform = MockPlatform::new();
    platform.fail_polls();
    let err = run(&mut platform, Duration::ZERO, |_| ControlFlow::Continue(())).unwrap_err();
    assert_eq!(err, Error::general("connection lost"));
}

#[test_log::test]
fn run_works_through_a_trait_object() {
    let mut platform = MockPlatform::new();
    platform.send_event(Event::WindowClosed(WindowId(1)));
    let dynamic: &mut dyn Platform = &mut platform;
    let mut closed = None;
    run(dynamic, Duration::ZERO, |event| {
        if let Event::WindowClosed(id) = event {
            closed = Some(id);
        }
        ControlFlow::Break(())
    })
    .unwrap();
    assert_eq!(closed, Some(WindowId(1)));
}
