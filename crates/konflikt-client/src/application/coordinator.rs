//! ClientCoordinator: the client-side half of the cursor-ownership state
//! machine.
//!
//! Mirrors the shape of `konflikt-server`'s `ServerCoordinator` — a pure
//! state machine driven by one event at a time, with all OS interaction
//! pushed behind the injected [`EmulateInputUseCase`]/[`PlatformInputEmulator`]
//! collaborator. The only output this type produces directly is the
//! occasional outbound [`Message`] the caller is responsible for sending;
//! everything else happens as a side effect through the emulator.

use konflikt_core::domain::layout::InstanceId;
use konflikt_core::protocol::envelope::now_epoch_millis;
use konflikt_core::protocol::messages::{InputEventData, InputEventType, Message};

use crate::application::emulate_input::EmulateInputUseCase;

/// How close to the left edge (in pixels) the real cursor position must
/// land, after executing an incoming leftward `mouseMove`, to count as
/// "at the boundary" and trigger a `deactivation_request`.
const EDGE_RETURN_THRESHOLD: i32 = 1;

/// Minimum time between two accepted deactivation requests, absorbing
/// jitter at the boundary the same way the server debounces acceptance.
const DEACTIVATION_DEBOUNCE: std::time::Duration = konflikt_core::protocol::session::DEACTIVATION_DEBOUNCE;

/// The client-side cursor-ownership state machine.
pub struct ClientCoordinator {
    instance_id: InstanceId,
    is_active: bool,
    emulate_input: EmulateInputUseCase,
    last_deactivation_request_at: Option<std::time::Instant>,
}

impl ClientCoordinator {
    pub fn new(instance_id: InstanceId, emulate_input: EmulateInputUseCase) -> Self {
        Self { instance_id, is_active: false, emulate_input, last_deactivation_request_at: None }
    }

    /// `true` while this client owns local input (the coordinator has not
    /// activated it as the forwarding target).
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Handles an `activate_client` message. Returns `true` if the target
    /// was this instance (the caller may want to log the activation).
    pub fn handle_activate_client(&mut self, target_instance_id: &str, cursor_x: i32, cursor_y: i32) -> bool {
        if target_instance_id == self.instance_id {
            self.is_active = true;
            if let Err(e) = self.emulate_input.handle_input_event(
                InputEventType::MouseMove,
                &InputEventData {
                    x: cursor_x,
                    y: cursor_y,
                    dx: None,
                    dy: None,
                    timestamp: now_epoch_millis(),
                    keyboard_modifiers: 0,
                    mouse_buttons: 0,
                    keycode: None,
                    text: None,
                    button: None,
                },
            ) {
                tracing::warn!(error = %e, "failed to warp the cursor on activation");
            }
            true
        } else {
            self.is_active = false;
            false
        }
    }

    /// Handles an `input_event` message, executing it via the platform
    /// emulator unless it originated from this instance. Returns a
    /// `deactivation_request` to send when the event was a leftward
    /// `mouseMove` that landed the real cursor at the left edge.
    pub fn handle_input_event(
        &mut self,
        source_instance_id: &str,
        event_type: InputEventType,
        data: &InputEventData,
    ) -> Option<Message> {
        if source_instance_id == self.instance_id {
            return None;
        }

        if let Err(e) = self.emulate_input.handle_input_event(event_type, data) {
            tracing::warn!(error = %e, "failed to execute forwarded input event");
            return None;
        }

        if event_type != InputEventType::MouseMove {
            return None;
        }
        let incoming_dx = data.dx.unwrap_or(0);
        if incoming_dx >= 0 {
            return None;
        }

        let real_x = match self.emulate_input_cursor_position() {
            Ok((x, _)) => x,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read back cursor position");
                return None;
            }
        };
        if real_x > EDGE_RETURN_THRESHOLD {
            return None;
        }

        let now = std::time::Instant::now();
        if let Some(last) = self.last_deactivation_request_at {
            if now.duration_since(last) < DEACTIVATION_DEBOUNCE {
                return None;
            }
        }
        self.last_deactivation_request_at = Some(now);

        Some(Message::DeactivationRequest { instance_id: self.instance_id.clone(), timestamp: now_epoch_millis() })
    }

    fn emulate_input_cursor_position(&self) -> Result<(i32, i32), crate::application::emulate_input::EmulationError> {
        self.emulate_input.cursor_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::emulate_input::{EmulationError, MouseButton, PlatformInputEmulator};
    use konflikt_core::keymap::hid::HidKeyCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEmulator {
        mouse_moves: Mutex<Vec<(i32, i32)>>,
        reported_position: Mutex<(i32, i32)>,
    }

    impl PlatformInputEmulator for RecordingEmulator {
        fn emit_key_press(&self, _key: HidKeyCode) -> Result<(), EmulationError> {
            Ok(())
        }
        fn emit_key_release(&self, _key: HidKeyCode) -> Result<(), EmulationError> {
            Ok(())
        }
        fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
            self.mouse_moves.lock().unwrap().push((x, y));
            *self.reported_position.lock().unwrap() = (x, y);
            Ok(())
        }
        fn emit_mouse_press(&self, _button: MouseButton) -> Result<(), EmulationError> {
            Ok(())
        }
        fn emit_mouse_release(&self, _button: MouseButton) -> Result<(), EmulationError> {
            Ok(())
        }
        fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
            Ok(*self.reported_position.lock().unwrap())
        }
    }

    fn coordinator() -> (ClientCoordinator, std::sync::Arc<RecordingEmulator>) {
        let emulator = std::sync::Arc::new(RecordingEmulator::default());
        let use_case = EmulateInputUseCase::new(emulator.clone() as std::sync::Arc<dyn PlatformInputEmulator>);
        (ClientCoordinator::new("client-1".into(), use_case), emulator)
    }

    fn move_event(x: i32, y: i32, dx: i32) -> InputEventData {
        InputEventData {
            x,
            y,
            dx: Some(dx),
            dy: Some(0),
            timestamp: 0,
            keyboard_modifiers: 0,
            mouse_buttons: 0,
            keycode: None,
            text: None,
            button: None,
        }
    }

    #[test]
    fn activate_client_targeting_self_sets_is_active_and_warps_cursor() {
        let (mut coord, emulator) = coordinator();
        let activated = coord.handle_activate_client("client-1", 500, 300);
        assert!(activated);
        assert!(coord.is_active());
        assert_eq!(*emulator.mouse_moves.lock().unwrap(), vec![(500, 300)]);
    }

    #[test]
    fn activate_client_targeting_another_instance_clears_is_active() {
        let (mut coord, _em) = coordinator();
        coord.handle_activate_client("client-1", 0, 0);
        let activated = coord.handle_activate_client("client-2", 0, 0);
        assert!(!activated);
        assert!(!coord.is_active());
    }

    #[test]
    fn input_event_sourced_from_self_is_ignored() {
        let (mut coord, emulator) = coordinator();
        let out = coord.handle_input_event("client-1", InputEventType::MouseMove, &move_event(0, 0, -5));
        assert!(out.is_none());
        assert!(emulator.mouse_moves.lock().unwrap().is_empty());
    }

    #[test]
    fn leftward_move_landing_at_the_edge_emits_a_deactivation_request() {
        let (mut coord, _em) = coordinator();
        let out = coord.handle_input_event("server", InputEventType::MouseMove, &move_event(1, 300, -5));
        match out {
            Some(Message::DeactivationRequest { instance_id, .. }) => assert_eq!(instance_id, "client-1"),
            other => panic!("expected a deactivation request, got {other:?}"),
        }
    }

    #[test]
    fn rightward_move_never_emits_a_deactivation_request() {
        let (mut coord, _em) = coordinator();
        let out = coord.handle_input_event("server", InputEventType::MouseMove, &move_event(1, 300, 5));
        assert!(out.is_none());
    }

    #[test]
    fn deactivation_requests_are_debounced() {
        let (mut coord, _em) = coordinator();
        let first = coord.handle_input_event("server", InputEventType::MouseMove, &move_event(0, 0, -5));
        assert!(first.is_some());
        let second = coord.handle_input_event("server", InputEventType::MouseMove, &move_event(0, 0, -5));
        assert!(second.is_none(), "second request within the debounce window must be suppressed");
    }

    #[test]
    fn key_press_event_is_forwarded_without_affecting_activation() {
        let (mut coord, _em) = coordinator();
        let data = InputEventData {
            x: 0,
            y: 0,
            dx: None,
            dy: None,
            timestamp: 0,
            keyboard_modifiers: 0,
            mouse_buttons: 0,
            keycode: Some(HidKeyCode::KeyA.as_u16()),
            text: None,
            button: None,
        };
        let out = coord.handle_input_event("server", InputEventType::KeyPress, &data);
        assert!(out.is_none());
    }
}
