//! ServerCoordinator: the cursor-ownership state machine.
//!
//! This is the heart of the master application. It owns the [`LayoutManager`],
//! decides when the local cursor has reached a screen edge, and drives the
//! handshake/activation/deactivation protocol described by the peer wire
//! format. It depends only on the [`Broadcast`] and [`PlatformIo`] traits;
//! infrastructure supplies the concrete session table and OS cursor control at
//! construction time — a direct generalization of the trait-injection shape
//! `RouteInputUseCase` used for its `InputTransmitter`/`CursorController`
//! collaborators.

use std::time::Instant;

use async_trait::async_trait;
use konflikt_core::domain::layout::InstanceId;
use konflikt_core::protocol::envelope::now_epoch_millis;
use konflikt_core::protocol::messages::{InputEventData, InputEventType, Message, Position};
use konflikt_core::protocol::session::DEACTIVATION_DEBOUNCE;
use konflikt_core::{LayoutManager, Rect, Side};
use thiserror::Error;

/// How close, in pixels, the cursor must be to a screen boundary before it
/// counts as "at the edge" for transition purposes. Distinct from
/// [`konflikt_core::EDGE_TOLERANCE`], which governs when two screens are
/// considered adjacent in the first place.
const EDGE_THRESHOLD: i32 = 1;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("server screen is not yet installed in the layout")]
    NoServerScreen,
}

/// Sends peer-protocol messages to connected sessions. Implemented by a thin
/// adapter over the Server Endpoint's per-session sender table; a failure to
/// reach one peer must never affect delivery to the others, so this trait
/// reports nothing back to the caller — the adapter logs failures itself.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Sends `message` to every session currently in `Ready`.
    async fn broadcast(&self, message: Message);
    /// Sends `message` to exactly one session, identified by its peer
    /// instance id. A session that has disconnected or was never known is
    /// silently skipped.
    async fn send_to(&self, instance_id: &str, message: Message);
}

/// The platform capabilities the Coordinator needs from the OS input layer:
/// control over the local cursor's visibility. Mirrors the shape of the
/// `InputSource` contract already used for input capture.
pub trait PlatformIo: Send + Sync {
    fn hide_cursor(&self);
    fn show_cursor(&self);
    fn is_cursor_visible(&self) -> bool;
}

/// Classifies `(x, y)` against `rect`'s four edges, within [`EDGE_THRESHOLD`]
/// pixels. Returns `None` if the point is not near any edge.
fn classify_edge(x: i32, y: i32, rect: &Rect) -> Option<Side> {
    if x <= rect.x + EDGE_THRESHOLD - 1 {
        Some(Side::Left)
    } else if x >= rect.right() - EDGE_THRESHOLD {
        Some(Side::Right)
    } else if y <= rect.y + EDGE_THRESHOLD - 1 {
        Some(Side::Top)
    } else if y >= rect.bottom() - EDGE_THRESHOLD {
        Some(Side::Bottom)
    } else {
        None
    }
}

/// The server-side half of the cursor-ownership state machine.
pub struct ServerCoordinator {
    instance_id: InstanceId,
    machine_id: String,
    layout: LayoutManager,
    activated_client_id: Option<InstanceId>,
    virtual_cursor: Option<(i32, i32)>,
    active_remote_screen: Option<Rect>,
    last_cursor_position: (i32, i32),
    last_deactivation_at: Option<Instant>,
    broadcast: std::sync::Arc<dyn Broadcast>,
    platform: std::sync::Arc<dyn PlatformIo>,
}

impl ServerCoordinator {
    pub fn new(
        instance_id: InstanceId,
        machine_id: String,
        layout: LayoutManager,
        broadcast: std::sync::Arc<dyn Broadcast>,
        platform: std::sync::Arc<dyn PlatformIo>,
    ) -> Self {
        Self {
            instance_id,
            machine_id,
            layout,
            activated_client_id: None,
            virtual_cursor: None,
            active_remote_screen: None,
            last_cursor_position: (0, 0),
            last_deactivation_at: None,
            broadcast,
            platform,
        }
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutManager {
        &mut self.layout
    }

    /// `true` while the local machine is the sink for input (no remote
    /// client is currently activated).
    pub fn is_active(&self) -> bool {
        self.virtual_cursor.is_none()
    }

    pub fn activated_client_id(&self) -> Option<&str> {
        self.activated_client_id.as_deref()
    }

    pub fn virtual_cursor(&self) -> Option<(i32, i32)> {
        self.virtual_cursor
    }

    fn server_rect(&self) -> Result<Rect, CoordinatorError> {
        self.layout
            .get(&self.instance_id)
            .map(|e| e.rect())
            .ok_or(CoordinatorError::NoServerScreen)
    }

    /// Handles a mouse-move event captured on the local machine.
    pub async fn handle_local_mouse_move(
        &mut self,
        x: i32,
        y: i32,
        modifiers: u32,
        buttons: u32,
    ) -> Result<(), CoordinatorError> {
        let (last_x, last_y) = self.last_cursor_position;
        let (dx, dy) = (x - last_x, y - last_y);
        self.last_cursor_position = (x, y);

        if let Some((vx, vy)) = self.virtual_cursor {
            let screen = self.active_remote_screen.expect("set alongside virtual_cursor");
            let new_x = konflikt_core::domain::geometry::clamp_into(vx + dx, screen.width);
            let new_y = konflikt_core::domain::geometry::clamp_into(vy + dy, screen.height);
            self.virtual_cursor = Some((new_x, new_y));
            self.send_input_event(
                InputEventType::MouseMove,
                new_x,
                new_y,
                Some(dx),
                Some(dy),
                modifiers,
                buttons,
                None,
                None,
                None,
            )
            .await;
            return Ok(());
        }

        self.check_screen_transition(x, y, dx, dy, modifiers, buttons).await
    }

    async fn check_screen_transition(
        &mut self,
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
        modifiers: u32,
        buttons: u32,
    ) -> Result<(), CoordinatorError> {
        let server_rect = self.server_rect()?;
        let edge = classify_edge(x, y, &server_rect);

        let Some(side) = edge else {
            self.activated_client_id = None;
            self.send_input_event(
                InputEventType::MouseMove,
                x,
                y,
                Some(dx),
                Some(dy),
                modifiers,
                buttons,
                None,
                None,
                None,
            )
            .await;
            return Ok(());
        };

        match self.layout.transition_target_at_edge(&self.instance_id, side, x, y) {
            Some(target) => {
                let target_id = self.layout.instance_id_at(target.instance_id_index).to_string();
                if self.activated_client_id.as_deref() != Some(target_id.as_str()) {
                    self.activate_client(target.instance_id_index, target.new_x, target.new_y)
                        .await;
                }
                // else: already activated for this edge — swallow the event.
            }
            None => {
                self.activated_client_id = None;
                self.send_input_event(
                    InputEventType::MouseMove,
                    x,
                    y,
                    Some(dx),
                    Some(dy),
                    modifiers,
                    buttons,
                    None,
                    None,
                    None,
                )
                .await;
            }
        }
        Ok(())
    }

    async fn activate_client(&mut self, target_idx: usize, new_x: i32, new_y: i32) {
        let target_id = self.layout.instance_id_at(target_idx).to_string();
        let target = self.layout.screens()[target_idx].clone();

        // Set first, before any await, so a concurrently-arriving move sees
        // the activation immediately rather than racing the broadcast.
        self.activated_client_id = Some(target_id.clone());

        self.broadcast
            .broadcast(Message::ActivateClient {
                target_instance_id: target_id,
                cursor_x: new_x,
                cursor_y: new_y,
                timestamp: now_epoch_millis(),
            })
            .await;

        self.virtual_cursor = Some((new_x, new_y));
        self.active_remote_screen = Some(Rect::new(0, 0, target.width, target.height));
        self.platform.hide_cursor();
    }

    /// Handles a local key press/release or mouse button press/release.
    #[allow(clippy::too_many_arguments)]
    pub async fn handle_local_input(
        &mut self,
        event_type: InputEventType,
        modifiers: u32,
        buttons: u32,
        keycode: Option<u16>,
        text: Option<String>,
        button: Option<String>,
    ) {
        let (x, y) = self.virtual_cursor.unwrap_or(self.last_cursor_position);
        self.send_input_event(event_type, x, y, None, None, modifiers, buttons, keycode, text, button)
            .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_input_event(
        &self,
        event_type: InputEventType,
        x: i32,
        y: i32,
        dx: Option<i32>,
        dy: Option<i32>,
        keyboard_modifiers: u32,
        mouse_buttons: u32,
        keycode: Option<u16>,
        text: Option<String>,
        button: Option<String>,
    ) {
        let event_data = InputEventData {
            x,
            y,
            dx,
            dy,
            timestamp: now_epoch_millis(),
            keyboard_modifiers,
            mouse_buttons,
            keycode,
            text,
            button,
        };
        self.broadcast
            .broadcast(Message::InputEvent {
                source_instance_id: self.instance_id.clone(),
                source_display_id: self.instance_id.clone(),
                source_machine_id: self.machine_id.clone(),
                event_type,
                event_data,
            })
            .await;
    }

    /// Handles a `deactivation_request` from a client, debounced to at most
    /// one acceptance per [`DEACTIVATION_DEBOUNCE`] window.
    pub async fn handle_deactivation_request(&mut self, instance_id: &str, now: Instant) {
        if self.activated_client_id.as_deref() != Some(instance_id) {
            return;
        }
        if let Some(last) = self.last_deactivation_at {
            if now.duration_since(last) < DEACTIVATION_DEBOUNCE {
                return;
            }
        }

        let ex_active = self.activated_client_id.take().expect("checked above");
        self.virtual_cursor = None;
        self.active_remote_screen = None;
        self.last_deactivation_at = Some(now);
        self.platform.show_cursor();

        let (x, y) = self.last_cursor_position;
        self.broadcast
            .send_to(
                &ex_active,
                Message::ActivateClient {
                    target_instance_id: self.instance_id.clone(),
                    cursor_x: x,
                    cursor_y: y,
                    timestamp: now_epoch_millis(),
                },
            )
            .await;
    }

    /// Handles a `client_registration` message: assigns the client a place
    /// in the layout, sends it a targeted `layout_assignment`, and
    /// broadcasts a `layout_update` to everyone.
    pub async fn handle_client_registration(
        &mut self,
        instance_id: InstanceId,
        display_name: String,
        machine_id: String,
        screen_width: u32,
        screen_height: u32,
    ) {
        let entry = self
            .layout
            .register_client(instance_id.clone(), display_name, machine_id, screen_width, screen_height)
            .clone();
        let position = Position { x: entry.x, y: entry.y };
        let adjacency = self.layout.adjacency_ids_for(&instance_id);
        let full_layout = self.layout.screens().to_vec();

        self.broadcast
            .send_to(&instance_id, Message::LayoutAssignment { position, adjacency, full_layout })
            .await;
        self.broadcast_layout_update().await;
    }

    async fn broadcast_layout_update(&self) {
        self.broadcast
            .broadcast(Message::LayoutUpdate {
                screens: self.layout.screens().to_vec(),
                timestamp: now_epoch_millis(),
            })
            .await;
    }

    /// Handles the loss of a client's session: marks it offline and, if it
    /// was the activated client, restores local cursor ownership as if it
    /// had sent a `deactivation_request` (it cannot send one anymore).
    pub async fn handle_client_disconnect(&mut self, instance_id: &str) {
        self.layout.unregister_client(instance_id);
        if self.activated_client_id.as_deref() == Some(instance_id) {
            self.activated_client_id = None;
            self.virtual_cursor = None;
            self.active_remote_screen = None;
            self.platform.show_cursor();
        }
        self.broadcast_layout_update().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konflikt_core::protocol::messages::mouse_buttons;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBroadcast {
        broadcasts: Mutex<Vec<Message>>,
        targeted: Mutex<Vec<(String, Message)>>,
    }

    #[async_trait]
    impl Broadcast for RecordingBroadcast {
        async fn broadcast(&self, message: Message) {
            self.broadcasts.lock().unwrap().push(message);
        }
        async fn send_to(&self, instance_id: &str, message: Message) {
            self.targeted.lock().unwrap().push((instance_id.to_string(), message));
        }
    }

    #[derive(Default)]
    struct RecordingPlatform {
        visible: Mutex<bool>,
        hide_calls: Mutex<u32>,
        show_calls: Mutex<u32>,
    }

    impl RecordingPlatform {
        fn new() -> Self {
            Self { visible: Mutex::new(true), ..Default::default() }
        }
    }

    impl PlatformIo for RecordingPlatform {
        fn hide_cursor(&self) {
            *self.visible.lock().unwrap() = false;
            *self.hide_calls.lock().unwrap() += 1;
        }
        fn show_cursor(&self) {
            *self.visible.lock().unwrap() = true;
            *self.show_calls.lock().unwrap() += 1;
        }
        fn is_cursor_visible(&self) -> bool {
            *self.visible.lock().unwrap()
        }
    }

    fn layout_with_client_to_right() -> LayoutManager {
        let mut layout = LayoutManager::new();
        layout.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        layout.register_client("cli".into(), "Client".into(), "m1".into(), 1920, 1080);
        layout
    }

    fn coordinator() -> (ServerCoordinator, std::sync::Arc<RecordingBroadcast>, std::sync::Arc<RecordingPlatform>)
    {
        let broadcast = std::sync::Arc::new(RecordingBroadcast::default());
        let platform = std::sync::Arc::new(RecordingPlatform::new());
        let coordinator = ServerCoordinator::new(
            "srv".into(),
            "m0".into(),
            layout_with_client_to_right(),
            broadcast.clone() as std::sync::Arc<dyn Broadcast>,
            platform.clone() as std::sync::Arc<dyn PlatformIo>,
        );
        (coordinator, broadcast, platform)
    }

    #[tokio::test]
    async fn reaching_the_right_edge_activates_the_neighbor() {
        let (mut c, broadcast, platform) = coordinator();
        c.handle_local_mouse_move(960, 540, 0, 0).await.unwrap();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();

        assert_eq!(c.activated_client_id(), Some("cli"));
        assert!(!platform.is_cursor_visible());
        assert!(!c.is_active());

        let broadcasts = broadcast.broadcasts.lock().unwrap();
        assert!(matches!(
            broadcasts.last(),
            Some(Message::ActivateClient { target_instance_id, cursor_x: 1, cursor_y: 540, .. })
                if target_instance_id == "cli"
        ));
    }

    #[tokio::test]
    async fn once_activated_further_deltas_move_the_virtual_cursor_not_reactivate() {
        let (mut c, broadcast, _platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        let activations_before =
            broadcast.broadcasts.lock().unwrap().iter().filter(|m| matches!(m, Message::ActivateClient { .. })).count();

        // Perturb back and forth near the boundary — must not re-activate.
        c.handle_local_mouse_move(1917, 540, 0, 0).await.unwrap();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        c.handle_local_mouse_move(1917, 540, 0, 0).await.unwrap();

        let activations_after =
            broadcast.broadcasts.lock().unwrap().iter().filter(|m| matches!(m, Message::ActivateClient { .. })).count();
        assert_eq!(activations_before, activations_after);
    }

    #[tokio::test]
    async fn virtual_cursor_clamps_to_the_target_screen() {
        let (mut c, _broadcast, _platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        // Push far past the target's bounds.
        c.handle_local_mouse_move(1919 + 5000, 540, 0, 0).await.unwrap();
        let (vx, _) = c.virtual_cursor().unwrap();
        assert_eq!(vx, 1919); // clamp_into(width=1920) -> max index 1919
    }

    #[tokio::test]
    async fn deactivation_request_restores_local_cursor_ownership() {
        let (mut c, broadcast, platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        assert!(!platform.is_cursor_visible());

        c.handle_deactivation_request("cli", Instant::now()).await;

        assert!(c.is_active());
        assert!(platform.is_cursor_visible());
        assert!(c.activated_client_id().is_none());

        let targeted = broadcast.targeted.lock().unwrap();
        assert!(matches!(
            targeted.last(),
            Some((id, Message::ActivateClient { target_instance_id, .. }))
                if id == "cli" && target_instance_id == "srv"
        ));
    }

    #[tokio::test]
    async fn deactivation_from_a_non_active_client_is_ignored() {
        let (mut c, _broadcast, platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        c.handle_deactivation_request("someone-else", Instant::now()).await;
        assert!(!platform.is_cursor_visible());
        assert_eq!(c.activated_client_id(), Some("cli"));
    }

    #[tokio::test]
    async fn a_second_deactivation_within_the_debounce_window_is_ignored() {
        let (mut c, broadcast, _platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        let now = Instant::now();
        c.handle_deactivation_request("cli", now).await;

        // Re-activate and immediately try to deactivate again within the window.
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        let targeted_before = broadcast.targeted.lock().unwrap().len();
        c.handle_deactivation_request("cli", now + std::time::Duration::from_millis(10)).await;
        let targeted_after = broadcast.targeted.lock().unwrap().len();
        assert_eq!(targeted_before, targeted_after);
    }

    #[tokio::test]
    async fn client_registration_sends_targeted_assignment_and_broadcasts_update() {
        let broadcast = std::sync::Arc::new(RecordingBroadcast::default());
        let platform = std::sync::Arc::new(RecordingPlatform::new());
        let mut layout = LayoutManager::new();
        layout.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        let mut c = ServerCoordinator::new(
            "srv".into(),
            "m0".into(),
            layout,
            broadcast.clone() as std::sync::Arc<dyn Broadcast>,
            platform.clone() as std::sync::Arc<dyn PlatformIo>,
        );

        c.handle_client_registration("cli".into(), "Client".into(), "m1".into(), 1920, 1080).await;

        let targeted = broadcast.targeted.lock().unwrap();
        assert_eq!(targeted.len(), 1);
        assert_eq!(targeted[0].0, "cli");
        assert!(matches!(targeted[0].1, Message::LayoutAssignment { .. }));

        let broadcasts = broadcast.broadcasts.lock().unwrap();
        assert!(matches!(broadcasts.last(), Some(Message::LayoutUpdate { .. })));
    }

    #[tokio::test]
    async fn disconnecting_the_activated_client_restores_cursor_ownership() {
        let (mut c, _broadcast, platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();
        c.handle_client_disconnect("cli").await;

        assert!(c.is_active());
        assert!(platform.is_cursor_visible());
        assert!(!c.layout().get("cli").unwrap().online);
    }

    #[tokio::test]
    async fn local_key_press_forwards_virtual_coordinates_while_a_client_is_active() {
        let (mut c, broadcast, _platform) = coordinator();
        c.handle_local_mouse_move(1919, 540, 0, 0).await.unwrap();

        c.handle_local_input(InputEventType::KeyPress, 0, 0, Some(4), None, None).await;

        let broadcasts = broadcast.broadcasts.lock().unwrap();
        match broadcasts.last() {
            Some(Message::InputEvent { event_data, .. }) => {
                assert_eq!((event_data.x, event_data.y), (1, 540));
            }
            other => panic!("expected InputEvent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_mouse_press_carries_the_button_bitmask() {
        let (mut c, broadcast, _platform) = coordinator();
        c.handle_local_input(
            InputEventType::MousePress,
            0,
            mouse_buttons::LEFT,
            None,
            None,
            Some("left".to_string()),
        )
        .await;

        let broadcasts = broadcast.broadcasts.lock().unwrap();
        match broadcasts.last() {
            Some(Message::InputEvent { event_data, .. }) => {
                assert_eq!(event_data.mouse_buttons, mouse_buttons::LEFT);
            }
            other => panic!("expected InputEvent, got {other:?}"),
        }
    }
}
