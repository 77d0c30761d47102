//! The virtual screen layout: an ordered set of screens and the adjacency
//! relation derived from their positions.
//!
//! # What "derived, never stored" means (for beginners)
//!
//! Earlier KVM-over-IP implementations kept an explicit list of which screens
//! connect to which. That list has to be kept in sync by hand every time a
//! screen moves, which is its own source of bugs. Here adjacency is instead a
//! *query*: given the current rectangles, `adjacency_for` and
//! `transition_target_at_edge` recompute the answer from scratch every time.
//! There is nothing to go stale.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::geometry::{
    clamp_into, edges_touch, map_edge_position, ranges_overlap, Rect, Side,
};

/// Stable identifier for one instance (server or client) in the cluster.
pub type InstanceId = String;

/// One screen's place in the virtual desktop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenEntry {
    pub instance_id: InstanceId,
    pub display_name: String,
    pub machine_id: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_server: bool,
    #[serde(default)]
    pub online: bool,
}

impl ScreenEntry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// The four neighbors of a screen, one per side. `None` means no screen
/// touches that edge (or the neighbor is currently offline).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjacency {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub top: Option<usize>,
    pub bottom: Option<usize>,
}

/// Wire-friendly form of [`Adjacency`]: instance ids instead of indices,
/// suitable for embedding in a `layout_assignment` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacencyIds {
    pub left: Option<InstanceId>,
    pub right: Option<InstanceId>,
    pub top: Option<InstanceId>,
    pub bottom: Option<InstanceId>,
}

impl Adjacency {
    fn get(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }

    fn set(&mut self, side: Side, idx: usize) {
        match side {
            Side::Left => self.left = Some(idx),
            Side::Right => self.right = Some(idx),
            Side::Top => self.top = Some(idx),
            Side::Bottom => self.bottom = Some(idx),
        }
    }
}

/// The result of a successful edge transition: which screen the cursor moves
/// to, and where on that screen it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTarget {
    pub instance_id_index: usize,
    pub new_x: i32,
    pub new_y: i32,
}

/// On-disk representation of the layout, versioned for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutFile {
    pub version: u32,
    pub screens: Vec<ScreenEntry>,
}

impl Default for LayoutFile {
    fn default() -> Self {
        Self { version: 1, screens: Vec::new() }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("screen {0} would overlap an existing online screen")]
    Overlap(InstanceId),
    #[error("unknown instance id: {0}")]
    UnknownInstance(InstanceId),
    #[error("cannot remove the server screen")]
    CannotRemoveServer,
    #[error("cannot remove an online client screen")]
    ClientStillOnline,
}

/// The authoritative arrangement of every screen known to this process.
///
/// A single `LayoutManager` lives on the server; clients receive read-only
/// snapshots (`layout_assignment` / `layout_update`) and never mutate their
/// own copy directly.
#[derive(Debug, Clone, Default)]
pub struct LayoutManager {
    screens: Vec<ScreenEntry>,
    index: HashMap<InstanceId, usize>,
}

impl LayoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a manager from a previously persisted [`LayoutFile`]. All
    /// entries start `online = false`; real liveness comes from active
    /// sessions, never from disk.
    pub fn from_file(mut file: LayoutFile) -> Self {
        for screen in &mut file.screens {
            screen.online = false;
        }
        let mut manager = Self::default();
        for screen in file.screens {
            manager.index.insert(screen.instance_id.clone(), manager.screens.len());
            manager.screens.push(screen);
        }
        manager
    }

    pub fn to_file(&self) -> LayoutFile {
        LayoutFile { version: 1, screens: self.screens.clone() }
    }

    pub fn screens(&self) -> &[ScreenEntry] {
        &self.screens
    }

    pub fn get(&self, id: &str) -> Option<&ScreenEntry> {
        self.index.get(id).map(|&i| &self.screens[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ScreenEntry> {
        let idx = *self.index.get(id)?;
        Some(&mut self.screens[idx])
    }

    /// Installs or replaces the sole server entry at the coordinate origin.
    pub fn set_server_screen(
        &mut self,
        id: InstanceId,
        name: String,
        machine_id: String,
        width: u32,
        height: u32,
    ) {
        if let Some(existing) = self.get_mut(&id) {
            existing.display_name = name;
            existing.machine_id = machine_id;
            existing.width = width;
            existing.height = height;
            existing.is_server = true;
            existing.online = true;
            return;
        }
        self.index.insert(id.clone(), self.screens.len());
        self.screens.push(ScreenEntry {
            instance_id: id,
            display_name: name,
            machine_id,
            x: 0,
            y: 0,
            width,
            height,
            is_server: true,
            online: true,
        });
    }

    /// Registers a client, either reviving a known one or placing a new one
    /// via auto-arrange (to the right of the current rightmost screen).
    pub fn register_client(
        &mut self,
        id: InstanceId,
        name: String,
        machine_id: String,
        width: u32,
        height: u32,
    ) -> &ScreenEntry {
        if let Some(existing) = self.get_mut(&id) {
            existing.display_name = name;
            existing.machine_id = machine_id;
            existing.width = width;
            existing.height = height;
            existing.online = true;
            return self.get(&id).expect("just updated");
        }

        let max_right = self.screens.iter().map(|s| s.rect().right()).max().unwrap_or(0);
        self.index.insert(id.clone(), self.screens.len());
        self.screens.push(ScreenEntry {
            instance_id: id.clone(),
            display_name: name,
            machine_id,
            x: max_right,
            y: 0,
            width,
            height,
            is_server: false,
            online: true,
        });
        self.get(&id).expect("just inserted")
    }

    pub fn unregister_client(&mut self, id: &str) {
        if let Some(entry) = self.get_mut(id) {
            entry.online = false;
        }
    }

    pub fn remove_client(&mut self, id: &str) -> Result<(), LayoutError> {
        let entry = self.get(id).ok_or_else(|| LayoutError::UnknownInstance(id.to_string()))?;
        if entry.is_server {
            return Err(LayoutError::CannotRemoveServer);
        }
        if entry.online {
            return Err(LayoutError::ClientStillOnline);
        }
        let idx = self.index.remove(id).expect("checked above");
        self.screens.remove(idx);
        // Every index after the removed one shifts down by one.
        for v in self.index.values_mut() {
            if *v > idx {
                *v -= 1;
            }
        }
        Ok(())
    }

    /// Bulk repositioning, as driven by the layout-editor UI. Rejects the
    /// update wholesale if it would overlap two online screens.
    pub fn update_positions(&mut self, positions: &[(InstanceId, i32, i32)]) -> Result<(), LayoutError> {
        let mut trial = self.screens.clone();
        for (id, x, y) in positions {
            let idx = *self.index.get(id).ok_or_else(|| LayoutError::UnknownInstance(id.clone()))?;
            trial[idx].x = *x;
            trial[idx].y = *y;
        }
        for i in 0..trial.len() {
            if !trial[i].online {
                continue;
            }
            for j in (i + 1)..trial.len() {
                if !trial[j].online {
                    continue;
                }
                if trial[i].rect().overlaps(&trial[j].rect()) {
                    return Err(LayoutError::Overlap(trial[j].instance_id.clone()));
                }
            }
        }
        self.screens = trial;
        Ok(())
    }

    /// The derived neighbor set for one screen. Offline screens never
    /// participate, on either side of the relation.
    pub fn adjacency_for(&self, id: &str) -> Adjacency {
        let mut adjacency = Adjacency::default();
        let Some(&self_idx) = self.index.get(id) else {
            return adjacency;
        };
        let me = &self.screens[self_idx];
        if !me.online {
            return adjacency;
        }
        let me_rect = me.rect();

        for (other_idx, other) in self.screens.iter().enumerate() {
            if other_idx == self_idx || !other.online {
                continue;
            }
            let other_rect = other.rect();

            if edges_touch(me_rect.right(), other_rect.x)
                && ranges_overlap(me_rect.y, me_rect.bottom(), other_rect.y, other_rect.bottom())
            {
                adjacency.set(Side::Right, other_idx);
            }
            if edges_touch(me_rect.x, other_rect.right())
                && ranges_overlap(me_rect.y, me_rect.bottom(), other_rect.y, other_rect.bottom())
            {
                adjacency.set(Side::Left, other_idx);
            }
            if edges_touch(me_rect.bottom(), other_rect.y)
                && ranges_overlap(me_rect.x, me_rect.right(), other_rect.x, other_rect.right())
            {
                adjacency.set(Side::Bottom, other_idx);
            }
            if edges_touch(me_rect.y, other_rect.bottom())
                && ranges_overlap(me_rect.x, me_rect.right(), other_rect.x, other_rect.right())
            {
                adjacency.set(Side::Top, other_idx);
            }
        }
        adjacency
    }

    /// Given a screen, an edge it is at, and the cursor position on that
    /// screen, returns the neighbor and the landing coordinates on it.
    ///
    /// The parallel coordinate is placed one pixel inside the edge opposite
    /// to the one crossed, so the target's own edge sensors do not
    /// immediately bounce the cursor back.
    pub fn transition_target_at_edge(
        &self,
        from_id: &str,
        side: Side,
        x: i32,
        y: i32,
    ) -> Option<TransitionTarget> {
        let adjacency = self.adjacency_for(from_id);
        let target_idx = adjacency.get(side)?;
        let from = self.get(from_id)?;
        let target = &self.screens[target_idx];

        let (new_x, new_y) = match side {
            Side::Right | Side::Left => {
                let mapped_y = map_edge_position(from.height, target.height, y - from.y);
                let parallel_x = match side {
                    Side::Right => 1,
                    Side::Left => target.width as i32 - 2,
                    _ => unreachable!(),
                };
                (clamp_into(parallel_x, target.width), mapped_y)
            }
            Side::Top | Side::Bottom => {
                let mapped_x = map_edge_position(from.width, target.width, x - from.x);
                let parallel_y = match side {
                    Side::Bottom => 1,
                    Side::Top => target.height as i32 - 2,
                    _ => unreachable!(),
                };
                (mapped_x, clamp_into(parallel_y, target.height))
            }
        };

        Some(TransitionTarget { instance_id_index: target_idx, new_x, new_y })
    }

    /// Resolves a `TransitionTarget`'s index back to its instance id. Exists
    /// because indices are only stable for the lifetime of a borrow.
    pub fn instance_id_at(&self, index: usize) -> &str {
        &self.screens[index].instance_id
    }

    /// The wire-friendly form of [`Self::adjacency_for`], with instance ids
    /// instead of indices, for embedding in a `layout_assignment` message.
    pub fn adjacency_ids_for(&self, id: &str) -> AdjacencyIds {
        let adjacency = self.adjacency_for(id);
        AdjacencyIds {
            left: adjacency.left.map(|i| self.screens[i].instance_id.clone()),
            right: adjacency.right.map(|i| self.screens[i].instance_id.clone()),
            top: adjacency.top.map(|i| self.screens[i].instance_id.clone()),
            bottom: adjacency.bottom.map(|i| self.screens[i].instance_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_client_to_right() -> (LayoutManager, InstanceId) {
        let mut m = LayoutManager::new();
        m.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        let entry = m.register_client("cli".into(), "Client".into(), "m1".into(), 1920, 1080);
        let id = entry.instance_id.clone();
        (m, id)
    }

    #[test]
    fn auto_arrange_places_client_to_the_right() {
        let (m, id) = manager_with_client_to_right();
        let client = m.get(&id).unwrap();
        assert_eq!((client.x, client.y), (1920, 0));
    }

    #[test]
    fn second_client_is_placed_past_the_first() {
        let mut m = LayoutManager::new();
        m.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        m.register_client("c1".into(), "C1".into(), "m1".into(), 1920, 1080);
        let c2 = m.register_client("c2".into(), "C2".into(), "m2".into(), 1280, 800);
        assert_eq!((c2.x, c2.y), (3840, 0));
    }

    #[test]
    fn update_positions_rejects_overlap() {
        let mut m = LayoutManager::new();
        m.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        m.register_client("c1".into(), "C1".into(), "m1".into(), 1920, 1080);
        let result = m.update_positions(&[("c1".into(), 0, 0)]);
        assert!(matches!(result, Err(LayoutError::Overlap(_))));
    }

    #[test]
    fn adjacency_is_symmetric_for_touching_screens() {
        let (m, id) = manager_with_client_to_right();
        let server_adj = m.adjacency_for("srv");
        let client_adj = m.adjacency_for(&id);
        assert_eq!(m.instance_id_at(server_adj.right.unwrap()), id);
        assert_eq!(m.instance_id_at(client_adj.left.unwrap()), "srv");
    }

    #[test]
    fn offline_screens_are_excluded_from_adjacency() {
        let (mut m, id) = manager_with_client_to_right();
        m.unregister_client(&id);
        let server_adj = m.adjacency_for("srv");
        assert!(server_adj.right.is_none());
    }

    #[test]
    fn transition_target_lands_inside_the_opposite_edge() {
        let (m, id) = manager_with_client_to_right();
        let t = m.transition_target_at_edge("srv", Side::Right, 1919, 540).unwrap();
        assert_eq!(m.instance_id_at(t.instance_id_index), id);
        // One pixel inside the left edge of the target, not at it.
        assert_eq!(t.new_x, 1);
        assert_eq!(t.new_y, 540);
    }

    #[test]
    fn transition_target_maps_perpendicular_coordinate_proportionally() {
        let mut m = LayoutManager::new();
        m.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        m.register_client("cli".into(), "Client".into(), "m1".into(), 1920, 800);
        let t = m.transition_target_at_edge("srv", Side::Right, 1919, 540).unwrap();
        // 540/1080 of the way down a 1080-tall edge maps to the same fraction
        // of an 800-tall edge.
        assert_eq!(t.new_y, 400);
    }

    #[test]
    fn transition_target_is_none_without_adjacency() {
        let mut m = LayoutManager::new();
        m.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        assert!(m.transition_target_at_edge("srv", Side::Right, 1919, 540).is_none());
    }

    #[test]
    fn remove_client_rejects_online_screen() {
        let (mut m, id) = manager_with_client_to_right();
        assert_eq!(m.remove_client(&id), Err(LayoutError::ClientStillOnline));
    }

    #[test]
    fn remove_client_succeeds_once_offline() {
        let (mut m, id) = manager_with_client_to_right();
        m.unregister_client(&id);
        assert!(m.remove_client(&id).is_ok());
        assert!(m.get(&id).is_none());
    }

    #[test]
    fn remove_client_rejects_the_server_screen() {
        let (mut m, _) = manager_with_client_to_right();
        assert_eq!(m.remove_client("srv"), Err(LayoutError::CannotRemoveServer));
    }

    #[test]
    fn layout_file_round_trip_resets_online_flag() {
        let (m, id) = manager_with_client_to_right();
        let file = m.to_file();
        let restored = LayoutManager::from_file(file);
        assert!(!restored.get(&id).unwrap().online);
        assert_eq!(restored.get("srv").unwrap().x, 0);
    }

    #[test]
    fn reregistering_a_known_client_preserves_its_position() {
        let (mut m, id) = manager_with_client_to_right();
        m.unregister_client(&id);
        let revived = m.register_client(id.clone(), "Client".into(), "m1".into(), 1920, 1080);
        assert_eq!((revived.x, revived.y), (1920, 0));
        assert!(revived.online);
    }
}
