//! Contract surface for an external UI.
//!
//! No HTTP server lives in this crate: the browser-based layout editor is an
//! external collaborator that drives the coordinator entirely over the
//! `/console` channel already served by [`crate::infrastructure::network::server_endpoint`].
//! This module only owns the DTO shape that channel's `connections`/`status`
//! output is meant to render into, so a UI implementation and this crate
//! agree on field names without either depending on the other.

use serde::Serialize;

use konflikt_core::domain::layout::ScreenEntry;

/// A JSON-friendly projection of [`ScreenEntry`] for a UI consuming the
/// `connections` console command's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDto {
    pub instance_id: String,
    pub display_name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_server: bool,
    pub online: bool,
}

impl From<&ScreenEntry> for ScreenDto {
    fn from(entry: &ScreenEntry) -> Self {
        Self {
            instance_id: entry.instance_id.clone(),
            display_name: entry.display_name.clone(),
            x: entry.x,
            y: entry.y,
            width: entry.width,
            height: entry.height,
            is_server: entry.is_server,
            online: entry.online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_dto_carries_every_field_from_the_domain_entry() {
        let entry = ScreenEntry {
            instance_id: "cli".into(),
            display_name: "Laptop".into(),
            machine_id: "m1".into(),
            x: 1920,
            y: 0,
            width: 1920,
            height: 1080,
            is_server: false,
            online: true,
        };

        let dto = ScreenDto::from(&entry);

        assert_eq!(dto.instance_id, "cli");
        assert_eq!(dto.display_name, "Laptop");
        assert_eq!(dto.x, 1920);
        assert_eq!(dto.width, 1920);
        assert!(!dto.is_server);
        assert!(dto.online);
    }
}
