//! Concrete locations.

use serde::{Deserialize, Serialize};

/// A position and orientation inside a named world on a named server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub world: String,
    pub server: String,
}

impl Location {
    pub fn new(
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        world: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            pitch,
            world: world.into(),
            server: server.into(),
        }
    }

    /// Whether both locations share world and x/y/z. Orientation is ignored.
    pub fn same_position(&self, other: &Location) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z && self.world == other.world
    }

    /// Returns a copy of this location attributed to another server.
    pub fn on_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1}, {:.1}, {:.1} in {}",
            self.x, self.y, self.z, self.world
        )?;
        if !self.server.is_empty() {
            write!(f, " on {}", self.server)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_change_keeps_position() {
        let a = Location::new(1.0, 64.0, -3.5, 0.0, 0.0, "world", "lobby");
        let mut b = a.clone();
        b.yaw = 90.0;
        b.pitch = -45.0;
        assert!(a.same_position(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn coordinate_or_world_change_moves() {
        let a = Location::new(1.0, 64.0, -3.5, 0.0, 0.0, "world", "lobby");
        let mut b = a.clone();
        b.x += 0.01;
        assert!(!a.same_position(&b));

        let mut c = a.clone();
        c.world = "world_nether".to_string();
        assert!(!a.same_position(&c));
    }

    #[test]
    fn display_omits_empty_server() {
        let loc = Location::new(1.0, 2.0, 3.0, 0.0, 0.0, "world", "");
        assert_eq!(loc.to_string(), "1.0, 2.0, 3.0 in world");
        let loc = loc.on_server("survival");
        assert_eq!(loc.to_string(), "1.0, 2.0, 3.0 in world on survival");
    }
}
