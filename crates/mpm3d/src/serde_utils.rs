//! Serde helpers for glam types used in configuration files.
//!
//! Use with `#[serde(with = "crate::serde_utils::vec3")]`.

/// `Vec3` as `{ "x": .., "y": .., "z": .. }`.
pub mod vec3 {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Vec3Repr {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Repr {
            x: v.x,
            y: v.y,
            z: v.z,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = Vec3Repr::deserialize(d)?;
        Ok(Vec3::new(repr.x, repr.y, repr.z))
    }
}
