use crate::layout::{PlaneLayout, Topology};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings of the demo packer. Every field can be left out of the JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Width of one rendered texture slot (both eyes for `mono`)
    pub slot_width: u32,
    pub slot_height: u32,
    pub topology: Topology,
    pub frames: u32,
    pub pool_size: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            slot_width: 2880,
            slot_height: 936,
            topology: Topology::DoubleWide,
            frames: 1,
            pool_size: 2,
        }
    }
}

impl DemoConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn layout(&self) -> Result<PlaneLayout> {
        PlaneLayout::new(self.topology, self.slot_width, self.slot_height)
    }
}

/// Returns a version as specified in Cargo.toml
pub fn app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config = DemoConfig::from_json(r#"{ "topology": "stereo", "slot_width": 640 }"#).unwrap();
        assert_eq!(config.topology, Topology::StereoArray);
        assert_eq!(config.slot_width, 640);
        assert_eq!(config.slot_height, DemoConfig::default().slot_height);
        assert_eq!(config.frames, 1);
    }

    #[test]
    fn test_bad_topology() {
        assert!(DemoConfig::from_json(r#"{ "topology": "quad" }"#).is_err());
    }

    #[test]
    fn test_default_layout() {
        let layout = DemoConfig::default().layout().unwrap();
        assert_eq!(layout.depth_luma_offset(), 2_695_680);
        assert_eq!(layout.depth_chroma_offset(), 673_920);
    }
}
