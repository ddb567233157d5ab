use crate::{error::PresetError, graph::panner::Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialPreset {
    pub name: &'static str,
    pub position: Position,
}

pub const SPATIAL_PRESETS: &[SpatialPreset] = &[
    SpatialPreset {
        name: "Center",
        position: Position::new(0.0, 0.0, -1.0),
    },
    SpatialPreset {
        name: "Wide",
        position: Position::new(0.0, 0.0, -3.0),
    },
    SpatialPreset {
        name: "Concert Hall",
        position: Position::new(0.0, 2.0, -8.0),
    },
    SpatialPreset {
        name: "Intimate",
        position: Position::new(0.0, 0.0, -0.5),
    },
    SpatialPreset {
        name: "Left Stage",
        position: Position::new(-3.0, 0.0, -2.0),
    },
    SpatialPreset {
        name: "Right Stage",
        position: Position::new(3.0, 0.0, -2.0),
    },
];

pub fn find_spatial_preset(name: &str) -> Option<&'static SpatialPreset> {
    SPATIAL_PRESETS.iter().find(|preset| preset.name == name)
}

pub fn validate_spatial_preset_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), PresetError> {
    match names.into_iter().find(|name| find_spatial_preset(name).is_none()) {
        Some(unknown) => Err(PresetError::UnknownPreset(unknown.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_mirror_each_other() {
        let left = find_spatial_preset("Left Stage").unwrap().position;
        let right = find_spatial_preset("Right Stage").unwrap().position;
        assert_eq!(left.x, -right.x);
        assert_eq!(left.z, right.z);
    }

    #[test]
    fn validation() {
        assert!(validate_spatial_preset_names(["Center", "Wide"]).is_ok());
        assert_eq!(
            validate_spatial_preset_names(["Center", "Stadium"]),
            Err(PresetError::UnknownPreset("Stadium".into()))
        );
    }
}
