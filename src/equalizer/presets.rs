use crate::{equalizer::BAND_COUNT, error::PresetError};

/// Name reported once gains no longer match any preset
pub const CUSTOM_PRESET: &str = "Custom";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqPreset {
    pub name: &'static str,
    /// Gain per band in dB, lowest band first
    pub gains: [f32; BAND_COUNT],
}

//                         32    64   125   250   500    1k    2k    4k    8k   16k
#[rustfmt::skip]
pub const PRESETS: &[EqPreset] = &[
    EqPreset { name: "Flat",         gains: [ 0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0] },
    EqPreset { name: "Rock",         gains: [ 5.0,  4.0,  3.0,  1.0, -1.0, -1.0,  1.0,  3.0,  4.0,  5.0] },
    EqPreset { name: "Pop",          gains: [-1.0,  1.0,  3.0,  4.0,  3.0,  0.0, -1.0, -1.0,  1.0,  2.0] },
    EqPreset { name: "Jazz",         gains: [ 3.0,  2.0,  1.0,  2.0, -1.0, -1.0,  0.0,  1.0,  2.0,  3.0] },
    EqPreset { name: "Classical",    gains: [ 4.0,  3.0,  2.0,  1.0, -1.0, -1.0,  0.0,  2.0,  3.0,  4.0] },
    EqPreset { name: "Electronic",   gains: [ 6.0,  5.0,  1.0,  0.0, -2.0,  2.0,  1.0,  2.0,  5.0,  6.0] },
    EqPreset { name: "Hip-Hop",      gains: [ 6.0,  5.0,  2.0,  3.0, -1.0, -1.0,  1.0,  0.0,  2.0,  3.0] },
    EqPreset { name: "Vocal",        gains: [-2.0, -3.0, -2.0,  1.0,  4.0,  4.0,  3.0,  1.0,  0.0, -2.0] },
    EqPreset { name: "Bass Boost",   gains: [ 8.0,  6.0,  5.0,  3.0,  1.0,  0.0,  0.0,  0.0,  0.0,  0.0] },
    EqPreset { name: "Treble Boost", gains: [ 0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  3.0,  5.0,  6.0,  8.0] },
    EqPreset { name: "Acoustic",     gains: [ 4.0,  3.0,  2.0,  1.0,  1.0,  1.0,  2.0,  3.0,  3.0,  2.0] },
    EqPreset { name: "Late Night",   gains: [-3.0, -2.0,  0.0,  1.0,  2.0,  2.0,  1.0,  0.0, -2.0, -4.0] },
];

pub fn find_preset(name: &str) -> Option<&'static EqPreset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

/// Preset whose gains match `gains` exactly
pub fn matching_preset(gains: &[f32]) -> Option<&'static EqPreset> {
    PRESETS.iter().find(|preset| preset.gains[..] == *gains)
}

/// Check that every name a caller intends to offer exists in the catalog
pub fn validate_preset_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<(), PresetError> {
    for name in names {
        if find_preset(name).is_none() {
            return Err(PresetError::UnknownPreset(name.to_string()));
        }
    }
    Ok(())
}

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|preset| preset.name)
}
