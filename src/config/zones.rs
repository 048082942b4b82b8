//! DRS zone registry and `drs_zones.ini` reader
//!
//! Tracks ship their zones as an INI file with one section per zone:
//!
//! ```text
//! [ZONE_0]
//! DETECTION=0.512
//! START=0.538
//! END=0.640
//! ```
//!
//! Section order is significant: it defines the [`ZoneId`] used to decide
//! whether two cars crossed the same detection line.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{ZoneDefinition, ZoneId};
use crate::{Result, StewardError};

/// Ordered, read-only list of the zones on the current track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRegistry {
    zones: Vec<ZoneDefinition>,
}

impl ZoneRegistry {
    /// Build a registry from `(detection, start, end)` triples in declaration order.
    pub fn from_bounds<I>(bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let mut zones = Vec::new();
        for (index, (detection, start, end)) in bounds.into_iter().enumerate() {
            for (name, value) in [("DETECTION", detection), ("START", start), ("END", end)] {
                if !value.is_finite() || !(0.0..1.0).contains(&value) {
                    return Err(StewardError::configuration(
                        format!("zone {}", index + 1),
                        format!("{} = {} is not a spline fraction in [0, 1)", name, value),
                    ));
                }
            }
            zones.push(ZoneDefinition { id: ZoneId(index), detection, start, end });
        }
        Ok(Self { zones })
    }

    /// Registry with no zones; DRS checking is silently inactive.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the contents of a `drs_zones.ini` file.
    pub fn parse_ini(contents: &str) -> Result<Self> {
        let sections = parse_sections(contents)?;
        let mut bounds = Vec::with_capacity(sections.len());

        for section in &sections {
            let field = |key: &str| -> Result<f64> {
                let raw = section.get(key).ok_or_else(|| {
                    StewardError::parse(
                        format!("section [{}]", section.name),
                        format!("missing key {}", key),
                    )
                })?;
                raw.parse::<f64>().map_err(|e| {
                    StewardError::parse(
                        format!("section [{}]", section.name),
                        format!("{} = '{}': {}", key, raw, e),
                    )
                })
            };
            bounds.push((field("DETECTION")?, field("START")?, field("END")?));
        }

        Self::from_bounds(bounds)
    }

    /// Load the zones for a track, degrading to an empty registry.
    ///
    /// A missing file means the track has no DRS and is not an error. An
    /// unreadable or malformed file is logged and also yields zero zones.
    pub fn load(tracks_root: &Path, track: &str, layout: Option<&str>) -> Self {
        let path = zone_file_path(tracks_root, track, layout);
        if !path.is_file() {
            warn!("No DRS zone file at {}; DRS checking disabled", path.display());
            return Self::empty();
        }

        match Self::read(&path) {
            Ok(registry) => {
                info!("Loaded {} DRS zones from {}", registry.len(), path.display());
                for zone in registry.iter() {
                    debug!(
                        zone = zone.id.number(),
                        detection = zone.detection,
                        start = zone.start,
                        end = zone.end,
                        "DRS zone"
                    );
                }
                registry
            }
            Err(e) => {
                warn!("Ignoring DRS zone file {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Read and parse a zone file, surfacing every failure.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StewardError::file_error(path.to_path_buf(), e))?;
        Self::parse_ini(&contents)
    }

    pub fn get(&self, id: ZoneId) -> Option<&ZoneDefinition> {
        self.zones.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneDefinition> {
        self.zones.iter()
    }

    pub fn as_slice(&self) -> &[ZoneDefinition] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Location of the zone file for a track and optional layout.
pub fn zone_file_path(tracks_root: &Path, track: &str, layout: Option<&str>) -> PathBuf {
    let mut path = tracks_root.join(track);
    if let Some(layout) = layout.filter(|l| !l.is_empty()) {
        path.push(layout);
    }
    path.join("data").join("drs_zones.ini")
}

#[derive(Debug)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }
}

/// Split INI text into sections, keeping declaration order.
///
/// Handles `;` and `#` comments, blank lines and `KEY=VALUE` pairs. Keys
/// before the first section header are rejected.
fn parse_sections(contents: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (line_no, raw) in contents.lines().enumerate() {
        let line = raw.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                StewardError::parse("zone file", format!("line {}: unterminated section header", line_no + 1))
            })?;
            sections.push(Section { name: name.trim().to_string(), entries: Vec::new() });
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            StewardError::parse("zone file", format!("line {}: expected KEY=VALUE", line_no + 1))
        })?;
        // Trailing comments are common in hand-edited track data
        let value = value.split([';', '#']).next().unwrap_or_default().trim();

        let section = sections.last_mut().ok_or_else(|| {
            StewardError::parse("zone file", format!("line {}: key outside of a section", line_no + 1))
        })?;
        section.entries.push((key.trim().to_string(), value.to_string()));
    }

    Ok(sections)
}
