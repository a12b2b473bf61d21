use std::fmt;

/// Which debug curve overlays are shown
///
/// Cycles None, Path, ControlPolygon, Frame and back to None. Never affects
/// the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveDisplayMode {
    #[default]
    None,
    Path,
    ControlPolygon,
    Frame,
}

impl CurveDisplayMode {
    pub fn next(self) -> Self {
        match self {
            CurveDisplayMode::None => CurveDisplayMode::Path,
            CurveDisplayMode::Path => CurveDisplayMode::ControlPolygon,
            CurveDisplayMode::ControlPolygon => CurveDisplayMode::Frame,
            CurveDisplayMode::Frame => CurveDisplayMode::None,
        }
    }

    /// Overlays drawn in this mode
    pub fn overlays(self) -> OverlaySet {
        match self {
            CurveDisplayMode::None => OverlaySet::default(),
            CurveDisplayMode::Path => OverlaySet {
                path: true,
                ..OverlaySet::default()
            },
            CurveDisplayMode::ControlPolygon => OverlaySet {
                path: true,
                control_polygon: true,
                frame: false,
            },
            CurveDisplayMode::Frame => OverlaySet {
                path: true,
                control_polygon: false,
                frame: true,
            },
        }
    }
}

impl fmt::Display for CurveDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurveDisplayMode::None => "off",
            CurveDisplayMode::Path => "path",
            CurveDisplayMode::ControlPolygon => "control polygon",
            CurveDisplayMode::Frame => "frame",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlaySet {
    pub path: bool,
    pub control_polygon: bool,
    pub frame: bool,
}

impl OverlaySet {
    pub fn is_empty(&self) -> bool {
        !(self.path || self.control_polygon || self.frame)
    }
}

/// Presentation toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayFlags {
    pub greyscale: bool,
    pub curve_display: CurveDisplayMode,
}

impl DisplayFlags {
    pub fn toggle_greyscale(&mut self) -> bool {
        self.greyscale = !self.greyscale;
        self.greyscale
    }

    pub fn cycle_curve_display(&mut self) -> CurveDisplayMode {
        self.curve_display = self.curve_display.next();
        self.curve_display
    }
}
