use palette::Srgb;

/// 8-bit sRGB color, as used by the map renderer
pub type Color = Srgb<u8>;

/// Smallest palette the route grouper accepts
pub const MIN_PALETTE_SIZE: usize = 6;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid color {0:?}, expected #rrggbb")]
    Invalid(String),
    #[error("route palette needs at least {MIN_PALETTE_SIZE} colors, got {0}")]
    PaletteTooSmall(usize),
}

/// Format a color as `#rrggbb`
pub fn to_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

pub fn parse_hex(value: &str) -> Result<Color, ColorError> {
    value
        .trim()
        .parse::<Color>()
        .map_err(|_| ColorError::Invalid(value.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStyle {
    pub color: Color,
    pub weight: f32,
    pub opacity: f32,
}

impl PathStyle {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            weight: 5.0,
            opacity: 0.8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    pub radius: f32,
    pub fill: Color,
    pub fill_opacity: f32,
    pub border_color: Color,
    pub border_width: f32,
}

impl MarkerStyle {
    /// Circle marker with no border
    pub fn solid_color(radius: f32, fill: Color) -> Self {
        Self {
            radius,
            fill,
            fill_opacity: 1.0,
            border_color: Srgb::new(0, 0, 0),
            border_width: 0.0,
        }
    }

    pub fn with_border(mut self, border_width: f32, border_color: Color) -> Self {
        self.border_width = border_width;
        self.border_color = border_color;
        self
    }

    pub fn with_fill_opacity(mut self, fill_opacity: f32) -> Self {
        self.fill_opacity = fill_opacity;
        self
    }
}

/// Ordered colors handed out to route directions
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePalette {
    colors: Vec<Color>,
}

impl RoutePalette {
    pub fn new(colors: Vec<Color>) -> Result<Self, ColorError> {
        if colors.len() < MIN_PALETTE_SIZE {
            return Err(ColorError::PaletteTooSmall(colors.len()));
        }
        Ok(Self { colors })
    }

    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, ColorError> {
        let colors = colors
            .iter()
            .map(|c| parse_hex(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    /// Color for the `index`-th drawn direction, cycling when exhausted
    pub fn color(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

pub const DEFAULT_ROUTE_COLORS: [&str; 8] = [
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#a65628", "#f781bf", "#17becf",
];

impl Default for RoutePalette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_ROUTE_COLORS
                .iter()
                .filter_map(|c| parse_hex(c).ok())
                .collect(),
        }
    }
}
