use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An sRGB color with straight (non-premultiplied) alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized color {0:?}")]
pub struct ColorParseError(pub String);

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Scale the alpha by `opacity` (clamped to [0, 1]).
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (self.a * opacity.clamp(0.0, 1.0)).clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `#rgb`, `#rrggbb`, `rgb(r, g, b)`, `rgba(r, g, b, a)`, `white`
    /// and `black`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || ColorParseError(s.to_string());

        match input.to_ascii_lowercase().as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            _ => {}
        }

        if let Some(hex) = input.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            let expanded: String = match hex.len() {
                3 => hex.chars().flat_map(|c| [c, c]).collect(),
                6 => hex.to_string(),
                _ => return Err(err()),
            };
            let n = u32::from_str_radix(&expanded, 16).map_err(|_| err())?;
            return Ok(Color::rgb((n >> 16) as u8, (n >> 8) as u8, n as u8));
        }

        let (body, want_alpha) = if let Some(rest) = input.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = input.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(err());
        };
        let body = body.strip_suffix(')').ok_or_else(err)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();

        let expected = if want_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(err());
        }

        let channel = |p: &str| p.parse::<u8>().map_err(|_| err());
        let a = if want_alpha {
            parts[3]
                .parse::<f32>()
                .map_err(|_| err())?
                .clamp(0.0, 1.0)
        } else {
            1.0
        };

        Ok(Color::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            a,
        ))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}
