//! Organization branding colors as theme variables
//!
//! [`theme_variables`] is pure: it maps the primary and secondary hex colors
//! to CSS variable values in the `"H S% L%"` form the stylesheet expects.
//! [`apply_theme`] is the only call that touches a live environment.

use crate::types::LedgerError;

/// Foreground used on light backgrounds
pub const DARK_FOREGROUND: &str = "222 47% 11%";

/// Foreground used on dark backgrounds
pub const LIGHT_FOREGROUND: &str = "0 0% 100%";

/// Backgrounds lighter than this take the dark foreground
const LIGHTNESS_THRESHOLD: f64 = 60.0;

/// A color in hue/saturation/lightness, hue in degrees, the rest in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    /// `"H S% L%"` with each component rounded, hue kept in `0..360`
    pub fn to_css(&self) -> String {
        format!(
            "{} {}% {}%",
            (self.h.round() as i64).rem_euclid(360),
            self.s.round() as i64,
            self.l.round() as i64
        )
    }

    fn foreground(&self) -> &'static str {
        if self.l > LIGHTNESS_THRESHOLD {
            DARK_FOREGROUND
        } else {
            LIGHT_FOREGROUND
        }
    }
}

/// Parse `#rrggbb` or `#rgb` (the leading `#` is optional)
pub fn parse_hex(input: &str) -> Result<(u8, u8, u8), LedgerError> {
    let hex = input.trim().trim_start_matches('#');
    let invalid = || LedgerError::invalid_color(input);

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(invalid()),
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

pub fn hex_to_hsl(input: &str) -> Result<Hsl, LedgerError> {
    let (r, g, b) = parse_hex(input)?;
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Ok(Hsl {
            h: 0.0,
            s: 0.0,
            l: l * 100.0,
        });
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Ok(Hsl {
        h: h * 60.0,
        s: s * 100.0,
        l: l * 100.0,
    })
}

/// Theme variable values for one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeVariables {
    pub primary: String,
    pub primary_foreground: String,
    pub secondary: String,
    pub secondary_foreground: String,
    pub ring: String,
}

impl ThemeVariables {
    /// `(css variable, value)` pairs in a stable order
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("--primary", self.primary.as_str()),
            ("--primary-foreground", self.primary_foreground.as_str()),
            ("--secondary", self.secondary.as_str()),
            ("--secondary-foreground", self.secondary_foreground.as_str()),
            ("--ring", self.ring.as_str()),
        ]
    }
}

pub fn theme_variables(primary: &str, secondary: &str) -> Result<ThemeVariables, LedgerError> {
    let primary = hex_to_hsl(primary)?;
    let secondary = hex_to_hsl(secondary)?;

    Ok(ThemeVariables {
        primary: primary.to_css(),
        primary_foreground: primary.foreground().to_string(),
        secondary: secondary.to_css(),
        secondary_foreground: secondary.foreground().to_string(),
        ring: primary.to_css(),
    })
}

/// Where theme variables end up
pub trait StyleSink {
    fn set_property(&mut self, name: &str, value: &str);
}

pub fn apply_theme(sink: &mut dyn StyleSink, vars: &ThemeVariables) {
    for (name, value) in vars.entries() {
        sink.set_property(name, value);
    }
    tracing::debug!(primary = %vars.primary, secondary = %vars.secondary, "theme applied");
}
