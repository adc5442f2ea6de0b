// Parser for the CSS colour strings the map styles hand us, mostly
// functional notation like `rgba(200, 80, 40, 0.6)`.

use crate::error::{GranularityError, Result};

/// A straight (non-premultiplied) colour with float alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub fn alpha_u8(&self) -> u8 {
        (self.a.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Parse `rgb()`/`rgba()` (comma or space separated, optional `/ alpha`,
/// channels as numbers or percentages) and `#rgb`, `#rrggbb`, `#rrggbbaa`.
pub fn parse_colour(input: &str) -> Result<Rgba> {
    let s = input.trim();
    let invalid = || GranularityError::InvalidColour(input.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    let lower = s.to_ascii_lowercase();
    let body = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(invalid());
    }

    let channel = |p: &str| -> Option<u8> {
        let v = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? * 2.55,
            None => p.parse::<f64>().ok()?,
        };
        v.is_finite().then(|| v.clamp(0.0, 255.0).round() as u8)
    };
    let alpha = |p: &str| -> Option<f32> {
        let v = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => p.parse::<f32>().ok()?,
        };
        v.is_finite().then(|| v.clamp(0.0, 1.0))
    };

    Ok(Rgba {
        r: channel(parts[0]).ok_or_else(invalid)?,
        g: channel(parts[1]).ok_or_else(invalid)?,
        b: channel(parts[2]).ok_or_else(invalid)?,
        a: match parts.get(3) {
            Some(p) => alpha(p).ok_or_else(invalid)?,
            None => 1.0,
        },
    })
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    match hex.len() {
        3 => Some(Rgba { r: nibble(0)?, g: nibble(1)?, b: nibble(2)?, a: 1.0 }),
        6 => Some(Rgba { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: 1.0 }),
        8 => Some(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)? as f32 / 255.0,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_functional_notation() {
        assert_eq!(
            parse_colour("rgba(255, 0, 10, 0.5)").unwrap(),
            Rgba { r: 255, g: 0, b: 10, a: 0.5 }
        );
        assert_eq!(
            parse_colour("rgb(1 2 3 / 25%)").unwrap(),
            Rgba { r: 1, g: 2, b: 3, a: 0.25 }
        );
        assert_eq!(parse_colour("RGB(100%,0%,0%)").unwrap().r, 255);
    }

    #[test]
    fn parses_hex() {
        assert_eq!(parse_colour("#f00").unwrap(), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(parse_colour("#00ff0080").unwrap().alpha_u8(), 128);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_colour("rgba(1,2)").is_err());
        assert!(parse_colour("hsl(10, 50%, 50%)").is_err());
        assert!(parse_colour("#12345").is_err());
        assert!(parse_colour("rgba(a,b,c,d)").is_err());
    }
}
