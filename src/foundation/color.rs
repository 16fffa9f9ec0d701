use std::str::FromStr;

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from channels including alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `true` when the color contributes nothing when painted.
    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    /// Channels as an array, for `image::Rgba`.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rrggbbaa` form, used when handing colors to SVG.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Premultiplied channels.
    pub fn to_premul(self) -> [u8; 4] {
        let a = u16::from(self.a);
        [
            crate::foundation::core::mul_div255(u16::from(self.r), a),
            crate::foundation::core::mul_div255(u16::from(self.g), a),
            crate::foundation::core::mul_div255(u16::from(self.b), a),
            self.a,
        ]
    }
}

impl FromStr for Rgba8 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('#') {
            return parse_hex(s);
        }
        let name = s.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
            .ok_or_else(|| format!("unknown color \"{s}\""))
    }
}

impl std::fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match NAMED.iter().find(|(_, c)| c == self) {
            Some((name, _)) => f.write_str(name),
            None => f.write_str(&self.to_hex()),
        }
    }
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = u8::from_str_radix(c, 16).map_err(|_| format!("invalid hex digit \"{c}\""))?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err("hex color must be ascii".to_owned());
    }

    match s.len() {
        3 => Ok(Rgba8::rgb(
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
        )),
        6 => Ok(Rgba8::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8::rgba(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        )),
        _ => Err("hex color must be #RGB, #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned()),
    }
}

const NAMED: &[(&str, Rgba8)] = &[
    ("transparent", Rgba8::TRANSPARENT),
    ("black", Rgba8::BLACK),
    ("white", Rgba8::WHITE),
    ("dimgray", Rgba8::rgb(105, 105, 105)),
    ("dimgrey", Rgba8::rgb(105, 105, 105)),
    ("gray", Rgba8::rgb(128, 128, 128)),
    ("grey", Rgba8::rgb(128, 128, 128)),
    ("darkgray", Rgba8::rgb(169, 169, 169)),
    ("darkgrey", Rgba8::rgb(169, 169, 169)),
    ("silver", Rgba8::rgb(192, 192, 192)),
    ("lightgray", Rgba8::rgb(211, 211, 211)),
    ("lightgrey", Rgba8::rgb(211, 211, 211)),
    ("gainsboro", Rgba8::rgb(220, 220, 220)),
    ("whitesmoke", Rgba8::rgb(245, 245, 245)),
    ("red", Rgba8::rgb(255, 0, 0)),
    ("darkred", Rgba8::rgb(139, 0, 0)),
    ("maroon", Rgba8::rgb(128, 0, 0)),
    ("orange", Rgba8::rgb(255, 165, 0)),
    ("gold", Rgba8::rgb(255, 215, 0)),
    ("yellow", Rgba8::rgb(255, 255, 0)),
    ("olive", Rgba8::rgb(128, 128, 0)),
    ("lime", Rgba8::rgb(0, 255, 0)),
    ("green", Rgba8::rgb(0, 128, 0)),
    ("darkgreen", Rgba8::rgb(0, 100, 0)),
    ("teal", Rgba8::rgb(0, 128, 128)),
    ("cyan", Rgba8::rgb(0, 255, 255)),
    ("aqua", Rgba8::rgb(0, 255, 255)),
    ("blue", Rgba8::rgb(0, 0, 255)),
    ("navy", Rgba8::rgb(0, 0, 128)),
    ("darkblue", Rgba8::rgb(0, 0, 139)),
    ("steelblue", Rgba8::rgb(70, 130, 180)),
    ("purple", Rgba8::rgb(128, 0, 128)),
    ("magenta", Rgba8::rgb(255, 0, 255)),
    ("fuchsia", Rgba8::rgb(255, 0, 255)),
    ("pink", Rgba8::rgb(255, 192, 203)),
    ("brown", Rgba8::rgb(165, 42, 42)),
    ("ivory", Rgba8::rgb(255, 255, 240)),
    ("beige", Rgba8::rgb(245, 245, 220)),
];
