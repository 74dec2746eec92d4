// Color helpers used to paint map areas.
//
// Colors travel through the rest of the crate as `Rgb` values and are only
// turned into `#rrggbb` strings when written into the SVG.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// The color read as one 24-bit number, `0xRRGGBB`.
    pub fn value(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Linear blend of two colors.
///
/// The endpoints are first ordered by their numeric value, so `ratio`
/// always weighs the numerically smaller color: `ratio == 1.0` yields the
/// smaller one and `ratio == 0.0` the larger one, whatever order the
/// arguments came in. Each channel is `ceil(small * ratio + large * (1 - ratio))`.
///
/// Ratios outside `[0, 1]` extrapolate; the resulting channels saturate at
/// the byte range.
///
/// `gradient(#FF0000, #0000FF, 0.5) == #800080`
pub fn gradient(color1: Rgb, color2: Rgb, ratio: f64) -> Rgb {
    let (from, to) = if color1.value() > color2.value() {
        (color2, color1)
    } else {
        (color1, color2)
    };
    let mix = |a: u8, b: u8| channel(f64::from(a) * ratio + f64::from(b) * (1.0 - ratio));
    Rgb::new(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
}

fn channel(v: f64) -> u8 {
    let v = v.ceil();
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0) as u8
}
