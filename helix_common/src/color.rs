//! Human-readable names for filament colors.
//!
//! Exact matches against a few filament-specific colors come first (metallic
//! and wood tones a user would never reach by picking a plain hue), then the
//! nearest entry of a basic palette by CIE76 distance in Lab space.

struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    fn to_lab(&self) -> (f32, f32, f32) {
        let r = srgb_to_linear(self.r as f32 / 255.0);
        let g = srgb_to_linear(self.g as f32 / 255.0);
        let b = srgb_to_linear(self.b as f32 / 255.0);

        let x = (0.4124 * r + 0.3576 * g + 0.1805 * b) / 0.95047;
        let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        let z = (0.0193 * r + 0.1192 * g + 0.9505 * b) / 1.08883;

        let f = |t: f32| {
            if t > 0.008856 {
                t.powf(1.0 / 3.0)
            } else {
                7.787 * t + 16.0 / 116.0
            }
        };
        let (x, y, z) = (f(x), f(y), f(z));

        (116.0 * y - 16.0, 500.0 * (x - y), 200.0 * (y - z))
    }

    fn distance(&self, other: &Rgb) -> f32 {
        let (l1, a1, b1) = self.to_lab();
        let (l2, a2, b2) = other.to_lab();
        ((l1 - l2).powi(2) + (a1 - a2).powi(2) + (b1 - b2).powi(2)).sqrt()
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

static SPECIAL_NAMES: [(u32, &str); 9] = [
    (0xD4AF37, "Gold"),
    (0xCD7F32, "Bronze"),
    (0x8B4513, "Wood"),
    (0xE8E8FF, "Clear"),
    (0xC0C0C0, "Silver"),
    (0xE0D5C7, "Marble"),
    (0xFF7043, "Coral"),
    (0x1A237E, "Navy"),
    (0xBCAAA4, "Taupe"),
];

static PALETTE: [(u32, &str); 28] = [
    (0x000000, "Black"),
    (0xFFFFFF, "White"),
    (0x808080, "Gray"),
    (0x404040, "Dark Gray"),
    (0xD3D3D3, "Light Gray"),
    (0xFF0000, "Red"),
    (0x8B0000, "Dark Red"),
    (0xDC143C, "Crimson"),
    (0xFF69B4, "Pink"),
    (0xFF00FF, "Magenta"),
    (0x800080, "Purple"),
    (0xE6E6FA, "Lavender"),
    (0x0000FF, "Blue"),
    (0x00008B, "Dark Blue"),
    (0x87CEEB, "Light Blue"),
    (0x00FFFF, "Cyan"),
    (0x008080, "Teal"),
    (0x008000, "Green"),
    (0x006400, "Dark Green"),
    (0x90EE90, "Light Green"),
    (0x808000, "Olive"),
    (0xFFFF00, "Yellow"),
    (0xFFD700, "Golden Yellow"),
    (0xFFA500, "Orange"),
    (0xA52A2A, "Brown"),
    (0xF5F5DC, "Beige"),
    (0xD2B48C, "Tan"),
    (0x800000, "Maroon"),
];

/// Name for a 0xRRGGBB color.
pub fn color_name_from_hex(rgb: u32) -> &'static str {
    let rgb = rgb & 0x00FF_FFFF;
    if let Some((_, name)) = SPECIAL_NAMES.iter().find(|(hex, _)| *hex == rgb) {
        return name;
    }

    let input = Rgb::from_hex(rgb);
    let mut best = "Unknown";
    let mut min_distance = f32::MAX;
    for (hex, name) in &PALETTE {
        let d = input.distance(&Rgb::from_hex(*hex));
        if d < min_distance {
            min_distance = d;
            best = name;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_palette_colors() {
        assert_eq!(color_name_from_hex(0x000000), "Black");
        assert_eq!(color_name_from_hex(0xFF0000), "Red");
        assert_eq!(color_name_from_hex(0xFFFFFF), "White");
    }

    #[test]
    fn test_special_names_take_priority() {
        assert_eq!(color_name_from_hex(0xD4AF37), "Gold");
        assert_eq!(color_name_from_hex(0x1A237E), "Navy");
        assert_eq!(color_name_from_hex(0xC0C0C0), "Silver");
    }

    #[test]
    fn test_nearest_match() {
        assert_eq!(color_name_from_hex(0x1A1A2E), "Black");
        assert_eq!(color_name_from_hex(0xD20000), "Red");
        assert_eq!(color_name_from_hex(0x00FF00), "Light Green");
        // Alpha byte ignored.
        assert_eq!(color_name_from_hex(0xFF00_00FF), "Blue");
    }
}
