use serde::Deserialize;

/// An 8-bit-per-channel color in logical red, green, blue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// The fixed palette for the pad matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
    Orange,
    LightOrange,
    WarmYellow,
    Yellow,
    Lime,
    Green,
    Mint,
    Cyan,
    #[serde(alias = "turquise")]
    Turquoise,
    Blue,
    Plum,
    Violet,
    Purple,
    Magenta,
    Fuchsia,
    White,
}

const PALETTE: [(Color, &str, Rgb); 18] = [
    (Color::Black, "black", Rgb::new(0, 0, 0)),
    (Color::Red, "red", Rgb::new(255, 0, 0)),
    (Color::Orange, "orange", Rgb::new(255, 97, 45)),
    (Color::LightOrange, "lightorange", Rgb::new(255, 148, 0)),
    (Color::WarmYellow, "warmyellow", Rgb::new(255, 213, 0)),
    (Color::Yellow, "yellow", Rgb::new(255, 255, 0)),
    (Color::Lime, "lime", Rgb::new(144, 255, 0)),
    (Color::Green, "green", Rgb::new(0, 255, 0)),
    (Color::Mint, "mint", Rgb::new(0, 255, 165)),
    (Color::Cyan, "cyan", Rgb::new(0, 255, 255)),
    (Color::Turquoise, "turquoise", Rgb::new(0, 206, 255)),
    (Color::Blue, "blue", Rgb::new(0, 49, 255)),
    (Color::Plum, "plum", Rgb::new(69, 49, 218)),
    (Color::Violet, "violet", Rgb::new(125, 41, 217)),
    (Color::Purple, "purple", Rgb::new(229, 18, 255)),
    (Color::Magenta, "magenta", Rgb::new(255, 0, 255)),
    (Color::Fuchsia, "fuchsia", Rgb::new(255, 0, 136)),
    (Color::White, "white", Rgb::new(255, 255, 255)),
];

impl Color {
    pub fn all() -> impl Iterator<Item = Color> {
        PALETTE.iter().map(|(color, _, _)| *color)
    }

    pub fn rgb(self) -> Rgb {
        PALETTE[self as usize].2
    }

    pub fn name(self) -> &'static str {
        PALETTE[self as usize].1
    }

    /// Case-insensitive lookup by palette name.
    pub fn from_name(name: &str) -> Option<Color> {
        let name = name.trim().to_ascii_lowercase();
        PALETTE
            .iter()
            .find(|(_, entry, _)| *entry == name)
            .map(|(color, _, _)| *color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_variant() {
        for (idx, color) in Color::all().enumerate() {
            assert_eq!(color as usize, idx);
            assert_eq!(Color::from_name(color.name()), Some(color));
        }
        assert_eq!(Color::all().count(), 18);
    }

    #[test]
    fn black_is_off() {
        assert_eq!(Color::Black.rgb(), Rgb::new(0, 0, 0));
        assert_eq!(Color::Red.rgb(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Color::from_name(" Mint "), Some(Color::Mint));
        assert_eq!(Color::from_name("chartreuse"), None);
    }

    #[test]
    fn deserializes_from_names() {
        let color: Color = serde_yaml::from_str("lightorange").unwrap();
        assert_eq!(color, Color::LightOrange);
        let color: Color = serde_yaml::from_str("turquise").unwrap();
        assert_eq!(color, Color::Turquoise);
    }
}
