//! Built-in block glyphs for the burned-in timestamp.
//!
//! The stamp text only ever contains digits, `-`, `:` and spaces, so a tiny
//! fixed bitmap set is enough and keeps font files out of the bundle. Each
//! glyph is an 8x12 cell with the drawing in the top six bits of every row
//! byte (bit 7 = leftmost pixel); the binary literals read as pixels.

pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 12;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const ZERO: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b10000100,
    0b10001100,
    0b10010100,
    0b10100100,
    0b11000100,
    0b10000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const ONE: Glyph = [
    0b00000000,
    0b00110000,
    0b01110000,
    0b00110000,
    0b00110000,
    0b00110000,
    0b00110000,
    0b00110000,
    0b00110000,
    0b00110000,
    0b11111100,
    0b00000000,
];

const TWO: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b00000100,
    0b00001000,
    0b00010000,
    0b00100000,
    0b01000000,
    0b10000000,
    0b10000000,
    0b11111100,
    0b00000000,
];

const THREE: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b00000100,
    0b00000100,
    0b00111000,
    0b00000100,
    0b00000100,
    0b00000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const FOUR: Glyph = [
    0b00000000,
    0b00001000,
    0b00011000,
    0b00101000,
    0b01001000,
    0b10001000,
    0b11111100,
    0b00001000,
    0b00001000,
    0b00001000,
    0b00001000,
    0b00000000,
];

const FIVE: Glyph = [
    0b00000000,
    0b11111100,
    0b10000000,
    0b10000000,
    0b11111000,
    0b00000100,
    0b00000100,
    0b00000100,
    0b00000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const SIX: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b10000000,
    0b10000000,
    0b11111000,
    0b10000100,
    0b10000100,
    0b10000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const SEVEN: Glyph = [
    0b00000000,
    0b11111100,
    0b00000100,
    0b00001000,
    0b00001000,
    0b00010000,
    0b00010000,
    0b00100000,
    0b00100000,
    0b01000000,
    0b01000000,
    0b00000000,
];

const EIGHT: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b10000100,
    0b10000100,
    0b01111000,
    0b10000100,
    0b10000100,
    0b10000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const NINE: Glyph = [
    0b00000000,
    0b01111000,
    0b10000100,
    0b10000100,
    0b10000100,
    0b01111100,
    0b00000100,
    0b00000100,
    0b00000100,
    0b10000100,
    0b01111000,
    0b00000000,
];

const DASH: Glyph = [
    0b00000000,
    0b00000000,
    0b00000000,
    0b00000000,
    0b00000000,
    0b01111000,
    0b01111000,
    0b00000000,
    0b00000000,
    0b00000000,
    0b00000000,
    0b00000000,
];

const COLON: Glyph = [
    0b00000000,
    0b00000000,
    0b00000000,
    0b00110000,
    0b00110000,
    0b00000000,
    0b00000000,
    0b00110000,
    0b00110000,
    0b00000000,
    0b00000000,
    0b00000000,
];

const SPACE: Glyph = [0; GLYPH_HEIGHT as usize];

pub fn glyph(c: char) -> Option<&'static Glyph> {
    match c {
        '0' => Some(&ZERO),
        '1' => Some(&ONE),
        '2' => Some(&TWO),
        '3' => Some(&THREE),
        '4' => Some(&FOUR),
        '5' => Some(&FIVE),
        '6' => Some(&SIX),
        '7' => Some(&SEVEN),
        '8' => Some(&EIGHT),
        '9' => Some(&NINE),
        '-' => Some(&DASH),
        ':' => Some(&COLON),
        ' ' => Some(&SPACE),
        _ => None,
    }
}

/// Pixel width of `text` rendered at `scale` (monospace advance).
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_WIDTH * scale
}
