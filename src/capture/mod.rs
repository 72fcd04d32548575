mod glyphs;
mod stamp;

pub use stamp::{stamp_frame, StampedPhoto, STANDARD_WIDTH};
