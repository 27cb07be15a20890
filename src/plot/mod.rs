//! Rendering of diagnostics: ASCII for the terminal, SVG files via Plotters.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;

/// Figure annotation comparing the recorded pressure with the calculated one.
pub fn difference_caption(percent_difference: f64) -> String {
    format!("% difference from calculated value = {percent_difference:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_caption_rounds_to_one_decimal() {
        assert_eq!(difference_caption(-41.447), "% difference from calculated value = -41.4%");
    }
}
