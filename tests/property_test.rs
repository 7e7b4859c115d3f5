use invoice_ocr::preprocessing::steps::resize::{target_dimensions, Resize};
use invoice_ocr::report::ConfidenceBand;
use invoice_ocr::{Point, Region, Transcript};
use proptest::prelude::*;

/// Property: every confidence maps to exactly one band, split at 0.50 and 0.80
#[test]
fn proptest_band_classification_is_total() {
    proptest!(|(confidence in 0.0f32..=1.0f32)| {
        let band = ConfidenceBand::classify(confidence);
        let expected = if confidence > 0.8 {
            ConfidenceBand::High
        } else if confidence >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        };
        prop_assert_eq!(band, expected);
    });
}

/// Property: the full text has one token per region, in region order
#[test]
fn proptest_full_text_tokens_match_regions() {
    proptest!(|(texts in prop::collection::vec("[A-Za-z0-9$.\\-]{0,12}", 0..20))| {
        let regions: Vec<Region> = texts
            .iter()
            .map(|t| Region::new(vec![Point::new(0.0, 0.0)], t.clone(), 0.5))
            .collect();
        let transcript = Transcript::from_regions(regions);

        if texts.is_empty() {
            prop_assert_eq!(transcript.full_text.as_str(), "");
        } else {
            let tokens: Vec<&str> = transcript.full_text.split(' ').collect();
            prop_assert_eq!(tokens.len(), transcript.regions.len());
            for (token, region) in tokens.iter().zip(&transcript.regions) {
                prop_assert_eq!(*token, region.text.as_str());
            }
        }
    });
}

/// Property: the larger side lands in [800, 1920] unless the 1.5x upscale cap
/// stops short, and in-range images are left alone
#[test]
fn proptest_resize_targets_working_range() {
    proptest!(|(width in 1u32..6000, height in 1u32..6000)| {
        let longest = width.max(height);
        match target_dimensions(width, height, 1920, 800, 1.5) {
            Resize::Down(w, h) => {
                prop_assert!(longest > 1920);
                prop_assert_eq!(w.max(h), 1920);
                prop_assert!(w <= width && h <= height);
            }
            Resize::Up(w, h) => {
                prop_assert!(longest < 800);
                prop_assert!(w >= width && h >= height);
                let new_longest = w.max(h);
                if longest as f64 * 1.5 >= 800.0 {
                    prop_assert_eq!(new_longest, 800);
                } else {
                    prop_assert!(new_longest < 800);
                    prop_assert!(new_longest as f64 <= longest as f64 * 1.5);
                }
            }
            Resize::Keep => {
                prop_assert!((800..=1920).contains(&longest) || longest as f64 * 1.5 < longest as f64 + 1.0);
            }
        }
    });
}
