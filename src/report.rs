//! Human-readable rendering of extraction results

use crate::detector::Region;
use crate::extractor::ExtractionResult;
use serde::Serialize;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

/// Coarse confidence tier used for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// HIGH above 0.80, MEDIUM in [0.50, 0.80], LOW below 0.50
    pub fn classify(confidence: f32) -> Self {
        if confidence > 0.8 {
            Self::High
        } else if confidence >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Fixed-width tag for the per-region listing
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "[HIGH]",
            Self::Medium => "[MED] ",
            Self::Low => "[LOW] ",
        }
    }
}

/// Aggregate figures over a transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    /// Mean region confidence in [0, 1]; 0 when there are no regions
    pub mean_confidence: f32,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub characters: usize,
}

impl Statistics {
    pub fn from_regions(regions: &[Region], full_text: &str) -> Self {
        let count = regions.len();
        let mean_confidence = if count == 0 {
            0.0
        } else {
            regions.iter().map(|r| r.confidence).sum::<f32>() / count as f32
        };

        let band_count = |band: ConfidenceBand| {
            regions
                .iter()
                .filter(|r| ConfidenceBand::classify(r.confidence) == band)
                .count()
        };

        Self {
            count,
            mean_confidence,
            high: band_count(ConfidenceBand::High),
            medium: band_count(ConfidenceBand::Medium),
            low: band_count(ConfidenceBand::Low),
            characters: full_text.chars().count(),
        }
    }

    pub fn from_result(result: &ExtractionResult) -> Self {
        Self::from_regions(result.regions(), result.full_text())
    }
}

/// One `█` per ten percentage points
pub fn confidence_bar(confidence: f32) -> String {
    let units = (confidence.clamp(0.0, 1.0) * 100.0 / 10.0).floor() as usize;
    "█".repeat(units)
}

/// Render a result as the terminal report
pub fn render(result: &ExtractionResult) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let transcript = match result {
        ExtractionResult::Failure { message, .. } => {
            let _ = writeln!(out, "\nExtraction failed: {}", message);
            return out;
        }
        ExtractionResult::Success(t) => t,
    };

    if transcript.full_text.is_empty() && transcript.regions.is_empty() {
        let _ = writeln!(out, "\nNo text was detected in the image");
        return out;
    }

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "EXTRACTED TEXT FROM INVOICE");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", transcript.full_text);
    let _ = writeln!(out, "{}", rule);

    if !transcript.regions.is_empty() {
        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "WORD-LEVEL DETAILS (with confidence scores)");
        let _ = writeln!(out, "{}", rule);
        for (i, region) in transcript.regions.iter().enumerate() {
            let band = ConfidenceBand::classify(region.confidence);
            let _ = writeln!(
                out,
                "{} {:3}. {:<25} | Confidence: {:5.1}% {}",
                band.label(),
                i + 1,
                region.text,
                region.confidence * 100.0,
                confidence_bar(region.confidence)
            );
        }
    }

    let stats = Statistics::from_regions(&transcript.regions, &transcript.full_text);
    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "STATISTICS");
    let _ = writeln!(out, "{}", rule);
    if stats.count > 0 {
        let _ = writeln!(out, "Total words detected: {}", stats.count);
        let _ = writeln!(
            out,
            "Average confidence: {:.2}%",
            stats.mean_confidence * 100.0
        );
        let _ = writeln!(out, "High confidence (>80%): {} words", stats.high);
        let _ = writeln!(out, "Medium confidence (50-80%): {} words", stats.medium);
        let _ = writeln!(out, "Low confidence (<50%): {} words", stats.low);
    }
    let _ = writeln!(out, "Character count: {}", stats.characters);
    let _ = writeln!(out, "Lines detected: {}", stats.count);
    let _ = writeln!(out, "{}\n", rule);

    let _ = writeln!(out, "TIPS FOR BETTER RESULTS:");
    let _ = writeln!(
        out,
        "- Check the 'preprocessed_*' image to see if preprocessing helped"
    );
    let _ = writeln!(
        out,
        "- Use good lighting and high resolution images (300 DPI or higher)"
    );
    let _ = writeln!(out, "- Ensure text is dark on light background");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::extractor::Transcript;

    fn region(text: &str, confidence: f32) -> Region {
        Region::new(vec![], text, confidence)
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ConfidenceBand::classify(0.0), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::classify(0.4999), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::classify(0.5), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::classify(0.8), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::classify(0.8001), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::classify(1.0), ConfidenceBand::High);
    }

    #[test]
    fn test_confidence_bar_units() {
        assert_eq!(confidence_bar(0.0), "");
        assert_eq!(confidence_bar(0.92), "█████████");
        assert_eq!(confidence_bar(1.0).chars().count(), 10);
    }

    #[test]
    fn test_statistics() {
        let regions = vec![region("INV-001", 0.92), region("$45.00", 0.55)];
        let stats = Statistics::from_regions(&regions, "INV-001 $45.00");
        assert_eq!(stats.count, 2);
        assert!((stats.mean_confidence - 0.735).abs() < 1e-6);
        assert_eq!((stats.high, stats.medium, stats.low), (1, 1, 0));
        assert_eq!(stats.characters, 14);
    }

    #[test]
    fn test_render_lists_regions() {
        let result = ExtractionResult::Success(Transcript::from_regions(vec![
            region("INV-001", 0.92),
            region("$45.00", 0.55),
            region("smudge", 0.2),
        ]));
        let report = render(&result);
        assert!(report.contains("INV-001 $45.00 smudge"));
        assert!(report.contains("[HIGH]   1. INV-001"));
        assert!(report.contains("[MED]    2. $45.00"));
        assert!(report.contains("[LOW]    3. smudge"));
        assert!(report.contains("Total words detected: 3"));
    }

    #[test]
    fn test_render_degenerate_results() {
        let empty = ExtractionResult::Success(Transcript::from_regions(vec![]));
        assert!(render(&empty).contains("No text was detected"));

        let failed = ExtractionResult::Failure {
            kind: ErrorKind::FileNotFound,
            message: "Image not found: x.jpg".to_string(),
        };
        assert!(render(&failed).contains("Extraction failed: Image not found: x.jpg"));

        let blank = ExtractionResult::Success(Transcript::from_regions(vec![region("", 0.1)]));
        let stats = Statistics::from_result(&blank);
        assert_eq!(stats.count, 1);
        assert!(render(&blank).contains("Total words detected: 1"));
    }
}
