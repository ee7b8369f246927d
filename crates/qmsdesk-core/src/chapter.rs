//! Sort key normalisation for QM chapter references.
//!
//! Chapter codes follow the ISO 9001 clause layout ("4", "4.2", "7.1.5",
//! "10.2") with the occasional annex reference ("A.1"). Plain string
//! ordering puts "10" before "4" and "7.10" before "7.2"; the key produced
//! here recovers the handbook order.
//!
//! # Key layout
//!
//! - Each dot-separated segment becomes one key segment.
//! - Numeric segments are zero-padded to 3 digits: "4" -> "004".
//! - Non-numeric segments sort after every numeric one: "A" -> "~A".
//! - Keys are padded to 4 segments with "000".

const KEY_SEGMENTS: usize = 4;

/// Normalise a QM chapter reference into a lexicographically-sortable string.
///
/// Input: "4.2", "7.1.5", "10", "A.1"
/// Output: "004.002.000.000", "007.001.005.000", "010.000.000.000", "~A.001.000.000"
pub fn chapter_sort_key(chapter: &str) -> String {
    let chapter = chapter.trim().trim_end_matches('.');
    if chapter.is_empty() {
        return vec!["000"; KEY_SEGMENTS].join(".");
    }

    let mut segments: Vec<String> = chapter
        .split('.')
        .map(str::trim)
        .take(KEY_SEGMENTS)
        .map(|seg| match seg.parse::<u32>() {
            Ok(n) => format!("{n:03}"),
            Err(_) => format!("~{}", seg.to_ascii_uppercase()),
        })
        .collect();

    while segments.len() < KEY_SEGMENTS {
        segments.push("000".to_string());
    }

    segments.join(".")
}
