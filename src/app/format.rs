//! Quality and format resolution
//!
//! Builds the stream-selection expression handed to the fetch engine and
//! resolves a fallback height when the probe shows the requested quality is
//! not offered for a resource.

use tracing::debug;

use super::models::Quality;

/// Build the format-selection expression for a request
///
/// Audio-only requests always select best audio with a best-overall fallback.
/// Video requests use a three-tier chain: best video plus container-compatible
/// audio, then best video plus any audio, then a single best muxed stream.
/// For a specific target height every video alternative is capped at
/// `height <= h`.
pub fn build_format_expression(audio_only: bool, quality: Quality) -> String {
    if audio_only {
        return "bestaudio/best".to_string();
    }
    match quality.height() {
        None => "bestvideo+bestaudio[ext=m4a]/bestvideo+bestaudio/best".to_string(),
        Some(h) => capped_expression(h),
    }
}

/// The three-tier selection chain capped at a concrete height
pub fn capped_expression(height: u32) -> String {
    format!(
        "bestvideo[height<={h}]+bestaudio[ext=m4a]/bestvideo[height<={h}]+bestaudio/best[height<={h}]",
        h = height
    )
}

/// Resolve the height to actually request given what the resource offers
///
/// Returns the requested height unchanged when available. Otherwise picks the
/// available height closest to the request; on an exact tie the higher
/// candidate wins (heights are scanned in descending order and the first
/// minimum is kept).
pub fn resolve_fallback(requested: u32, available: &[u32]) -> Option<u32> {
    if available.is_empty() {
        return None;
    }
    if available.contains(&requested) {
        return Some(requested);
    }

    let mut heights: Vec<u32> = available.to_vec();
    heights.sort_unstable_by(|a, b| b.cmp(a));

    let chosen = heights
        .into_iter()
        .min_by_key(|h| requested.abs_diff(*h))?;
    debug!(
        "Requested height {} unavailable, falling back to {}",
        requested, chosen
    );
    Some(chosen)
}

/// Extract the distinct available heights from probed stream formats,
/// descending
pub fn available_heights(heights: impl IntoIterator<Item = Option<u32>>) -> Vec<u32> {
    let mut out: Vec<u32> = heights.into_iter().flatten().collect();
    out.sort_unstable_by(|a, b| b.cmp(a));
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_expression_ignores_quality() {
        assert_eq!(
            build_format_expression(true, Quality::P720),
            "bestaudio/best"
        );
        assert_eq!(build_format_expression(true, Quality::Best), "bestaudio/best");
    }

    #[test]
    fn best_video_expression_has_three_tiers() {
        let expr = build_format_expression(false, Quality::Best);
        assert_eq!(
            expr,
            "bestvideo+bestaudio[ext=m4a]/bestvideo+bestaudio/best"
        );
    }

    #[test]
    fn capped_expression_caps_every_tier() {
        let expr = build_format_expression(false, Quality::P720);
        assert_eq!(
            expr,
            "bestvideo[height<=720]+bestaudio[ext=m4a]/bestvideo[height<=720]+bestaudio/best[height<=720]"
        );
    }

    #[test]
    fn fallback_returns_exact_match() {
        assert_eq!(resolve_fallback(720, &[1080, 720, 480]), Some(720));
    }

    #[test]
    fn fallback_picks_closest_height() {
        // 900 is 180 away from 1080 and 180 from 720: tie, higher wins
        assert_eq!(resolve_fallback(900, &[1080, 720]), Some(1080));
        // Clean win: 850 is 130 from 720 and 110 from 960
        assert_eq!(resolve_fallback(850, &[720, 960]), Some(960));
    }

    #[test]
    fn fallback_exact_tie_prefers_higher() {
        // |800-600| == |800-1000| == 200
        assert_eq!(resolve_fallback(800, &[600, 1000]), Some(1000));
        assert_eq!(resolve_fallback(800, &[1000, 600]), Some(1000));
    }

    #[test]
    fn fallback_with_no_candidates() {
        assert_eq!(resolve_fallback(1080, &[]), None);
    }

    #[test]
    fn heights_are_deduplicated_and_sorted_descending() {
        let heights = available_heights(vec![Some(720), None, Some(1080), Some(720), Some(360)]);
        assert_eq!(heights, vec![1080, 720, 360]);
    }
}
