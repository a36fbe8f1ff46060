//! Status line shown to the operator while framing the sample card.

/// Derive the status line; first matching rule wins.
pub fn status_message(
    detected_count: u8,
    min_fiducials: u8,
    fiducial_ready: bool,
    fiducial_quality: f32,
    alignment_score: f32,
    start_threshold: f32,
) -> String {
    if detected_count == 0 {
        "looking for corner markers".to_string()
    } else if detected_count < min_fiducials {
        format!(
            "found {}/{} corners, adjust position",
            detected_count, min_fiducials
        )
    } else if !fiducial_ready {
        format!(
            "all corners found, improve alignment ({:.0}%)",
            fiducial_quality * 100.0
        )
    } else if alignment_score < start_threshold {
        "corners detected, hold steady".to_string()
    } else {
        "all corners detected, auto capture arming".to_string()
    }
}
