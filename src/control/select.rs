use serde::Deserialize;

use crate::detect::Detection;
use crate::frame::FrameGeometry;

/// How to pick the tracked subject among this frame's detections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Largest bounding box, as a proxy for the closest subject.
    #[default]
    Largest,
    /// Highest model confidence.
    Confident,
    /// Box centre nearest the frame centre.
    Central,
}

/// Pick one detection, or `None` when there is nothing to track.
///
/// Ties keep the earliest detection.
pub fn select_target<I>(
    detections: I,
    policy: SelectionPolicy,
    geometry: FrameGeometry,
) -> Option<Detection>
where
    I: IntoIterator<Item = Detection>,
{
    let (cx, cy) = geometry.center();
    let score = |d: &Detection| -> f32 {
        match policy {
            SelectionPolicy::Largest => d.bbox.area(),
            SelectionPolicy::Confident => d.confidence,
            SelectionPolicy::Central => {
                let (bx, by) = d.bbox.center();
                -((bx - cx).powi(2) + (by - cy).powi(2))
            }
        }
    };

    detections
        .into_iter()
        .fold(None, |best: Option<(f32, Detection)>, d| {
            let s = score(&d);
            match best {
                Some((best_score, _)) if s <= best_score => best,
                _ => Some((s, d)),
            }
        })
        .map(|(_, d)| d)
}
