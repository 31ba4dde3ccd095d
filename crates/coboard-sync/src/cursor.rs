//! Remote cursor prediction and interpolation.
//!
//! Network cursor samples arrive at an uneven, latent cadence; rendering
//! them raw makes remote pointers teleport. Each user gets a small track
//! that the render loop interpolates between the last two samples, with a
//! bounded forward extrapolation when samples stop arriving. Purely a
//! smoothing layer: shape state is never affected.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kurbo::{Affine, Point, Vec2};

/// Tween window between two samples.
pub const CURSOR_TWEEN: Duration = Duration::from_millis(80);

/// Upper bound on forward extrapolation once the tween is exhausted.
pub const MAX_EXTRAPOLATION: Duration = Duration::from_millis(50);

/// Extrapolation is half-weighted so a stalled stream eases out instead of
/// shooting off along the last velocity.
const EXTRAPOLATION_WEIGHT: f64 = 0.5;

/// Tracks silent for this long are dropped from the presence display.
const STALE_AFTER: Duration = Duration::from_secs(5);

/// One remote pointer observation, in canvas coordinates.
#[derive(Debug, Clone)]
pub struct CursorSample {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
    pub pos: Point,
    pub received_at: Instant,
}

/// A smoothed remote cursor ready for rendering, in screen coordinates.
#[derive(Debug, Clone)]
pub struct RemoteCursor {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
    pub pos: Point,
}

#[derive(Debug)]
struct CursorTrack {
    user_name: String,
    color: String,
    last: Point,
    target: Point,
    velocity: Vec2,
    last_update: Instant,
}

impl CursorTrack {
    fn displayed(&self, now: Instant) -> Point {
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed <= CURSOR_TWEEN {
            let t = elapsed.as_secs_f64() / CURSOR_TWEEN.as_secs_f64();
            self.last.lerp(self.target, t)
        } else {
            let overshoot = (elapsed - CURSOR_TWEEN).min(MAX_EXTRAPOLATION);
            self.target + self.velocity * overshoot.as_secs_f64() * EXTRAPOLATION_WEIGHT
        }
    }
}

/// Per-user cursor state machine driven by the render loop.
#[derive(Debug)]
pub struct CursorInterpolator {
    tracks: HashMap<String, CursorTrack>,
    /// Canvas-to-screen transform applied to incoming samples.
    to_screen: Affine,
}

impl Default for CursorInterpolator {
    fn default() -> Self {
        Self {
            tracks: HashMap::new(),
            to_screen: Affine::IDENTITY,
        }
    }
}

impl CursorInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canvas-to-screen transform (camera pan/zoom).
    pub fn set_view_transform(&mut self, to_screen: Affine) {
        self.to_screen = to_screen;
    }

    /// Ingest one network sample; supersedes the previous one for the user.
    pub fn observe(&mut self, sample: CursorSample) {
        let screen = self.to_screen * sample.pos;
        match self.tracks.get_mut(&sample.user_id) {
            Some(track) => {
                let dt = sample
                    .received_at
                    .saturating_duration_since(track.last_update)
                    .as_secs_f64();
                track.velocity = if dt > 0.0 {
                    (screen - track.target) / dt
                } else {
                    Vec2::ZERO
                };
                track.last = track.target;
                track.target = screen;
                track.last_update = sample.received_at;
                track.user_name = sample.user_name;
                track.color = sample.color;
            }
            None => {
                self.tracks.insert(
                    sample.user_id,
                    CursorTrack {
                        user_name: sample.user_name,
                        color: sample.color,
                        last: screen,
                        target: screen,
                        velocity: Vec2::ZERO,
                        last_update: sample.received_at,
                    },
                );
            }
        }
    }

    /// Smoothed position for one user at render time.
    pub fn position(&self, user_id: &str, now: Instant) -> Option<Point> {
        self.tracks.get(user_id).map(|track| track.displayed(now))
    }

    /// Smoothed positions for every tracked user at render time.
    pub fn positions(&self, now: Instant) -> Vec<RemoteCursor> {
        self.tracks
            .iter()
            .map(|(user_id, track)| RemoteCursor {
                user_id: user_id.clone(),
                user_name: track.user_name.clone(),
                color: track.color.clone(),
                pos: track.displayed(now),
            })
            .collect()
    }

    /// Drop tracks that have not been updated recently.
    pub fn prune_stale(&mut self, now: Instant) {
        self.tracks
            .retain(|_, track| now.saturating_duration_since(track.last_update) < STALE_AFTER);
    }

    /// Drop one user's track (graceful departure).
    pub fn remove_user(&mut self, user_id: &str) {
        self.tracks.remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(user: &str, x: f64, y: f64, at: Instant) -> CursorSample {
        CursorSample {
            user_id: user.to_string(),
            user_name: user.to_uppercase(),
            color: "#ff0000".to_string(),
            pos: Point::new(x, y),
            received_at: at,
        }
    }

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_first_sample_is_displayed_as_is() {
        let mut interp = CursorInterpolator::new();
        let t0 = Instant::now();
        interp.observe(sample("a", 100.0, 100.0, t0));

        let pos = interp.position("a", t0).unwrap();
        assert!(approx(pos, Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_lerp_midway_through_tween() {
        let mut interp = CursorInterpolator::new();
        let t0 = Instant::now();
        interp.observe(sample("a", 0.0, 0.0, t0));
        let t1 = t0 + Duration::from_millis(100);
        interp.observe(sample("a", 80.0, 0.0, t1));

        // Halfway through the 80ms tween: halfway between 0 and 80.
        let pos = interp.position("a", t1 + Duration::from_millis(40)).unwrap();
        assert!(approx(pos, Point::new(40.0, 0.0)));

        // Tween complete: sitting on the target.
        let pos = interp.position("a", t1 + CURSOR_TWEEN).unwrap();
        assert!(approx(pos, Point::new(80.0, 0.0)));
    }

    #[test]
    fn test_extrapolation_is_bounded() {
        let mut interp = CursorInterpolator::new();
        let t0 = Instant::now();
        interp.observe(sample("a", 0.0, 0.0, t0));
        let t1 = t0 + Duration::from_millis(100);
        interp.observe(sample("a", 100.0, 0.0, t1));

        // Velocity is 100px / 100ms = 1 px/ms. At 30ms past the tween the
        // half-weighted extrapolation adds 15px.
        let pos = interp
            .position("a", t1 + CURSOR_TWEEN + Duration::from_millis(30))
            .unwrap();
        assert!(approx(pos, Point::new(115.0, 0.0)));

        // Long after samples stop, the overshoot is capped at 50ms worth.
        let pos = interp
            .position("a", t1 + Duration::from_secs(2))
            .unwrap();
        assert!(approx(pos, Point::new(125.0, 0.0)));
    }

    #[test]
    fn test_view_transform_converts_to_screen_space() {
        let mut interp = CursorInterpolator::new();
        interp.set_view_transform(Affine::scale(2.0).then_translate(Vec2::new(10.0, 0.0)));

        let t0 = Instant::now();
        interp.observe(sample("a", 50.0, 50.0, t0));
        let pos = interp.position("a", t0).unwrap();
        assert!(approx(pos, Point::new(110.0, 100.0)));
    }

    #[test]
    fn test_prune_stale_and_remove() {
        let mut interp = CursorInterpolator::new();
        let t0 = Instant::now();
        interp.observe(sample("a", 0.0, 0.0, t0));
        interp.observe(sample("b", 0.0, 0.0, t0 + Duration::from_secs(4)));

        interp.prune_stale(t0 + Duration::from_secs(6));
        assert!(interp.position("a", t0).is_none());
        assert!(interp.position("b", t0).is_some());

        interp.remove_user("b");
        assert!(interp.is_empty());
    }

    #[test]
    fn test_positions_reports_all_users() {
        let mut interp = CursorInterpolator::new();
        let t0 = Instant::now();
        interp.observe(sample("a", 1.0, 1.0, t0));
        interp.observe(sample("b", 2.0, 2.0, t0));

        let mut cursors = interp.positions(t0);
        cursors.sort_by(|l, r| l.user_id.cmp(&r.user_id));
        assert_eq!(interp.len(), 2);
        assert_eq!(cursors.len(), 2);
        assert_eq!(cursors[0].user_name, "A");
        assert_eq!(cursors[1].user_id, "b");
    }
}
