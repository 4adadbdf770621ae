//! Vector eraser: splits strokes around an eraser contact.
//!
//! Erasing never masks pixels. A stroke touched by the eraser is cut into the
//! runs of points that lie outside the eraser disk, and each run long enough
//! to draw becomes a stroke of its own.

use crate::history::Replacement;
use crate::stroke::{InkPoint, Stroke, StrokeId};
use kurbo::Point;
use std::collections::{HashMap, HashSet};

/// Result of one erase pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseOutcome {
    /// The full stroke list after erasing, in the original order.
    pub strokes: Vec<Stroke>,
    /// One entry per stroke that was touched.
    pub replacements: Vec<Replacement>,
}

impl EraseOutcome {
    /// Whether any stroke was touched.
    pub fn changed(&self) -> bool {
        !self.replacements.is_empty()
    }
}

/// Id of the `index`-th fragment cut from `parent`.
pub fn fragment_id(parent: &str, index: usize) -> StrokeId {
    format!("{parent}:{index}")
}

/// Like [`fragment_id`], suffixed with `~k` if the plain id is already taken.
///
/// The returned id is added to `taken`.
fn unique_fragment_id(parent: &str, index: usize, taken: &mut HashSet<StrokeId>) -> StrokeId {
    let plain = fragment_id(parent, index);
    let mut id = plain.clone();
    let mut attempt = 1;
    while taken.contains(&id) {
        id = format!("{plain}~{attempt}");
        attempt += 1;
    }
    taken.insert(id.clone());
    id
}

/// Erase every point within `radius` of `contact`.
pub fn erase(strokes: &[Stroke], contact: Point, radius: f64) -> EraseOutcome {
    let mut outcome = EraseOutcome {
        strokes: Vec::with_capacity(strokes.len()),
        replacements: Vec::new(),
    };
    let mut taken: HashSet<StrokeId> = strokes.iter().map(|s| s.id.clone()).collect();

    for stroke in strokes {
        match split_stroke(stroke, contact, radius, &mut taken) {
            Some(fragments) => {
                outcome.strokes.extend(fragments.iter().cloned());
                outcome.replacements.push(Replacement {
                    original: stroke.id.clone(),
                    fragments,
                });
            }
            None => outcome.strokes.push(stroke.clone()),
        }
    }
    outcome
}

/// Split one stroke, or return `None` if the eraser does not reach it.
///
/// Fragment ids avoid every id in `taken`, and are added to it.
pub fn split_stroke(
    stroke: &Stroke,
    contact: Point,
    radius: f64,
    taken: &mut HashSet<StrokeId>,
) -> Option<Vec<Stroke>> {
    let reach = stroke.bounds().inflate(radius, radius);
    if contact.x < reach.x0
        || contact.x > reach.x1
        || contact.y < reach.y0
        || contact.y > reach.y1
    {
        return None;
    }

    let inside = |p: &InkPoint| p.position().distance(contact) <= radius;
    if !stroke.points.iter().any(inside) {
        return None;
    }

    let fragments = stroke
        .points
        .split(inside)
        .filter(|run| run.len() >= 2)
        .enumerate()
        .map(|(n, run)| {
            Stroke::from_points(
                unique_fragment_id(&stroke.id, n, taken),
                run.to_vec(),
                stroke.style.clone(),
                stroke.created_at_ms,
            )
        })
        .collect();
    Some(fragments)
}

/// Erasing along a whole gesture, recorded as a single history entry.
#[derive(Debug, Clone)]
pub struct EraseSession {
    radius: f64,
    /// Working copy of the visible strokes.
    strokes: Vec<Stroke>,
    /// Maps every fragment id back to the stroke it was first cut from.
    roots: HashMap<StrokeId, StrokeId>,
    /// Roots touched so far, in the order they were first touched.
    touched: Vec<StrokeId>,
    last_contact: Option<Point>,
}

impl EraseSession {
    /// Start a session over the currently visible strokes.
    pub fn new(visible: &[Stroke], radius: f64) -> Self {
        Self {
            radius,
            strokes: visible.to_vec(),
            roots: HashMap::new(),
            touched: Vec::new(),
            last_contact: None,
        }
    }

    /// Strokes as they look with the session applied so far.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Erase at `contact`, also covering the path from the previous contact.
    ///
    /// Returns `true` if any stroke changed.
    pub fn erase_to(&mut self, contact: Point) -> bool {
        let from = self.last_contact.unwrap_or(contact);
        self.last_contact = Some(contact);

        // Step at half the radius so a fast swipe leaves no islands.
        let step = (self.radius / 2.0).max(0.5);
        let steps = (from.distance(contact) / step).ceil().max(1.0) as usize;

        let mut changed = false;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            changed |= self.erase_at(from.lerp(contact, t));
        }
        changed
    }

    fn erase_at(&mut self, contact: Point) -> bool {
        let outcome = erase(&self.strokes, contact, self.radius);
        if !outcome.changed() {
            return false;
        }

        for replacement in &outcome.replacements {
            let root = self
                .roots
                .get(&replacement.original)
                .cloned()
                .unwrap_or_else(|| replacement.original.clone());
            if !self.touched.contains(&root) {
                self.touched.push(root.clone());
            }
            for fragment in &replacement.fragments {
                self.roots.insert(fragment.id.clone(), root.clone());
            }
        }
        self.strokes = outcome.strokes;
        true
    }

    /// Finish the session, returning one replacement per touched stroke.
    pub fn finish(self) -> Vec<Replacement> {
        self.touched
            .iter()
            .map(|root| Replacement {
                original: root.clone(),
                fragments: self
                    .strokes
                    .iter()
                    .filter(|s| self.roots.get(&s.id) == Some(root))
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::stroke::StyleOptions;

    fn horizontal(id: &str, n: usize) -> Stroke {
        let points = (0..n)
            .map(|i| InkPoint::new(i as f64 * 10.0, 0.0, Some(0.5), i as i64))
            .collect();
        let style = StyleOptions {
            color: "#123456".to_string(),
            ..StyleOptions::default()
        };
        Stroke::from_points(id.to_string(), points, style, 42)
    }

    #[test]
    fn test_untouched_stroke_is_kept() {
        let strokes = vec![horizontal("a", 5)];
        let outcome = erase(&strokes, Point::new(0.0, 100.0), 5.0);
        assert!(!outcome.changed());
        assert_eq!(outcome.strokes, strokes);
    }

    #[test]
    fn test_stroke_inside_radius_vanishes() {
        let strokes = vec![horizontal("a", 5)];
        let outcome = erase(&strokes, Point::new(20.0, 0.0), 100.0);
        assert!(outcome.strokes.is_empty());
        assert_eq!(outcome.replacements.len(), 1);
        assert!(outcome.replacements[0].fragments.is_empty());
    }

    #[test]
    fn test_midpoint_erase_yields_two_fragments() {
        let strokes = vec![horizontal("a", 9)];
        let outcome = erase(&strokes, Point::new(40.0, 0.0), 1.0);

        assert_eq!(outcome.strokes.len(), 2);
        let (left, right) = (&outcome.strokes[0], &outcome.strokes[1]);
        assert_eq!(left.points.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(right.points.iter().map(|p| p.x).collect::<Vec<_>>(), vec![50.0, 60.0, 70.0, 80.0]);
        assert_eq!(left.style, strokes[0].style);
        assert_eq!(right.style, strokes[0].style);
        assert_eq!(left.id, "a:0");
        assert_eq!(right.id, "a:1");
        assert_eq!(left.created_at_ms, 42);
    }

    #[test]
    fn test_single_point_leftovers_are_dropped() {
        // Erasing x=10 leaves a lone point at x=0.
        let strokes = vec![horizontal("a", 4)];
        let outcome = erase(&strokes, Point::new(10.0, 0.0), 1.0);
        assert_eq!(outcome.strokes.len(), 1);
        assert_eq!(outcome.strokes[0].len(), 2);
    }

    #[test]
    fn test_order_is_preserved_across_strokes() {
        let strokes = vec![horizontal("a", 9), horizontal("b", 2), horizontal("c", 9)];
        let outcome = erase(&strokes, Point::new(40.0, 0.0), 1.0);
        let ids: Vec<&str> = outcome.strokes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a:0", "a:1", "b", "c:0", "c:1"]);
    }

    #[test]
    fn test_fragment_ids_never_collide() {
        let mut other = horizontal("a:0", 3);
        other.transform(kurbo::Affine::translate((0.0, 50.0)));
        let strokes = vec![horizontal("a", 9), other];

        let outcome = erase(&strokes, Point::new(40.0, 0.0), 1.0);
        let ids: Vec<&str> = outcome.strokes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a:0~1", "a:1", "a:0"]);

        // A later pass on the untouched stroke still finds the right one.
        let mut history = History::default();
        history.load(strokes);
        history.replace(outcome.replacements);
        let second = erase(history.visible(), Point::new(10.0, 50.0), 1.0);
        assert_eq!(second.replacements.len(), 1);
        assert_eq!(second.replacements[0].original, "a:0");
        history.replace(second.replacements);
        let ids: Vec<&str> = history.visible().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a:0~1", "a:1"]);
    }

    #[test]
    fn test_session_folds_into_one_entry() {
        let mut history = History::default();
        history.commit(horizontal("a", 9));

        let mut session = EraseSession::new(history.visible(), 1.0);
        assert!(session.erase_to(Point::new(20.0, 0.0)));
        assert!(session.erase_to(Point::new(60.0, 0.0)));
        assert_eq!(session.strokes().len(), 2);

        let replacements = session.finish();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].original, "a");
        history.replace(replacements);

        // The swipe from 20 to 60 removes everything in between.
        let xs: Vec<Vec<f64>> = history
            .visible()
            .iter()
            .map(|s| s.points.iter().map(|p| p.x).collect())
            .collect();
        assert_eq!(xs, vec![vec![0.0, 10.0], vec![70.0, 80.0]]);

        history.undo();
        assert_eq!(history.visible().len(), 1);
        assert_eq!(history.visible()[0].id, "a");
    }

    #[test]
    fn test_session_without_hits_records_nothing() {
        let strokes = vec![horizontal("a", 3)];
        let mut session = EraseSession::new(&strokes, 2.0);
        assert!(!session.erase_to(Point::new(500.0, 500.0)));
        assert!(session.finish().is_empty());
    }
}
