use geo::{coord, Coord};
use tracing::trace;

/// Label positions already taken during one draw pass.
///
/// A new label colliding with an earlier one is pushed down by `offset`. Instead of a single
/// shift, it keeps moving until clear or pushed [`Self::MAX_SHIFTS`] times, so a crowded
/// cluster still fans out. Earlier labels never move, so results depend on draw order.
#[derive(Clone, Debug, Default)]
pub struct PlacedLabels {
    threshold: f64,
    offset: f64,
    placed: Vec<Coord>,
}

impl PlacedLabels {
    pub const MAX_SHIFTS: usize = 4;

    pub fn new(threshold: f64, offset: f64) -> Self {
        Self {
            threshold,
            offset,
            placed: Vec::new(),
        }
    }

    pub fn collides(&self, at: Coord) -> bool {
        self.placed.iter().any(|placed| {
            (placed.x - at.x).abs() < self.threshold && (placed.y - at.y).abs() < self.threshold
        })
    }

    pub fn place(&mut self, anchor: Coord) -> Coord {
        let mut at = anchor;
        for _ in 0..Self::MAX_SHIFTS {
            if !self.collides(at) {
                break;
            }
            at = coord! { x: at.x, y: at.y + self.offset };
        }
        if at != anchor {
            trace!("label at {anchor:?} moved to {at:?}");
        }
        self.placed.push(at);
        at
    }
}

#[cfg(test)]
mod test {
    use geo::coord;
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::PlacedLabels;

    #[test]
    fn test_first_label_keeps_its_anchor() {
        let mut labels = PlacedLabels::new(18.0, 14.0);
        let anchor = coord! { x: 100.0, y: 100.0 };
        assert_eq_sorted!(labels.place(anchor), anchor);
    }

    #[test]
    fn test_colliding_label_is_pushed_down() {
        let mut labels = PlacedLabels::new(18.0, 14.0);
        labels.place(coord! { x: 100.0, y: 100.0 });
        assert_eq_sorted!(
            labels.place(coord! { x: 105.0, y: 95.0 }),
            coord! { x: 105.0, y: 123.0 }
        );
        // clear of both, only the x delta is small
        assert_eq_sorted!(
            labels.place(coord! { x: 100.0, y: 200.0 }),
            coord! { x: 100.0, y: 200.0 }
        );
        // collides with the first, then with the pushed one
        assert_eq_sorted!(
            labels.place(coord! { x: 100.0, y: 100.0 }),
            coord! { x: 100.0, y: 142.0 }
        );
        assert!(labels.collides(coord! { x: 100.0, y: 150.0 }));
        assert!(!labels.collides(coord! { x: 100.0, y: 170.0 }));
    }

    #[test]
    fn test_earlier_labels_never_move() {
        let mut labels = PlacedLabels::new(18.0, 14.0);
        let first = labels.place(coord! { x: 10.0, y: 10.0 });
        let second = labels.place(coord! { x: 10.0, y: 10.0 });
        assert_eq_sorted!(second, coord! { x: 10.0, y: 38.0 });
        // the original spot stays reserved
        assert!(labels.collides(first));
    }

    #[test]
    fn test_shifting_stops_after_max_shifts() {
        let mut labels = PlacedLabels::new(10.0, 14.0);
        let anchor = coord! { x: 0.0, y: 0.0 };
        for _ in 0..=PlacedLabels::MAX_SHIFTS {
            labels.place(anchor);
        }
        // every slot down the column is taken, the last label gives up and overlaps
        let last = labels.place(anchor);
        assert_eq_sorted!(last.y, 14.0 * PlacedLabels::MAX_SHIFTS as f64);
        assert!(labels.collides(last));
    }
}
