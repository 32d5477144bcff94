use std::collections::HashSet;

use tracing::{debug, warn};

use crate::procedure::{map_index, Leg, MergedLegSequence, Procedure, RUNWAY_PREFIX};

/// Splits at the MAP: `before` excludes it, `after` starts with it.
fn split_at_map(legs: &[Leg]) -> (&[Leg], &[Leg]) {
    match map_index(legs) {
        Some(idx) => legs.split_at(idx),
        None => (legs, &[]),
    }
}

fn step_down_designator(leg: &Leg) -> Option<&str> {
    leg.fix_designator()
        .filter(|designator| !designator.is_empty() && !designator.starts_with(RUNWAY_PREFIX))
}

pub fn merge(precision: &Procedure, non_precision: Option<&Procedure>) -> MergedLegSequence {
    let Some(non_precision) = non_precision else {
        return MergedLegSequence(precision.legs.clone());
    };
    if !precision.is_mergeable_with(non_precision) {
        warn!(
            "{} {} cannot be merged with {}, using it unchanged",
            precision.airport, precision.identifier, non_precision.identifier
        );
        return MergedLegSequence(precision.legs.clone());
    }

    let (before, after) = split_at_map(&precision.legs);
    let (np_before, np_after) = split_at_map(&non_precision.legs);

    let mut known: HashSet<&str> = before.iter().filter_map(step_down_designator).collect();
    let inserted: Vec<Leg> = np_before
        .iter()
        .filter(|leg| step_down_designator(leg).is_some_and(|designator| known.insert(designator)))
        .cloned()
        .collect();

    if inserted.is_empty() {
        debug!(
            "{}: no step-down fixes missing from {}",
            non_precision.identifier, precision.identifier
        );
        return MergedLegSequence(precision.legs.clone());
    }
    debug!(
        "{}: inserting {:?} from {}",
        precision.identifier,
        inserted
            .iter()
            .filter_map(Leg::fix_designator)
            .collect::<Vec<_>>(),
        non_precision.identifier
    );

    let mut legs: Vec<Leg> = before.iter().cloned().chain(inserted).collect();
    // stable: ties keep precision legs ahead of inserted ones
    legs.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));

    let mut after = after.to_vec();
    if let (Some(first), Some(np_map)) = (after.first_mut(), np_after.first()) {
        first.distance = np_map.distance;
    }
    legs.extend(after);

    MergedLegSequence(legs)
}
