use std::cmp::Ordering;

use crate::{
    candidate::{ContributorGroup, Fitter, FullSphere},
    PlacementError,
};

#[derive(Debug)]
pub enum MergeOutcome {
    Groups(Vec<ContributorGroup>),
    FullSphere,
}

fn first_overlap(groups: &[ContributorGroup]) -> Option<(usize, usize)> {
    (0..groups.len())
        .flat_map(|i| (i + 1..groups.len()).map(move |j| (i, j)))
        .find(|&(i, j)| {
            groups[i]
                .candidate
                .coverage
                .overlaps(&groups[j].candidate.coverage)
        })
}

/// Orders two groups so the one that survives a merge comes first: more members wins,
/// then the larger coverage, then the earlier group.
fn survivor(groups: &[ContributorGroup], i: usize, j: usize) -> (usize, usize) {
    let size = |k: usize| {
        (
            groups[k].members.len(),
            groups[k].candidate.sensor.coverage(),
        )
    };
    let (a, b) = (size(i), size(j));

    match a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)) {
        Ordering::Less => (j, i),
        Ordering::Equal | Ordering::Greater => (i, j),
    }
}

/// Merges overlapping groups until no pair overlaps. Every merge removes one group, so
/// `groups + 1` passes always suffice.
pub fn merge_overlapping(
    fitter: &Fitter,
    mut groups: Vec<ContributorGroup>,
) -> Result<MergeOutcome, PlacementError> {
    let ceiling = groups.len() + 1;

    for _ in 0..ceiling {
        let Some((i, j)) = first_overlap(&groups) else {
            return Ok(MergeOutcome::Groups(groups));
        };

        let (keep, absorb) = survivor(&groups, i, j);
        let absorbed = groups.remove(absorb);
        let keep = if keep > absorb { keep - 1 } else { keep };

        log::debug!(
            "Merging group of {} into group of {}",
            absorbed.members.len(),
            groups[keep].members.len()
        );

        if let Err(FullSphere) = fitter.absorb(&mut groups[keep], absorbed) {
            return Ok(MergeOutcome::FullSphere);
        }
    }

    Err(PlacementError::MergeDidNotConverge {
        passes: ceiling,
        groups: groups.len(),
    })
}
