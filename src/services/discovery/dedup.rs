use crate::models::CityGroup;
use std::collections::HashMap;

/// Leave every point of interest in exactly one group.
///
/// For an id found in several groups, the owner is the first group (in
/// group order) whose municipality name occurs in the spot's first non-empty
/// address; failing that, the first group that contained it.
pub fn dedup_across_groups(groups: &mut [CityGroup]) {
    // id -> group indices, in group order
    let mut occurrences: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (group_idx, group) in groups.iter().enumerate() {
        for spot in &group.spots {
            let entry = occurrences.entry(spot.id.clone()).or_default();
            if entry.is_empty() {
                order.push(spot.id.clone());
            }
            if entry.last() != Some(&group_idx) {
                entry.push(group_idx);
            }
        }
    }

    for spot_id in order {
        let Some(group_indices) = occurrences.get(&spot_id) else {
            continue;
        };
        if group_indices.len() < 2 {
            continue;
        }

        let address = group_indices.iter().find_map(|&gi| {
            groups[gi]
                .spots
                .iter()
                .find(|s| s.id == spot_id)
                .and_then(|s| s.address.as_deref())
                .filter(|a| !a.trim().is_empty())
        });

        let owner = address
            .and_then(|address| {
                group_indices
                    .iter()
                    .copied()
                    .find(|&gi| address.contains(&groups[gi].municipality.name))
            })
            .unwrap_or(group_indices[0]);

        tracing::debug!(
            "Spot {} found in {} groups, keeping it under {}",
            spot_id,
            group_indices.len(),
            groups[owner].municipality.name
        );

        for &gi in group_indices {
            if gi != owner {
                groups[gi].spots.retain(|s| s.id != spot_id);
            }
        }
    }
}
