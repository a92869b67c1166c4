use crate::constants::DISTANCE_MATRIX_MAX_DESTINATIONS;
use crate::error::{AppError, Result};
use crate::models::{Budget, BudgetKind, Coordinates};
use crate::services::distance_matrix::{Destination, RouteElement, RoutingClient};
use crate::services::upstream::with_deadline;
use futures::stream::{self, StreamExt};
use std::time::Duration;

/// Route `destinations` in chunks the upstream accepts.
///
/// The output is aligned with `destinations`. Entries of a chunk whose call
/// failed are `None`; the error only propagates when every chunk failed.
pub async fn route_in_chunks(
    routing: &dyn RoutingClient,
    origin: &Coordinates,
    destinations: &[Destination],
    concurrency: usize,
    timeout: Duration,
) -> Result<Vec<Option<RouteElement>>> {
    if destinations.is_empty() {
        return Ok(Vec::new());
    }

    let chunks: Vec<Vec<Destination>> = destinations
        .chunks(DISTANCE_MATRIX_MAX_DESTINATIONS)
        .map(<[Destination]>::to_vec)
        .collect();
    let chunk_count = chunks.len();

    let results: Vec<Result<Vec<RouteElement>>> = stream::iter(chunks)
        .map(move |chunk| async move {
            with_deadline(
                "Distance Matrix",
                timeout,
                routing.distance_matrix(origin, &chunk),
            )
            .await
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut elements = Vec::with_capacity(destinations.len());
    let mut failed_chunks = 0;
    let mut last_error: Option<AppError> = None;

    for (idx, (chunk, result)) in destinations
        .chunks(DISTANCE_MATRIX_MAX_DESTINATIONS)
        .zip(results)
        .enumerate()
    {
        match result {
            Ok(chunk_elements) => {
                let mut chunk_elements = chunk_elements.into_iter().map(Some);
                for _ in chunk {
                    elements.push(chunk_elements.next().flatten());
                }
            }
            Err(e) => {
                tracing::warn!(
                    chunk = idx,
                    destinations = chunk.len(),
                    "Routing chunk {}/{} failed, dropping its {} candidates: {}",
                    idx + 1,
                    chunk_count,
                    chunk.len(),
                    e
                );
                failed_chunks += 1;
                elements.extend(std::iter::repeat_with(|| None).take(chunk.len()));
                last_error = Some(e);
            }
        }
    }

    if failed_chunks == chunk_count {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    Ok(elements)
}

/// Minutes or kilometers, matching the budget kind. `None` for failed elements.
pub fn metric_for(element: &RouteElement, kind: BudgetKind) -> Option<f64> {
    if !element.is_ok() {
        return None;
    }
    match kind {
        BudgetKind::Time => element.duration_minutes(),
        BudgetKind::Distance => element.distance_km(),
    }
}

/// Index and metric of every element whose cost lies inside the budget's
/// tolerance band, in input order.
pub fn accept_within_band(
    elements: &[Option<RouteElement>],
    budget: &Budget,
) -> Vec<(usize, f64)> {
    let band = budget.tolerance();
    let kind = budget.kind();

    elements
        .iter()
        .enumerate()
        .filter_map(|(idx, element)| {
            let metric = metric_for(element.as_ref()?, kind)?;
            band.contains(metric).then_some((idx, metric))
        })
        .collect()
}
