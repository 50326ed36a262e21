use super::GriddingError;
use crate::params::{Region, Spacing};
use crate::utils::XyzPoint;

/// Median of a non-empty slice; even counts average the two middle values.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Block-median decimation.
///
/// Blocks are centred on the grid nodes of `region` at `spacing`. Each
/// occupied block yields one point whose x, y and z are the medians of the
/// block's coordinates, taken independently. Points outside the region are
/// dropped. Output is ordered by block, south-west first.
pub fn blockmedian(points: &[XyzPoint], region: &Region, spacing: Spacing) -> Result<Vec<XyzPoint>, GriddingError> {
    let (nx, ny) = region.node_counts(spacing)?;

    let mut keyed: Vec<(usize, XyzPoint)> = points
        .iter()
        .filter(|p| region.contains(p.x, p.y))
        .map(|p| {
            let col = (((p.x - region.west) / spacing.x_inc).round().max(0.0) as usize).min(nx.saturating_sub(1));
            let row = (((p.y - region.south) / spacing.y_inc).round().max(0.0) as usize).min(ny.saturating_sub(1));
            (row * nx + col, *p)
        })
        .collect();

    let dropped = points.len() - keyed.len();
    if dropped > 0 {
        log::warn!("Block median dropped {} points outside {}", dropped, region);
    }

    keyed.sort_by_key(|(key, _)| *key);

    let mut out = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut zs = Vec::new();
    for block in keyed.chunk_by(|a, b| a.0 == b.0) {
        xs.clear();
        ys.clear();
        zs.clear();
        for (_, p) in block {
            xs.push(p.x);
            ys.push(p.y);
            zs.push(p.z);
        }
        out.push(XyzPoint::new(median(&mut xs), median(&mut ys), median(&mut zs)));
    }

    log::debug!("Block median reduced {} points to {} blocks", points.len(), out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [7.0]), 7.0);
    }

    #[test]
    fn test_one_point_per_occupied_block() {
        let region = Region::new(0.0, 2.0, 0.0, 2.0);
        let spacing = Spacing { x_inc: 1.0, y_inc: 1.0 };
        let points = [
            // block around node (0, 0)
            XyzPoint::new(0.1, 0.1, 1.0),
            XyzPoint::new(0.2, 0.3, 5.0),
            XyzPoint::new(0.3, 0.2, 3.0),
            // block around node (2, 1)
            XyzPoint::new(1.9, 1.2, 10.0),
            // outside the region
            XyzPoint::new(5.0, 5.0, 99.0),
        ];

        let result = blockmedian(&points, &region, spacing).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], XyzPoint::new(0.2, 0.2, 3.0));
        assert_eq!(result[1], XyzPoint::new(1.9, 1.2, 10.0));
    }

    #[test]
    fn test_block_boundaries_are_half_a_step_from_nodes() {
        let region = Region::new(0.0, 4.0, 0.0, 1.0);
        let spacing = Spacing { x_inc: 1.0, y_inc: 1.0 };
        let points = [XyzPoint::new(1.4, 0.0, 1.0), XyzPoint::new(1.6, 0.0, 2.0)];
        let result = blockmedian(&points, &region, spacing).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_step_too_small_for_region() {
        let region = Region::new(0.0, 4.0, 0.0, 1.0);
        let spacing = Spacing { x_inc: 1e-24, y_inc: 1e-24 };
        let points = [XyzPoint::new(1.0, 0.5, 1.0)];
        assert!(matches!(
            blockmedian(&points, &region, spacing),
            Err(GriddingError::TooLarge { .. })
        ));
    }
}
