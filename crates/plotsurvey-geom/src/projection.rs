//! Geographic to planar reprojection with `geodesy`.

use crate::{GeomError, Result};
use geodesy::prelude::*;

/// Fixed geographic-to-metric projection for the deployment area.
///
/// The operator definition (for example `utm zone=11`) is checked once in
/// [`Reprojector::new`]. Each call builds its own `geodesy` context, so the
/// reprojector is plain data and can be shared across threads. Points far
/// outside the projection's zone are projected anyway, with distortion.
#[derive(Debug, Clone)]
pub struct Reprojector {
    definition: String,
}

impl Reprojector {
    pub fn new(definition: &str) -> Result<Self> {
        let mut context = Minimal::new();
        context
            .op(definition)
            .map_err(|e| GeomError::InvalidProjection {
                definition: definition.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            definition: definition.to_string(),
        })
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Project one `(lon, lat)` pair in degrees to `(x, y)` meters.
    pub fn to_planar(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let (context, op) = self.context()?;
        project(&context, op, lon, lat)
    }

    /// Project many `(lon, lat)` pairs, sharing one operator instance.
    pub fn to_planar_all(&self, coords: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
        let (context, op) = self.context()?;
        coords
            .iter()
            .map(|&(lon, lat)| project(&context, op, lon, lat))
            .collect()
    }

    fn context(&self) -> Result<(Minimal, OpHandle)> {
        let mut context = Minimal::new();
        let op = context
            .op(&self.definition)
            .map_err(|e| GeomError::InvalidProjection {
                definition: self.definition.clone(),
                reason: e.to_string(),
            })?;
        Ok((context, op))
    }
}

fn project(context: &Minimal, op: OpHandle, lon: f64, lat: f64) -> Result<(f64, f64)> {
    let mut data = [Coor2D::geo(lat, lon)];
    context
        .apply(op, Fwd, &mut data)
        .map_err(|e| GeomError::ProjectionFailed {
            lon,
            lat,
            reason: e.to_string(),
        })?;

    let [x, y] = data[0].0;
    if !x.is_finite() || !y.is_finite() {
        return Err(GeomError::ProjectionFailed {
            lon,
            lat,
            reason: "non-finite result".to_string(),
        });
    }
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_utm_central_meridian() {
        // Zone 31 is centred on 3°E: false easting 500 km, northing 0 at the equator
        let reprojector = Reprojector::new("utm zone=31").unwrap();
        let (x, y) = reprojector.to_planar(3.0, 0.0).unwrap();
        assert_abs_diff_eq!(x, 500_000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_planar_distances_are_metric() {
        let reprojector = Reprojector::new("utm zone=11").unwrap();
        let points = reprojector
            .to_planar_all(&[(-118.28, 34.02), (-118.28, 34.03)])
            .unwrap();
        let dx = points[1].0 - points[0].0;
        let dy = points[1].1 - points[0].1;
        // 0.01 degree of latitude is ~1109 m; UTM scale stays within 0.1%
        assert_abs_diff_eq!(dx.hypot(dy), 1109.0, epsilon = 3.0);
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let err = Reprojector::new("no_such_operator").unwrap_err();
        assert!(matches!(err, GeomError::InvalidProjection { .. }));
    }
}
