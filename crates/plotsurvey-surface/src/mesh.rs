//! Triangulated terrain mesh and its 3D area.

use serde::{Deserialize, Serialize};

/// Planar position in projected meters plus elevation in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Indices into the mesh's point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle(pub [usize; 3]);

/// Area of the triangle `abc` in 3D: half the magnitude of `AB x AC`.
pub fn triangle_area_3d(a: &SamplePoint3D, b: &SamplePoint3D, c: &SamplePoint3D) -> f64 {
    let ab = [b.x - a.x, b.y - a.y, b.z - a.z];
    let ac = [c.x - a.x, c.y - a.y, c.z - a.z];
    let cross = [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ];
    0.5 * (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt()
}

/// Sample points and the triangles built over their planar positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub points: Vec<SamplePoint3D>,
    pub triangles: Vec<Triangle>,
}

impl SurfaceMesh {
    /// Sum of 3D triangle areas, in square meters.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|Triangle([a, b, c])| {
                triangle_area_3d(&self.points[*a], &self.points[*b], &self.points[*c])
            })
            .sum()
    }

    /// Sum of triangle areas with elevation ignored.
    pub fn planar_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|Triangle([a, b, c])| {
                let flatten = |p: &SamplePoint3D| SamplePoint3D { z: 0.0, ..*p };
                triangle_area_3d(
                    &flatten(&self.points[*a]),
                    &flatten(&self.points[*b]),
                    &flatten(&self.points[*c]),
                )
            })
            .sum()
    }
}
