//! Planar Delaunay triangulation via Bowyer-Watson incremental insertion.

use std::collections::{HashMap, HashSet};

/// Relative shrink applied to circumcircles in the point-in-circle test.
///
/// Regular grids produce many exactly cocircular quadruples; treating points
/// on a circumcircle as outside keeps every insertion cavity connected.
const INCIRCLE_TOLERANCE: f64 = 1e-9;

/// Triangles with twice-area below this (in squared input units) are dropped.
const MIN_DOUBLE_AREA: f64 = 1e-12;

/// Working triangle with cached circumcircle.
struct BwTri {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

/// Edge key with sorted vertex indices for hashing.
#[derive(Hash, Eq, PartialEq)]
struct EdgeKey([usize; 2]);

impl EdgeKey {
    fn new(a: usize, b: usize) -> Self {
        if a < b {
            EdgeKey([a, b])
        } else {
            EdgeKey([b, a])
        }
    }
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<(f64, f64, f64)> {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < f64::EPSILON {
        return None;
    }

    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;

    let dx = a.0 - ux;
    let dy = a.1 - uy;
    Some((ux, uy, dx * dx + dy * dy))
}

fn double_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Triangulate planar points.
///
/// Returns counter-clockwise index triples into `points`. Fewer than three
/// points, or an all-collinear set, yield no triangles. Duplicate points are
/// not inserted twice; callers should deduplicate beforehand.
pub fn triangulate(points: &[(f64, f64)]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    // Work relative to the bounding box corner so projected coordinates in
    // the hundreds of kilometres keep their precision.
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let mut all_points: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x - min_x, y - min_y)).collect();

    // Super-triangle well outside every circumcircle that matters
    let extent = (max_x - min_x).max(max_y - min_y).max(1e-9);
    let cx = (max_x - min_x) * 0.5;
    let cy = (max_y - min_y) * 0.5;
    let scale = 100.0 * extent;
    all_points.push((cx - scale, cy - scale));
    all_points.push((cx + scale, cy - scale));
    all_points.push((cx, cy + scale));
    let si = [n, n + 1, n + 2];

    let Some((ux, uy, radius_sq)) = circumcircle(all_points[si[0]], all_points[si[1]], all_points[si[2]])
    else {
        return Vec::new();
    };
    let mut tris = vec![BwTri {
        v: si,
        cx: ux,
        cy: uy,
        radius_sq,
    }];

    for i in 0..n {
        let p = all_points[i];

        // Bad triangles: circumcircle strictly contains the new point
        let mut bad_indices: Vec<usize> = Vec::new();
        for (ti, tri) in tris.iter().enumerate() {
            let dx = tri.cx - p.0;
            let dy = tri.cy - p.1;
            if dx * dx + dy * dy < tri.radius_sq * (1.0 - INCIRCLE_TOLERANCE) {
                bad_indices.push(ti);
            }
        }

        if bad_indices.is_empty() {
            continue;
        }

        // Cavity boundary: edges owned by exactly one bad triangle
        let mut edge_count: HashMap<EdgeKey, (usize, [usize; 2])> = HashMap::new();
        for &bi in &bad_indices {
            let v = tris[bi].v;
            for edge in [[v[0], v[1]], [v[1], v[2]], [v[2], v[0]]] {
                edge_count
                    .entry(EdgeKey::new(edge[0], edge[1]))
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, edge));
            }
        }

        let boundary: Vec<[usize; 2]> = edge_count
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, edge)| edge)
            .collect();

        // Reverse order keeps the remaining indices valid for swap_remove
        bad_indices.sort_unstable();
        for &bi in bad_indices.iter().rev() {
            tris.swap_remove(bi);
        }

        for edge in &boundary {
            let v = [edge[0], edge[1], i];
            if let Some((cx, cy, radius_sq)) =
                circumcircle(all_points[v[0]], all_points[v[1]], all_points[v[2]])
            {
                tris.push(BwTri { v, cx, cy, radius_sq });
            }
        }
    }

    let mut triangles: Vec<[usize; 3]> = tris
        .into_iter()
        .filter(|t| t.v.iter().all(|&vi| vi < n))
        .filter_map(|t| {
            let [a, b, c] = t.v;
            let area2 = double_area(all_points[a], all_points[b], all_points[c]);
            if area2.abs() <= MIN_DOUBLE_AREA {
                None
            } else if area2 > 0.0 {
                Some([a, b, c])
            } else {
                Some([a, c, b])
            }
        })
        .collect();

    let local = &all_points[..n];
    if fill_hull_pockets(local, &mut triangles) > 0 {
        legalize(local, &mut triangles);
    }
    triangles
}

/// Directed boundary edges of a CCW triangulation as `from -> to`.
///
/// `None` when a vertex has more than one outgoing boundary edge.
fn boundary_successors(tris: &[[usize; 3]]) -> Option<HashMap<usize, usize>> {
    let mut directed = HashSet::new();
    for t in tris {
        directed.extend([(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]);
    }

    let mut next = HashMap::new();
    for &(from, to) in &directed {
        if !directed.contains(&(to, from)) && next.insert(from, to).is_some() {
            return None;
        }
    }
    Some(next)
}

fn inside_or_on(points: &[(f64, f64)], t: [usize; 3], p: (f64, f64)) -> bool {
    let [a, b, c] = t.map(|i| points[i]);
    double_area(a, b, p) >= -MIN_DOUBLE_AREA
        && double_area(b, c, p) >= -MIN_DOUBLE_AREA
        && double_area(c, a, p) >= -MIN_DOUBLE_AREA
}

/// Add the hull triangles lost to the finite super-triangle.
///
/// Those show up as reflex notches in the triangulated boundary; each is
/// closed with an ear as long as no other point lies in it. Returns the number
/// of triangles added.
fn fill_hull_pockets(points: &[(f64, f64)], tris: &mut Vec<[usize; 3]>) -> usize {
    let mut added = 0;
    for _ in 0..points.len() {
        let Some(next) = boundary_successors(tris) else {
            break;
        };
        let mut starts: Vec<usize> = next.keys().copied().collect();
        starts.sort_unstable();

        let ear = starts.into_iter().find_map(|a| {
            let b = *next.get(&a)?;
            let c = *next.get(&b)?;
            if c == a || double_area(points[a], points[b], points[c]) >= -MIN_DOUBLE_AREA {
                return None;
            }
            let candidate = [a, c, b];
            let blocked = points
                .iter()
                .enumerate()
                .any(|(i, &p)| !candidate.contains(&i) && inside_or_on(points, candidate, p));
            (!blocked).then_some(candidate)
        });

        match ear {
            Some(t) => {
                tris.push(t);
                added += 1;
            }
            None => break,
        }
    }
    added
}

/// Lawson edge flips until no triangle's circumcircle strictly contains the
/// opposite vertex of a neighbor.
fn legalize(points: &[(f64, f64)], tris: &mut [[usize; 3]]) {
    let limit = 4 * tris.len() + 16;
    for _ in 0..limit {
        let mut owners: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
        for (ti, t) in tris.iter().enumerate() {
            for (u, v) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                owners.entry(EdgeKey::new(u, v)).or_default().push(ti);
            }
        }

        let mut flip = None;
        'search: for (ti, t) in tris.iter().enumerate() {
            for k in 0..3 {
                let (a, b, c) = (t[(k + 1) % 3], t[(k + 2) % 3], t[k]);
                let Some(other) = owners
                    .get(&EdgeKey::new(a, b))
                    .and_then(|o| o.iter().copied().find(|&oi| oi != ti))
                else {
                    continue;
                };
                let Some(&d) = tris[other].iter().find(|v| !t.contains(v)) else {
                    continue;
                };
                let Some((cx, cy, radius_sq)) = circumcircle(points[c], points[a], points[b]) else {
                    continue;
                };
                let dx = points[d].0 - cx;
                let dy = points[d].1 - cy;
                if dx * dx + dy * dy < radius_sq * (1.0 - INCIRCLE_TOLERANCE) {
                    flip = Some((ti, other, [c, a, b], d));
                    break 'search;
                }
            }
        }

        let Some((t1, t2, [c, a, b], d)) = flip else {
            return;
        };
        // (c, a, b) and (b, a, d) become (c, a, d) and (d, b, c)
        let first = [c, a, d];
        let second = [d, b, c];
        if double_area(points[c], points[a], points[d]) <= MIN_DOUBLE_AREA
            || double_area(points[d], points[b], points[c]) <= MIN_DOUBLE_AREA
        {
            return;
        }
        tris[t1] = first;
        tris[t2] = second;
    }
}
