//! Grouping corner candidates into an ordered chessboard lattice.
//!
//! Candidates are linked to near neighbors, the two dominant lattice
//! directions are voted from link angles, and a breadth-first walk assigns
//! integer lattice coordinates. The result is validated against the
//! expected grid shape and re-indexed into the canonical order: column
//! index varies fastest, columns point toward +x and rows toward +y in the
//! image. The rule is a pure function of the detected geometry, so index i
//! names the same physical intersection in every image of a run.

use std::collections::{HashMap, VecDeque};

use chesscal_core::{Pt2, Real, Vec2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("{found} corner candidates for a {cols}x{rows} board")]
    TooFewCandidates {
        found: usize,
        cols: usize,
        rows: usize,
    },
    #[error("no dominant lattice directions among candidate links")]
    NoLatticeDirections,
    #[error("lattice walk covered {found} of {expected} corners")]
    IncompleteLattice { found: usize, expected: usize },
    #[error("lattice shape {da}x{db} does not match the {cols}x{rows} board")]
    WrongShape {
        da: usize,
        db: usize,
        cols: usize,
        rows: usize,
    },
    #[error("inconsistent lattice assignment (outlier candidates?)")]
    InconsistentLattice,
}

/// Snap `candidates` onto a `cols x rows` grid and return them in canonical
/// row-major order.
pub fn order_grid(candidates: &[Pt2], cols: usize, rows: usize) -> Result<Vec<Pt2>, GridError> {
    let expected = cols * rows;
    if candidates.len() < expected {
        return Err(GridError::TooFewCandidates {
            found: candidates.len(),
            cols,
            rows,
        });
    }

    let links = neighbor_links(candidates);
    if links.is_empty() {
        return Err(GridError::NoLatticeDirections);
    }

    let (dir_a, dir_b) = dominant_directions(candidates, &links)?;
    let neighbors = directed_neighbors(candidates, &links, dir_a, dir_b);

    let coords = walk_lattice(candidates, &neighbors)?;
    if coords.len() != expected {
        return Err(GridError::IncompleteLattice {
            found: coords.len(),
            expected,
        });
    }

    arrange(candidates, &coords, cols, rows)
}

/// Candidate links: index pairs with their displacement, restricted to a
/// plausible lattice-step distance band.
fn neighbor_links(candidates: &[Pt2]) -> Vec<(usize, usize)> {
    let n = candidates.len();
    const K: usize = 8;

    // Median nearest-neighbor distance estimates the lattice step.
    let mut nn_dist = Vec::with_capacity(n);
    let mut knn: Vec<Vec<usize>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            let da = (candidates[a] - candidates[i]).norm();
            let db = (candidates[b] - candidates[i]).norm();
            da.partial_cmp(&db).unwrap()
        });
        order.truncate(K);
        if let Some(&nearest) = order.first() {
            nn_dist.push((candidates[nearest] - candidates[i]).norm());
        }
        knn.push(order);
    }
    if nn_dist.is_empty() {
        return Vec::new();
    }
    nn_dist.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let step = nn_dist[nn_dist.len() / 2];
    if step <= 0.0 {
        return Vec::new();
    }

    let mut links = Vec::new();
    for (i, near) in knn.iter().enumerate() {
        for &j in near {
            let d = (candidates[j] - candidates[i]).norm();
            if d >= 0.5 * step && d <= 1.8 * step {
                links.push((i, j));
            }
        }
    }
    links
}

/// Vote the two dominant link directions (mod pi), at least 30 deg apart.
fn dominant_directions(
    candidates: &[Pt2],
    links: &[(usize, usize)],
) -> Result<(Real, Real), GridError> {
    const BINS: usize = 36;

    let angles: Vec<Real> = links
        .iter()
        .map(|&(i, j)| {
            let d = candidates[j] - candidates[i];
            d.y.atan2(d.x).rem_euclid(std::f64::consts::PI)
        })
        .collect();

    let histogram = |mask: &dyn Fn(Real) -> bool| -> [usize; BINS] {
        let mut h = [0usize; BINS];
        for &a in &angles {
            if mask(a) {
                let bin = ((a / std::f64::consts::PI) * BINS as Real) as usize % BINS;
                h[bin] += 1;
            }
        }
        h
    };

    let peak_angle = |h: &[usize; BINS]| -> Option<Real> {
        let (best, &count) = h.iter().enumerate().max_by_key(|&(_, c)| c)?;
        if count == 0 {
            return None;
        }
        Some((best as Real + 0.5) * std::f64::consts::PI / BINS as Real)
    };

    let h1 = histogram(&|_| true);
    let theta1 = peak_angle(&h1).ok_or(GridError::NoLatticeDirections)?;
    let theta1 = refine_direction(&angles, theta1);

    let min_sep = 30.0f64.to_radians();
    let h2 = histogram(&|a| axial_distance(a, theta1) > min_sep);
    let theta2 = peak_angle(&h2).ok_or(GridError::NoLatticeDirections)?;
    let theta2 = refine_direction(&angles, theta2);

    if axial_distance(theta1, theta2) < min_sep {
        return Err(GridError::NoLatticeDirections);
    }
    Ok((theta1, theta2))
}

/// Angular distance between two undirected (mod pi) directions.
fn axial_distance(a: Real, b: Real) -> Real {
    let d = (a - b).rem_euclid(std::f64::consts::PI);
    d.min(std::f64::consts::PI - d)
}

/// Average nearby link angles in the doubled-angle domain to de-quantize
/// the histogram peak.
fn refine_direction(angles: &[Real], theta: Real) -> Real {
    let window = 10.0f64.to_radians();
    let mut sx = 0.0;
    let mut sy = 0.0;
    for &a in angles {
        if axial_distance(a, theta) <= window {
            sx += (2.0 * a).cos();
            sy += (2.0 * a).sin();
        }
    }
    if sx == 0.0 && sy == 0.0 {
        return theta;
    }
    (sy.atan2(sx) / 2.0).rem_euclid(std::f64::consts::PI)
}

/// For each candidate, its best-aligned neighbor in the four signed lattice
/// directions `+a, -a, +b, -b`.
fn directed_neighbors(
    candidates: &[Pt2],
    links: &[(usize, usize)],
    dir_a: Real,
    dir_b: Real,
) -> Vec<[Option<usize>; 4]> {
    let max_dev = 25.0f64.to_radians();
    let dirs = [dir_a, dir_a + std::f64::consts::PI, dir_b, dir_b + std::f64::consts::PI];

    let mut best: Vec<[Option<(usize, Real)>; 4]> = vec![[None; 4]; candidates.len()];
    for &(i, j) in links {
        let d = candidates[j] - candidates[i];
        let angle = d.y.atan2(d.x);
        let dist = d.norm();
        for (slot, &dir) in dirs.iter().enumerate() {
            let dev = directed_distance(angle, dir);
            if dev > max_dev {
                continue;
            }
            match best[i][slot] {
                Some((_, prev)) if prev <= dist => {}
                _ => best[i][slot] = Some((j, dist)),
            }
        }
    }

    best.into_iter()
        .map(|slots| slots.map(|s| s.map(|(j, _)| j)))
        .collect()
}

/// Angular distance between two directed angles.
fn directed_distance(a: Real, b: Real) -> Real {
    let two_pi = 2.0 * std::f64::consts::PI;
    let d = (a - b).rem_euclid(two_pi);
    d.min(two_pi - d)
}

/// Breadth-first integer-coordinate assignment from the candidate nearest
/// the cloud centroid.
fn walk_lattice(
    candidates: &[Pt2],
    neighbors: &[[Option<usize>; 4]],
) -> Result<HashMap<usize, (i32, i32)>, GridError> {
    let n = candidates.len();
    let cx = candidates.iter().map(|p| p.x).sum::<Real>() / n as Real;
    let cy = candidates.iter().map(|p| p.y).sum::<Real>() / n as Real;
    let seed = (0..n)
        .min_by(|&a, &b| {
            let da = (candidates[a].x - cx).powi(2) + (candidates[a].y - cy).powi(2);
            let db = (candidates[b].x - cx).powi(2) + (candidates[b].y - cy).powi(2);
            da.partial_cmp(&db).unwrap()
        })
        .ok_or(GridError::NoLatticeDirections)?;

    const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    let mut coords: HashMap<usize, (i32, i32)> = HashMap::new();
    let mut occupied: HashMap<(i32, i32), usize> = HashMap::new();
    let mut queue = VecDeque::new();

    coords.insert(seed, (0, 0));
    occupied.insert((0, 0), seed);
    queue.push_back(seed);

    while let Some(i) = queue.pop_front() {
        let (a, b) = coords[&i];
        for (slot, &(da, db)) in STEPS.iter().enumerate() {
            let Some(j) = neighbors[i][slot] else {
                continue;
            };
            let target = (a + da, b + db);
            match coords.get(&j) {
                Some(&existing) if existing == target => {}
                Some(_) => return Err(GridError::InconsistentLattice),
                None => {
                    if occupied.contains_key(&target) {
                        return Err(GridError::InconsistentLattice);
                    }
                    coords.insert(j, target);
                    occupied.insert(target, j);
                    queue.push_back(j);
                }
            }
        }
    }

    Ok(coords)
}

/// Validate the lattice shape, pick axes, orient, and emit ordered points.
fn arrange(
    candidates: &[Pt2],
    coords: &HashMap<usize, (i32, i32)>,
    cols: usize,
    rows: usize,
) -> Result<Vec<Pt2>, GridError> {
    let a_min = coords.values().map(|c| c.0).min().unwrap();
    let a_max = coords.values().map(|c| c.0).max().unwrap();
    let b_min = coords.values().map(|c| c.1).min().unwrap();
    let b_max = coords.values().map(|c| c.1).max().unwrap();
    let da = (a_max - a_min + 1) as usize;
    let db = (b_max - b_min + 1) as usize;

    // Decide which lattice axis runs along the columns. Shape decides for
    // rectangular boards; for square boards the more x-aligned axis wins.
    let a_is_col = if da == cols && db == rows && cols == rows {
        let (ea, eb) = axis_vectors(candidates, coords);
        ea.x.abs() >= eb.x.abs()
    } else if da == cols && db == rows {
        true
    } else if da == rows && db == cols {
        false
    } else {
        return Err(GridError::WrongShape { da, db, cols, rows });
    };

    // Re-express as (col, row) from zero.
    let cr: HashMap<usize, (i32, i32)> = coords
        .iter()
        .map(|(&i, &(a, b))| {
            let (c, r) = if a_is_col {
                (a - a_min, b - b_min)
            } else {
                (b - b_min, a - a_min)
            };
            (i, (c, r))
        })
        .collect();

    // Orient columns toward +x and rows toward +y in the image.
    let (e_col, e_row) = col_row_vectors(candidates, &cr);
    let flip_cols = e_col.x < 0.0 || (e_col.x == 0.0 && e_col.y < 0.0);
    let flip_rows = e_row.y < 0.0 || (e_row.y == 0.0 && e_row.x < 0.0);

    let mut ordered = vec![None; cols * rows];
    for (&i, &(c, r)) in &cr {
        let c = if flip_cols { cols as i32 - 1 - c } else { c } as usize;
        let r = if flip_rows { rows as i32 - 1 - r } else { r } as usize;
        let slot = &mut ordered[r * cols + c];
        if slot.is_some() {
            return Err(GridError::InconsistentLattice);
        }
        *slot = Some(candidates[i]);
    }

    ordered
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(GridError::IncompleteLattice {
            found: coords.len(),
            expected: cols * rows,
        })
}

/// Least-squares lattice basis in raw (a, b) coordinates.
fn axis_vectors(candidates: &[Pt2], coords: &HashMap<usize, (i32, i32)>) -> (Vec2, Vec2) {
    fit_basis(candidates, coords.iter().map(|(&i, &c)| (i, c)))
}

/// Least-squares lattice basis in (col, row) coordinates.
fn col_row_vectors(candidates: &[Pt2], cr: &HashMap<usize, (i32, i32)>) -> (Vec2, Vec2) {
    fit_basis(candidates, cr.iter().map(|(&i, &c)| (i, c)))
}

/// Fit `p ~ o + u * e_u + v * e_v` over the assigned candidates and return
/// `(e_u, e_v)`.
fn fit_basis(
    candidates: &[Pt2],
    assignment: impl Iterator<Item = (usize, (i32, i32))>,
) -> (Vec2, Vec2) {
    use nalgebra::{Matrix3, Vector3};

    let mut ata = Matrix3::<Real>::zeros();
    let mut atx = Vector3::<Real>::zeros();
    let mut aty = Vector3::<Real>::zeros();

    for (i, (u, v)) in assignment {
        let row = Vector3::new(1.0, u as Real, v as Real);
        ata += row * row.transpose();
        atx += row * candidates[i].x;
        aty += row * candidates[i].y;
    }

    let Some(inv) = ata.try_inverse() else {
        return (Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
    };
    let cx = inv * atx;
    let cy = inv * aty;
    (Vec2::new(cx[1], cy[1]), Vec2::new(cx[2], cy[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shuffled_grid(cols: usize, rows: usize, rot_deg: Real) -> (Vec<Pt2>, Vec<Pt2>) {
        let step = 40.0;
        let (s, c) = rot_deg.to_radians().sin_cos();
        let mut truth = Vec::new();
        for r in 0..rows {
            for col in 0..cols {
                let x = col as Real * step;
                let y = r as Real * step;
                truth.push(Pt2::new(
                    300.0 + c * x - s * y,
                    250.0 + s * x + c * y,
                ));
            }
        }
        // Deterministic scramble so input order carries no information.
        let mut scrambled = truth.clone();
        let n = scrambled.len();
        for i in 0..n {
            let j = (i * 7 + 3) % n;
            scrambled.swap(i, j);
        }
        (truth, scrambled)
    }

    #[test]
    fn orders_an_axis_aligned_grid() {
        let (truth, scrambled) = shuffled_grid(6, 4, 0.0);
        let ordered = order_grid(&scrambled, 6, 4).unwrap();
        for (o, t) in ordered.iter().zip(truth.iter()) {
            assert!((o - t).norm() < 1e-9, "{o:?} vs {t:?}");
        }
    }

    #[test]
    fn orders_a_mildly_rotated_grid() {
        let (truth, scrambled) = shuffled_grid(6, 4, 12.0);
        let ordered = order_grid(&scrambled, 6, 4).unwrap();
        for (o, t) in ordered.iter().zip(truth.iter()) {
            assert!((o - t).norm() < 1e-9, "{o:?} vs {t:?}");
        }
    }

    #[test]
    fn recovers_canonical_order_from_a_flipped_grid() {
        // Build the grid with columns running toward -x; the canonical rule
        // must flip them back.
        let step = 40.0;
        let mut pts = Vec::new();
        for r in 0..3 {
            for c in 0..5 {
                pts.push(Pt2::new(400.0 - c as Real * step, 200.0 + r as Real * step));
            }
        }
        let ordered = order_grid(&pts, 5, 3).unwrap();
        // First corner must be the leftmost of the top row.
        assert!((ordered[0] - Pt2::new(240.0, 200.0)).norm() < 1e-9);
        assert!((ordered[4] - Pt2::new(400.0, 200.0)).norm() < 1e-9);
        assert!((ordered[5] - Pt2::new(240.0, 240.0)).norm() < 1e-9);
    }

    #[test]
    fn too_few_candidates_fails() {
        let pts = vec![Pt2::new(0.0, 0.0); 5];
        assert!(matches!(
            order_grid(&pts, 6, 4),
            Err(GridError::TooFewCandidates { found: 5, .. })
        ));
    }

    #[test]
    fn wrong_shape_fails() {
        let (_, scrambled) = shuffled_grid(6, 4, 0.0);
        assert!(order_grid(&scrambled, 8, 3).is_err());
    }
}
