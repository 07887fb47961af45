//! Raster-to-vector conversion of class masks
//!
//! Boundaries are traced on the cell lattice: every cell side between a
//! cell of the target value and any other cell becomes a directed edge with
//! the target cell on its right (lattice rows grow downward). At vertices
//! where two cells of the value touch only diagonally the trace either turns
//! away from the pinch (4-connected regions) or crosses it (8-connected
//! regions, whose rings then touch themselves at that vertex). Holes keep
//! their own rings.

use std::collections::HashMap;

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Orient, Point, Polygon};
use geo::orient::Direction;
use tidemark_core::raster::{GeoTransform, Raster};
use tidemark_core::Result;

type Vertex = (i64, i64);

/// Neighbourhood that joins cells of one value into a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and corner neighbours
    #[default]
    Eight,
}

/// Directed lattice edge of unit length.
#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    dir: (i64, i64),
}

impl Edge {
    fn to(&self) -> Vertex {
        (self.from.0 + self.dir.0, self.from.1 + self.dir.1)
    }
}

fn turn_right((dx, dy): (i64, i64)) -> (i64, i64) {
    (-dy, dx)
}

fn turn_left((dx, dy): (i64, i64)) -> (i64, i64) {
    (dy, -dx)
}

/// Boundary edges of every region of `value`.
fn boundary_edges(mask: &Raster<u8>, value: u8) -> Vec<Edge> {
    let (rows, cols) = mask.shape();
    let data = mask.data();
    let is_value = |r: i64, c: i64| {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols && data[(r as usize, c as usize)] == value
    };

    let mut edges = Vec::new();
    for ((r, c), &v) in data.indexed_iter() {
        if v != value {
            continue;
        }
        let (r, c) = (r as i64, c as i64);
        if !is_value(r - 1, c) {
            edges.push(Edge { from: (c, r), dir: (1, 0) });
        }
        if !is_value(r, c + 1) {
            edges.push(Edge { from: (c + 1, r), dir: (0, 1) });
        }
        if !is_value(r + 1, c) {
            edges.push(Edge { from: (c + 1, r + 1), dir: (-1, 0) });
        }
        if !is_value(r, c - 1) {
            edges.push(Edge { from: (c, r + 1), dir: (0, -1) });
        }
    }
    edges
}

/// Link edges into closed rings of lattice vertices.
fn trace_rings(edges: &[Edge], connectivity: Connectivity) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let successor = |i: usize| -> Option<usize> {
        let e = edges[i];
        let candidates = outgoing.get(&e.to())?;
        let turns = match connectivity {
            Connectivity::Four => [turn_right(e.dir), e.dir, turn_left(e.dir)],
            Connectivity::Eight => [turn_left(e.dir), e.dir, turn_right(e.dir)],
        };
        turns
            .into_iter()
            .find_map(|d| candidates.iter().copied().find(|&j| edges[j].dir == d))
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = vec![edges[start].from];
        let mut i = start;
        used[i] = true;
        while let Some(next) = successor(i).filter(|&n| n != start) {
            if used[next] {
                break;
            }
            used[next] = true;
            ring.push(edges[next].from);
            i = next;
        }
        ring.push(edges[start].from);
        rings.push(simplify_collinear(ring));
    }
    rings
}

/// Drop vertices where the ring continues straight on. `ring` is closed.
fn simplify_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len() - 1;
    let dir = |a: Vertex, b: Vertex| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    let mut out: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            dir(prev, ring[i]) != dir(ring[i], ring[i + 1])
        })
        .map(|i| ring[i])
        .collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

/// Twice the signed area in lattice coordinates; positive for region
/// boundaries, negative for holes.
fn signed_area2(ring: &[Vertex]) -> i64 {
    ring.windows(2).map(|w| w[0].0 * w[1].1 - w[1].0 * w[0].1).sum()
}

fn lattice_ring(ring: &[Vertex]) -> LineString<f64> {
    ring.iter().map(|&(x, y)| Coord { x: x as f64, y: y as f64 }).collect()
}

/// Centre of the cell just left of the ring's first edge, which for a hole
/// is a cell of the hole.
fn hole_sample(ring: &[Vertex]) -> Point<f64> {
    let (a, b) = (ring[0], ring[1]);
    let d = ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    let (lx, ly) = turn_left(d);
    Point::new(a.0 as f64 + 0.5 * d.0 as f64 + 0.5 * lx as f64, a.1 as f64 + 0.5 * d.1 as f64 + 0.5 * ly as f64)
}

/// Polygons covering the cells of `mask` equal to `value`, in the mask's
/// map coordinates. Exteriors are counter-clockwise, holes clockwise.
pub fn polygonize(mask: &Raster<u8>, value: u8, connectivity: Connectivity) -> Result<MultiPolygon<f64>> {
    let rings = trace_rings(&boundary_edges(mask, value), connectivity);

    let mut exteriors: Vec<(i64, Polygon<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes = Vec::new();
    for ring in rings.into_iter().filter(|r| r.len() >= 4) {
        let area = signed_area2(&ring);
        if area > 0 {
            exteriors.push((area, Polygon::new(lattice_ring(&ring), vec![]), Vec::new()));
        } else if area < 0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let sample = hole_sample(&hole);
        let owner = exteriors
            .iter_mut()
            .filter(|(_, poly, _)| {
                poly.bounding_rect().is_some_and(|r| {
                    sample.x() > r.min().x && sample.x() < r.max().x && sample.y() > r.min().y && sample.y() < r.max().y
                }) && poly.contains(&sample)
            })
            .min_by_key(|(area, _, _)| *area);
        if let Some((_, _, interiors)) = owner {
            interiors.push(lattice_ring(&hole));
        }
    }

    let gt = *mask.transform();
    let polygons = exteriors
        .into_iter()
        .map(|(_, poly, interiors)| {
            let (exterior, _) = poly.into_inner();
            Polygon::new(to_map(&exterior, &gt), interiors.iter().map(|h| to_map(h, &gt)).collect())
        })
        .collect();
    Ok(MultiPolygon::new(polygons).orient(Direction::Default))
}

fn to_map(ring: &LineString<f64>, gt: &GeoTransform) -> LineString<f64> {
    ring.coords()
        .map(|c| {
            let (x, y) = gt.lattice_to_geo(c.x, c.y);
            Coord { x, y }
        })
        .collect()
}
