use glam::IVec2;

use crate::cellmap::{Cell, CellMap};

/// Cost of every step, orthogonal or diagonal.
pub const STEP_COST: u32 = 10;

const NORTH: usize = 0;
const SOUTH: usize = 1;
const WEST: usize = 2;
const EAST: usize = 3;
const NORTH_WEST: usize = 4;
const NORTH_EAST: usize = 5;
const SOUTH_WEST: usize = 6;
const SOUTH_EAST: usize = 7;

/// Expansion order. Orthogonals come first so blocked ones can veto the
/// diagonals next to them.
const OFFSETS: [IVec2; 8] = [
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(1, 1),
];

/// Diagonals that pass a corner shared with each orthogonal neighbour.
const CUTS: [(usize, [usize; 2]); 4] = [
    (NORTH, [NORTH_WEST, NORTH_EAST]),
    (SOUTH, [SOUTH_WEST, SOUTH_EAST]),
    (WEST, [NORTH_WEST, SOUTH_WEST]),
    (EAST, [NORTH_EAST, SOUTH_EAST]),
];

fn heuristic(from: IVec2, to: IVec2) -> f32 {
    (from - to).as_vec2().length()
}

fn neighbours(map: &CellMap, position: IVec2) -> [Option<usize>; 8] {
    let mut out = OFFSETS.map(|offset| map.walkable_index(position + offset));
    for (orthogonal, diagonals) in CUTS {
        if out[orthogonal].is_none() {
            for d in diagonals {
                out[d] = None;
            }
        }
    }
    out
}

fn f_score(cells: &[Option<Cell>], index: usize) -> f32 {
    cells[index].map_or(f32::INFINITY, |c| c.f())
}

fn reconstruct(map: &CellMap, last: usize) -> Vec<IVec2> {
    let mut path = Vec::new();
    let mut cursor = Some(last);
    while let Some(i) = cursor {
        let Some(cell) = map.cells[i].as_ref() else {
            break;
        };
        path.push(cell.position);
        cursor = cell.parent;
    }
    path.reverse();
    path
}

/// A* from `start` to `end`, both inclusive.
///
/// Steps cost [`STEP_COST`] each; the heuristic is the straight-line
/// distance to `end` in cells. The open list is re-sorted by descending `f`
/// before every pop, so ties resolve in insertion order. Returns an empty
/// path when either endpoint is blocked or off the grid, or when `end` is
/// unreachable.
///
/// Search bookkeeping is reset on entry, so the same map can serve several
/// queries.
pub fn generate_path(map: &mut CellMap, start: IVec2, end: IVec2) -> Vec<IVec2> {
    map.reset();
    let (Some(start_index), Some(_)) = (map.walkable_index(start), map.walkable_index(end)) else {
        return Vec::new();
    };

    let n = map.len();
    let mut open = vec![start_index];
    let mut in_open = vec![false; n];
    let mut closed = vec![false; n];
    in_open[start_index] = true;
    if let Some(cell) = map.cells[start_index].as_mut() {
        cell.h = heuristic(start, end);
    }

    let mut expanded = 0usize;
    while !open.is_empty() {
        open.sort_by(|a, b| f_score(&map.cells, *b).total_cmp(&f_score(&map.cells, *a)));
        let Some(current) = open.pop() else {
            break;
        };
        in_open[current] = false;
        let Some(cell) = map.cells[current] else {
            continue;
        };

        if cell.position == end {
            let path = reconstruct(map, current);
            tracing::trace!(%start, %end, expanded, len = path.len(), "path found");
            return path;
        }

        closed[current] = true;
        expanded += 1;

        let tentative = cell.g + STEP_COST;
        for neighbour in neighbours(map, cell.position).into_iter().flatten() {
            if closed[neighbour] {
                continue;
            }
            let Some(next) = map.cells[neighbour].as_mut() else {
                continue;
            };
            if !in_open[neighbour] {
                open.push(neighbour);
                in_open[neighbour] = true;
            } else if tentative >= next.g {
                continue;
            }
            next.parent = Some(current);
            next.g = tentative;
            next.h = heuristic(next.position, end);
        }
    }

    tracing::trace!(%start, %end, expanded, "no path");
    Vec::new()
}
