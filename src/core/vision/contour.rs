//! 外轮廓提取与几何量
//!
//! Foreground is 8-connected, background 4-connected. A component counts as
//! external when it touches the image border or the background region that
//! reaches the border; components sitting inside another shape's hole are
//! skipped.

use super::{Contour, Mask, Moments};
use std::collections::VecDeque;

/// Clockwise on screen (y grows downwards), starting east.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

pub fn find_external_contours(mask: &Mask) -> Vec<Contour> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let fg: Vec<bool> = mask.as_raw().iter().map(|&v| v > 0).collect();
    let exterior = exterior_background(&fg, w, h);

    let mut labeled = vec![false; w * h];
    let mut queue = VecDeque::new();
    let mut contours = Vec::new();

    for start in 0..w * h {
        if !fg[start] || labeled[start] {
            continue;
        }

        let mut external = false;
        labeled[start] = true;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (x, y) = ((idx % w) as i32, (idx / w) as i32);
            for (i, &(dx, dy)) in NEIGHBORS.iter().enumerate() {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    external = true;
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if fg[n] {
                    if !labeled[n] {
                        labeled[n] = true;
                        queue.push_back(n);
                    }
                } else if i % 2 == 0 && exterior[n] {
                    external = true;
                }
            }
        }

        if external {
            contours.push(trace_border(&fg, w, h, start));
        }
    }

    contours
}

/// Background pixels 4-connected to the image border.
fn exterior_background(fg: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut exterior = vec![false; w * h];
    let mut queue = VecDeque::new();

    let seed = |idx: usize, exterior: &mut Vec<bool>, queue: &mut VecDeque<usize>| {
        if !fg[idx] && !exterior[idx] {
            exterior[idx] = true;
            queue.push_back(idx);
        }
    };

    for x in 0..w {
        seed(x, &mut exterior, &mut queue);
        seed((h - 1) * w + x, &mut exterior, &mut queue);
    }
    for y in 0..h {
        seed(y * w, &mut exterior, &mut queue);
        seed(y * w + w - 1, &mut exterior, &mut queue);
    }

    while let Some(idx) = queue.pop_front() {
        let (x, y) = ((idx % w) as i32, (idx / w) as i32);
        for &(dx, dy) in NEIGHBORS.iter().step_by(2) {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            seed(ny as usize * w + nx as usize, &mut exterior, &mut queue);
        }
    }

    exterior
}

/// Moore-neighbour tracing from the first raster pixel of a component, whose
/// west neighbour is always background. Stops on Jacob's criterion: back at
/// the start and about to repeat the first move.
fn trace_border(fg: &[bool], w: usize, h: usize, start: usize) -> Contour {
    let is_fg = |x: i32, y: i32| {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && fg[y as usize * w + x as usize]
    };

    // Returns the next border pixel and the direction from it back to the last
    // background pixel examined.
    let step = |p: (i32, i32), back: usize| -> Option<((i32, i32), usize)> {
        for k in 1..=8 {
            let d = (back + k) % 8;
            let (dx, dy) = NEIGHBORS[d];
            let q = (p.0 + dx, p.1 + dy);
            if is_fg(q.0, q.1) {
                let (bx, by) = NEIGHBORS[(d + 7) % 8];
                let b = (p.0 + bx, p.1 + by);
                let back_dir = direction_of(b.0 - q.0, b.1 - q.1)?;
                return Some((q, back_dir));
            }
        }
        None
    };

    let origin = ((start % w) as i32, (start / w) as i32);
    let mut points = vec![origin];

    let Some((first, mut back)) = step(origin, WEST) else {
        return Contour { points };
    };

    let max_steps = 4 * w * h + 8;
    let mut current = first;
    for _ in 0..max_steps {
        let Some((next, next_back)) = step(current, back) else {
            break;
        };
        if current == origin && next == first {
            break;
        }
        points.push(current);
        current = next;
        back = next_back;
    }

    Contour { points }
}

fn direction_of(dx: i32, dy: i32) -> Option<usize> {
    NEIGHBORS.iter().position(|&d| d == (dx, dy))
}

/// Shoelace area of the closed chain.
pub fn polygon_area(contour: &Contour) -> f64 {
    polygon_moments(contour).m00
}

/// Perimeter of the closed chain, including the closing segment.
pub fn closed_arc_length(contour: &Contour) -> f64 {
    let pts = &contour.points;
    if pts.len() < 2 {
        return 0.0;
    }
    pts.iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| {
            let (dx, dy) = ((x1 - x0) as f64, (y1 - y0) as f64);
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

/// Green's theorem moments of the polygon, sign-normalised so `m00 >= 0`
/// regardless of traversal direction.
pub fn polygon_moments(contour: &Contour) -> Moments {
    let pts = &contour.points;
    if pts.len() < 3 {
        return Moments::default();
    }

    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    for (&(x0, y0), &(x1, y1)) in pts.iter().zip(pts.iter().cycle().skip(1)) {
        let (x0, y0, x1, y1) = (x0 as f64, y0 as f64, x1 as f64, y1 as f64);
        let a = x0 * y1 - x1 * y0;
        m00 += a;
        m10 += a * (x0 + x1);
        m01 += a * (y0 + y1);
    }

    let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * m00 / 2.0,
        m10: sign * m10 / 6.0,
        m01: sign * m01 / 6.0,
    }
}
