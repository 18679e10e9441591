use serde::{Deserialize, Serialize};

/// A connected patch of marker-colored pixels, in page coordinates (inclusive bounds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
    pub pixels: u64,
}

impl Blob {
    fn seed(x: u32, y: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
            pixels: 0,
        }
    }

    fn extend(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
        self.pixels += 1;
    }

    pub(crate) fn offset(mut self, dx: u32, dy: u32) -> Self {
        self.x_min += dx;
        self.x_max += dx;
        self.y_min += dy;
        self.y_max += dy;
        self
    }
}

/// 8-connected components of a row-major mask, ordered by first pixel in scan order.
pub(crate) fn label_blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
    debug_assert_eq!(mask.len(), width * height);
    let mut visited = vec![false; mask.len()];
    let mut blobs = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let (sx, sy) = (start % width, start / width);
        let mut blob = Blob::seed(sx as u32, sy as u32);
        visited[start] = true;
        stack.push((sx, sy));

        while let Some((x, y)) = stack.pop() {
            blob.extend(x as u32, y as u32);
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let idx = ny * width + nx;
                    if mask[idx] && !visited[idx] {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
        blobs.push(blob);
    }
    blobs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let width = rows[0].len();
        let mask = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| b == b'#'))
            .collect();
        (mask, width, rows.len())
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        let (mask, w, h) = mask_from(&["....", "...."]);
        assert!(label_blobs(&mask, w, h).is_empty());
        assert!(label_blobs(&[], 0, 0).is_empty());
    }

    #[test]
    fn diagonal_neighbours_are_connected() {
        let (mask, w, h) = mask_from(&["#...", ".#..", "..#."]);
        let blobs = label_blobs(&mask, w, h);
        assert_eq!(blobs.len(), 1);
        assert_eq!(
            blobs[0],
            Blob {
                x_min: 0,
                y_min: 0,
                x_max: 2,
                y_max: 2,
                pixels: 3
            }
        );
    }

    #[test]
    fn separate_patches_are_distinct() {
        let (mask, w, h) = mask_from(&["##..#", "##..#", ".....", "..#.."]);
        let blobs = label_blobs(&mask, w, h);
        let sizes: Vec<u64> = blobs.iter().map(|b| b.pixels).collect();
        assert_eq!(sizes, vec![4, 2, 1]);
        assert_eq!((blobs[1].x_min, blobs[1].y_max), (4, 1));
    }

    #[test]
    fn u_shape_is_one_blob() {
        let (mask, w, h) = mask_from(&["#.#", "#.#", "###"]);
        let blobs = label_blobs(&mask, w, h);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].pixels, 7);
    }

    #[test]
    fn offset_moves_bounds() {
        let blob = Blob::seed(1, 2).offset(10, 20);
        assert_eq!((blob.x_min, blob.y_min, blob.x_max, blob.y_max), (11, 22, 11, 22));
    }
}
