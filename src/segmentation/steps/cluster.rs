//! Rectangle clustering
//!
//! Several scan columns usually hit the same glyph and produce nearly
//! identical boxes. Boxes are partitioned into equivalence classes by a
//! similarity rule, small classes are discarded and every surviving class is
//! replaced by its mean box.

use crate::segmentation::Rect;

/// Union-find over rectangle indices
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Two boxes are similar when each of their four edges moves by at most
/// `eps * (min(w1, w2) + min(h1, h2)) / 2`
pub fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}

/// Label every rectangle with its equivalence class. Classes are numbered
/// in order of first appearance. Returns the labels and the class count.
pub fn partition(rects: &[Rect], eps: f64) -> (Vec<usize>, usize) {
    let mut set = DisjointSet::new(rects.len());
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                set.union(i, j);
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut classes = 0;
    let labels = (0..rects.len())
        .map(|i| {
            let root = set.find(i);
            if class_of_root[root] == usize::MAX {
                class_of_root[root] = classes;
                classes += 1;
            }
            class_of_root[root]
        })
        .collect();
    (labels, classes)
}

/// Merge near-duplicate rectangles into one mean rectangle per class.
///
/// A class survives only with more than `threshold` members. A surviving
/// class that fits inside another surviving class (grown by `eps` of the
/// outer size) is dropped when the outer class is clearly stronger. A
/// threshold of 0 disables grouping and returns the input unchanged.
/// Output order follows class numbering, not position.
pub fn group_rectangles(rects: &[Rect], threshold: u32, eps: f64) -> Vec<Rect> {
    if threshold == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, classes) = partition(rects, eps);

    let mut sums = vec![[0u64; 4]; classes];
    let mut members = vec![0u32; classes];
    for (rect, &class) in rects.iter().zip(&labels) {
        let sum = &mut sums[class];
        sum[0] += rect.x as u64;
        sum[1] += rect.y as u64;
        sum[2] += rect.width as u64;
        sum[3] += rect.height as u64;
        members[class] += 1;
    }

    let means: Vec<Rect> = sums
        .iter()
        .zip(&members)
        .map(|(sum, &n)| {
            let scale = 1.0f32 / n as f32;
            let mean = |v: u64| (v as f32 * scale).round_ties_even() as u32;
            Rect::new(mean(sum[0]), mean(sum[1]), mean(sum[2]), mean(sum[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, inner) in means.iter().enumerate() {
        let n1 = members[i];
        if n1 <= threshold {
            continue;
        }

        let swallowed = means.iter().enumerate().any(|(j, outer)| {
            let n2 = members[j];
            if j == i || n2 <= threshold {
                return false;
            }
            let dx = (outer.width as f64 * eps).round_ties_even() as i64;
            let dy = (outer.height as f64 * eps).round_ties_even() as i64;
            let inside = inner.x as i64 >= outer.x as i64 - dx
                && inner.y as i64 >= outer.y as i64 - dy
                && inner.right() as i64 <= outer.right() as i64 + dx
                && inner.bottom() as i64 <= outer.bottom() as i64 + dy;
            inside && (n2 > n1.max(3) || n1 < 3)
        });

        if !swallowed {
            grouped.push(*inner);
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse_to_mean() {
        let rects = vec![
            Rect::new(10, 10, 40, 50),
            Rect::new(11, 10, 40, 50),
            Rect::new(12, 10, 40, 50),
            Rect::new(100, 10, 40, 50),
            Rect::new(101, 10, 40, 50),
            Rect::new(102, 10, 40, 50),
        ];

        let grouped = group_rectangles(&rects, 2, 0.45);

        assert_eq!(grouped.len(), 2);
        assert!(grouped.contains(&Rect::new(11, 10, 40, 50)));
        assert!(grouped.contains(&Rect::new(101, 10, 40, 50)));
    }

    #[test]
    fn test_small_classes_are_discarded() {
        let rects = vec![
            Rect::new(10, 10, 40, 50),
            Rect::new(10, 10, 40, 50),
            Rect::new(100, 10, 40, 50),
            Rect::new(100, 10, 40, 50),
            Rect::new(100, 10, 40, 50),
        ];

        // Two members is not more than the threshold of 2
        let grouped = group_rectangles(&rects, 2, 0.45);
        assert_eq!(grouped, vec![Rect::new(100, 10, 40, 50)]);
    }

    #[test]
    fn test_zero_threshold_returns_input() {
        let rects = vec![Rect::new(0, 0, 5, 5), Rect::new(0, 0, 5, 5)];
        assert_eq!(group_rectangles(&rects, 0, 0.45), rects);
    }

    #[test]
    fn test_similarity_is_transitive_through_chain() {
        // a~b and b~c but a and c are too far apart on their own
        let a = Rect::new(0, 0, 40, 40);
        let b = Rect::new(15, 0, 40, 40);
        let c = Rect::new(30, 0, 40, 40);
        assert!(similar(&a, &b, 0.4));
        assert!(similar(&b, &c, 0.4));
        assert!(!similar(&a, &c, 0.4));

        let (labels, classes) = partition(&[a, b, c], 0.4);
        assert_eq!(classes, 1);
        assert_eq!(labels, vec![0, 0, 0]);
    }

    #[test]
    fn test_inner_rectangle_is_swallowed() {
        let mut rects = vec![Rect::new(10, 10, 80, 80); 5];
        rects.extend(vec![Rect::new(30, 30, 20, 20); 3]);

        let grouped = group_rectangles(&rects, 2, 0.2);
        assert_eq!(grouped, vec![Rect::new(10, 10, 80, 80)]);
    }

    #[test]
    fn test_wider_eps_never_adds_groups() {
        let rects: Vec<Rect> = (0..18).map(|i| Rect::new((i / 3) * 20, 5, 40, 40)).collect();
        let narrow = group_rectangles(&rects, 2, 0.05).len();
        let wide = group_rectangles(&rects, 2, 0.9).len();
        assert_eq!(narrow, 6);
        assert!(wide <= narrow);
    }
}
