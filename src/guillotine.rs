use serde::{Deserialize, Serialize};

use crate::score::{Score, ScoreValue};
use crate::types::{Placement, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRect {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
}

impl FreeRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            rect: Rect::new(w, h),
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.rect.w
    }

    pub fn top(&self) -> u32 {
        self.y + self.rect.h
    }
}

/// Which way the L-shaped leftover is cut after a placement.
///
/// A horizontal cut gives the top piece the full free width; a vertical cut
/// gives the right piece the full free height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitRule {
    #[default]
    Horizontal,
    Vertical,
    ShorterLeftoverAxis,
    LongerLeftoverAxis,
    MinimizeArea,
    MaximizeArea,
    ShorterAxis,
    LongerAxis,
}

impl SplitRule {
    pub const ALL: [SplitRule; 8] = [
        SplitRule::Horizontal,
        SplitRule::Vertical,
        SplitRule::ShorterLeftoverAxis,
        SplitRule::LongerLeftoverAxis,
        SplitRule::MinimizeArea,
        SplitRule::MaximizeArea,
        SplitRule::ShorterAxis,
        SplitRule::LongerAxis,
    ];

    fn cut_horizontally(&self, free: Rect, placed: Rect) -> bool {
        let right_w = (free.w - placed.w) as u64;
        let top_h = (free.h - placed.h) as u64;
        match self {
            SplitRule::Horizontal => true,
            SplitRule::Vertical => false,
            SplitRule::ShorterLeftoverAxis => right_w <= top_h,
            SplitRule::LongerLeftoverAxis => right_w > top_h,
            SplitRule::MinimizeArea => placed.w as u64 * top_h > right_w * placed.h as u64,
            SplitRule::MaximizeArea => placed.w as u64 * top_h <= right_w * placed.h as u64,
            SplitRule::ShorterAxis => free.w <= free.h,
            SplitRule::LongerAxis => free.w > free.h,
        }
    }
}

impl std::str::FromStr for SplitRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(SplitRule::Horizontal),
            "vertical" => Ok(SplitRule::Vertical),
            "shorter-leftover-axis" => Ok(SplitRule::ShorterLeftoverAxis),
            "longer-leftover-axis" => Ok(SplitRule::LongerLeftoverAxis),
            "minimize-area" => Ok(SplitRule::MinimizeArea),
            "maximize-area" => Ok(SplitRule::MaximizeArea),
            "shorter-axis" => Ok(SplitRule::ShorterAxis),
            "longer-axis" => Ok(SplitRule::LongerAxis),
            _ => Err(format!(
                "invalid split rule '{s}', expected: horizontal, vertical, shorter-leftover-axis, \
                 longer-leftover-axis, minimize-area, maximize-area, shorter-axis or longer-axis"
            )),
        }
    }
}

/// Free space and placements of one opened bin, in that bin's own coordinates.
#[derive(Debug, Clone)]
pub struct GuillotineBin {
    bin: usize,
    stock: Rect,
    split_rule: SplitRule,
    merge: bool,
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub rotated: bool,
    pub score: ScoreValue,
}

impl GuillotineBin {
    pub fn new(bin: usize, stock: Rect, split_rule: SplitRule, merge: bool) -> Self {
        Self {
            bin,
            stock,
            split_rule,
            merge,
            free_rects: vec![FreeRect {
                x: 0,
                y: 0,
                rect: stock,
            }],
            placements: Vec::new(),
        }
    }

    pub fn bin(&self) -> usize {
        self.bin
    }

    pub fn stock(&self) -> Rect {
        self.stock
    }

    pub fn used_area(&self) -> u64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }

    pub fn free_area(&self) -> u64 {
        self.free_rects.iter().map(|f| f.rect.area()).sum()
    }

    /// Best (free rect, orientation) for `piece`, or `None` if nothing fits.
    ///
    /// Free rects are scanned in list order, unrotated before rotated, and
    /// only a strictly better score replaces the current best, so ties go to
    /// the first candidate encountered.
    pub fn find_best<S: Score>(
        &self,
        piece: Rect,
        allow_rotate: bool,
        scorer: &S,
    ) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;
        let mut consider = |free_idx: usize, rotated: bool, score: ScoreValue| {
            if best.is_none_or(|b| score < b.score) {
                best = Some(ScoredPlacement {
                    free_idx,
                    rotated,
                    score,
                });
            }
        };

        for (idx, free) in self.free_rects.iter().enumerate() {
            if piece.fits_in(&free.rect) {
                consider(idx, false, scorer.score(free.rect, piece));
            }
            if allow_rotate {
                let rotated = piece.rotated();
                if rotated.fits_in(&free.rect) {
                    consider(idx, true, scorer.score(free.rect, rotated));
                }
            }
        }

        best
    }

    /// Commits `piece` (as given, before any rotation) at the chosen spot.
    pub fn place(&mut self, scored: ScoredPlacement, item: usize, piece: Rect) -> Placement {
        let free = self.free_rects.remove(scored.free_idx);
        let placed = if scored.rotated {
            piece.rotated()
        } else {
            piece
        };

        let placement = Placement {
            item,
            bin: self.bin,
            rect: placed,
            x: free.x,
            y: free.y,
            rotated: scored.rotated,
        };

        let pieces = split(free, placed, self.split_rule);
        self.free_rects.extend(pieces.into_iter().flatten());
        self.placements.push(placement);
        if self.merge {
            self.merge_free_rects();
        }

        placement
    }

    /// Joins adjacent free rects sharing a full edge until no pair is left.
    pub fn merge_free_rects(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free_rects.len() {
                for j in (i + 1)..self.free_rects.len() {
                    if let Some(m) = try_merge(self.free_rects[i], self.free_rects[j]) {
                        self.free_rects[i] = m;
                        self.free_rects.remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

/// Residual rects left after putting `placed` in the lower-left corner of
/// `free`: right piece first, then top piece. Empty pieces are dropped.
pub fn split(free: FreeRect, placed: Rect, rule: SplitRule) -> [Option<FreeRect>; 2] {
    let right_w = free.rect.w - placed.w;
    let top_h = free.rect.h - placed.h;

    let (right_h, top_w) = if rule.cut_horizontally(free.rect, placed) {
        (placed.h, free.rect.w)
    } else {
        (free.rect.h, placed.w)
    };

    let non_empty = |r: FreeRect| (r.rect.w > 0 && r.rect.h > 0).then_some(r);
    [
        non_empty(FreeRect::new(free.x + placed.w, free.y, right_w, right_h)),
        non_empty(FreeRect::new(free.x, free.y + placed.h, top_w, top_h)),
    ]
}

fn try_merge(a: FreeRect, b: FreeRect) -> Option<FreeRect> {
    // Side by side: same y, same height
    if a.y == b.y && a.rect.h == b.rect.h {
        let w = a.rect.w + b.rect.w;
        if a.right() == b.x {
            return Some(FreeRect::new(a.x, a.y, w, a.rect.h));
        }
        if b.right() == a.x {
            return Some(FreeRect::new(b.x, b.y, w, a.rect.h));
        }
    }
    // Stacked: same x, same width
    if a.x == b.x && a.rect.w == b.rect.w {
        let h = a.rect.h + b.rect.h;
        if a.top() == b.y {
            return Some(FreeRect::new(a.x, a.y, a.rect.w, h));
        }
        if b.top() == a.y {
            return Some(FreeRect::new(b.x, b.y, a.rect.w, h));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreStrategy;

    fn footprints(bin: &GuillotineBin) -> Vec<FreeRect> {
        bin.free_rects
            .iter()
            .copied()
            .chain(
                bin.placements
                    .iter()
                    .map(|p| FreeRect::new(p.x, p.y, p.rect.w, p.rect.h)),
            )
            .collect()
    }

    /// Free rects and placements must tile part of the bin without overlap,
    /// and together account for its whole area.
    fn assert_partition(bin: &GuillotineBin) {
        let stock = bin.stock();
        assert_eq!(
            bin.used_area() + bin.free_area(),
            stock.area(),
            "used + free != stock area, free rects: {:?}",
            bin.free_rects
        );

        let rects = footprints(bin);
        for r in &rects {
            assert!(r.rect.w > 0 && r.rect.h > 0, "empty rect {r:?}");
            assert!(
                r.right() <= stock.w && r.top() <= stock.h,
                "{r:?} outside {stock}"
            );
        }
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                let (a, b) = (rects[i], rects[j]);
                let overlaps =
                    a.x < b.right() && b.x < a.right() && a.y < b.top() && b.y < a.top();
                assert!(!overlaps, "{a:?} overlaps {b:?}");
            }
        }
    }

    fn pieces() -> Vec<Rect> {
        vec![
            Rect::new(30, 20),
            Rect::new(25, 25),
            Rect::new(40, 10),
            Rect::new(10, 35),
            Rect::new(15, 15),
            Rect::new(20, 5),
            Rect::new(5, 20),
            Rect::new(12, 8),
            Rect::new(8, 8),
            Rect::new(6, 3),
        ]
    }

    #[test]
    fn test_place_single_piece() {
        let mut bin = GuillotineBin::new(0, Rect::new(100, 100), SplitRule::Horizontal, true);
        let piece = Rect::new(50, 30);
        let scored = bin
            .find_best(piece, false, &ScoreStrategy::BestAreaFit)
            .unwrap();
        let p = bin.place(scored, 7, piece);
        assert_eq!((p.x, p.y), (0, 0));
        assert_eq!(p.rect, piece);
        assert_eq!(p.item, 7);
        assert_eq!(
            bin.free_rects,
            vec![FreeRect::new(50, 0, 50, 30), FreeRect::new(0, 30, 100, 70)]
        );
    }

    #[test]
    fn test_piece_too_large() {
        let bin = GuillotineBin::new(0, Rect::new(100, 100), SplitRule::Horizontal, true);
        let piece = Rect::new(200, 50);
        for strategy in ScoreStrategy::ALL {
            assert!(bin.find_best(piece, true, &strategy).is_none());
        }
    }

    #[test]
    fn test_rotation_fit() {
        let bin = GuillotineBin::new(0, Rect::new(100, 50), SplitRule::Horizontal, true);
        let piece = Rect::new(50, 100);
        assert!(
            bin.find_best(piece, false, &ScoreStrategy::BestAreaFit)
                .is_none()
        );
        let scored = bin
            .find_best(piece, true, &ScoreStrategy::BestAreaFit)
            .unwrap();
        assert!(scored.rotated);
    }

    #[test]
    fn test_rotated_placement_stores_turned_footprint() {
        let mut bin = GuillotineBin::new(3, Rect::new(100, 50), SplitRule::Horizontal, true);
        let piece = Rect::new(50, 100);
        let scored = bin
            .find_best(piece, true, &ScoreStrategy::BestAreaFit)
            .unwrap();
        let p = bin.place(scored, 0, piece);
        assert!(p.rotated);
        assert_eq!(p.bin, 3);
        assert_eq!(p.rect, Rect::new(100, 50));
        assert!(bin.free_rects.is_empty());
    }

    #[test]
    fn test_fill_exact() {
        let mut bin = GuillotineBin::new(0, Rect::new(100, 100), SplitRule::Horizontal, true);
        let piece = Rect::new(100, 100);
        let scored = bin
            .find_best(piece, false, &ScoreStrategy::BestAreaFit)
            .unwrap();
        bin.place(scored, 0, piece);
        assert!(bin.free_rects.is_empty());
        assert_partition(&bin);
    }

    #[test]
    fn test_tie_goes_to_first_free_rect() {
        let mut bin = GuillotineBin::new(0, Rect::new(20, 10), SplitRule::Horizontal, false);
        bin.free_rects = vec![FreeRect::new(10, 0, 10, 10), FreeRect::new(0, 0, 10, 10)];
        let scored = bin
            .find_best(Rect::new(5, 5), true, &ScoreStrategy::BestAreaFit)
            .unwrap();
        assert_eq!(scored.free_idx, 0);
        assert!(!scored.rotated);
    }

    #[test]
    fn test_exact_fit_wins_in_huge_bin() {
        let stock = Rect::new(u32::MAX, u32::MAX);
        let mut bin = GuillotineBin::new(0, stock, SplitRule::Horizontal, false);
        bin.free_rects = vec![
            FreeRect::new(0, 0, u32::MAX - 10, u32::MAX),
            FreeRect::new(u32::MAX - 10, 0, 10, 10),
        ];
        let scored = bin
            .find_best(Rect::new(10, 10), true, &ScoreStrategy::BestAreaFit)
            .unwrap();
        assert_eq!(scored.free_idx, 1);
        assert_eq!(scored.score, (0, 0));

        let scored = bin
            .find_best(Rect::new(10, 10), true, &ScoreStrategy::WorstAreaFit)
            .unwrap();
        assert_eq!(scored.free_idx, 0);
    }

    #[test]
    fn test_best_and_worst_pick_opposite_rects() {
        let mut bin = GuillotineBin::new(0, Rect::new(30, 10), SplitRule::Horizontal, false);
        bin.free_rects = vec![FreeRect::new(0, 0, 6, 10), FreeRect::new(6, 0, 24, 10)];
        let piece = Rect::new(5, 5);
        let best = bin
            .find_best(piece, false, &ScoreStrategy::BestAreaFit)
            .unwrap();
        let worst = bin
            .find_best(piece, false, &ScoreStrategy::WorstAreaFit)
            .unwrap();
        assert_eq!(best.free_idx, 0);
        assert_eq!(worst.free_idx, 1);
    }

    #[test]
    fn test_split_horizontal_and_vertical() {
        let free = FreeRect::new(10, 20, 100, 60);
        let placed = Rect::new(40, 25);

        let [right, top] = split(free, placed, SplitRule::Horizontal);
        assert_eq!(right, Some(FreeRect::new(50, 20, 60, 25)));
        assert_eq!(top, Some(FreeRect::new(10, 45, 100, 35)));

        let [right, top] = split(free, placed, SplitRule::Vertical);
        assert_eq!(right, Some(FreeRect::new(50, 20, 60, 60)));
        assert_eq!(top, Some(FreeRect::new(10, 45, 40, 35)));
    }

    #[test]
    fn test_split_drops_empty_pieces() {
        let free = FreeRect::new(0, 0, 40, 30);
        assert_eq!(
            split(free, Rect::new(40, 10), SplitRule::Horizontal),
            [None, Some(FreeRect::new(0, 10, 40, 20))]
        );
        assert_eq!(
            split(free, Rect::new(15, 30), SplitRule::Horizontal),
            [Some(FreeRect::new(15, 0, 25, 30)), None]
        );
        assert_eq!(split(free, Rect::new(40, 30), SplitRule::Vertical), [None, None]);
    }

    #[test]
    fn test_split_rule_axis_choice() {
        let free = Rect::new(100, 60);
        // leftover: 70 to the right, 50 on top
        let placed = Rect::new(30, 10);
        assert!(!SplitRule::ShorterLeftoverAxis.cut_horizontally(free, placed));
        assert!(SplitRule::LongerLeftoverAxis.cut_horizontally(free, placed));
        // 30 * 50 = 1500 vs 70 * 10 = 700
        assert!(SplitRule::MinimizeArea.cut_horizontally(free, placed));
        assert!(!SplitRule::MaximizeArea.cut_horizontally(free, placed));
        assert!(!SplitRule::ShorterAxis.cut_horizontally(free, placed));
        assert!(SplitRule::LongerAxis.cut_horizontally(free, placed));
    }

    #[test]
    fn test_merge_stacked_and_side_by_side() {
        let mut bin = GuillotineBin::new(0, Rect::new(20, 20), SplitRule::Horizontal, true);
        bin.free_rects = vec![
            FreeRect::new(0, 0, 10, 10),
            FreeRect::new(10, 0, 10, 10),
            FreeRect::new(0, 10, 20, 10),
        ];
        bin.merge_free_rects();
        assert_eq!(bin.free_rects, vec![FreeRect::new(0, 0, 20, 20)]);
    }

    #[test]
    fn test_merge_ignores_partial_edges() {
        let mut bin = GuillotineBin::new(0, Rect::new(20, 20), SplitRule::Horizontal, true);
        let rects = vec![FreeRect::new(0, 0, 10, 10), FreeRect::new(10, 0, 10, 5)];
        bin.free_rects = rects.clone();
        bin.merge_free_rects();
        assert_eq!(bin.free_rects, rects);
    }

    #[test]
    fn test_merge_keeps_area_and_never_grows() {
        for rule in SplitRule::ALL {
            let mut bin = GuillotineBin::new(0, Rect::new(100, 80), rule, false);
            for (i, piece) in pieces().into_iter().enumerate() {
                if let Some(scored) = bin.find_best(piece, true, &ScoreStrategy::BestShortSideFit) {
                    bin.place(scored, i, piece);
                }
                let before_count = bin.free_rects.len();
                let before_area = bin.free_area();
                let mut merged = bin.clone();
                merged.merge_free_rects();
                assert!(merged.free_rects.len() <= before_count, "{rule:?}");
                assert_eq!(merged.free_area(), before_area, "{rule:?}");
                assert_partition(&merged);
            }
        }
    }

    #[test]
    fn test_area_conserved_after_every_placement() {
        for rule in SplitRule::ALL {
            for strategy in ScoreStrategy::ALL {
                for merge in [false, true] {
                    let mut bin = GuillotineBin::new(0, Rect::new(100, 80), rule, merge);
                    assert_partition(&bin);
                    for (i, piece) in pieces().into_iter().enumerate() {
                        let before = bin.free_rects.len();
                        if let Some(scored) = bin.find_best(piece, true, &strategy) {
                            bin.place(scored, i, piece);
                            assert!(bin.free_rects.len() <= before + 1);
                        }
                        assert_partition(&bin);
                    }
                }
            }
        }
    }
}
