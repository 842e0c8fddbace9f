//! Ranking of candidate (free rect, orientation) pairs.
//!
//! A score is a pair compared lexicographically; lower is better.

use serde::{Deserialize, Serialize};

use crate::types::Rect;

/// Wide enough that area differences and their negations of any `u32` rect never overflow.
pub type ScoreValue = (i128, i128);

/// Anything that can rank a piece against a free rect it fits in.
pub trait Score {
    fn score(&self, free: Rect, piece: Rect) -> ScoreValue;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(clippy::enum_variant_names)]
pub enum ScoreStrategy {
    #[default]
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    WorstAreaFit,
    WorstShortSideFit,
    WorstLongSideFit,
}

impl ScoreStrategy {
    pub const ALL: [ScoreStrategy; 6] = [
        ScoreStrategy::BestAreaFit,
        ScoreStrategy::BestShortSideFit,
        ScoreStrategy::BestLongSideFit,
        ScoreStrategy::WorstAreaFit,
        ScoreStrategy::WorstShortSideFit,
        ScoreStrategy::WorstLongSideFit,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ScoreStrategy::BestAreaFit => "BAF",
            ScoreStrategy::BestShortSideFit => "BSSF",
            ScoreStrategy::BestLongSideFit => "BLSF",
            ScoreStrategy::WorstAreaFit => "WAF",
            ScoreStrategy::WorstShortSideFit => "WSSF",
            ScoreStrategy::WorstLongSideFit => "WLSF",
        }
    }

    fn is_worst(&self) -> bool {
        matches!(
            self,
            ScoreStrategy::WorstAreaFit
                | ScoreStrategy::WorstShortSideFit
                | ScoreStrategy::WorstLongSideFit
        )
    }
}

impl Score for ScoreStrategy {
    fn score(&self, free: Rect, piece: Rect) -> ScoreValue {
        let dw = free.w as i128 - piece.w as i128;
        let dh = free.h as i128 - piece.h as i128;
        let short = dw.min(dh);
        let long = dw.max(dh);

        let best = match self {
            ScoreStrategy::BestAreaFit | ScoreStrategy::WorstAreaFit => {
                (free.area() as i128 - piece.area() as i128, short)
            }
            ScoreStrategy::BestShortSideFit | ScoreStrategy::WorstShortSideFit => (short, long),
            ScoreStrategy::BestLongSideFit | ScoreStrategy::WorstLongSideFit => (long, short),
        };

        if self.is_worst() {
            (-best.0, -best.1)
        } else {
            best
        }
    }
}

impl std::fmt::Display for ScoreStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ScoreStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "best-area-fit" => Ok(ScoreStrategy::BestAreaFit),
            "bssf" | "best-short-side-fit" => Ok(ScoreStrategy::BestShortSideFit),
            "blsf" | "best-long-side-fit" => Ok(ScoreStrategy::BestLongSideFit),
            "waf" | "worst-area-fit" => Ok(ScoreStrategy::WorstAreaFit),
            "wssf" | "worst-short-side-fit" => Ok(ScoreStrategy::WorstShortSideFit),
            "wlsf" | "worst-long-side-fit" => Ok(ScoreStrategy::WorstLongSideFit),
            _ => Err(format!(
                "invalid strategy '{s}', expected one of: baf, bssf, blsf, waf, wssf, wlsf"
            )),
        }
    }
}
