//! Plain-text problem format.
//!
//! ```text
//! N M
//! w h          (N item lines)
//! w h cost     (M bin lines)
//! ```
//!
//! Tokens are whitespace-delimited, so line breaks are not significant.

use std::str::SplitWhitespace;

use crate::error::InputError;
use crate::types::{Bin, Rect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub items: Vec<Rect>,
    pub bins: Vec<Bin>,
}

struct Tokens<'a>(SplitWhitespace<'a>);

impl Tokens<'_> {
    fn next_number(&mut self, what: &str) -> Result<u32, InputError> {
        let token = self
            .0
            .next()
            .ok_or_else(|| InputError::Missing(what.to_string()))?;
        token.parse::<u32>().map_err(|_| InputError::InvalidNumber {
            token: token.to_string(),
            what: what.to_string(),
        })
    }

    fn next_positive(&mut self, what: &str) -> Result<u32, InputError> {
        let n = self.next_number(what)?;
        if n == 0 {
            return Err(InputError::Zero {
                what: what.to_string(),
            });
        }
        Ok(n)
    }
}

pub fn parse_problem(text: &str) -> Result<Problem, InputError> {
    let mut tokens = Tokens(text.split_whitespace());
    let item_count = tokens.next_number("item count")? as usize;
    let bin_count = tokens.next_number("bin count")? as usize;

    let items = (0..item_count)
        .map(|i| -> Result<Rect, InputError> {
            Ok(Rect::new(
                tokens.next_positive(&format!("width of item {i}"))?,
                tokens.next_positive(&format!("height of item {i}"))?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let bins = (0..bin_count)
        .map(|i| -> Result<Bin, InputError> {
            Ok(Bin::new(
                tokens.next_positive(&format!("width of bin {i}"))?,
                tokens.next_positive(&format!("height of bin {i}"))?,
                tokens.next_positive(&format!("cost of bin {i}"))?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(extra) = tokens.0.next() {
        return Err(InputError::Trailing(extra.to_string()));
    }

    Ok(Problem { items, bins })
}
