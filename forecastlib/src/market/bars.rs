use chrono::NaiveDate;
use serde::Serialize;

// One daily bar, only the close is used downstream
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Bar { date, close }
    }
}

/// Daily closes for one instrument, strictly increasing by date.
///
/// Providers occasionally hand back unsorted rows or repeat the latest
/// session (a live row next to the settled one), so construction sorts and
/// keeps the last bar seen for any given date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        // Stable sort, so among equal dates the later input row stays last
        bars.sort_by_key(|bar| bar.date);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        BarSeries { bars: deduped }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    // Second-to-last and last bar, if there are at least two
    pub fn last_two(&self) -> Option<(&Bar, &Bar)> {
        match self.bars.as_slice() {
            [.., previous, current] => Some((previous, current)),
            _ => None,
        }
    }
}
