//! Bounds-checked page cursor

/// Current page index with single-page and spread stepping
///
/// In spread mode the index is always even and the upper bound is the last
/// even index, so an odd final page is reached as the left half of a spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationCursor {
    index: usize,
    page_count: usize,
    spread: bool,
}

impl NavigationCursor {
    pub fn new(page_count: usize) -> Self {
        Self {
            index: 0,
            page_count,
            spread: false,
        }
    }

    /// Start over at page 0 for a newly opened document
    pub fn reset(&mut self, page_count: usize) {
        self.index = 0;
        self.page_count = page_count;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn is_spread(&self) -> bool {
        self.spread
    }

    /// Switch spread stepping on or off, snapping the index down to even
    pub fn set_spread(&mut self, spread: bool) {
        self.spread = spread;
        if spread {
            self.index -= self.index % 2;
        }
    }

    pub fn step(&self) -> usize {
        if self.spread {
            2
        } else {
            1
        }
    }

    pub fn upper_bound(&self) -> usize {
        if self.page_count == 0 {
            return 0;
        }
        let last = self.page_count - 1;
        if self.spread {
            last - last % 2
        } else {
            last
        }
    }

    /// Advance one step; returns whether the index moved
    pub fn next(&mut self) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let next = (self.index + self.step()).min(self.upper_bound());
        let moved = next != self.index;
        self.index = next;
        moved
    }

    /// Go back one step; returns whether the index moved
    pub fn prev(&mut self) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let prev = self.index.saturating_sub(self.step());
        let moved = prev != self.index;
        self.index = prev;
        moved
    }

    /// Jump to `index`, clamped into range and snapped for spreads
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let mut target = index.min(self.upper_bound());
        if self.spread {
            target -= target % 2;
        }
        let moved = target != self.index;
        self.index = target;
        moved
    }
}
