pub const STEP_COUNT: usize = 16;
pub const ROW_COUNT: usize = crate::kit::INSTRUMENT_COUNT;

/// Instrument × step grid of on/off beats. Always 16×16.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    cells: [[bool; STEP_COUNT]; ROW_COUNT],
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, row: usize, step: usize) -> bool {
        self.row(row).is_some_and(|r| r.get(step).copied().unwrap_or(false))
    }

    /// Out-of-range cells are ignored.
    pub fn set(&mut self, row: usize, step: usize, active: bool) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(step)) {
            *cell = active;
        }
    }

    /// Flips a cell and returns its new state.
    pub fn toggle(&mut self, row: usize, step: usize) -> Option<bool> {
        let cell = self.cells.get_mut(row)?.get_mut(step)?;
        *cell = !*cell;
        Some(*cell)
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEP_COUNT]; ROW_COUNT];
    }

    pub fn row(&self, row: usize) -> Option<&[bool; STEP_COUNT]> {
        self.cells.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool; STEP_COUNT]> {
        self.cells.iter()
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&on| on).count()
    }
}
