//! Row state bitmap (component C3): 2 bits per column, packed 16 columns to
//! a 32-bit word, tracking whether each column is unset, clean, or dirty.

/// A column has not been assigned a value since the row was constructed or
/// last reset.
pub const UNSET: u32 = 0b00;
/// The column holds a value that matches what was last loaded/stored.
pub const CLEAN: u32 = 0b01;
/// The column holds a value that has not yet been written back.
pub const DIRTY: u32 = 0b11;

const BITS_PER_COLUMN: usize = 2;
const COLUMNS_PER_WORD: usize = 32 / BITS_PER_COLUMN;

/// Packed per-column state for a row with an arbitrary number of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowState {
    words: Vec<u32>,
    num_columns: usize,
}

impl RowState {
    pub fn new(num_columns: usize) -> Self {
        let num_words = num_columns.div_ceil(COLUMNS_PER_WORD);
        Self {
            words: vec![0; num_words],
            num_columns,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    fn locate(&self, column: usize) -> (usize, u32) {
        debug_assert!(column < self.num_columns, "column index out of range");
        let word = column / COLUMNS_PER_WORD;
        let shift = ((column % COLUMNS_PER_WORD) * BITS_PER_COLUMN) as u32;
        (word, shift)
    }

    pub fn get(&self, column: usize) -> u32 {
        let (word, shift) = self.locate(column);
        (self.words[word] >> shift) & 0b11
    }

    pub fn set(&mut self, column: usize, state: u32) {
        debug_assert!(state <= 0b11);
        let (word, shift) = self.locate(column);
        let mask = 0b11u32 << shift;
        self.words[word] = (self.words[word] & !mask) | (state << shift);
    }

    pub fn is_unset(&self, column: usize) -> bool {
        self.get(column) == UNSET
    }

    pub fn is_clean(&self, column: usize) -> bool {
        self.get(column) == CLEAN
    }

    pub fn is_dirty(&self, column: usize) -> bool {
        self.get(column) == DIRTY
    }

    /// True if every column named by `columns` is set (clean or dirty).
    pub fn check_set(&self, columns: impl IntoIterator<Item = usize>) -> bool {
        columns.into_iter().all(|c| self.get(c) != UNSET)
    }

    /// True if every column named by `columns` is dirty.
    pub fn check_all_dirty(&self, columns: impl IntoIterator<Item = usize>) -> bool {
        columns.into_iter().all(|c| self.get(c) == DIRTY)
    }

    /// True if at least one column named by `columns` is dirty.
    pub fn check_any_dirty(&self, columns: impl IntoIterator<Item = usize>) -> bool {
        columns.into_iter().any(|c| self.get(c) == DIRTY)
    }

    /// Mark every column clean, including ones that were unset.
    pub fn mark_all_clean(&mut self) {
        for word in &mut self.words {
            *word = repeat_pattern(CLEAN);
        }
    }

    /// Demote every dirty column to clean, leaving unset columns unset.
    pub fn mark_all_undirty(&mut self) {
        for word in &mut self.words {
            let dirty_mask = *word & repeat_pattern(DIRTY);
            // Column is DIRTY (0b11) exactly where both bits are set; clear
            // the high bit of each such pair to demote it to CLEAN (0b01).
            let high_bits = dirty_mask & repeat_pattern(0b10);
            *word &= !high_bits;
        }
    }

    /// Reset the named columns to UNSET.
    pub fn mark_values_unset(&mut self, columns: impl IntoIterator<Item = usize>) {
        for c in columns {
            self.set(c, UNSET);
        }
    }

    /// Mark the named columns CLEAN unconditionally.
    pub fn mark_clean(&mut self, columns: impl IntoIterator<Item = usize>) {
        for c in columns {
            self.set(c, CLEAN);
        }
    }

    pub fn reset(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }
}

fn repeat_pattern(two_bits: u32) -> u32 {
    let mut pattern = 0u32;
    for i in 0..COLUMNS_PER_WORD {
        pattern |= two_bits << (i * BITS_PER_COLUMN);
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_all_unset() {
        let state = RowState::new(20);
        for c in 0..20 {
            assert!(state.is_unset(c));
        }
    }

    #[test]
    fn set_and_get_roundtrip_across_word_boundary() {
        let mut state = RowState::new(40);
        state.set(15, CLEAN);
        state.set(16, DIRTY);
        state.set(39, DIRTY);
        assert!(state.is_clean(15));
        assert!(state.is_dirty(16));
        assert!(state.is_dirty(39));
        assert!(state.is_unset(0));
    }

    #[test]
    fn mark_all_clean_also_claims_unset_columns() {
        let mut state = RowState::new(4);
        state.set(0, DIRTY);
        state.set(1, CLEAN);
        state.mark_all_clean();
        assert!(state.is_clean(0));
        assert!(state.is_clean(1));
        assert!(state.is_clean(2));
        assert!(state.is_clean(3));
    }

    #[test]
    fn mark_all_undirty_demotes_dirty_only() {
        let mut state = RowState::new(4);
        state.set(0, DIRTY);
        state.set(1, CLEAN);
        state.mark_all_undirty();
        assert!(state.is_clean(0));
        assert!(state.is_clean(1));
        assert!(state.is_unset(2));
    }

    #[test]
    fn check_predicates() {
        let mut state = RowState::new(4);
        state.set(0, DIRTY);
        state.set(1, CLEAN);
        assert!(state.check_set([0, 1]));
        assert!(!state.check_set([0, 2]));
        assert!(!state.check_all_dirty([0, 1]));
        assert!(state.check_any_dirty([0, 1]));
    }

    #[test]
    fn mark_values_unset_clears_only_named_columns() {
        let mut state = RowState::new(4);
        state.set(0, DIRTY);
        state.set(1, DIRTY);
        state.mark_values_unset([0]);
        assert!(state.is_unset(0));
        assert!(state.is_dirty(1));
    }
}
