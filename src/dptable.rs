/// A dense DP table, serialized row by row.
/// Rows are time steps and columns are states in every table of this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct DPTable<T> {
    mem: Vec<T>,
    row: usize,
    column: usize,
}

impl<T: Copy> DPTable<T> {
    /// (row x column) table filled by `init`. `column` should be positive.
    pub fn new(row: usize, column: usize, init: T) -> Self {
        Self {
            mem: vec![init; row * column],
            row,
            column,
        }
    }
    pub fn rows(&self) -> usize {
        self.row
    }
    pub fn columns(&self) -> usize {
        self.column
    }
    pub fn get(&self, i: usize, j: usize) -> T {
        self.mem[i * self.column + j]
    }
    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut T {
        &mut self.mem[i * self.column + j]
    }
    pub fn row(&self, i: usize) -> &[T] {
        &self.mem[i * self.column..(i + 1) * self.column]
    }
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.mem[i * self.column..(i + 1) * self.column]
    }
    pub fn iter_rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.mem.chunks_exact(self.column)
    }
    pub fn as_slice(&self) -> &[T] {
        &self.mem
    }
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.mem
    }
    pub fn to_vecs(&self) -> Vec<Vec<T>> {
        self.iter_rows().map(|row| row.to_vec()).collect()
    }
}

impl<T> std::ops::Index<(usize, usize)> for DPTable<T> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.mem[i * self.column + j]
    }
}

impl<T> std::ops::IndexMut<(usize, usize)> for DPTable<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.mem[i * self.column + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn rows_and_cells() {
        let mut table = DPTable::new(3, 2, 0f64);
        table[(1, 1)] = 2.0;
        *table.get_mut(2, 0) = 3.0;
        table.row_mut(0).iter_mut().for_each(|x| *x = 1.0);
        assert_eq!(table.row(0), &[1.0, 1.0]);
        assert_eq!(table.get(1, 1), 2.0);
        assert_eq!(table[(2, 0)], 3.0);
        assert_eq!(table.iter_rows().count(), 3);
        assert_eq!(table.to_vecs()[1], vec![0.0, 2.0]);
        assert_eq!((table.rows(), table.columns()), (3, 2));
    }
}
