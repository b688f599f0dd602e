//! Indexed table rebuilt from a run log body

use crate::value::Scalar;

/// Column used as the row index when present.
pub const STEP_COLUMN: &str = "step";

/// Tabular view of a run log.
///
/// When the log has a `step` column it becomes the index and is removed from
/// the data columns; otherwise rows are indexed `0..n`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunTable {
    columns: Vec<String>,
    index_name: Option<String>,
    index: Vec<Scalar>,
    rows: Vec<Vec<Scalar>>,
}

impl RunTable {
    /// Build a table from a header row and raw cell rows.
    ///
    /// Rows with too few cells are padded with nulls; rows with too many are
    /// truncated.
    #[must_use]
    pub fn from_rows(header: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let index_pos = header.iter().position(|c| c == STEP_COLUMN);

        let mut index = Vec::with_capacity(raw_rows.len());
        let mut rows = Vec::with_capacity(raw_rows.len());

        for (line, raw) in raw_rows.into_iter().enumerate() {
            if raw.len() != width {
                tracing::debug!(
                    row = line,
                    expected = width,
                    found = raw.len(),
                    "malformed run log row"
                );
            }
            let mut cells: Vec<Scalar> = raw.iter().map(|c| Scalar::parse_cell(c)).collect();
            cells.resize(width, Scalar::Null);

            match index_pos {
                Some(pos) => index.push(cells.remove(pos)),
                None => index.push(Scalar::from(line)),
            }
            rows.push(cells);
        }

        let mut columns = header;
        let index_name = index_pos.map(|pos| columns.remove(pos));

        Self {
            columns,
            index_name,
            index,
            rows,
        }
    }

    /// Data column names (excluding the index).
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Name of the index column, `None` for the default `0..n` index.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Index value of every row.
    #[must_use]
    pub fn index(&self) -> &[Scalar] {
        &self.index
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Scalar>> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[pos]).collect())
    }

    /// Numeric view of one column; non-numeric cells become `NaN`.
    #[must_use]
    pub fn column_f64(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name)
            .map(|cells| cells.into_iter().map(|c| c.as_f64().unwrap_or(f64::NAN)).collect())
    }

    /// Row by position.
    #[must_use]
    pub fn row(&self, position: usize) -> Option<&[Scalar]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    /// First row whose index equals `step`.
    #[must_use]
    pub fn row_at(&self, step: i64) -> Option<&[Scalar]> {
        self.index
            .iter()
            .position(|i| i.as_i64() == Some(step))
            .and_then(|pos| self.row(pos))
    }

    /// Iterate `(index, row)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Scalar, &[Scalar])> {
        self.index.iter().zip(self.rows.iter().map(Vec::as_slice))
    }
}
