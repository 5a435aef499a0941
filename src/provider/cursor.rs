/// Tabular query results
///
/// A [`Cursor`] is a fixed set of named columns plus rows of optional cells,
/// the shape the host expects back from every query. Values for columns
/// outside the cursor's projection are dropped when a row is filled.
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        CellValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<Vec<Option<CellValue>>>,
}

impl Cursor {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Cursor over the caller's projection, or `default` when there is none
    pub fn with_projection(projection: Option<&[&str]>, default: &[&str]) -> Self {
        Self::new(projection.unwrap_or(default))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append an empty row and return a builder to fill it
    pub fn new_row(&mut self) -> RowBuilder<'_> {
        self.rows.push(vec![None; self.columns.len()]);
        let row = self.rows.last_mut().map(|r| r.as_mut_slice()).unwrap_or_default();
        RowBuilder {
            columns: &self.columns,
            row,
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_ref()
    }

    pub fn get_string(&self, row: usize, column: &str) -> Option<&str> {
        match self.get(row, column)? {
            CellValue::Text(s) => Some(s),
            CellValue::Integer(_) => None,
        }
    }

    pub fn get_long(&self, row: usize, column: &str) -> Option<i64> {
        match self.get(row, column)? {
            CellValue::Integer(v) => Some(*v),
            CellValue::Text(_) => None,
        }
    }

    /// Rows as column -> value maps, in column order
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView {
            columns: &self.columns,
            cells,
        })
    }
}

pub struct RowBuilder<'a> {
    columns: &'a [String],
    row: &'a mut [Option<CellValue>],
}

impl RowBuilder<'_> {
    /// Set `column`; ignored when the column is not projected
    pub fn add(&mut self, column: &str, value: impl Into<CellValue>) -> &mut Self {
        if let Some(index) = self.columns.iter().position(|c| c == column) {
            self.row[index] = Some(value.into());
        }
        self
    }
}

/// Borrowed view of one row, serialized as a JSON object
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [Option<CellValue>],
}

impl RowView<'_> {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.cells[index].as_ref()
    }
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}
