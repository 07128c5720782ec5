// Statistics table I/O
//
// Collated experiment output is a separator-delimited table with a header
// row of metric names and one row per collection interval. Models only ever
// need whole columns or the final (steady-state) row.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::crw_error::{ModelError, ModelResult};

// ============================================================================
// Reading
// ============================================================================

/// Column-major numeric table loaded from a statistics file
#[derive(Debug, Clone)]
pub struct StatsTable {
    path: PathBuf,
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Vec<f64>>,
}

impl StatsTable {
    pub fn read(path: impl AsRef<Path>, separator: char) -> ModelResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        Self::parse(path, &content, separator)
    }

    /// Parse table text. `path` is only used for error messages.
    pub fn parse(path: impl AsRef<Path>, content: &str, separator: char) -> ModelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end().trim_end_matches(separator)))
            .filter(|(_, l)| !l.is_empty());

        let (_, header) = lines.next().ok_or_else(|| ModelError::EmptyTable(path.clone()))?;
        let names: Vec<String> = header
            .split(separator)
            .map(|s| s.trim().to_string())
            .collect();

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.insert(name.clone(), i);
        }

        let mut columns = vec![Vec::new(); names.len()];
        for (line_no, line) in lines {
            let cells: Vec<&str> = line.split(separator).collect();
            if cells.len() != names.len() {
                return Err(ModelError::Parse {
                    path,
                    line: line_no,
                    message: format!("expected {} cells, found {}", names.len(), cells.len()),
                });
            }
            for (col, cell) in columns.iter_mut().zip(cells) {
                let value: f64 = cell.trim().parse().map_err(|_| ModelError::Parse {
                    path: path.clone(),
                    line: line_no,
                    message: format!("'{}' is not a number", cell.trim()),
                })?;
                col.push(value);
            }
        }

        Ok(Self {
            path,
            names,
            index,
            columns,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> ModelResult<&[f64]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| ModelError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    /// Final (steady-state) value of a column
    pub fn last(&self, name: &str) -> ModelResult<f64> {
        self.column(name)?
            .last()
            .copied()
            .ok_or_else(|| ModelError::EmptyTable(self.path.clone()))
    }

    /// Names of all columns containing `pattern`, in file order
    pub fn columns_matching(&self, pattern: &str) -> Vec<&str> {
        self.names
            .iter()
            .filter(|n| n.contains(pattern))
            .map(String::as_str)
            .collect()
    }
}

// ============================================================================
// Writing
// ============================================================================

/// One batch-level summary row: a value per experiment, in batch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRow {
    cells: IndexMap<String, f64>,
}

impl BatchRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exp_name: impl Into<String>, value: f64) {
        self.cells.insert(exp_name.into(), value);
    }

    pub fn get(&self, exp_name: &str) -> Option<f64> {
        self.cells.get(exp_name).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn exp_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn values(&self) -> Vec<f64> {
        self.cells.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Header of experiment names followed by a single value line
    pub fn write(&self, path: impl AsRef<Path>, separator: char) -> ModelResult<()> {
        let path = path.as_ref();
        let sep = separator.to_string();
        let header: Vec<&str> = self.exp_names().collect();
        let values: Vec<String> = self.cells.values().map(|v| v.to_string()).collect();

        let file = File::create(path).map_err(|e| ModelError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", header.join(&sep))
            .and_then(|_| writeln!(writer, "{}", values.join(&sep)))
            .and_then(|_| writer.flush())
            .map_err(|e| ModelError::io(path, e))
    }

    pub fn read(path: impl AsRef<Path>, separator: char) -> ModelResult<Self> {
        let table = StatsTable::read(path, separator)?;
        let mut row = BatchRow::new();
        for name in table.column_names() {
            row.insert(name.clone(), table.last(name)?);
        }
        Ok(row)
    }
}

impl FromIterator<(String, f64)> for BatchRow {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Write a single-column series with header `column`
pub fn write_series(path: impl AsRef<Path>, column: &str, series: &[f64]) -> ModelResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ModelError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut result = writeln!(writer, "{}", column);
    for v in series {
        if result.is_err() {
            break;
        }
        result = writeln!(writer, "{}", v);
    }
    result
        .and_then(|_| writer.flush())
        .map_err(|e| ModelError::io(path, e))
}

/// Legend files hold one display name per line
pub fn write_legend(path: impl AsRef<Path>, legend: &str) -> ModelResult<()> {
    let path = path.as_ref();
    fs::write(path, format!("{}\n", legend)).map_err(|e| ModelError::io(path, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unique scratch directory under the system temp dir
    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "crw_rust_{}_{}_{}",
            tag,
            std::process::id(),
            n
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_columns_and_last_row() {
        let content = "clock;cum_avg_exp_interference;int_avg_interference_duration\n\
                       1;0.5;10\n\
                       2;0.75;12\n\
                       3;1.0;14\n";
        let table = StatsTable::parse("mem", content, ';').unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.last("cum_avg_exp_interference").unwrap(), 1.0);
        assert_eq!(
            table.column("int_avg_interference_duration").unwrap(),
            &[10.0, 12.0, 14.0]
        );
    }

    #[test]
    fn test_missing_column_names_it() {
        let table = StatsTable::parse("mem", "a;b\n1;2\n", ';').unwrap();
        match table.last("c") {
            Err(ModelError::MissingColumn { column, .. }) => assert_eq!(column, "c"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_only_table_has_no_last() {
        let table = StatsTable::parse("mem", "a;b\n", ';').unwrap();
        assert_eq!(table.n_rows(), 0);
        assert!(matches!(table.last("a"), Err(ModelError::EmptyTable(_))));
        assert!(matches!(
            StatsTable::parse("mem", "", ';'),
            Err(ModelError::EmptyTable(_))
        ));
    }

    #[test]
    fn test_ragged_and_non_numeric_rows_fail() {
        assert!(matches!(
            StatsTable::parse("mem", "a;b\n1\n", ';'),
            Err(ModelError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            StatsTable::parse("mem", "a;b\n1;x\n", ';'),
            Err(ModelError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_trailing_separator_tolerated() {
        let table = StatsTable::parse("mem", "a;b;\n1;2;\n", ';').unwrap();
        assert_eq!(table.column_names().len(), 2);
        assert_eq!(table.last("b").unwrap(), 2.0);
    }

    #[test]
    fn test_columns_matching() {
        let content = "cluster0_xmin;cluster0_xmax;cluster1_xmin;cluster1_xmax\n0;1;2;3\n";
        let table = StatsTable::parse("mem", content, ';').unwrap();
        assert_eq!(
            table.columns_matching("xmin"),
            vec!["cluster0_xmin", "cluster1_xmin"]
        );
    }

    #[test]
    fn test_batch_row_write_and_read_back() {
        let dir = scratch_dir("batch_row");
        let mut row = BatchRow::new();
        row.insert("exp0", 1.5);
        row.insert("exp1", 2.5);
        row.insert("exp2", f64::INFINITY);

        let path = dir.join("pm-raw.model");
        row.write(&path, ';').unwrap();
        let back = BatchRow::read(&path, ';').unwrap();
        assert_eq!(back.exp_names().collect::<Vec<_>>(), vec!["exp0", "exp1", "exp2"]);
        assert_eq!(back.get("exp1"), Some(2.5));
        assert_eq!(back.get("exp2"), Some(f64::INFINITY));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_series_file_is_a_table() {
        let dir = scratch_dir("series");
        let path = dir.join("fsm-interference-counts.model");
        write_series(&path, "model", &[0.0, 0.5, 1.0]).unwrap();
        let table = StatsTable::read(&path, ';').unwrap();
        assert_eq!(table.column("model").unwrap(), &[0.0, 0.5, 1.0]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
