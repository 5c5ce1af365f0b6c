use polars::prelude::*;
use rayon::prelude::*;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::BVError;

#[derive(Debug)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

/// A single loosely typed cell value.
///
/// Values keep the type they were loaded with. Comparisons between different
/// types follow the relational rules of a dynamically typed language: two texts
/// compare lexicographically, everything else is compared as a number, and a
/// value without a numeric reading is neither smaller nor larger than anything.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// True for values that carry something to search in.
    /// Missing, null, false, zero and empty text never match a query.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Missing | FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
        }
    }

    fn as_number(&self) -> f64 {
        match self {
            FieldValue::Missing => f64::NAN,
            FieldValue::Null => 0.0,
            FieldValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => parse_number(s),
        }
    }

    pub fn less_than(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a < b,
            _ => self.as_number() < other.as_number(),
        }
    }

    pub fn greater_than(&self, other: &FieldValue) -> bool {
        other.less_than(self)
    }

    /// Ordering derived from `less_than` / `greater_than`.
    /// Not a total order when the values are of mixed types.
    pub fn relational_cmp(&self, other: &FieldValue) -> Ordering {
        if self.less_than(other) {
            Ordering::Less
        } else if self.greater_than(other) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

fn parse_number(text: &str) -> f64 {
    let t = text.trim();
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t
            .chars()
            .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => t.parse().unwrap_or(f64::NAN),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => Ok(()),
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Make,
    Model,
    Year,
    Displacement,
    Price,
    Terrain,
    Description,
}

impl Field {
    /// Fields that take part in a text search, in match order.
    pub const SEARCHABLE: [Field; 8] = [
        Field::Id,
        Field::Make,
        Field::Model,
        Field::Year,
        Field::Displacement,
        Field::Price,
        Field::Terrain,
        Field::Description,
    ];

    /// Columns of the table view, in display order.
    pub const COLUMNS: [Field; 7] = [
        Field::Make,
        Field::Model,
        Field::Year,
        Field::Displacement,
        Field::Price,
        Field::Terrain,
        Field::Description,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "BikeID",
            Field::Make => "Make",
            Field::Model => "Model",
            Field::Year => "Year",
            Field::Displacement => "Displacement",
            Field::Price => "Price",
            Field::Terrain => "Terrain",
            Field::Description => "Description",
        }
    }

    /// Free text has no meaningful order; the identifier is not a column.
    pub fn is_sortable(&self) -> bool {
        !matches!(self, Field::Id | Field::Description)
    }

    pub fn from_name(name: &str) -> Option<Field> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bikeid" | "bike_id" | "id" => Some(Field::Id),
            "make" => Some(Field::Make),
            "model" => Some(Field::Model),
            "year" => Some(Field::Year),
            "displacement" => Some(Field::Displacement),
            "price" => Some(Field::Price),
            "terrain" => Some(Field::Terrain),
            "description" => Some(Field::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: FieldValue,
    pub make: FieldValue,
    pub model: FieldValue,
    pub year: FieldValue,
    pub displacement: FieldValue,
    pub price: FieldValue,
    pub terrain: FieldValue,
    pub description: FieldValue,
}

impl Record {
    pub fn get(&self, field: Field) -> &FieldValue {
        match field {
            Field::Id => &self.id,
            Field::Make => &self.make,
            Field::Model => &self.model,
            Field::Year => &self.year,
            Field::Displacement => &self.displacement,
            Field::Price => &self.price,
            Field::Terrain => &self.terrain,
            Field::Description => &self.description,
        }
    }

    fn set(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Id => self.id = value,
            Field::Make => self.make = value,
            Field::Model => self.model = value,
            Field::Year => self.year = value,
            Field::Displacement => self.displacement = value,
            Field::Price => self.price = value,
            Field::Terrain => self.terrain = value,
            Field::Description => self.description = value,
        }
    }

    /// Builds a record from a json object. Anything that is not an object
    /// becomes a record without fields.
    pub fn from_json(value: &Value) -> Self {
        let mut record = Record::default();
        if let Value::Object(map) = value {
            for (key, v) in map {
                match Field::from_name(key) {
                    Some(field) => record.set(field, FieldValue::from(v)),
                    None => trace!("Ignoring unknown field {key}"),
                }
            }
        }
        record
    }

    /// Tab separated rendering of all fields.
    pub fn as_tsv(&self) -> String {
        Field::SEARCHABLE
            .iter()
            .map(|&f| self.get(f).to_string())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// The records exactly as they were loaded. Never modified after construction.
#[derive(Debug, Default)]
pub struct Dataset {
    name: String,
    records: Vec<Record>,
}

impl Dataset {
    pub fn load(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, BVError> {
        let value: Value = serde_json::from_str(json)?;
        let entries = match value {
            Value::Array(entries) => entries,
            _ => {
                return Err(BVError::LoadingFailed(
                    "expected a json array of records".into(),
                ));
            }
        };
        let records = entries.iter().map(Record::from_json).collect();
        Ok(Self::load(name, records))
    }

    pub fn load_file(path: PathBuf) -> Result<Self, BVError> {
        let file_type = get_file_type(&path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();

        let start_time = Instant::now();
        let dataset = match file_type {
            FileType::JSON => Self::from_json_str(name, &fs::read_to_string(&path)?)?,
            FileType::CSV => Self::from_frame(name, load_csv(&path)?.collect()?)?,
            FileType::PARQUET => Self::from_frame(name, load_parquet(&path)?.collect()?)?,
            FileType::ARROW => Self::from_frame(name, load_arrow(&path)?.collect()?)?,
        };
        info!(
            "Loading {} records from {:?} took {}ms ...",
            dataset.len(),
            file_type,
            start_time.elapsed().as_millis()
        );
        Ok(dataset)
    }

    /// Each known column is converted in its own thread.
    fn from_frame(name: String, df: DataFrame) -> Result<Self, BVError> {
        let converted: Result<Vec<(Field, Vec<FieldValue>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .filter_map(|col_name| Field::from_name(col_name).map(|f| (f, col_name)))
            .map(|(field, col_name)| load_column(&df, col_name).map(|values| (field, values)))
            .collect();
        let columns = converted?;

        let mut records = vec![Record::default(); df.height()];
        for (field, values) in columns {
            debug!("Column {} with {} values", field.name(), values.len());
            for (record, value) in records.iter_mut().zip(values) {
                record.set(field, value);
            }
        }
        Ok(Self::load(name, records))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<FieldValue>, PolarsError> {
    let column = df.column(col_name)?;
    if is_numeric_type(column.dtype()) {
        let col = column.cast(&DataType::Float64)?;
        Ok(col
            .f64()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Number))
            .collect())
    } else if column.dtype() == &DataType::Boolean {
        Ok(column
            .bool()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Bool))
            .collect())
    } else {
        let col = column.cast(&DataType::String)?;
        Ok(col
            .str()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string())))
            .collect())
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, BVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(BVError::UnknownFileType),
    }
}

fn get_file_type(path: &Path) -> Result<FileType, BVError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BVError::FileNotFound,
        ErrorKind::PermissionDenied => BVError::PermissionDenied,
        _ => BVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(BVError::LoadingFailed("Not a file!".into()));
    }
    detect_file_type(path)
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn json_records_tolerate_missing_and_unknown_fields() {
        let json = r#"[
            {"BikeID": 1, "Make": "Yamaha", "Year": 2020, "Price": 5000, "Color": "blue"},
            {"Make": "Honda", "Year": "2019"},
            42
        ]"#;
        let dataset = Dataset::from_json_str("inline", json).unwrap();
        assert_eq!(dataset.len(), 3);

        let yamaha = dataset.get(0).unwrap();
        assert_eq!(yamaha.id, FieldValue::Number(1.0));
        assert_eq!(yamaha.make, FieldValue::Text("Yamaha".into()));
        assert_eq!(yamaha.terrain, FieldValue::Missing);

        let honda = dataset.get(1).unwrap();
        assert_eq!(honda.year, FieldValue::Text("2019".into()));
        assert_eq!(honda.id, FieldValue::Missing);

        assert_eq!(dataset.get(2).unwrap(), &Record::default());
    }

    #[test]
    fn json_must_be_an_array() {
        let result = Dataset::from_json_str("inline", r#"{"Make": "Honda"}"#);
        assert!(matches!(result, Err(BVError::LoadingFailed(_))));
    }

    #[test]
    fn numbers_render_in_shortest_form() {
        assert_eq!(FieldValue::Number(4500.0).to_string(), "4500");
        assert_eq!(FieldValue::Number(0.5).to_string(), "0.5");
        assert_eq!(FieldValue::Missing.to_string(), "");
    }

    #[test]
    fn mixed_types_compare_like_dynamic_values() {
        let text = |s: &str| FieldValue::Text(s.to_string());
        let num = FieldValue::Number;

        // Texts compare lexicographically, not numerically.
        assert!(text("10").less_than(&text("9")));
        // A numeric text against a number compares as numbers.
        assert!(num(9.0).less_than(&text("10")));
        // Text without a numeric reading is unordered against numbers.
        assert_eq!(text("abc").relational_cmp(&num(1.0)), Ordering::Equal);
        assert_eq!(FieldValue::Missing.relational_cmp(&num(1.0)), Ordering::Equal);
        assert!(FieldValue::Null.less_than(&num(1.0)));
    }

    #[test]
    fn presence_follows_truthiness() {
        assert!(!FieldValue::Missing.is_present());
        assert!(!FieldValue::Text(String::new()).is_present());
        assert!(!FieldValue::Number(0.0).is_present());
        assert!(FieldValue::Number(125.0).is_present());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let result = Dataset::load_file(fixture("bikes.csv").with_extension("txt"));
        assert!(matches!(result, Err(BVError::FileNotFound)));
        assert!(matches!(
            detect_file_type(Path::new("bikes.xml")),
            Err(BVError::UnknownFileType)
        ));
    }

    #[test]
    fn loads_csv_fixture() {
        let dataset = Dataset::load_file(fixture("bikes.csv")).unwrap();
        assert_eq!(dataset.name(), "bikes.csv");
        assert_eq!(dataset.len(), 4);
        let first = dataset.get(0).unwrap();
        assert_eq!(first.make, FieldValue::Text("Yamaha".into()));
        assert_eq!(first.price, FieldValue::Number(5000.0));
        assert_eq!(first.terrain, FieldValue::Text("Road".into()));
    }

    #[test]
    fn loads_json_fixture() {
        let dataset = Dataset::load_file(fixture("bikes.json")).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.get(1).unwrap().make, FieldValue::Text("Honda".into()));
    }
}
