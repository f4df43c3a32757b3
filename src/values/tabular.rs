use crate::imports::*;
use duckdb::types::Value;
use polars::prelude::{AnyValue, Column, DataFrame, Series};

/*
    Types:
    * TabularValue - A tabular data structure, re-export of Polars DataFrame. Every report result is held as one.
    * RowBuffer - Column-major buffer filled row by row from engine results, turned into a TabularValue once complete.
*/
pub type TabularValue = DataFrame;

#[derive(Debug, Default)]
pub struct RowBuffer {
    names: Vec<String>,
    columns: Vec<Vec<AnyValue<'static>>>,
}

impl RowBuffer {
    pub fn new(names: Vec<String>) -> Self {
        let names = dedupe_names(names);
        let columns = names.iter().map(|_| Vec::new()).collect();
        RowBuffer { names, columns }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.width() {
            return Err(anyhow::anyhow!(
                "Row has {} values, expected {}",
                row.len(),
                self.width()
            ));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(any_value_from(value));
        }
        Ok(())
    }

    pub fn into_frame(self) -> Result<TabularValue> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.names.len());
        for (name, values) in self.names.into_iter().zip(self.columns) {
            let series = Series::from_any_values(name.as_str().into(), &values, false)
                .with_context(|| format!("Failed to build column '{}'", name))?;
            columns.push(Column::from(series));
        }
        DataFrame::new(columns).context("Failed to assemble result frame")
    }
}

// Engine column names are not guaranteed unique (e.g. two COUNT(*) columns).
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{}_{}", name, *count - 1)
            }
        })
        .collect()
}

/*
    Helper functions:
    * any_value_from - Maps an owned engine value onto a polars AnyValue. Types without a direct
      counterpart are kept as their debug text.
    * render_rows - Renders a frame as a list of tuples, e.g. `[("new", 10), ("returning", 10)]`
    * render_any_value / any_value_text - Single value rendering, quoted and unquoted
*/
pub fn any_value_from(value: Value) -> AnyValue<'static> {
    match value {
        Value::Null => AnyValue::Null,
        Value::Boolean(b) => AnyValue::Boolean(b),
        Value::TinyInt(v) => AnyValue::Int32(v as i32),
        Value::SmallInt(v) => AnyValue::Int32(v as i32),
        Value::Int(v) => AnyValue::Int32(v),
        Value::BigInt(v) => AnyValue::Int64(v),
        Value::UTinyInt(v) => AnyValue::UInt32(v as u32),
        Value::USmallInt(v) => AnyValue::UInt32(v as u32),
        Value::UInt(v) => AnyValue::UInt32(v),
        Value::UBigInt(v) => AnyValue::UInt64(v),
        Value::HugeInt(v) => match i64::try_from(v) {
            Ok(v) => AnyValue::Int64(v),
            Err(_) => AnyValue::StringOwned(v.to_string().into()),
        },
        Value::Float(v) => AnyValue::Float32(v),
        Value::Double(v) => AnyValue::Float64(v),
        Value::Text(s) | Value::Enum(s) => AnyValue::StringOwned(s.into()),
        other => AnyValue::StringOwned(format!("{:?}", other).into()),
    }
}

pub fn any_value_text(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Null => "None".to_string(),
        other => other.to_string(),
    }
}

pub fn render_any_value(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => format!("{:?}", s),
        AnyValue::StringOwned(s) => format!("{:?}", s.as_str()),
        other => any_value_text(other),
    }
}

pub fn render_rows(frame: &TabularValue) -> Result<String> {
    let mut rows = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let mut values = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let value = column
                .get(row)
                .with_context(|| format!("Failed to read row {} of '{}'", row, column.name()))?;
            values.push(render_any_value(&value));
        }
        rows.push(match values.len() {
            1 => format!("({},)", values[0]),
            _ => format!("({})", values.join(", ")),
        });
    }
    Ok(format!("[{}]", rows.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped_buffer() -> RowBuffer {
        let mut buffer = RowBuffer::new(vec!["user_type".to_string(), "count_star()".to_string()]);
        buffer
            .push_row(vec![Value::Text("new".to_string()), Value::BigInt(10)])
            .unwrap();
        buffer
            .push_row(vec![Value::Text("returning".to_string()), Value::BigInt(10)])
            .unwrap();
        buffer
    }

    #[test]
    fn test_row_buffer_builds_frame() {
        let buffer = grouped_buffer();
        assert_eq!(buffer.height(), 2);

        let frame = buffer.into_frame().unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 2);
        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["user_type", "count_star()"]);
    }

    #[test]
    fn test_row_buffer_rejects_wrong_arity() {
        let mut buffer = RowBuffer::new(vec!["a".to_string()]);
        assert!(buffer.push_row(vec![Value::Int(1), Value::Int(2)]).is_err());
    }

    #[test]
    fn test_render_rows_uses_tuple_notation() {
        let frame = grouped_buffer().into_frame().unwrap();
        assert_eq!(
            render_rows(&frame).unwrap(),
            r#"[("new", 10), ("returning", 10)]"#
        );

        let mut single = RowBuffer::new(vec!["count_star()".to_string()]);
        single.push_row(vec![Value::BigInt(20)]).unwrap();
        assert_eq!(render_rows(&single.into_frame().unwrap()).unwrap(), "[(20,)]");
    }

    #[test]
    fn test_render_empty_result() {
        let frame = RowBuffer::new(vec!["event_type".to_string(), "count_star()".to_string()])
            .into_frame()
            .unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(render_rows(&frame).unwrap(), "[]");
    }

    #[test]
    fn test_duplicate_column_names_are_suffixed() {
        let buffer = RowBuffer::new(vec![
            "count_star()".to_string(),
            "count_star()".to_string(),
        ]);
        let frame = buffer.into_frame().unwrap();
        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["count_star()", "count_star()_1"]);
    }

    #[test]
    fn test_any_value_mapping() {
        assert_eq!(any_value_from(Value::Null), AnyValue::Null);
        assert_eq!(any_value_from(Value::BigInt(7)), AnyValue::Int64(7));
        assert_eq!(any_value_from(Value::HugeInt(7)), AnyValue::Int64(7));
        assert_eq!(
            any_value_text(&any_value_from(Value::Enum("Premium".to_string()))),
            "Premium"
        );
    }
}
