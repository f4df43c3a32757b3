use crate::imports::*;
use polars::prelude::AnyValue;

pub mod export;

/*
    Types:
    * ReportQuery - One of the fixed aggregate queries: a stable name, the label printed before its rows, and the SQL text
    * ReportResult - A fully materialized query result plus the query it came from
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    name: &'static str,
    label: String,
    sql: String,
}

impl ReportQuery {
    pub fn new(name: &'static str, label: impl Into<String>, sql: impl Into<String>) -> Self {
        ReportQuery {
            name,
            label: label.into(),
            sql: sql.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The three reports of a run, in the order they are executed and printed.
    pub fn standard(table: &str, cutoff_date: &str) -> Vec<ReportQuery> {
        vec![
            ReportQuery::new("total_events", "Total events", sql::count_all(table)),
            ReportQuery::new(
                "events_by_user_type",
                "Events by user type",
                sql::count_by(table, "user_type"),
            ),
            ReportQuery::new(
                "events_by_type_since_cutoff",
                format!("Events by type since {}", cutoff_date),
                sql::count_by_since(table, "event_type", "timestamp", cutoff_date),
            ),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ReportResult {
    query: ReportQuery,
    frame: TabularValue,
}

impl ReportResult {
    pub fn new(query: ReportQuery, frame: TabularValue) -> Self {
        ReportResult { query, frame }
    }

    pub fn name(&self) -> &'static str {
        self.query.name()
    }

    pub fn label(&self) -> &str {
        self.query.label()
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn frame(&self) -> &TabularValue {
        &self.frame
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Single count of a one-row, one-column result.
    pub fn total(&self) -> Result<i64> {
        if self.frame.height() != 1 || self.frame.width() != 1 {
            return Err(anyhow::anyhow!(
                "Report '{}' is {}x{}, expected a single value",
                self.name(),
                self.frame.height(),
                self.frame.width()
            ));
        }
        let value = self.frame.get_columns()[0].get(0)?;
        count_of(&value).with_context(|| format!("Report '{}' has no count", self.name()))
    }

    /// `(group, count)` pairs of a two-column grouped count, in result order.
    pub fn grouped_counts(&self) -> Result<Vec<(String, i64)>> {
        if self.frame.width() != 2 {
            return Err(anyhow::anyhow!(
                "Report '{}' has {} columns, expected 2",
                self.name(),
                self.frame.width()
            ));
        }
        let columns = self.frame.get_columns();
        let mut pairs = Vec::with_capacity(self.frame.height());
        for row in 0..self.frame.height() {
            let group = any_value_text(&columns[0].get(row)?);
            let count = count_of(&columns[1].get(row)?)
                .with_context(|| format!("Report '{}' row {} has no count", self.name(), row))?;
            pairs.push((group, count));
        }
        Ok(pairs)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Rows => Ok(format!("{}: {}", self.label(), render_rows(&self.frame)?)),
            OutputFormat::Table => Ok(format!("{}:\n{}", self.label(), self.frame)),
        }
    }
}

fn count_of(value: &AnyValue) -> Option<i64> {
    value.extract::<i64>()
}
