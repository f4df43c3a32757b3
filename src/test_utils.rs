use polars::prelude::*;
use std::path::Path;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

// Epoch milliseconds used by fixtures, cutoff in tests is 2023-10-27.
pub const OCT_20_2023_MS: i64 = 1_697_760_000_000;
pub const OCT_26_2023_LAST_SECOND_MS: i64 = 1_698_364_799_000;
pub const OCT_27_2023_MS: i64 = 1_698_364_800_000;
pub const OCT_28_2023_NOON_MS: i64 = 1_698_494_400_000;

#[derive(Debug, Clone)]
pub struct EventRow {
    pub user_id: i64,
    pub event_type: &'static str,
    pub timestamp_ms: i64,
    pub user_type: &'static str,
    pub location: &'static str,
}

impl EventRow {
    pub fn new(
        user_id: i64,
        event_type: &'static str,
        timestamp_ms: i64,
        user_type: &'static str,
    ) -> Self {
        EventRow {
            user_id,
            event_type,
            timestamp_ms,
            user_type,
            location: "US",
        }
    }
}

pub fn events_frame(rows: &[EventRow]) -> DataFrame {
    let timestamps = Series::new(
        "timestamp".into(),
        rows.iter().map(|r| r.timestamp_ms).collect::<Vec<_>>(),
    )
    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
    .unwrap();

    DataFrame::new(vec![
        Column::new(
            "user_id".into(),
            rows.iter().map(|r| r.user_id).collect::<Vec<_>>(),
        ),
        Column::new(
            "event_type".into(),
            rows.iter().map(|r| r.event_type).collect::<Vec<_>>(),
        ),
        timestamps.into(),
        Column::new(
            "user_type".into(),
            rows.iter().map(|r| r.user_type).collect::<Vec<_>>(),
        ),
        Column::new(
            "location".into(),
            rows.iter().map(|r| r.location).collect::<Vec<_>>(),
        ),
    ])
    .unwrap()
}

pub fn write_parquet(path: &Path, frame: &DataFrame) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut frame = frame.clone();
    let file = std::fs::File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut frame).unwrap();
}

pub fn write_events(path: &Path, rows: &[EventRow]) {
    write_parquet(path, &events_frame(rows));
}

/// Ten events: five `new` users and five `returning` users, cycling through event types.
pub fn ten_events(timestamp_ms: i64) -> Vec<EventRow> {
    let event_types = ["Login", "Logout", "Download", "Share"];
    (0..10)
        .map(|i| {
            EventRow::new(
                i as i64,
                event_types[i % event_types.len()],
                timestamp_ms + i as i64 * 1_000,
                if i % 2 == 0 { "new" } else { "returning" },
            )
        })
        .collect()
}
