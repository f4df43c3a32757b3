//! Writes user event Parquet files into a local directory laid out like the cold store bucket.
//!
//! ```text
//! cargo run --example generate_events -- ./local-bucket 3 500
//! cargo run -- --local-root ./local-bucket
//! ```
use polars::prelude::*;
use std::fs::File;
use std::path::PathBuf;

const PREFIX: &str = "topics/user_events_avro/partition=0";
const EVENT_TYPES: [&str; 4] = ["Login", "Logout", "Download", "Share"];
const USER_TYPES: [&str; 3] = ["Free", "Premium", "Enterprise"];
const LOCATIONS: [&str; 4] = ["US", "BR", "EU", "IN"];

// 2023-10-25T00:00:00Z, events are spread over the following four days.
const START_MS: i64 = 1_698_192_000_000;
const STEP_MS: i64 = 37 * 60 * 1_000;

fn events(file_index: usize, rows: usize) -> PolarsResult<DataFrame> {
    let offset = file_index * rows;
    let ids: Vec<i64> = (0..rows).map(|i| ((offset + i) % 1_000) as i64).collect();
    let event_types: Vec<&str> = (0..rows)
        .map(|i| EVENT_TYPES[(offset + i) % EVENT_TYPES.len()])
        .collect();
    let user_types: Vec<&str> = (0..rows)
        .map(|i| USER_TYPES[(offset + i) % USER_TYPES.len()])
        .collect();
    let locations: Vec<&str> = (0..rows)
        .map(|i| LOCATIONS[(offset + i * 3) % LOCATIONS.len()])
        .collect();
    let timestamps: Vec<i64> = (0..rows)
        .map(|i| START_MS + ((offset + i) as i64 * STEP_MS) % (4 * 24 * 60 * 60 * 1_000))
        .collect();

    let timestamp = Series::new("timestamp".into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut df = df!(
        "user_id" => ids,
        "event_type" => event_types,
    )?;
    df.with_column(timestamp)?;
    df.with_column(Series::new("user_type".into(), user_types))?;
    df.with_column(Series::new("location".into(), locations))?;
    Ok(df)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| "local-bucket".to_string()));
    let files: usize = args.next().map(|v| v.parse()).transpose()?.unwrap_or(2);
    let rows: usize = args.next().map(|v| v.parse()).transpose()?.unwrap_or(100);

    let dir = root.join(PREFIX);
    std::fs::create_dir_all(&dir)?;

    for index in 0..files {
        let mut df = events(index, rows)?;
        let path = dir.join(format!("user_events+0+{:010}.parquet", index * rows));
        ParquetWriter::new(File::create(&path)?).finish(&mut df)?;
        println!("Created {} ({} rows)", path.display(), df.height());
    }
    Ok(())
}
