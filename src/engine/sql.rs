use crate::imports::*;

/*
    SQL text builders. Values that end up inside a statement (file URIs, the cutoff date, secret
    fields) are embedded as string literals with single quotes doubled.
*/
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn create_table_from_parquet(table: &str, uri: &str) -> String {
    format!(
        "CREATE TABLE {} AS SELECT * FROM read_parquet({})",
        table,
        quote_literal(uri)
    )
}

pub fn insert_from_parquet(table: &str, uri: &str) -> String {
    format!(
        "INSERT INTO {} SELECT * FROM read_parquet({})",
        table,
        quote_literal(uri)
    )
}

pub fn count_all(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table)
}

pub fn count_by(table: &str, column: &str) -> String {
    format!(
        "SELECT {column}, COUNT(*) FROM {table} GROUP BY {column}",
        column = column,
        table = table
    )
}

pub fn count_by_since(table: &str, column: &str, time_column: &str, cutoff: &str) -> String {
    format!(
        "SELECT {column}, COUNT(*) FROM {table} WHERE {time_column} >= {cutoff} GROUP BY {column}",
        column = column,
        table = table,
        time_column = time_column,
        cutoff = quote_literal(cutoff)
    )
}

const S3_SECRET_NAME: &str = "coldstore_s3";

// Without explicit keys the aws extension resolves credentials the same way the AWS SDKs do.
pub fn create_s3_secret(settings: &StorageSettings) -> String {
    let mut options: Vec<String> = vec!["TYPE S3".to_string()];

    match (&settings.access_key_id, &settings.secret_access_key) {
        (Some(key_id), Some(secret)) => {
            options.push(format!("KEY_ID {}", quote_literal(key_id)));
            options.push(format!("SECRET {}", quote_literal(secret)));
            if let Some(token) = &settings.session_token {
                options.push(format!("SESSION_TOKEN {}", quote_literal(token)));
            }
        }
        _ => options.push("PROVIDER CREDENTIAL_CHAIN".to_string()),
    }

    if let Some(region) = &settings.region {
        options.push(format!("REGION {}", quote_literal(region)));
    }

    if let Some(endpoint) = &settings.endpoint {
        let (host, use_ssl) = match endpoint.split_once("://") {
            Some(("http", host)) => (host, false),
            Some((_, host)) => (host, true),
            None => (endpoint.as_str(), !settings.allow_http),
        };
        options.push(format!(
            "ENDPOINT {}",
            quote_literal(host.trim_end_matches('/'))
        ));
        options.push("URL_STYLE 'path'".to_string());
        options.push(format!("USE_SSL {}", use_ssl));
    }

    format!(
        "CREATE OR REPLACE SECRET {} ({})",
        S3_SECRET_NAME,
        options.join(", ")
    )
}
