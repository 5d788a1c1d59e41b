use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeMetricsError {
    #[error("Invalid input table: {0}")]
    InputFormat(String),

    #[error("Insufficient geometry: {0}")]
    InsufficientGeometry(String),

    #[error("No scene below {max_cloud_pct}% cloud cover between {start} and {end}")]
    NoImageryAvailable {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        max_cloud_pct: f64,
    },

    #[error("Imagery service query failed after {attempts} attempt(s): {message}")]
    RemoteQuery { attempts: u32, message: String },

    #[error("Invalid pipeline parameter: {0}")]
    InvalidParameter(String),

    #[error("Raster shape mismatch: {0}")]
    RasterShape(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvironment(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PartialEq for TreeMetricsError {
    fn eq(&self, other: &Self) -> bool {
        use TreeMetricsError::*;
        match (self, other) {
            (InputFormat(a), InputFormat(b)) => a == b,
            (InsufficientGeometry(a), InsufficientGeometry(b)) => a == b,
            (
                NoImageryAvailable {
                    start: s1,
                    end: e1,
                    max_cloud_pct: c1,
                },
                NoImageryAvailable {
                    start: s2,
                    end: e2,
                    max_cloud_pct: c2,
                },
            ) => s1 == s2 && e1 == e2 && c1 == c2,
            (
                RemoteQuery {
                    attempts: a1,
                    message: m1,
                },
                RemoteQuery {
                    attempts: a2,
                    message: m2,
                },
            ) => a1 == a2 && m1 == m2,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (RasterShape(a), RasterShape(b)) => a == b,
            (MissingEnvironment(a), MissingEnvironment(b)) => a == b,

            // Wrapped foreign errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (ReqwestError(_), ReqwestError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}

