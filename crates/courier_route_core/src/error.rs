use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed cost matrix ({rows} rows): {detail}")]
    MalformedMatrix { rows: usize, detail: String },
    #[error("clustering failed: {0}")]
    Clustering(String),
    #[error("delay model failed: {0}")]
    Model(String),
    #[error("travel-time service failed: {0}")]
    Service(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn malformed_matrix(rows: usize, detail: impl Into<String>) -> Self {
        Self::MalformedMatrix {
            rows,
            detail: detail.into(),
        }
    }

    pub fn clustering(message: impl Into<String>) -> Self {
        Self::Clustering(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn malformed_matrix_reports_row_count_and_detail() {
        let err = Error::malformed_matrix(3, "row 1 has 2 cells");
        assert_eq!(
            err.to_string(),
            "malformed cost matrix (3 rows): row 1 has 2 cells"
        );
    }

    #[test]
    fn input_errors_carry_their_prefix() {
        assert_eq!(
            Error::invalid_input("missing longitude").to_string(),
            "invalid input: missing longitude"
        );
        assert_eq!(Error::other("logger init failed").to_string(), "logger init failed");
    }

    #[test]
    fn io_errors_convert_transparently() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert_eq!(err.to_string(), "disk gone");
    }
}
