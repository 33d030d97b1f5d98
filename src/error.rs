use std::path::PathBuf;

use derive_more::{Display, Error, From};

/// Failures while reading or writing configuration, model and dataset files.
///
/// Malformed configurations and misuse of the API are programmer errors and panic instead.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("{}: {source}", path.display())]
    #[from(skip)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("malformed JSON: {_0}")]
    Json(#[error(source)] serde_json::Error),
    #[display(
        "{}: {len} bytes is too short for the {header}-byte header",
        path.display()
    )]
    #[from(skip)]
    TruncatedDataSet {
        path: PathBuf,
        header: usize,
        len: usize,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
