use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read or write manifest: {}", _0.display())]
    Manifest(#[error(not(source))] PathBuf),
    #[display("directory watcher failure")]
    Watch,
    #[display("could not compute target path for book {_0}")]
    Preview(#[error(not(source))] u64),
    #[display("{_0} record(s) failed to relocate")]
    Failures(#[error(not(source))] usize),
}
