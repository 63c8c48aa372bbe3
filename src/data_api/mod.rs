pub mod data_retriever;
pub mod error;
pub mod gzip;
pub mod source;
