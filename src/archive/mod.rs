pub mod downloader;
pub mod extractor;
pub mod model;
