pub mod model;
pub mod repo;
pub mod runs;
pub mod test_records;
