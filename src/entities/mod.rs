pub mod subject;
pub mod task;
