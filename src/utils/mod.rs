pub mod linalg;
pub mod optimize;
