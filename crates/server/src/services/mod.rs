pub mod catalog;
pub mod credentials;
pub mod enrollment;
pub mod sessions;
pub mod storage;
