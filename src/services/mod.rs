pub mod file_service;
pub mod naming;
pub mod notifier;
pub mod progress;
pub mod storage;
pub mod upload_service;
