//! API 핸들러 모듈.

pub mod events;
pub mod health;
pub mod metrics;
pub mod stream;
