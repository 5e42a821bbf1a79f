//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! `livemetrics-hub`가 구현하고, 네트워크/웹 어댑터는 `Arc<dyn T>`로만 의존한다.

pub mod ingest;
