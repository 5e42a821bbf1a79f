//! LiveMetrics 도메인 모델.
//!
//! 수집 소스, 허브, 소비자 간 공유하는 데이터 구조체를 정의한다.
//! 와이어 포맷은 camelCase JSON이다.

pub mod aggregate;
pub mod event;
pub mod metric;
pub mod snapshot;
pub mod stream;
