//! LiveMetrics 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러 타입에서 `CoreError`를 변환하거나 그대로 전파한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 페이로드 디코딩, 네트워크 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패 (페이로드 정규화 포함)
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "UserMetric")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 네트워크 에러 (연결 실패, 타임아웃, 스트림 끊김)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// `Validation` 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 클라이언트 입력 문제로 인한 에러인지 여부 (HTTP 400 매핑용)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::Validation { .. } | CoreError::Serialization(_)
        )
    }
}
