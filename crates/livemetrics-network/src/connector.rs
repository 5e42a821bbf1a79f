//! 텍스트 프레임 연결 추상화.
//!
//! 전송 계층(WebSocket, SSE)마다 연결을 열어 텍스트 프레임 스트림을 돌려준다.
//! 재연결은 [`crate::runner`]가 담당한다.

use async_trait::async_trait;
use futures::stream::BoxStream;
use livemetrics_core::error::CoreError;

/// 수신 프레임 스트림. 스트림 종료 또는 `Err`는 연결 끊김을 뜻한다.
pub type FrameStream = BoxStream<'static, Result<String, CoreError>>;

/// 텍스트 프레임 스트림을 여는 연결기
#[async_trait]
pub trait FrameConnector: Send + Sync {
    /// 로그용 연결 대상
    fn target(&self) -> &str;

    /// 새 연결 수립
    async fn connect(&self) -> Result<FrameStream, CoreError>;
}
