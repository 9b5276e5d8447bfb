//! 错误类型 (Error taxonomy)
//!
//! - StartupConfig:     启动参数/配置文件错误
//! - StreamUnavailable: 视频源无法打开
//! - Tracker:           追踪会话内部失败
//! - Output:            显示帧缩放/保存失败
//!
//! 视频流结束不是错误, 见 `control::Termination::StreamExhausted`
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// 参数或配置文件格式错误 (malformed number, unreadable intrinsics)
    StartupConfig(String),

    /// 设备索引和文件路径都无法打开
    StreamUnavailable { source: String, reason: String },

    /// track / estimate_pose / render 失败
    Tracker(String),

    /// 发布通道失败
    Publish(String),

    /// 显示帧缩放/输出失败
    Output(String),

    Io(std::io::Error),
    Image(image::ImageError),
    Json(serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::StartupConfig(msg.into())
    }

    pub fn unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::StreamUnavailable {
            source: source.into(),
            reason: reason.into(),
        }
    }

    pub fn tracker(msg: impl Into<String>) -> Self {
        Error::Tracker(msg.into())
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Error::Output(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StartupConfig(msg) => write!(f, "configuration error: {}", msg),
            Error::StreamUnavailable { source, reason } => {
                write!(f, "Could not open video '{}': {}", source, reason)
            }
            Error::Tracker(msg) => write!(f, "tracker failure: {}", msg),
            Error::Publish(msg) => write!(f, "publish failure: {}", msg),
            Error::Output(msg) => write!(f, "display failure: {}", msg),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Image(e) => write!(f, "image error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
