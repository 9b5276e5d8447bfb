// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 启动配置
pub mod control; // 控制循环
pub mod display; // 显示与按键
pub mod error; // 错误类型
pub mod input; // 视频输入系统
pub mod publish; // 目标发布
pub mod timing; // 滑动窗口计时
pub mod tracking; // 标记追踪系统

pub use crate::config::{Args, CameraIntrinsics, PublisherKind, SessionConfig};
pub use crate::control::{ControlLoop, LoopState, Phase, RunSummary, Termination};
pub use crate::display::{FrameDisplay, NullDisplay, TerminalDisplay, WaitInterval};
pub use crate::error::{Error, Result};
pub use crate::input::{open_source, DefaultBackend, Frame, ImageSequence, VideoSource};
pub use crate::publish::{Target, TargetPublisher};
pub use crate::timing::TimerAvg;
pub use crate::tracking::{
    BoundingBox, BoxTrackerSession, TrackedMarker, TrackedMarkers, TrackerSession,
};
