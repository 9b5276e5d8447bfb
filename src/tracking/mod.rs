/// 标记追踪系统 (Marker Tracking System)
///
/// - TrackerSession:    追踪会话接口 (控制循环只负责按顺序调用)
/// - BoxTrackerSession: 内置会话 (方形候选 + IoU关联 + 卡尔曼平滑)
/// - Dictionary:        已知字典目录
pub mod box_tracker;
pub mod dictionary;
pub mod kalman;
pub mod session;
pub mod types;

pub use box_tracker::{BoxTrackerConfig, BoxTrackerSession};
pub use dictionary::{dictionary_list, Dictionary, DictionarySelector, DEFAULT_DICTIONARY};
pub use kalman::KalmanBoxFilter;
pub use session::TrackerSession;
pub use types::{BoundingBox, MarkerPose, TrackedMarker, TrackedMarkers};
