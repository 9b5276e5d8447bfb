//! 追踪会话接口
//!
//! 控制循环每帧固定顺序调用: track → estimate_pose → render.
//! 识别/滤波/位姿求解算法都在实现内部, 循环不关心.

use super::dictionary::DictionarySelector;
use super::types::TrackedMarkers;
use crate::config::CameraIntrinsics;
use crate::error::Result;
use crate::input::Frame;
use std::path::Path;

pub trait TrackerSession {
    /// 选择字典; 与 `load_config` 二选一
    fn set_dictionary(&mut self, selector: &DictionarySelector, min_confidence: f64) -> Result<()>;

    /// 从配置文件加载全部参数 (优先于 `set_dictionary`)
    fn load_config(&mut self, path: &Path) -> Result<()>;

    /// 相机内参 + 标记实际尺寸; 两者都有效时才调用
    fn set_calibration(&mut self, intrinsics: &CameraIntrinsics, marker_size: f64) -> Result<()>;

    /// 追踪当前帧, 返回 ID → 标记
    fn track(&mut self, frame: &Frame) -> Result<TrackedMarkers>;

    /// 必须在 `track` 之后调用; 位姿写回 `markers`
    fn estimate_pose(&mut self, markers: &mut TrackedMarkers) -> Result<()>;

    /// 在帧上绘制追踪结果
    fn render(&self, frame: &mut Frame) -> Result<()>;
}
