/// 发布消息定义
/// Wire records emitted once per frame with at least one tracked marker
use crate::input::Frame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TARGET_TOPIC: &str = "aruco/target";
pub const DETECTION_TOPIC: &str = "aruco/detection";

/// 相机坐标系ID
pub const CAMERA_FRAME_ID: &str = "camera";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub seq: u64,
    pub stamp: DateTime<Utc>,
    pub frame_id: String,
}

impl Header {
    pub fn new(seq: u64, stamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: CAMERA_FRAME_ID.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    pub orientation: Quaternion,
}

/// 目标位姿记录 (TARGET_TOPIC)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// 标注后的图像 (DETECTION_TOPIC)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMessage {
    pub header: Header,
    pub encoding: String,
    pub width: u32,
    pub height: u32,
    /// 每行字节数
    pub step: u32,
    pub data: Vec<u8>,
}

/// 已保存到磁盘的标注图像引用 (DETECTION_TOPIC, JSON行输出用)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    pub header: Header,
    pub encoding: String,
    pub width: u32,
    pub height: u32,
    pub path: String,
}

/// 带主题的记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicMessage<T> {
    pub topic: String,
    pub message: T,
}

impl<T> TopicMessage<T> {
    pub fn new(topic: &str, message: T) -> Self {
        Self {
            topic: topic.to_string(),
            message,
        }
    }
}

impl ImageMessage {
    pub fn from_frame(header: Header, frame: &Frame) -> Self {
        Self {
            header,
            encoding: "rgb8".to_string(),
            width: frame.width(),
            height: frame.height(),
            step: frame.width() * 3,
            data: frame.image.as_raw().clone(),
        }
    }
}
