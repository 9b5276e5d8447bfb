/// 目标发布 (Target Publisher)
///
/// 每帧至少追踪到一个标记时, 取第一个标记(最小ID)的边界框中心作为目标位置,
/// 连同标注后的图像推送到外部通道.
/// - NullPublisher:      关闭发布, 选择与发布一起跳过
/// - ChannelPublisher:   crossbeam 通道, 供嵌入方订阅
/// - JsonLinesPublisher: 每次发布写一行JSON (文件或stdout)
pub mod channel;
pub mod json_lines;
pub mod message;
pub mod null;

pub use channel::{ChannelPublisher, Published, TargetSubscription};
pub use json_lines::JsonLinesPublisher;
pub use message::{
    Header, ImageFile, ImageMessage, Point3, Pose, PoseStamped, Quaternion, TopicMessage,
    DETECTION_TOPIC, TARGET_TOPIC,
};
pub use null::NullPublisher;

use crate::config::PublisherKind;
use crate::error::Result;
use crate::input::Frame;
use crate::tracking::TrackedMarker;
use chrono::{DateTime, Utc};

/// 由一个标记导出的目标
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub position: Point3,
    pub stamp: DateTime<Utc>,
}

impl Target {
    /// 边界框中心, z 固定为 0 (无深度来源)
    pub fn from_marker(marker: &TrackedMarker, stamp: DateTime<Utc>) -> Self {
        let bbox = &marker.bbox;
        Self {
            position: Point3 {
                x: bbox.x + bbox.width / 2.0,
                y: bbox.y + bbox.height / 2.0,
                z: 0.0,
            },
            stamp,
        }
    }

    pub fn to_pose_stamped(&self, seq: u64) -> PoseStamped {
        PoseStamped {
            header: Header::new(seq, self.stamp),
            pose: Pose {
                position: self.position,
                ..Default::default()
            },
        }
    }
}

/// 订阅方发回的控制命令, 在 `spin_once` 中处理
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCommand {
    TogglePause,
    Quit,
}

pub trait TargetPublisher {
    /// false 时控制循环不选择标记也不发布
    fn is_enabled(&self) -> bool {
        true
    }

    fn publish(
        &mut self,
        marker: &TrackedMarker,
        frame: &Frame,
        stamp: DateTime<Utc>,
    ) -> Result<Target>;

    /// 每帧一次的同步分发点: 取出待处理的入站命令
    fn spin_once(&mut self) -> Vec<RemoteCommand> {
        Vec::new()
    }
}

/// 按配置创建发布器
pub fn from_kind(kind: &PublisherKind) -> Result<Box<dyn TargetPublisher>> {
    Ok(match kind {
        PublisherKind::Disabled => Box::new(NullPublisher),
        PublisherKind::Stdout { image_dir } => {
            Box::new(JsonLinesPublisher::stdout(image_dir.clone())?)
        }
        PublisherKind::File { path, image_dir } => {
            Box::new(JsonLinesPublisher::create(path, image_dir.clone())?)
        }
    })
}
