//! 通道发布器 - 供嵌入方在同进程内订阅目标和标注图像
//!
//! 队列满时丢弃新记录 (控制循环不因订阅方变慢而阻塞).

use super::message::{Header, ImageMessage, PoseStamped};
use super::{RemoteCommand, Target, TargetPublisher};
use crate::error::{Error, Result};
use crate::input::Frame;
use crate::tracking::TrackedMarker;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::debug;

/// 一次发布的内容
#[derive(Clone, Debug)]
pub struct Published {
    pub pose: PoseStamped,
    pub image: ImageMessage,
}

pub struct ChannelPublisher {
    tx: Sender<Published>,
    commands: Receiver<RemoteCommand>,
    seq: u64,
    dropped: u64,
}

/// 订阅端
pub struct TargetSubscription {
    rx: Receiver<Published>,
    commands: Sender<RemoteCommand>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, TargetSubscription) {
        let (tx, rx) = bounded::<Published>(capacity.max(1));
        let (cmd_tx, cmd_rx) = unbounded::<RemoteCommand>();
        (
            Self {
                tx,
                commands: cmd_rx,
                seq: 0,
                dropped: 0,
            },
            TargetSubscription {
                rx,
                commands: cmd_tx,
            },
        )
    }

    /// 队列满被丢弃的记录数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TargetPublisher for ChannelPublisher {
    fn publish(
        &mut self,
        marker: &TrackedMarker,
        frame: &Frame,
        stamp: DateTime<Utc>,
    ) -> Result<Target> {
        let target = Target::from_marker(marker, stamp);
        let published = Published {
            pose: target.to_pose_stamped(self.seq),
            image: ImageMessage::from_frame(Header::new(self.seq, stamp), frame),
        };
        self.seq += 1;

        match self.tx.try_send(published) {
            Ok(()) => Ok(target),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "subscriber queue full, record dropped");
                Ok(target)
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::Publish("target subscriber disconnected".to_string()))
            }
        }
    }

    fn spin_once(&mut self) -> Vec<RemoteCommand> {
        self.commands.try_iter().collect()
    }
}

impl TargetSubscription {
    /// 非阻塞取出所有已发布记录
    pub fn drain(&self) -> Vec<Published> {
        self.rx.try_iter().collect()
    }

    pub fn send_command(&self, command: RemoteCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}
