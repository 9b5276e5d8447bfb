use super::{Target, TargetPublisher};
use crate::error::Result;
use crate::input::Frame;
use crate::tracking::TrackedMarker;
use chrono::{DateTime, Utc};

/// 关闭发布时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

impl TargetPublisher for NullPublisher {
    fn is_enabled(&self) -> bool {
        false
    }

    fn publish(
        &mut self,
        marker: &TrackedMarker,
        _frame: &Frame,
        stamp: DateTime<Utc>,
    ) -> Result<Target> {
        Ok(Target::from_marker(marker, stamp))
    }
}
