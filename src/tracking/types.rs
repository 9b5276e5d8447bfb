/// 追踪数据结构定义
/// Data structures shared between the tracker session and the control loop
use std::collections::BTreeMap;
use std::fmt;

/// 轴对齐边界框 (x, y, width, height), 像素坐标
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// 交并比 (Intersection over Union)
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// 相机坐标系下的平移 (单位与标记尺寸一致)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPose {
    pub translation: [f64; 3],
}

/// 被追踪的标记 (每帧由追踪会话重新生成)
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedMarker {
    pub id: i32,
    /// 置信度
    pub trust: f64,
    pub bbox: BoundingBox,
    /// estimate_pose 之后才有
    pub pose: Option<MarkerPose>,
}

impl TrackedMarker {
    pub fn new(id: i32, trust: f64, bbox: BoundingBox) -> Self {
        Self {
            id,
            trust,
            bbox,
            pose: None,
        }
    }
}

impl fmt::Display for TrackedMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} bbox=({:.1},{:.1},{:.1},{:.1})",
            self.id, self.bbox.x, self.bbox.y, self.bbox.width, self.bbox.height
        )?;
        if let Some(pose) = &self.pose {
            let [tx, ty, tz] = pose.translation;
            write!(f, " Txyz=({:.3},{:.3},{:.3})", tx, ty, tz)?;
        }
        Ok(())
    }
}

/// 标记ID → 标记状态, 按ID升序迭代
pub type TrackedMarkers = BTreeMap<i32, TrackedMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(bbox.center(), (20.0, 20.0));
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-12);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 5.0, 5.0)), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_with_pose() {
        let mut m = TrackedMarker::new(4, 0.9, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(m.to_string(), "id=4 bbox=(1.0,2.0,3.0,4.0)");
        m.pose = Some(MarkerPose {
            translation: [0.1, 0.2, 1.5],
        });
        assert!(m.to_string().ends_with("Txyz=(0.100,0.200,1.500)"));
    }

    #[test]
    fn test_markers_iterate_by_id() {
        let mut markers = TrackedMarkers::new();
        markers.insert(9, TrackedMarker::new(9, 0.5, BoundingBox::default()));
        markers.insert(2, TrackedMarker::new(2, 0.5, BoundingBox::default()));
        assert_eq!(markers.values().next().map(|m| m.id), Some(2));
    }
}
