//! 边界框卡尔曼滤波
//! Constant-velocity box filter used to smooth tracked marker regions

use super::types::BoundingBox;

/// 简化卡尔曼滤波器 (对角协方差)
/// 状态向量: [cx, cy, w, h, vx, vy, vw, vh]
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    state: [f64; 8],
    p: [f64; 8],
    /// 过程噪声
    q: f64,
    /// 观测噪声
    r: f64,
    /// 每帧速度保留比例
    velocity_decay: f64,
}

impl KalmanBoxFilter {
    /// - `q`: 过程噪声 (越小越平滑)
    /// - `r`: 观测噪声 (越大越平滑)
    pub fn new(bbox: &BoundingBox, q: f64, r: f64) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            state: [cx, cy, bbox.width, bbox.height, 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
            velocity_decay: 0.95,
        }
    }

    /// 匀速预测 + 速度衰减
    pub fn predict(&mut self) {
        for v in &mut self.state[4..8] {
            *v *= self.velocity_decay;
        }
        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }
        for p in &mut self.p {
            *p += self.q;
        }
    }

    pub fn update(&mut self, bbox: &BoundingBox) {
        let (cx, cy) = bbox.center();
        let y = [
            cx - self.state[0],
            cy - self.state[1],
            bbox.width - self.state[2],
            bbox.height - self.state[3],
        ];

        for i in 0..4 {
            let k_pos = self.p[i] / (self.p[i] + self.r);
            let k_vel = self.p[i + 4] / (self.p[i + 4] + self.r * 10.0);
            self.state[i] += k_pos * y[i];
            self.state[i + 4] += k_vel * y[i];
            self.p[i] *= 1.0 - k_pos;
            self.p[i + 4] *= 1.0 - k_vel;
        }
    }

    /// 当前状态的边界框
    pub fn bbox(&self) -> BoundingBox {
        let w = self.state[2].max(1.0);
        let h = self.state[3].max(1.0);
        BoundingBox::new(self.state[0] - w / 2.0, self.state[1] - h / 2.0, w, h)
    }
}
