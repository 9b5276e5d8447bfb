//! 相机内参 - 通过JSON文件加载
//!
//! ```json
//! { "fx": 600.0, "fy": 600.0, "cx": 320.0, "cy": 240.0,
//!   "width": 640, "height": 480, "distortion": [0.0, 0.0, 0.0, 0.0, 0.0] }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// 标定时的图像尺寸
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub distortion: Vec<f64>,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
            distortion: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read camera parameters {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            Error::config(format!("invalid camera parameters {}: {}", path.display(), e))
        })
    }

    pub fn is_valid(&self) -> bool {
        self.fx > 0.0
            && self.fy > 0.0
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.width > 0
            && self.height > 0
    }

    /// 按新的图像尺寸缩放
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (self.width == width && self.height == height) || !self.is_valid() {
            return self.clone();
        }
        let sx = width as f64 / self.width as f64;
        let sy = height as f64 / self.height as f64;
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
            width,
            height,
            distortion: self.distortion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480).is_valid());
        assert!(!CameraIntrinsics::new(0.0, 500.0, 320.0, 240.0, 640, 480).is_valid());
        assert!(!CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 0, 480).is_valid());
    }

    #[test]
    fn test_resize_scales_focal_and_center() {
        let k = CameraIntrinsics::new(500.0, 400.0, 320.0, 240.0, 640, 480);
        let half = k.resized(320, 240);
        assert_eq!(half.fx, 250.0);
        assert_eq!(half.fy, 200.0);
        assert_eq!(half.cx, 160.0);
        assert_eq!(half.cy, 120.0);
        assert_eq!((half.width, half.height), (320, 240));
        assert_eq!(k.resized(640, 480), k);
    }

    #[test]
    fn test_load_json() {
        let path = std::env::temp_dir().join(format!("aruco_dcf_cam_{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"fx": 600, "fy": 610, "cx": 320, "cy": 240, "width": 640, "height": 480}"#,
        )
        .unwrap();
        let k = CameraIntrinsics::load(&path).unwrap();
        assert_eq!(k.fy, 610.0);
        assert!(k.distortion.is_empty());
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            CameraIntrinsics::load(Path::new("/no/such/camera.json")),
            Err(Error::StartupConfig(_))
        ));
    }
}
