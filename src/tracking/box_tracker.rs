//! 内置追踪会话: 方形暗区候选 + IoU关联 + 卡尔曼平滑
//!
//! 候选提取: 灰度 → Otsu阈值(反色) → 外轮廓 → 多边形近似为凸四边形.
//! 每个轨迹有自己的ID; 不解码标记内部位图, ID按出现顺序分配.

use super::dictionary::DictionarySelector;
use super::kalman::KalmanBoxFilter;
use super::session::TrackerSession;
use super::types::{BoundingBox, MarkerPose, TrackedMarker, TrackedMarkers};
use crate::config::CameraIntrinsics;
use crate::error::{Error, Result};
use crate::input::Frame;
use image::{GrayImage, Luma, Rgb};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// 会话参数 (可通过 `-f` JSON 文件整体加载)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxTrackerConfig {
    /// 字典名或字典文件路径
    pub dictionary: String,
    /// 低于此置信度的轨迹不报告
    pub min_confidence: f64,
    /// 关联IoU阈值
    pub iou_threshold: f64,
    /// 最大丢失帧数
    pub max_lost_frames: u32,
    /// 候选最小边长(像素)
    pub min_side_px: f64,
    /// 候选最大面积占比
    pub max_area_ratio: f64,
    /// 多边形近似精度 (相对周长)
    pub poly_epsilon: f64,
    /// 候选最大长宽比
    pub max_aspect: f64,
    pub kalman_process_noise: f64,
    pub kalman_obs_noise: f64,
}

impl Default for BoxTrackerConfig {
    fn default() -> Self {
        Self {
            dictionary: super::dictionary::DEFAULT_DICTIONARY.to_string(),
            min_confidence: 0.0,
            iou_threshold: 0.3,
            max_lost_frames: 10,
            min_side_px: 10.0,
            max_area_ratio: 0.9,
            poly_epsilon: 0.05,
            max_aspect: 4.0,
            kalman_process_noise: 0.1,
            kalman_obs_noise: 1.0,
        }
    }
}

impl BoxTrackerConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read tracker config {}: {}", path.display(), e))
        })?;
        let config: BoxTrackerConfig = serde_json::from_str(&json).map_err(|e| {
            Error::config(format!("invalid tracker config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }
}

/// 单个轨迹
#[derive(Clone, Debug)]
struct Track {
    id: i32,
    filter: KalmanBoxFilter,
    last_iou: f64,
    hits: u32,
    age: u32,
    frames_lost: u32,
    pose: Option<MarkerPose>,
}

impl Track {
    fn trust(&self) -> f64 {
        let hit_ratio = self.hits as f64 / self.age.max(1) as f64;
        0.5 * self.last_iou + 0.5 * hit_ratio
    }

    fn to_marker(&self) -> TrackedMarker {
        TrackedMarker {
            id: self.id,
            trust: self.trust(),
            bbox: self.filter.bbox(),
            pose: self.pose,
        }
    }
}

struct Calibration {
    intrinsics: CameraIntrinsics,
    marker_size: f64,
}

pub struct BoxTrackerSession {
    config: BoxTrackerConfig,
    selector: DictionarySelector,
    calibration: Option<Calibration>,
    tracks: Vec<Track>,
    next_id: i32,
}

impl Default for BoxTrackerSession {
    fn default() -> Self {
        Self::new(BoxTrackerConfig::default())
    }
}

impl BoxTrackerSession {
    pub fn new(config: BoxTrackerConfig) -> Self {
        let selector = DictionarySelector::parse(&config.dictionary);
        Self {
            config,
            selector,
            calibration: None,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &BoxTrackerConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &DictionarySelector {
        &self.selector
    }

    /// 候选最小边长: 配置值与字典网格 (每格至少2像素) 取大者
    pub fn min_side_px(&self) -> f64 {
        let grid = match &self.selector {
            DictionarySelector::Named(dict) => dict.grid_cells(),
            DictionarySelector::File(_) => 0,
        };
        self.config.min_side_px.max(2.0 * grid as f64)
    }

    /// 候选方框提取
    pub fn detect_candidates(&self, gray: &GrayImage) -> Vec<BoundingBox> {
        let (w, h) = gray.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let image_area = w as f64 * h as f64;
        let min_side = self.min_side_px();

        // 暗区 → 前景(255)
        let level = imageproc::contrast::otsu_level(gray);
        let binary = GrayImage::from_fn(w, h, |x, y| {
            if gray.get_pixel(x, y)[0] <= level {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let mut candidates = Vec::new();
        for contour in find_contours::<i32>(&binary) {
            if contour.border_type != BorderType::Outer || contour.points.len() < 4 {
                continue;
            }

            let epsilon = self.config.poly_epsilon * perimeter(&contour.points);
            let poly = approximate_polygon_dp(&contour.points, epsilon, true);
            if poly.len() != 4 || !is_convex(&poly) {
                continue;
            }

            let bbox = bounding_box(&contour.points);
            let aspect = bbox.width.max(bbox.height) / bbox.width.min(bbox.height).max(1.0);
            if bbox.width < min_side
                || bbox.height < min_side
                || bbox.area() > self.config.max_area_ratio * image_area
                || aspect > self.config.max_aspect
            {
                continue;
            }
            candidates.push(bbox);
        }
        candidates
    }

    /// 贪心IoU关联, 返回更新后的报告集合
    fn associate(&mut self, detections: &[BoundingBox]) -> TrackedMarkers {
        for track in &mut self.tracks {
            track.filter.predict();
            track.age += 1;
            track.pose = None;
        }

        let mut pairs = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            let predicted = track.filter.bbox();
            for (di, det) in detections.iter().enumerate() {
                let iou = predicted.iou(det);
                if iou >= self.config.iou_threshold {
                    pairs.push((iou, ti, di));
                }
            }
        }
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut track_used = vec![false; self.tracks.len()];
        let mut det_used = vec![false; detections.len()];
        for (iou, ti, di) in pairs {
            if track_used[ti] || det_used[di] {
                continue;
            }
            track_used[ti] = true;
            det_used[di] = true;

            let track = &mut self.tracks[ti];
            track.filter.update(&detections[di]);
            track.last_iou = iou;
            track.hits += 1;
            track.frames_lost = 0;
        }

        for (ti, used) in track_used.iter().enumerate() {
            if !used {
                self.tracks[ti].frames_lost += 1;
            }
        }
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        for (di, det) in detections.iter().enumerate() {
            if det_used[di] {
                continue;
            }
            self.tracks.push(Track {
                id: self.next_id,
                filter: KalmanBoxFilter::new(
                    det,
                    self.config.kalman_process_noise,
                    self.config.kalman_obs_noise,
                ),
                last_iou: 0.0,
                hits: 1,
                age: 1,
                frames_lost: 0,
                pose: None,
            });
            self.next_id += 1;
        }

        self.tracks
            .iter()
            .filter(|t| t.frames_lost == 0 && t.trust() >= self.config.min_confidence)
            .map(|t| (t.id, t.to_marker()))
            .collect()
    }
}

impl TrackerSession for BoxTrackerSession {
    fn set_dictionary(&mut self, selector: &DictionarySelector, min_confidence: f64) -> Result<()> {
        if let DictionarySelector::File(path) = selector {
            if !path.is_file() {
                return Err(Error::config(format!(
                    "unknown dictionary '{}' (not a known name or readable file)",
                    path.display()
                )));
            }
        }
        info!(dictionary = %selector, min_confidence, "dictionary selected");
        self.selector = selector.clone();
        self.config.dictionary = selector.to_string();
        self.config.min_confidence = min_confidence;
        Ok(())
    }

    fn load_config(&mut self, path: &Path) -> Result<()> {
        let config = BoxTrackerConfig::load(path)?;
        let selector = DictionarySelector::parse(&config.dictionary);
        info!(path = %path.display(), dictionary = %selector, "tracker config loaded");
        self.selector = selector;
        self.config = config;
        Ok(())
    }

    fn set_calibration(&mut self, intrinsics: &CameraIntrinsics, marker_size: f64) -> Result<()> {
        if !intrinsics.is_valid() || marker_size <= 0.0 {
            return Err(Error::config("calibration requires valid intrinsics and marker size"));
        }
        self.calibration = Some(Calibration {
            intrinsics: intrinsics.clone(),
            marker_size,
        });
        Ok(())
    }

    fn track(&mut self, frame: &Frame) -> Result<TrackedMarkers> {
        if frame.is_empty() {
            return Err(Error::tracker(format!("frame {} is empty", frame.index)));
        }
        let gray = image::imageops::grayscale(&frame.image);
        let detections = self.detect_candidates(&gray);
        let markers = self.associate(&detections);
        debug!(
            frame = frame.index,
            candidates = detections.len(),
            tracked = markers.len(),
            "frame tracked"
        );
        Ok(markers)
    }

    /// 针孔模型: z = fx * size / width_px
    fn estimate_pose(&mut self, markers: &mut TrackedMarkers) -> Result<()> {
        let Some(calib) = &self.calibration else {
            return Ok(());
        };
        let k = &calib.intrinsics;

        for marker in markers.values_mut() {
            if marker.bbox.width <= 0.0 {
                continue;
            }
            let (u, v) = marker.bbox.center();
            let z = k.fx * calib.marker_size / marker.bbox.width;
            let pose = MarkerPose {
                translation: [(u - k.cx) * z / k.fx, (v - k.cy) * z / k.fy, z],
            };
            marker.pose = Some(pose);
            if let Some(track) = self.tracks.iter_mut().find(|t| t.id == marker.id) {
                track.pose = Some(pose);
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) -> Result<()> {
        for track in self.tracks.iter().filter(|t| t.frames_lost == 0) {
            let bbox = track.filter.bbox();
            let color = id_to_color(track.id);
            let (cx, cy) = bbox.center();

            // 2像素宽边框
            for inset in 0..2 {
                let w = (bbox.width as i32 - 2 * inset).max(1) as u32;
                let h = (bbox.height as i32 - 2 * inset).max(1) as u32;
                let rect = Rect::at(bbox.x as i32 + inset, bbox.y as i32 + inset).of_size(w, h);
                draw_hollow_rect_mut(&mut frame.image, rect, color);
            }
            draw_cross_mut(&mut frame.image, color, cx as i32, cy as i32);
        }
        Ok(())
    }
}

fn perimeter(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            (((b.x - a.x) as f64).powi(2) + ((b.y - a.y) as f64).powi(2)).sqrt()
        })
        .sum()
}

fn is_convex(poly: &[Point<i32>]) -> bool {
    let n = poly.len();
    let mut sign = 0i64;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        if cross != 0 {
            if sign == 0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
    }
    sign != 0
}

fn bounding_box(points: &[Point<i32>]) -> BoundingBox {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    BoundingBox::new(
        min_x as f64,
        min_y as f64,
        (max_x - min_x + 1) as f64,
        (max_y - min_y + 1) as f64,
    )
}

/// 根据ID生成不同颜色 (黄金角度采样)
pub fn id_to_color(id: i32) -> Rgb<u8> {
    let hue = (id as f64 * 137.508).rem_euclid(360.0);
    hsv_to_rgb(hue, 0.8, 0.9)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb([
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    /// 白底上画黑色方块
    fn scene(squares: &[(u32, u32, u32)]) -> Frame {
        let mut img = RgbImage::from_pixel(200, 150, Rgb([255, 255, 255]));
        for &(x0, y0, size) in squares {
            for y in y0..y0 + size {
                for x in x0..x0 + size {
                    img.put_pixel(x, y, Rgb([0, 0, 0]));
                }
            }
        }
        Frame::new(0, img)
    }

    #[test]
    fn test_detects_dark_squares() {
        let session = BoxTrackerSession::default();
        let frame = scene(&[(20, 20, 30), (120, 60, 40)]);
        let gray = image::imageops::grayscale(&frame.image);
        let mut found = session.detect_candidates(&gray);
        found.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], BoundingBox::new(20.0, 20.0, 30.0, 30.0));
        assert_eq!(found[1], BoundingBox::new(120.0, 60.0, 40.0, 40.0));
    }

    #[test]
    fn test_ignores_tiny_blobs() {
        let session = BoxTrackerSession::default();
        let frame = scene(&[(20, 20, 4), (100, 50, 30)]);
        let gray = image::imageops::grayscale(&frame.image);
        assert_eq!(session.detect_candidates(&gray).len(), 1);
    }

    #[test]
    fn test_dictionary_grid_raises_min_side() {
        let mut session = BoxTrackerSession::default();
        let frame = scene(&[(20, 20, 12), (100, 50, 30)]);
        let gray = image::imageops::grayscale(&frame.image);
        assert_eq!(session.detect_candidates(&gray).len(), 2);

        // TAG36h11: 6x6 位 + 边框 = 8 格 → 至少16像素
        session
            .set_dictionary(&DictionarySelector::parse("TAG36h11"), 0.0)
            .unwrap();
        assert_eq!(session.min_side_px(), 16.0);
        let found = session.detect_candidates(&gray);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].width, 30.0);
    }

    #[test]
    fn test_ids_persist_across_frames() {
        let mut session = BoxTrackerSession::default();
        let first = session.track(&scene(&[(20, 20, 30)])).unwrap();
        let second = session.track(&scene(&[(22, 21, 30)])).unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), vec![&0]);
        assert_eq!(second.keys().collect::<Vec<_>>(), vec![&0]);
        assert!(second[&0].trust > first[&0].trust);
    }

    #[test]
    fn test_empty_scene_tracks_nothing() {
        let mut session = BoxTrackerSession::default();
        assert!(session.track(&scene(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_empty_frame_is_tracker_failure() {
        let mut session = BoxTrackerSession::default();
        let err = session.track(&Frame::new(5, RgbImage::new(0, 0))).unwrap_err();
        assert!(matches!(err, Error::Tracker(_)));
    }

    #[test]
    fn test_pose_requires_calibration() {
        let mut session = BoxTrackerSession::default();
        let mut markers = session.track(&scene(&[(85, 60, 30)])).unwrap();
        session.estimate_pose(&mut markers).unwrap();
        assert!(markers[&0].pose.is_none());

        let k = CameraIntrinsics::new(300.0, 300.0, 100.0, 75.0, 200, 150);
        session.set_calibration(&k, 0.1).unwrap();
        session.estimate_pose(&mut markers).unwrap();
        let t = markers[&0].pose.unwrap().translation;
        // 宽30像素 → z = 300 * 0.1 / 30 = 1.0
        assert!((t[2] - 1.0).abs() < 1e-9);
        assert!(t[0].abs() < 1e-9 && t[1].abs() < 1e-9);
    }

    #[test]
    fn test_unknown_dictionary_file_rejected() {
        let mut session = BoxTrackerSession::default();
        let selector = DictionarySelector::parse("/no/such/dictionary.dict");
        assert!(session.set_dictionary(&selector, 0.0).is_err());
        let named = DictionarySelector::parse("TAG36h11");
        session.set_dictionary(&named, 0.2).unwrap();
        assert_eq!(session.config().min_confidence, 0.2);
        assert_eq!(session.dictionary(), &named);
    }

    #[test]
    fn test_render_draws_box_outline() {
        let mut session = BoxTrackerSession::default();
        let mut frame = scene(&[(20, 20, 30)]);
        session.track(&frame).unwrap();
        session.render(&mut frame).unwrap();
        assert_eq!(*frame.image.get_pixel(20, 20), id_to_color(0));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("aruco_dcf_cfg_{}.json", std::process::id()));
        fs::write(&path, r#"{"dictionary": "TAG25h9", "min_confidence": 0.4}"#).unwrap();
        let mut session = BoxTrackerSession::default();
        session.load_config(&path).unwrap();
        assert_eq!(session.config().dictionary, "TAG25h9");
        assert_eq!(session.config().iou_threshold, 0.3);
        fs::remove_file(&path).unwrap();
    }
}
