//! 帧源接口与源解析
//!
//! 源标识可以是设备索引 ("0") 也可以是文件路径 ("video.avi").
//! 能解析为整数时先按设备打开, 失败后再把同一字符串当作路径打开.

use super::image_sequence::ImageSequence;
use super::Frame;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 阻塞式帧源
pub trait VideoSource {
    /// 请求起始位置 (实时设备上尽力而为)
    fn seek(&mut self, frame_index: u64) -> Result<()>;

    /// 总帧数估计; 未知(实时设备)时为 -1
    fn total_frames(&self) -> i64;

    /// 阻塞直到下一帧可用; 流结束返回 `Ok(None)`
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn describe(&self) -> String;
}

/// 打开方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAttempt {
    DeviceIndex(i32),
    Path(PathBuf),
}

impl SourceAttempt {
    /// 按顺序列出要尝试的打开方式
    pub fn plan(literal: &str) -> Vec<SourceAttempt> {
        let mut attempts = Vec::with_capacity(2);
        if let Some(index) = try_as_device_index(literal) {
            attempts.push(SourceAttempt::DeviceIndex(index));
        }
        attempts.push(try_as_path(literal));
        attempts
    }
}

fn try_as_device_index(literal: &str) -> Option<i32> {
    literal.trim().parse::<i32>().ok()
}

fn try_as_path(literal: &str) -> SourceAttempt {
    SourceAttempt::Path(PathBuf::from(literal))
}

/// 底层打开能力
pub trait SourceBackend {
    fn open_device(&self, index: i32) -> Result<Box<dyn VideoSource>>;
    fn open_path(&self, path: &Path) -> Result<Box<dyn VideoSource>>;
}

/// 依次尝试, 返回第一个成功的帧源
pub fn open_source(backend: &dyn SourceBackend, literal: &str) -> Result<Box<dyn VideoSource>> {
    let mut last_reason = String::from("no attempt made");

    for attempt in SourceAttempt::plan(literal) {
        let opened = match &attempt {
            SourceAttempt::DeviceIndex(index) => backend.open_device(*index),
            SourceAttempt::Path(path) => backend.open_path(path),
        };
        match opened {
            Ok(source) => {
                info!(?attempt, source = %source.describe(), "video source opened");
                return Ok(source);
            }
            Err(e) => {
                debug!(?attempt, error = %e, "open attempt failed");
                last_reason = e.to_string();
            }
        }
    }

    Err(Error::unavailable(literal, last_reason))
}

/// 默认后端: 图片目录/单张图片; 启用 ffmpeg 特性时支持摄像头和视频文件
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackend;

impl SourceBackend for DefaultBackend {
    #[cfg(feature = "ffmpeg")]
    fn open_device(&self, index: i32) -> Result<Box<dyn VideoSource>> {
        if index < 0 {
            return Err(Error::unavailable(index.to_string(), "negative device index"));
        }
        Ok(Box::new(super::ffmpeg::FfmpegSource::open_camera(index as usize)?))
    }

    #[cfg(not(feature = "ffmpeg"))]
    fn open_device(&self, index: i32) -> Result<Box<dyn VideoSource>> {
        Err(Error::unavailable(
            index.to_string(),
            "camera capture requires the `ffmpeg` feature",
        ))
    }

    fn open_path(&self, path: &Path) -> Result<Box<dyn VideoSource>> {
        let literal = path.display().to_string();
        if path.is_dir() {
            return Ok(Box::new(ImageSequence::from_dir(path)?));
        }
        if !path.exists() {
            return Err(Error::unavailable(literal, "no such file or directory"));
        }
        if ImageSequence::is_image_file(path) {
            return Ok(Box::new(ImageSequence::from_file(path)?));
        }
        open_video_file(path)
    }
}

#[cfg(feature = "ffmpeg")]
fn open_video_file(path: &Path) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(super::ffmpeg::FfmpegSource::open_file(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_file(path: &Path) -> Result<Box<dyn VideoSource>> {
    Err(Error::unavailable(
        path.display().to_string(),
        "video decoding requires the `ffmpeg` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::cell::RefCell;

    /// 记录尝试顺序的后端
    struct RecordingBackend {
        device_ok: bool,
        path_ok: bool,
        calls: RefCell<Vec<SourceAttempt>>,
    }

    impl RecordingBackend {
        fn new(device_ok: bool, path_ok: bool) -> Self {
            Self {
                device_ok,
                path_ok,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SourceBackend for RecordingBackend {
        fn open_device(&self, index: i32) -> Result<Box<dyn VideoSource>> {
            self.calls.borrow_mut().push(SourceAttempt::DeviceIndex(index));
            if self.device_ok {
                Ok(Box::new(ImageSequence::from_images("device", vec![RgbImage::new(2, 2)])))
            } else {
                Err(Error::unavailable(index.to_string(), "device busy"))
            }
        }

        fn open_path(&self, path: &Path) -> Result<Box<dyn VideoSource>> {
            self.calls.borrow_mut().push(SourceAttempt::Path(path.to_path_buf()));
            if self.path_ok {
                Ok(Box::new(ImageSequence::from_images("path", vec![RgbImage::new(2, 2)])))
            } else {
                Err(Error::unavailable(path.display().to_string(), "missing"))
            }
        }
    }

    #[test]
    fn test_plan_numeric_then_path() {
        assert_eq!(
            SourceAttempt::plan("2"),
            vec![
                SourceAttempt::DeviceIndex(2),
                SourceAttempt::Path(PathBuf::from("2"))
            ]
        );
        assert_eq!(
            SourceAttempt::plan("clip.mp4"),
            vec![SourceAttempt::Path(PathBuf::from("clip.mp4"))]
        );
    }

    #[test]
    fn test_numeric_falls_back_to_same_literal_as_path() {
        let backend = RecordingBackend::new(false, true);
        let source = open_source(&backend, "7").unwrap();
        assert_eq!(source.describe(), "path");
        assert_eq!(
            *backend.calls.borrow(),
            vec![
                SourceAttempt::DeviceIndex(7),
                SourceAttempt::Path(PathBuf::from("7"))
            ]
        );
    }

    #[test]
    fn test_device_success_skips_path() {
        let backend = RecordingBackend::new(true, true);
        let source = open_source(&backend, "0").unwrap();
        assert_eq!(source.describe(), "device");
        assert_eq!(backend.calls.borrow().len(), 1);
    }

    #[test]
    fn test_all_attempts_fail_is_unavailable() {
        let backend = RecordingBackend::new(false, false);
        match open_source(&backend, "3") {
            Err(Error::StreamUnavailable { source, reason }) => {
                assert_eq!(source, "3");
                assert!(reason.contains("missing"));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_default_backend_missing_path() {
        let err = DefaultBackend
            .open_path(Path::new("/definitely/not/here.avi"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::StreamUnavailable { .. }));
    }
}
