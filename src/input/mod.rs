/// 视频输入系统 (Video Input System)
///
/// 阻塞式帧源, 由控制循环独占
/// - VideoSource:   帧源接口 (seek / total_frames / next_frame)
/// - ImageSequence: 图片目录/单张图片帧源
/// - FfmpegSource:  FFmpeg 摄像头/视频文件帧源 (feature = "ffmpeg")
/// - open_source:   设备索引 → 文件路径 的有序尝试
pub mod image_sequence;
pub mod source;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

pub use image_sequence::ImageSequence;
pub use source::{open_source, DefaultBackend, SourceAttempt, SourceBackend, VideoSource};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegSource;

use image::RgbImage;

/// 单帧图像快照, 每次循环替换
#[derive(Clone, Debug)]
pub struct Frame {
    /// 帧在流中的序号
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}
