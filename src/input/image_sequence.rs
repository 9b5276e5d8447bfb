//! 图片序列帧源 - 目录中的图片按文件名排序作为视频帧
//! Image-sequence source: a directory of stills (or one still) replayed as a stream

use super::source::VideoSource;
use super::Frame;
use crate::error::{Error, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

enum FrameData {
    Memory(RgbImage),
    File(PathBuf),
}

pub struct ImageSequence {
    name: String,
    frames: Vec<FrameData>,
    cursor: usize,
}

impl ImageSequence {
    /// 内存中的帧 (合成视频流)
    pub fn from_images(name: impl Into<String>, images: Vec<RgbImage>) -> Self {
        Self {
            name: name.into(),
            frames: images.into_iter().map(FrameData::Memory).collect(),
            cursor: 0,
        }
    }

    /// 目录下所有可识别的图片, 按文件名排序, 逐帧惰性解码
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Self::is_image_file(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::unavailable(
                dir.display().to_string(),
                "directory contains no images",
            ));
        }

        Ok(Self {
            name: dir.display().to_string(),
            frames: paths.into_iter().map(FrameData::File).collect(),
            cursor: 0,
        })
    }

    /// 单张图片 → 单帧流
    pub fn from_file(path: &Path) -> Result<Self> {
        // 打开时校验一次, 避免第一帧才报错
        image::open(path)
            .map_err(|e| Error::unavailable(path.display().to_string(), e.to_string()))?;
        Ok(Self {
            name: path.display().to_string(),
            frames: vec![FrameData::File(path.to_path_buf())],
            cursor: 0,
        })
    }

    pub fn is_image_file(path: &Path) -> bool {
        image::ImageFormat::from_path(path).is_ok()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl VideoSource for ImageSequence {
    fn seek(&mut self, frame_index: u64) -> Result<()> {
        self.cursor = (frame_index as usize).min(self.frames.len());
        Ok(())
    }

    fn total_frames(&self) -> i64 {
        self.frames.len() as i64
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(data) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        let image = match data {
            FrameData::Memory(img) => img.clone(),
            FrameData::File(path) => image::open(path)?.to_rgb8(),
        };
        let frame = Frame::new(self.cursor as u64, image);
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
