//! FFmpeg 帧源 - 摄像头 / 视频文件
//!
//! 解码在独立线程中运行, 通过有界通道按顺序交付RGB帧.
//! 摄像头格式: DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)

use super::source::VideoSource;
use super::Frame;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// 解码线程 → 控制循环 的缓冲帧数
const FRAME_QUEUE: usize = 8;

/// FFmpeg解码过滤器: 视频帧 → RgbImage
#[derive(Clone)]
struct RgbCaptureFilter {
    tx: Sender<RgbImage>,
    dropped_frames: usize,
}

impl FrameFilter for RgbCaptureFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> std::result::Result<(), String> {
        debug!("capture filter initialised");
        Ok(())
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        if self.dropped_frames > 0 {
            warn!(dropped = self.dropped_frames, "decoder dropped empty/corrupt frames");
        } else {
            debug!("capture filter finished");
        }
    }

    fn filter_frame(
        &mut self,
        frame: ez_ffmpeg::Frame,
        _ctx: &FrameFilterContext,
    ) -> std::result::Result<Option<ez_ffmpeg::Frame>, String> {
        unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.dropped_frames += 1;
                return Ok(None);
            }

            let w = (*frame.as_ptr()).width as u32;
            let h = (*frame.as_ptr()).height as u32;
            let plane = (*frame.as_ptr()).data[0];
            let stride = (*frame.as_ptr()).linesize[0] as usize;

            // format=rgb24 保证单平面 RGB
            if w == 0 || h == 0 || plane.is_null() || stride < w as usize * 3 {
                self.dropped_frames += 1;
                return Ok(None);
            }

            let row_bytes = w as usize * 3;
            let mut data = Vec::with_capacity(row_bytes * h as usize);
            for y in 0..h as usize {
                let row = std::slice::from_raw_parts(plane.add(y * stride), row_bytes);
                data.extend_from_slice(row);
            }

            let Some(image) = RgbImage::from_raw(w, h, data) else {
                self.dropped_frames += 1;
                return Ok(None);
            };

            // 阻塞发送: 保持帧顺序, 消费端慢时反压解码
            if self.tx.send(image).is_err() {
                return Err("frame receiver closed".to_string());
            }
        }
        Ok(Some(frame))
    }
}

pub struct FfmpegSource {
    name: String,
    rx: Receiver<RgbImage>,
    next_index: u64,
    live: bool,
    /// 文件总帧数; 实时设备为 -1
    total: i64,
}

impl FfmpegSource {
    /// 打开本地摄像头
    pub fn open_camera(device_index: usize) -> Result<Self> {
        let url = format_camera_url(device_index)?;
        let input = Input::new(url.as_str()).set_format(camera_format());
        Self::spawn(url, input, true)
    }

    /// 打开视频文件
    pub fn open_file(path: &Path) -> Result<Self> {
        let url = path.display().to_string();
        let total = probe_frame_count(&url);
        let input = Input::new(url.as_str());
        let mut source = Self::spawn(url, input, false)?;
        source.total = total;
        Ok(source)
    }

    fn spawn(name: String, input: Input, live: bool) -> Result<Self> {
        let (tx, rx) = bounded::<RgbImage>(FRAME_QUEUE);
        let (status_tx, status_rx) = bounded::<std::result::Result<(), String>>(1);

        let thread_name = name.clone();
        std::thread::spawn(move || {
            let filter = RgbCaptureFilter {
                tx,
                dropped_frames: 0,
            };
            let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
            let pipe = pipe.filter("capture", Box::new(filter));
            let out = create_null_output().add_frame_pipeline(pipe);

            let ctx = match FfmpegContext::builder()
                .input(input)
                .filter_descs(["format=rgb24"].into())
                .output(out)
                .build()
            {
                Ok(c) => c,
                Err(e) => {
                    let _ = status_tx.send(Err(format!("build failed: {}", e)));
                    return;
                }
            };

            let sch = match ctx.start() {
                Ok(s) => s,
                Err(e) => {
                    let _ = status_tx.send(Err(format!("start failed: {}", e)));
                    return;
                }
            };
            let _ = status_tx.send(Ok(()));

            let _ = sch.wait();
            debug!(source = %thread_name, "decode loop finished");
        });

        match status_rx.recv() {
            Ok(Ok(())) => {
                info!(source = %name, live, "ffmpeg decoder started");
                Ok(Self {
                    name,
                    rx,
                    next_index: 0,
                    live,
                    total: -1,
                })
            }
            Ok(Err(reason)) => Err(Error::unavailable(name, reason)),
            Err(_) => Err(Error::unavailable(name, "decoder thread exited")),
        }
    }
}

impl VideoSource for FfmpegSource {
    /// 文件: 解码并丢弃前 `frame_index` 帧; 实时设备: 只偏移帧号
    fn seek(&mut self, frame_index: u64) -> Result<()> {
        if self.live {
            self.next_index = frame_index;
            return Ok(());
        }
        while self.next_index < frame_index {
            if self.rx.recv().is_err() {
                warn!(requested = frame_index, reached = self.next_index, "seek past end of stream");
                break;
            }
            self.next_index += 1;
        }
        Ok(())
    }

    fn total_frames(&self) -> i64 {
        self.total
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.rx.recv() {
            Ok(image) => {
                let frame = Frame::new(self.next_index, image);
                self.next_index += 1;
                Ok(Some(frame))
            }
            Err(_) => Ok(None),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// 读取视频流信息估计总帧数; 失败时为 -1
fn probe_frame_count(url: &str) -> i64 {
    match find_video_stream_info(url) {
        Ok(Some(StreamInfo::Video {
            nb_frames,
            duration,
            time_base,
            fps,
            ..
        })) => {
            let seconds = if time_base.den != 0 {
                duration as f64 * time_base.num as f64 / time_base.den as f64
            } else {
                0.0
            };
            estimate_frame_count(nb_frames, seconds, fps)
        }
        Ok(_) => -1,
        Err(e) => {
            warn!(source = %url, error = %e, "cannot read stream info");
            -1
        }
    }
}

/// 优先使用容器记录的帧数, 否则用 时长 × 帧率
fn estimate_frame_count(nb_frames: i64, duration_secs: f64, fps: f64) -> i64 {
    if nb_frames > 0 {
        return nb_frames;
    }
    if duration_secs > 0.0 && fps.is_finite() && fps > 0.0 {
        return (duration_secs * fps).round() as i64;
    }
    -1
}

fn camera_format() -> &'static str {
    #[cfg(target_os = "windows")]
    let format = "dshow";

    #[cfg(target_os = "macos")]
    let format = "avfoundation";

    #[cfg(target_os = "linux")]
    let format = "v4l2";

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    let format = "video4linux2";

    format
}

/// 摄像头URL - 根据平台选择
fn format_camera_url(index: usize) -> Result<String> {
    #[cfg(target_os = "windows")]
    {
        // DirectShow 按设备名称打开
        let devices = ez_ffmpeg::device::get_input_video_devices()
            .map_err(|e| Error::unavailable(index.to_string(), e.to_string()))?;
        devices
            .into_iter()
            .nth(index)
            .map(|name| format!("video={}", name))
            .ok_or_else(|| Error::unavailable(index.to_string(), "no such camera"))
    }
    #[cfg(target_os = "linux")]
    {
        let url = format!("/dev/video{}", index);
        if !Path::new(&url).exists() {
            return Err(Error::unavailable(index.to_string(), "no such camera"));
        }
        Ok(url)
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        Ok(format!("{}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_prefers_container_value() {
        assert_eq!(estimate_frame_count(250, 10.0, 30.0), 250);
    }

    #[test]
    fn test_frame_count_from_duration_and_rate() {
        assert_eq!(estimate_frame_count(0, 10.0, 25.0), 250);
        assert_eq!(estimate_frame_count(0, 0.0, 25.0), -1);
        assert_eq!(estimate_frame_count(0, 4.0, 0.0), -1);
    }
}
