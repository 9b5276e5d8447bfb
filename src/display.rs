//! 显示与按键 (Display & interactive keys)
//!
//! 按键等待时长由控制循环传入; 0 表示一直阻塞到有按键 (暂停).

use crate::error::{Error, Result};
use crate::input::Frame;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use fast_image_resize as fr;
use image::RgbImage;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// 暂停/继续
pub const PAUSE_KEY: char = 's';
/// ESC 退出
pub const QUIT_KEY: char = '\u{1b}';
/// 终端里 ESC 不方便时的退出键
pub const QUIT_ALIAS_KEY: char = 'q';

/// 显示尺寸
pub const DISPLAY_WIDTH: u32 = 1200;
pub const DISPLAY_HEIGHT: u32 = 600;

pub fn is_quit_key(key: char) -> bool {
    key == QUIT_KEY || key == QUIT_ALIAS_KEY
}

/// 按键等待时长; 零表示无限等待
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitInterval(pub Duration);

impl WaitInterval {
    pub const INDEFINITE: WaitInterval = WaitInterval(Duration::ZERO);

    pub fn is_indefinite(&self) -> bool {
        self.0.is_zero()
    }
}

pub trait FrameDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// 等待按键, 超时返回 None
    fn wait_key(&mut self, wait: WaitInterval) -> Result<Option<char>>;
}

/// 无界面模式: 不显示, 没有按键
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl FrameDisplay for NullDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn wait_key(&mut self, _wait: WaitInterval) -> Result<Option<char>> {
        Ok(None)
    }
}

/// 终端显示: 按键来自stdin (回车提交), 可选把缩放后的帧写入目录
pub struct TerminalDisplay {
    keys: Option<Receiver<char>>,
    frames_out: Option<PathBuf>,
    resizer: fr::Resizer,
}

impl TerminalDisplay {
    pub fn new(read_keys: bool, frames_out: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &frames_out {
            std::fs::create_dir_all(dir)?;
        }
        let keys = read_keys.then(spawn_stdin_reader);
        Ok(Self {
            keys,
            frames_out,
            resizer: fr::Resizer::new(),
        })
    }

    /// 缩放到显示尺寸
    fn resize_for_display(&mut self, image: &RgbImage) -> Result<RgbImage> {
        let src = fr::images::Image::from_vec_u8(
            image.width(),
            image.height(),
            image.as_raw().clone(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| Error::output(format!("display buffer: {}", e)))?;

        let mut dst = fr::images::Image::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, fr::PixelType::U8x3);
        self.resizer
            .resize(
                &src,
                &mut dst,
                &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Nearest),
            )
            .map_err(|e| Error::output(format!("display resize: {}", e)))?;

        RgbImage::from_raw(DISPLAY_WIDTH, DISPLAY_HEIGHT, dst.into_vec())
            .ok_or_else(|| Error::output("display buffer size mismatch"))
    }
}

impl FrameDisplay for TerminalDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let Some(dir) = self.frames_out.clone() else {
            return Ok(());
        };
        if frame.is_empty() {
            return Ok(());
        }
        let resized = self.resize_for_display(&frame.image)?;
        let path = dir.join(format!("frame_{:06}.jpg", frame.index));
        resized
            .save(&path)
            .map_err(|e| Error::output(format!("cannot save {}: {}", path.display(), e)))
    }

    fn wait_key(&mut self, wait: WaitInterval) -> Result<Option<char>> {
        let Some(rx) = &self.keys else {
            return Ok(None);
        };

        let key = if wait.is_indefinite() {
            rx.recv().ok()
        } else {
            match rx.recv_timeout(wait.0) {
                Ok(key) => Some(key),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => None,
            }
        };

        // stdin 关闭后不再读键, 防止暂停时永久阻塞
        if key.is_none() && wait.is_indefinite() {
            warn!("stdin closed, keyboard control disabled");
            self.keys = None;
        }
        Ok(key)
    }
}

fn spawn_stdin_reader() -> Receiver<char> {
    let (tx, rx) = unbounded::<char>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for key in line.chars().filter(|c| !c.is_whitespace()) {
                if tx.send(key).is_err() {
                    return;
                }
            }
        }
        debug!("stdin reader finished");
    });
    rx
}
