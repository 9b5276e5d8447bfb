//! JSON行发布器: 每次发布写一行 `aruco/target` 记录;
//! 设置图像目录时保存标注图像, 并追加一行 `aruco/detection` 记录引用该文件.

use super::message::{Header, ImageFile, TopicMessage, DETECTION_TOPIC, TARGET_TOPIC};
use super::{Target, TargetPublisher};
use crate::error::Result;
use crate::input::Frame;
use crate::tracking::TrackedMarker;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct JsonLinesPublisher {
    out: Box<dyn Write>,
    image_dir: Option<PathBuf>,
    seq: u64,
}

impl JsonLinesPublisher {
    pub fn new(out: Box<dyn Write>, image_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &image_dir {
            fs::create_dir_all(dir)?;
        }
        Ok(Self {
            out,
            image_dir,
            seq: 0,
        })
    }

    pub fn stdout(image_dir: Option<PathBuf>) -> Result<Self> {
        Self::new(Box::new(io::stdout()), image_dir)
    }

    pub fn create(path: &Path, image_dir: Option<PathBuf>) -> Result<Self> {
        let file = File::create(path)?;
        info!(path = %path.display(), "publishing targets as json lines");
        Self::new(Box::new(BufWriter::new(file)), image_dir)
    }
}

impl JsonLinesPublisher {
    fn write_line<T: serde::Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl TargetPublisher for JsonLinesPublisher {
    fn publish(
        &mut self,
        marker: &TrackedMarker,
        frame: &Frame,
        stamp: DateTime<Utc>,
    ) -> Result<Target> {
        let target = Target::from_marker(marker, stamp);
        let record = TopicMessage::new(TARGET_TOPIC, target.to_pose_stamped(self.seq));
        self.write_line(&record)?;

        if let Some(dir) = &self.image_dir {
            let path = dir.join(format!("detection_{:06}.png", self.seq));
            frame.image.save(&path)?;
            let image = ImageFile {
                header: Header::new(self.seq, stamp),
                encoding: "rgb8".to_string(),
                width: frame.width(),
                height: frame.height(),
                path: path.display().to_string(),
            };
            self.write_line(&TopicMessage::new(DETECTION_TOPIC, image))?;
        }

        self.out.flush()?;
        self.seq += 1;
        Ok(target)
    }
}
