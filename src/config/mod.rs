/// 启动配置 (Configuration Resolution)
///
/// 命令行参数 → SessionConfig, 启动时解析一次, 之后不可变.
/// 位姿估计开关 = 内参有效 且 标记尺寸已知.
pub mod intrinsics;

pub use intrinsics::CameraIntrinsics;

use crate::error::{Error, Result};
use crate::timing::DEFAULT_WINDOW;
use crate::tracking::{dictionary_list, DictionarySelector, DEFAULT_DICTIONARY};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// 默认按键等待 (毫秒)
pub const DEFAULT_WAIT_MS: u64 = 10;

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(
    name = "aruco_dcf",
    version,
    about = "ArUco DCF 标记追踪 - 实时视频帧处理循环",
    disable_help_flag = true
)]
pub struct Args {
    /// 视频文件/图片目录 或 摄像头索引
    pub source: Option<String>,

    /// 相机内参文件 (JSON)
    #[arg(short = 'c')]
    pub camera_params: Option<PathBuf>,

    /// 标记实际尺寸 (米); -1 表示未知
    #[arg(short = 's', default_value = "-1", allow_hyphen_values = true)]
    pub marker_size: String,

    /// 起始帧 (也接受 -start)
    #[arg(long = "start", default_value = "0", allow_hyphen_values = true)]
    pub start: String,

    /// 字典名或自定义字典文件
    #[arg(short = 'd', default_value = DEFAULT_DICTIONARY)]
    pub dictionary: String,

    /// 追踪器配置文件, 优先于 -d
    #[arg(short = 'f')]
    pub tracker_config: Option<PathBuf>,

    /// 打印用法
    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// 目标发布: none / - (stdout) / 文件路径
    #[arg(long, default_value = "none")]
    pub publish: String,

    /// 发布时保存标注图像的目录
    #[arg(long)]
    pub publish_images: Option<PathBuf>,

    /// 显示帧保存目录
    #[arg(long)]
    pub frames_out: Option<PathBuf>,

    /// 按键等待 (毫秒)
    #[arg(long, default_value = "10")]
    pub wait: String,

    /// FPS滑动窗口大小
    #[arg(long, default_value = "30")]
    pub timer_window: String,

    /// 不读取键盘
    #[arg(long)]
    pub headless: bool,
}

impl Args {
    /// 解析命令行; `-start` 先改写为 `--start`
    pub fn parse_from_env() -> std::result::Result<Self, clap::Error> {
        Self::try_parse_from(normalize_args(std::env::args_os()))
    }

    pub fn wants_usage(&self) -> bool {
        self.help || self.source.is_none()
    }
}

/// clap 不支持单横线长参数
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| if arg == "-start" { OsString::from("--start") } else { arg })
        .collect()
}

/// 用法说明, 包含已知字典列表
pub fn usage() -> String {
    let mut text = String::new();
    text.push_str(
        "Usage: (invideo|cameraindex) [-c cameraParams.json] [-s markerSize] [-start frame] \
         [-d <dictionary>:ALL_DICTS default] [-f trackerConfig.json]\n",
    );
    text.push_str(&format!("\tDictionaries: {}\n", dictionary_list()));
    text.push_str(
        "\t Instead of these, you can directly indicate the path to a file with your own generated dictionary\n",
    );
    text.push_str(
        "\tExtra: [--publish none|-|targets.jsonl] [--publish-images dir] [--frames-out dir] \
         [--wait ms] [--timer-window n] [--headless]\n",
    );
    text.push_str("\t--publish - writes targets to stdout; per-frame status then goes to stderr\n");
    text.push_str("Example to work with apriltags dictionary : video.avi -d TAG36h11\n");
    text
}

/// 目标发布方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublisherKind {
    Disabled,
    Stdout { image_dir: Option<PathBuf> },
    File { path: PathBuf, image_dir: Option<PathBuf> },
}

impl PublisherKind {
    /// 目标JSON是否占用stdout
    pub fn writes_stdout(&self) -> bool {
        matches!(self, PublisherKind::Stdout { .. })
    }
}

/// 启动时解析的会话配置
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub source: String,
    pub dictionary: DictionarySelector,
    pub tracker_config: Option<PathBuf>,
    pub intrinsics: Option<CameraIntrinsics>,
    pub marker_size: Option<f64>,
    pub start_frame: u64,
    pub pose_enabled: bool,
    pub publisher: PublisherKind,
    pub frames_out: Option<PathBuf>,
    pub wait: Duration,
    pub timer_window: usize,
    pub headless: bool,
}

impl SessionConfig {
    /// 以默认值构造 (嵌入和测试用)
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dictionary: DictionarySelector::default(),
            tracker_config: None,
            intrinsics: None,
            marker_size: None,
            start_frame: 0,
            pose_enabled: false,
            publisher: PublisherKind::Disabled,
            frames_out: None,
            wait: Duration::from_millis(DEFAULT_WAIT_MS),
            timer_window: DEFAULT_WINDOW,
            headless: true,
        }
    }

    pub fn resolve(args: &Args) -> Result<Self> {
        let source = args
            .source
            .clone()
            .ok_or_else(|| Error::config("missing video source"))?;

        let intrinsics = match &args.camera_params {
            Some(path) => Some(CameraIntrinsics::load(path)?),
            None => None,
        };

        let marker_size = parse_number::<f64>("-s", &args.marker_size)?;
        let marker_size = (marker_size > 0.0).then_some(marker_size);

        let start_frame = parse_number::<i64>("-start", &args.start)?;
        if start_frame < 0 {
            return Err(Error::config(format!(
                "-start must not be negative (got {})",
                start_frame
            )));
        }

        let wait_ms = parse_number::<u64>("--wait", &args.wait)?;
        let timer_window = parse_number::<usize>("--timer-window", &args.timer_window)?;
        if timer_window == 0 {
            return Err(Error::config("--timer-window must be at least 1"));
        }

        let publisher = match args.publish.as_str() {
            "none" => PublisherKind::Disabled,
            "channel" => {
                return Err(Error::config(
                    "--publish channel is only available when embedding the library",
                ))
            }
            "-" => PublisherKind::Stdout {
                image_dir: args.publish_images.clone(),
            },
            path => PublisherKind::File {
                path: PathBuf::from(path),
                image_dir: args.publish_images.clone(),
            },
        };

        let pose_enabled =
            intrinsics.as_ref().is_some_and(|k| k.is_valid()) && marker_size.is_some();

        Ok(Self {
            source,
            dictionary: DictionarySelector::parse(&args.dictionary),
            tracker_config: args.tracker_config.clone(),
            intrinsics,
            marker_size,
            start_frame: start_frame as u64,
            pose_enabled,
            publisher,
            frames_out: args.frames_out.clone(),
            wait: Duration::from_millis(wait_ms),
            timer_window,
            headless: args.headless,
        })
    }
}

fn parse_number<T>(flag: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::config(format!("invalid value '{}' for {}: {}", value, flag, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(list: &[&str]) -> Args {
        let mut argv = vec!["aruco_dcf"];
        argv.extend_from_slice(list);
        Args::try_parse_from(normalize_args(argv)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::resolve(&args(&["video.avi"])).unwrap();
        assert_eq!(config.source, "video.avi");
        assert_eq!(config.start_frame, 0);
        assert_eq!(config.marker_size, None);
        assert!(!config.pose_enabled);
        assert_eq!(config.dictionary, DictionarySelector::default());
        assert_eq!(config.publisher, PublisherKind::Disabled);
        assert_eq!(config.wait, Duration::from_millis(10));
        assert_eq!(config.timer_window, 30);
    }

    #[test]
    fn test_single_dash_start() {
        let config = SessionConfig::resolve(&args(&["0", "-start", "3", "-d", "TAG36h11"])).unwrap();
        assert_eq!(config.start_frame, 3);
        assert_eq!(config.dictionary.to_string(), "TAG36h11");
    }

    #[test]
    fn test_malformed_numbers_are_config_errors() {
        assert!(matches!(
            SessionConfig::resolve(&args(&["v.avi", "-s", "abc"])),
            Err(Error::StartupConfig(_))
        ));
        assert!(matches!(
            SessionConfig::resolve(&args(&["v.avi", "-start", "x"])),
            Err(Error::StartupConfig(_))
        ));
        assert!(matches!(
            SessionConfig::resolve(&args(&["v.avi", "-start", "-2"])),
            Err(Error::StartupConfig(_))
        ));
    }

    #[test]
    fn test_pose_needs_intrinsics_and_size() {
        let path = std::env::temp_dir().join(format!("aruco_dcf_args_{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"fx": 600, "fy": 600, "cx": 320, "cy": 240, "width": 640, "height": 480}"#,
        )
        .unwrap();
        let cam = path.to_str().unwrap();

        let only_cam = SessionConfig::resolve(&args(&["v.avi", "-c", cam])).unwrap();
        assert!(!only_cam.pose_enabled);

        let only_size = SessionConfig::resolve(&args(&["v.avi", "-s", "0.05"])).unwrap();
        assert!(!only_size.pose_enabled);

        let both = SessionConfig::resolve(&args(&["v.avi", "-c", cam, "-s", "0.05"])).unwrap();
        assert!(both.pose_enabled);
        assert_eq!(both.marker_size, Some(0.05));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unreadable_intrinsics_fail_startup() {
        assert!(matches!(
            SessionConfig::resolve(&args(&["v.avi", "-c", "/no/such/cam.json"])),
            Err(Error::StartupConfig(_))
        ));
    }

    #[test]
    fn test_help_and_missing_source_want_usage() {
        assert!(args(&["-h"]).wants_usage());
        assert!(args(&[]).wants_usage());
        assert!(!args(&["clip.mp4"]).wants_usage());
        assert!(usage().contains("TAG36h11"));
    }

    #[test]
    fn test_publisher_selection() {
        let stdout = SessionConfig::resolve(&args(&["v.avi", "--publish", "-"])).unwrap();
        assert_eq!(stdout.publisher, PublisherKind::Stdout { image_dir: None });
        let file = SessionConfig::resolve(&args(&["v.avi", "--publish", "out.jsonl"])).unwrap();
        assert_eq!(
            file.publisher,
            PublisherKind::File {
                path: PathBuf::from("out.jsonl"),
                image_dir: None
            }
        );
        assert!(stdout.publisher.writes_stdout());
        assert!(!file.publisher.writes_stdout());
    }

    #[test]
    fn test_channel_publisher_is_not_a_file_name() {
        assert!(matches!(
            SessionConfig::resolve(&args(&["v.avi", "--publish", "channel"])),
            Err(Error::StartupConfig(_))
        ));
    }
}
