/// ArUco DCF 标记追踪 - 命令行入口
///
/// 直接运行: cargo run --bin aruco_dcf --release -- video.avi -d TAG36h11
/// 图片目录也可作为视频源; 摄像头/视频文件需要 `--features ffmpeg`
use anyhow::Context;
use aruco_dcf::config::{usage, Args, SessionConfig};
use aruco_dcf::control::{ControlLoop, RunSummary};
use aruco_dcf::display::{FrameDisplay, NullDisplay, TerminalDisplay};
use aruco_dcf::input::{open_source, DefaultBackend};
use aruco_dcf::publish;
use aruco_dcf::tracking::BoxTrackerSession;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::parse_from_env() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            eprintln!("{}", usage());
            return;
        }
    };

    if args.wants_usage() {
        eprintln!("{}", usage());
        return;
    }

    // 启动或运行期间的错误只打印到stderr, 退出码保持 0
    match run(&args) {
        Ok(summary) => {
            println!(
                "✅ 处理完成: {} 帧, 发布 {} 次, 结束原因 {:?}",
                summary.frames_processed, summary.published, summary.termination
            );
        }
        Err(e) => eprintln!("Exception :{:#}", e),
    }
}

fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let config = SessionConfig::resolve(args)?;

    let source = open_source(&DefaultBackend, &config.source)?;
    println!("📹 视频源: {}", source.describe());

    let publisher = publish::from_kind(&config.publisher).context("creating target publisher")?;
    if publisher.is_enabled() {
        println!("📡 目标发布已启用");
    }

    let display: Box<dyn FrameDisplay> = if config.headless && config.frames_out.is_none() {
        Box::new(NullDisplay)
    } else {
        Box::new(TerminalDisplay::new(!config.headless, config.frames_out.clone())?)
    };
    if !config.headless {
        println!("⌨️  按键: s+回车 暂停/继续, q+回车 退出");
    }

    let session = Box::new(BoxTrackerSession::default());
    let mut control = ControlLoop::new(config, source, session, publisher, display);
    Ok(control.run()?)
}
