//! 控制循环 (Control Loop)
//!
//! Initializing → Running → {Paused ⇄ Running} → Terminated
//!
//! 循环上下文独占帧源/追踪会话/计时器/发布器/显示, 单线程逐帧处理:
//! 取帧 → track → estimate_pose → 输出信任度 → 绘制 → 发布 → 显示 → 等待按键.
//! 暂停只是把按键等待时长切换为 0 (无限等待).
use crate::config::SessionConfig;
use crate::display::{is_quit_key, FrameDisplay, WaitInterval, PAUSE_KEY};
use crate::error::Result;
use crate::input::{Frame, VideoSource};
use crate::publish::{RemoteCommand, TargetPublisher};
use crate::timing::TimerAvg;
use crate::tracking::TrackerSession;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================================================
// 循环状态
// ============================================================================

/// 会话阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    Paused,
    Terminated,
}

/// 结束原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// 退出键或远程退出命令
    Quit,
    /// 帧源没有更多帧 (正常结束)
    StreamExhausted,
}

/// 每帧变化的循环状态
#[derive(Clone, Debug)]
pub struct LoopState {
    pub frame_id: u64,
    pub wait: Duration,
    pub default_wait: Duration,
    pub quit: bool,
}

impl LoopState {
    pub fn new(default_wait: Duration) -> Self {
        Self {
            frame_id: 0,
            wait: default_wait,
            default_wait,
            quit: false,
        }
    }

    /// 暂停/继续: 等待时长在默认值和 0 之间切换
    pub fn toggle_pause(&mut self) {
        self.wait = if self.wait.is_zero() {
            self.default_wait
        } else {
            Duration::ZERO
        };
    }

    pub fn is_paused(&self) -> bool {
        self.wait.is_zero() && !self.default_wait.is_zero()
    }

    pub fn wait_interval(&self) -> WaitInterval {
        WaitInterval(self.wait)
    }

    pub fn apply_key(&mut self, key: char) {
        if key == PAUSE_KEY {
            self.toggle_pause();
        } else if is_quit_key(key) {
            self.quit = true;
        }
    }

    pub fn apply_command(&mut self, command: RemoteCommand) {
        match command {
            RemoteCommand::TogglePause => self.toggle_pause(),
            RemoteCommand::Quit => self.quit = true,
        }
    }
}

/// 运行结果统计
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub published: u64,
    pub first_frame: Option<u64>,
    pub last_frame: Option<u64>,
    pub termination: Termination,
    pub average_fps: Option<f64>,
}

// ============================================================================
// 控制循环
// ============================================================================

pub struct ControlLoop {
    config: SessionConfig,
    source: Box<dyn VideoSource>,
    session: Box<dyn TrackerSession>,
    publisher: Box<dyn TargetPublisher>,
    display: Box<dyn FrameDisplay>,
    timer: TimerAvg,
    state: LoopState,
    phase: Phase,
    /// 初始化时取到的第一帧
    current: Option<Frame>,
    max_frames: i64,
    /// stdout 被目标JSON占用时, 逐帧状态改写到stderr
    status_on_stderr: bool,
}

impl ControlLoop {
    pub fn new(
        config: SessionConfig,
        source: Box<dyn VideoSource>,
        session: Box<dyn TrackerSession>,
        publisher: Box<dyn TargetPublisher>,
        display: Box<dyn FrameDisplay>,
    ) -> Self {
        let timer = TimerAvg::new(config.timer_window);
        let state = LoopState::new(config.wait);
        let status_on_stderr = config.publisher.writes_stdout();
        Self {
            config,
            source,
            session,
            publisher,
            display,
            timer,
            state,
            phase: Phase::Initializing,
            current: None,
            max_frames: -1,
            status_on_stderr,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn timer(&self) -> &TimerAvg {
        &self.timer
    }

    pub fn status_on_stderr(&self) -> bool {
        self.status_on_stderr
    }

    fn report(&self, line: std::fmt::Arguments<'_>) {
        if self.status_on_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    /// 跳到起始帧, 阻塞直到第一帧非空图像, 再配置追踪会话
    pub fn initialize(&mut self) -> Result<()> {
        if self.phase != Phase::Initializing {
            return Ok(());
        }

        if self.config.start_frame > 0 {
            self.source.seek(self.config.start_frame)?;
        }

        let first = loop {
            match self.source.next_frame()? {
                Some(frame) if frame.is_empty() => {
                    debug!(index = frame.index, "skipping empty frame");
                }
                Some(frame) => break Some(frame),
                None => break None,
            }
        };

        let Some(first) = first else {
            warn!(source = %self.source.describe(), "stream ended before the first frame");
            self.phase = Phase::Terminated;
            return Ok(());
        };

        match &self.config.tracker_config {
            Some(path) => self.session.load_config(path)?,
            None => self.session.set_dictionary(&self.config.dictionary, 0.0)?,
        }

        if self.config.pose_enabled {
            if let (Some(intrinsics), Some(size)) =
                (&self.config.intrinsics, self.config.marker_size)
            {
                let resized = intrinsics.resized(first.width(), first.height());
                self.session.set_calibration(&resized, size)?;
                info!(
                    fx = resized.fx,
                    fy = resized.fy,
                    marker_size = size,
                    "pose estimation enabled"
                );
            }
        }

        self.max_frames = self.source.total_frames() - 1;
        self.state.frame_id = first.index;
        self.current = Some(first);
        self.phase = Phase::Running;
        info!(source = %self.source.describe(), "control loop initialized");
        Ok(())
    }

    /// 运行至退出或帧源耗尽; 追踪错误直接向上传播
    pub fn run(&mut self) -> Result<RunSummary> {
        self.initialize()?;

        let mut summary = RunSummary {
            frames_processed: 0,
            published: 0,
            first_frame: None,
            last_frame: None,
            termination: Termination::StreamExhausted,
            average_fps: None,
        };

        let Some(mut frame) = self.current.take() else {
            self.phase = Phase::Terminated;
            return Ok(summary);
        };

        loop {
            self.state.frame_id = frame.index;
            if self.process_frame(&mut frame)? {
                summary.published += 1;
            }
            summary.frames_processed += 1;
            summary.first_frame.get_or_insert(frame.index);
            summary.last_frame = Some(frame.index);

            if self.state.quit {
                summary.termination = Termination::Quit;
                break;
            }

            // 首帧之后取帧失败按流结束处理
            match self.source.next_frame() {
                Ok(Some(next)) => frame = next,
                Ok(None) => {
                    summary.termination = Termination::StreamExhausted;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "frame retrieval failed, treating as end of stream");
                    summary.termination = Termination::StreamExhausted;
                    break;
                }
            }
        }

        self.phase = Phase::Terminated;
        summary.average_fps = self.timer.fps();
        info!(
            frames = summary.frames_processed,
            published = summary.published,
            termination = ?summary.termination,
            "control loop terminated"
        );
        Ok(summary)
    }

    /// 处理一帧, 返回是否发布了目标
    fn process_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        self.timer.start();
        let mut markers = self.session.track(frame)?;
        self.session.estimate_pose(&mut markers)?;
        self.timer.stop();

        for marker in markers.values() {
            self.report(format_args!("{} W={}", marker, marker.trust));
        }
        // stop() 之后至少有一个样本
        let fps = self.timer.fps().unwrap_or(0.0);
        self.report(format_args!(
            "|@ Frame:{}/{}, fps:{}",
            frame.index, self.max_frames, fps
        ));

        self.session.render(frame)?;

        let mut published = false;
        if self.publisher.is_enabled() {
            // 选择策略: 映射中的第一个 (最小ID)
            if let Some(marker) = markers.values().next() {
                self.publisher.publish(marker, frame, Utc::now())?;
                published = true;
            }
        }
        for command in self.publisher.spin_once() {
            debug!(?command, "remote command");
            self.state.apply_command(command);
        }

        self.display.show(frame)?;

        if !self.state.quit {
            if let Some(key) = self.display.wait_key(self.state.wait_interval())? {
                self.state.apply_key(key);
            }
        }
        self.phase = if self.state.is_paused() {
            Phase::Paused
        } else {
            Phase::Running
        };
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublisherKind;
    use crate::display::NullDisplay;
    use crate::input::ImageSequence;
    use crate::publish::NullPublisher;
    use crate::tracking::BoxTrackerSession;
    use image::RgbImage;

    #[test]
    fn test_toggle_pause_twice_restores_wait() {
        let mut state = LoopState::new(Duration::from_millis(10));
        state.toggle_pause();
        assert!(state.is_paused());
        assert!(state.wait_interval().is_indefinite());
        state.toggle_pause();
        assert!(!state.is_paused());
        assert_eq!(state.wait, Duration::from_millis(10));
    }

    #[test]
    fn test_keys_and_commands() {
        let mut state = LoopState::new(Duration::from_millis(10));
        state.apply_key('x');
        assert!(!state.quit && !state.is_paused());
        state.apply_key(PAUSE_KEY);
        assert!(state.is_paused());
        state.apply_command(RemoteCommand::TogglePause);
        assert!(!state.is_paused());
        state.apply_command(RemoteCommand::Quit);
        assert!(state.quit);

        let mut esc = LoopState::new(Duration::from_millis(10));
        esc.apply_key('\u{1b}');
        assert!(esc.quit);
    }

    fn loop_with(publisher: PublisherKind) -> ControlLoop {
        let mut config = SessionConfig::new("synthetic");
        config.publisher = publisher;
        ControlLoop::new(
            config,
            Box::new(ImageSequence::from_images("synthetic", vec![RgbImage::new(4, 4)])),
            Box::new(BoxTrackerSession::default()),
            Box::new(NullPublisher),
            Box::new(NullDisplay),
        )
    }

    #[test]
    fn test_status_moves_to_stderr_when_targets_use_stdout() {
        assert!(loop_with(PublisherKind::Stdout { image_dir: None }).status_on_stderr());
        assert!(!loop_with(PublisherKind::Disabled).status_on_stderr());
        assert!(!loop_with(PublisherKind::File {
            path: "targets.jsonl".into(),
            image_dir: None
        })
        .status_on_stderr());
    }

    #[test]
    fn test_fps_guard_before_first_sample() {
        let timer = TimerAvg::default();
        assert_eq!(timer.fps(), None);
    }
}
