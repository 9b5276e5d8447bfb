//! 滑动窗口计时器 - 平滑FPS统计
//! Rolling-window timer used for the smoothed fps figure

use std::time::Instant;

/// 默认窗口大小 (帧)
pub const DEFAULT_WINDOW: usize = 30;

/// 环形缓冲区计时器
///
/// `start()` 标记起点, `stop()` 记录耗时(秒). 窗口满后覆盖最旧的样本.
#[derive(Debug, Clone)]
pub struct TimerAvg {
    times: Vec<f64>,
    curr: usize,
    window: usize,
    begin: Option<Instant>,
}

impl Default for TimerAvg {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TimerAvg {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            times: Vec::with_capacity(window),
            curr: 0,
            window,
            begin: None,
        }
    }

    pub fn start(&mut self) {
        self.begin = Some(Instant::now());
    }

    /// 记录自 `start()` 以来的耗时; 未调用 `start()` 时忽略
    pub fn stop(&mut self) {
        if let Some(begin) = self.begin.take() {
            self.record(begin.elapsed().as_secs_f64());
        }
    }

    /// 直接写入一个样本
    pub fn record(&mut self, seconds: f64) {
        if self.times.len() < self.window {
            self.times.push(seconds);
        } else {
            self.times[self.curr] = seconds;
            self.curr += 1;
            if self.curr >= self.times.len() {
                self.curr = 0;
            }
        }
    }

    /// 当前样本的算术平均; 无样本时返回 None
    pub fn average(&self) -> Option<f64> {
        if self.times.is_empty() {
            return None;
        }
        let sum: f64 = self.times.iter().sum();
        Some(sum / self.times.len() as f64)
    }

    /// 平滑帧率 = 1 / average; 平均耗时为 0 时为无穷大, 仅空窗口返回 None
    pub fn fps(&self) -> Option<f64> {
        self.average().map(|avg| {
            if avg > 0.0 {
                1.0 / avg
            } else {
                f64::INFINITY
            }
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_samples_give_infinite_fps() {
        let mut timer = TimerAvg::new(5);
        timer.record(0.0);
        assert_eq!(timer.average(), Some(0.0));
        assert_eq!(timer.fps(), Some(f64::INFINITY));

        timer.start();
        timer.stop();
        assert!(timer.fps().is_some());
    }

    #[test]
    fn test_empty_has_no_average() {
        let timer = TimerAvg::new(5);
        assert!(timer.average().is_none());
        assert!(timer.fps().is_none());
    }

    #[test]
    fn test_average_before_window_full() {
        let mut timer = TimerAvg::new(4);
        timer.record(1.0);
        timer.record(3.0);
        assert_eq!(timer.len(), 2);
        assert_eq!(timer.average(), Some(2.0));
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut timer = TimerAvg::new(3);
        for s in [1.0, 2.0, 3.0, 10.0, 20.0] {
            timer.record(s);
        }
        // 保留最近3个: 3, 10, 20
        assert_eq!(timer.len(), 3);
        assert!((timer.average().unwrap() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_never_exceeded() {
        for window in 1..8 {
            let mut timer = TimerAvg::new(window);
            for n in 0..25 {
                timer.record(n as f64);
                assert!(timer.len() <= window);
                let kept = (n + 1).min(window);
                let expected: f64 =
                    ((n + 1 - kept)..=n).map(|v| v as f64).sum::<f64>() / kept as f64;
                assert!((timer.average().unwrap() - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_stop_without_start_is_ignored() {
        let mut timer = TimerAvg::default();
        timer.stop();
        assert!(timer.is_empty());
        timer.start();
        timer.stop();
        assert_eq!(timer.len(), 1);
        assert_eq!(timer.window(), DEFAULT_WINDOW);
    }

    #[test]
    fn test_fps_is_reciprocal() {
        let mut timer = TimerAvg::new(2);
        timer.record(0.02);
        timer.record(0.03);
        assert!((timer.fps().unwrap() - 40.0).abs() < 1e-9);
    }
}
