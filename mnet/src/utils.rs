use hytra::TrAdder;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::thread;
use std::time::Duration;

pub(crate) fn with_progress<F, T>(
    f: F,
    n_iter: u64,
    pb_msg: &'static str,
    config: &crate::Config,
) -> T
where
    F: FnOnce(&TrAdder<u64>) -> T + Send,
    T: Send,
{
    let it_cnt: TrAdder<u64> = TrAdder::new();
    let finished = std::sync::atomic::AtomicBool::new(false);
    thread::scope(|s| {
        let finished_ref = &finished;
        let it_cnt_ref = &it_cnt;
        let pb_thread_handle = config.show_progress.then(|| {
            s.spawn(move || {
                // Wait for at least config.progress_min_time, unless the computation
                // finishes first.
                let start_init_wait = std::time::Instant::now();
                loop {
                    let elapsed = start_init_wait.elapsed();
                    if elapsed >= config.progress_min_time {
                        break;
                    }
                    thread::park_timeout(config.progress_min_time - elapsed);
                    if finished_ref.load(std::sync::atomic::Ordering::Acquire) {
                        return;
                    }
                }
                let pb = ProgressBar::new(n_iter)
                    .with_style(
                        ProgressStyle::default_spinner()
                            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] (ETA {eta})")
                            .unwrap(),
                    )
                    .with_finish(ProgressFinish::AndClear)
                    .with_message(pb_msg)
                    .with_position(it_cnt_ref.get());
                while !finished_ref.load(std::sync::atomic::Ordering::Acquire) {
                    pb.set_position(it_cnt_ref.get());
                    thread::park_timeout(Duration::from_millis(50));
                }
                pb.finish_and_clear();
            })
        });

        let res = f(it_cnt_ref);
        finished_ref.store(true, std::sync::atomic::Ordering::Release);
        // park always consumes the token and unpark always produces it, whether or not the
        // progress thread is currently parked.
        if let Some(handle) = pb_thread_handle {
            handle.thread().unpark();
        }
        res
    })
}

/// Streaming log-sum-exp accumulator.
///
/// Keeps the running maximum apart so that adding very negative log-weights does not underflow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogSumExp {
    max: f64,
    // sum of exp(x - max)
    scaled_sum: f64,
}

impl LogSumExp {
    pub(crate) fn new() -> Self {
        Self {
            max: f64::NEG_INFINITY,
            scaled_sum: 0.0,
        }
    }
    pub(crate) fn add(&mut self, x: f64) {
        if x == f64::NEG_INFINITY {
            return;
        }
        if x <= self.max {
            self.scaled_sum += (x - self.max).exp();
        } else {
            self.scaled_sum = self.scaled_sum * (self.max - x).exp() + 1.0;
            self.max = x;
        }
    }
    pub(crate) fn merge(mut self, other: Self) -> Self {
        if other.max == f64::NEG_INFINITY {
            return self;
        }
        if self.max == f64::NEG_INFINITY {
            return other;
        }
        if other.max <= self.max {
            self.scaled_sum += other.scaled_sum * (other.max - self.max).exp();
            self
        } else {
            Self {
                max: other.max,
                scaled_sum: other.scaled_sum + self.scaled_sum * (self.max - other.max).exp(),
            }
        }
    }
    pub(crate) fn value(&self) -> f64 {
        if self.max == f64::NEG_INFINITY {
            f64::NEG_INFINITY
        } else {
            self.max + self.scaled_sum.ln()
        }
    }
}

/// Normalize in place so that the values sum to one. Returns false if the sum is zero.
pub(crate) fn normalize(values: &mut ndarray::Array1<f64>) -> bool {
    let s = values.sum();
    if s > 0.0 && s.is_finite() {
        values.mapv_inplace(|x| x / s);
        true
    } else {
        false
    }
}
