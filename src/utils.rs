//! Вспомогательные функции и утилиты

use std::time::{Duration, Instant};

/// Выполняет `f` и возвращает результат вместе с затраченным временем
pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Среднее время одного вызова; при `calls == 0` возвращает ноль
pub fn mean_duration(total: Duration, calls: usize) -> Duration {
    if calls == 0 {
        return Duration::ZERO;
    }
    total.div_f64(calls as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_closure_result() {
        let (value, elapsed) = measure_time(|| {
            std::thread::sleep(Duration::from_millis(2));
            42
        });
        assert_eq!(value, 42);
        assert!(elapsed >= Duration::from_millis(2));
    }

    #[test]
    fn mean_duration_divides_total() {
        assert_eq!(mean_duration(Duration::from_secs(6), 3), Duration::from_secs(2));
        assert_eq!(mean_duration(Duration::from_secs(5), 0), Duration::ZERO);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn mean_duration_handles_counts_past_u32() {
        let calls = (u32::MAX as usize) + 1;
        let mean = mean_duration(Duration::from_secs(1 << 32), calls);
        assert_eq!(mean, Duration::from_secs(1));
    }
}
