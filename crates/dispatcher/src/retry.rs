use std::time::Duration;

use registrar_core::RetryPolicyConfig;

/// 重试退避配置
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 基础重试间隔（毫秒）
    pub base_interval_ms: u64,
    /// 最大重试间隔（毫秒）
    pub max_interval_ms: u64,
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 重试间隔的随机抖动范围（0.0-1.0）
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 10_000,  // 10秒
            max_interval_ms: 300_000,  // 5分钟
            backoff_multiplier: 2.0,   // 指数退避倍数
            jitter_factor: 0.1,        // 10%的随机抖动
        }
    }
}

impl From<&RetryPolicyConfig> for RetryConfig {
    fn from(config: &RetryPolicyConfig) -> Self {
        Self {
            base_interval_ms: config.base_interval_ms,
            max_interval_ms: config.max_interval_ms,
            backoff_multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
        }
    }
}

impl RetryConfig {
    /// 计算第retry_count次重试前的等待时长
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let base_interval = self.base_interval_ms as f64;
        let max_interval = self.max_interval_ms as f64;

        // 计算指数退避间隔并限制最大值
        let exponential_interval =
            base_interval * self.backoff_multiplier.powi(retry_count as i32);
        let capped_interval = exponential_interval.min(max_interval);

        // 添加随机抖动以避免雷群效应
        let jitter = capped_interval * self.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
        let final_interval = (capped_interval + jitter).max(base_interval);

        Duration::from_millis(final_interval as u64)
    }
}
