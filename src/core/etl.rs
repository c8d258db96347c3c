use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting extraction");
        self.monitor.log_stats("Start");

        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Read {} document(s)", raw_data.len());
        self.monitor.log_stats("Extract");

        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🔄 Extracted fields for {} document(s)",
            transformed.processed_records.len()
        );
        self.monitor.log_stats("Transform");

        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
