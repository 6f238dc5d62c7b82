use chrono::{DateTime, Utc};

/// Wall-clock marker logged at the start of a stage.
pub struct StageClock {
    started: DateTime<Utc>,
}

impl StageClock {
    pub fn start(stage: &str) -> Self {
        let started = Utc::now();
        tracing::info!("started {stage}: {}", started.format("%a %b %d %H:%M:%S %Y"));
        Self { started }
    }

    pub fn finish(self, stage: &str) {
        let ended = Utc::now();
        tracing::info!(
            "completed {stage}: {} (runtime: {})",
            ended.format("%a %b %d %H:%M:%S %Y"),
            format_elapsed(ended - self.started)
        );
    }
}

/// Human-readable rendering of a stage runtime, coarsest unit first.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total_secs = elapsed.num_seconds().max(0);
    let days = total_secs / 86_400;
    let hrs = (total_secs % 86_400) / 3_600;
    let min = (total_secs % 3_600) / 60;
    let sec = total_secs % 60;

    if days > 0 {
        format!("{days} day(s) {hrs} hr(s) {min} min {sec} sec")
    } else if hrs > 0 {
        format!("{hrs} hr(s) {min} min {sec} sec")
    } else if min > 0 {
        format!("{min} min {sec} sec")
    } else {
        format!("{sec} sec")
    }
}
