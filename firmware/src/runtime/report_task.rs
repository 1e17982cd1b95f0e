use embassy_time::{Duration, Ticker};

use crate::status;
use crate::telemetry;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Logs the loop status once per interval. Runs at thread priority and only
/// reads the observer, so it never delays the conversion interrupt.
#[embassy_executor::task]
pub async fn run() {
    let mut ticker = Ticker::every(REPORT_INTERVAL);
    let mut reported_overruns = 0;

    loop {
        ticker.next().await;
        let current = status::snapshot();
        telemetry::log_status(&current, current.overruns.wrapping_sub(reported_overruns));
        reported_overruns = current.overruns;
    }
}
