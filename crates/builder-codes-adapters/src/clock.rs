use builder_codes_core::{ClockPort, PortError};

#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("time error: {e}")))?;
        Ok(now.as_millis() as u64)
    }
}
