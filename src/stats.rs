use std::io::Write;

use crate::util;

/// Frames are reported on the progress line every this many frames.
pub const PROGRESS_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStatistics {
    pub frames: u64,
    pub bytes: u64,
}

impl RecordingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one binary frame. Returns true when a progress line is due.
    pub fn add_frame(&mut self, len: usize) -> bool {
        self.frames += 1;
        self.bytes += len as u64;
        self.frames % PROGRESS_EVERY == 0
    }

    pub fn print(&self) {
        print!(
            "\x1b[2K\rReceived {} frames ({})",
            self.frames,
            util::format_bytes(self.bytes)
        );
        let _ = std::io::stdout().lock().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_due_every_hundredth_frame() {
        let mut stats = RecordingStatistics::new();
        let mut due = Vec::new();
        for _ in 0..250 {
            if stats.add_frame(2) {
                due.push(stats.frames);
            }
        }

        assert_eq!(due, vec![100, 200]);
        assert_eq!(stats.frames, 250);
        assert_eq!(stats.bytes, 500);
    }
}
