// Copyright 2026 DGW Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Best-effort process memory watermark.
//!
//! Handlers record the current resident set size on entry; `serverInfo` and
//! `/mem` report the current value and the peak seen so far. The watermark
//! is advisory only and not part of any correctness argument.

use std::sync::Mutex;

/// Current resident set size of this process in bytes.
///
/// Reads `/proc/self/statm` on Linux; other platforms report 0.
pub fn current_rss_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        let statm = match std::fs::read_to_string("/proc/self/statm") {
            Ok(s) => s,
            Err(_) => return 0,
        };
        // Second field is resident pages.
        let pages: u64 = statm
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        pages * 4096
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}

/// Tracks the highest resident set size observed.
pub struct MemoryWatermark {
    peak: Mutex<u64>,
}

impl MemoryWatermark {
    /// Creates a watermark starting at zero.
    pub fn new() -> Self {
        Self { peak: Mutex::new(0) }
    }

    /// Samples current memory use and raises the peak if exceeded.
    /// Returns the sampled value.
    pub fn update(&self) -> u64 {
        let current = current_rss_bytes();
        let mut peak = self.peak.lock().expect("lock poisoned");
        if current > *peak {
            *peak = current;
        }
        current
    }

    /// Highest value recorded so far.
    pub fn peak(&self) -> u64 {
        *self.peak.lock().expect("lock poisoned")
    }
}

impl Default for MemoryWatermark {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_is_monotonic() {
        let watermark = MemoryWatermark::new();
        let first = watermark.update();
        let peak = watermark.peak();
        assert!(peak >= first.min(peak));
        watermark.update();
        assert!(watermark.peak() >= peak);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rss_nonzero_on_linux() {
        assert!(current_rss_bytes() > 0);
    }
}
