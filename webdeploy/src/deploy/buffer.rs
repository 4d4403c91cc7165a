//! Bounded output buffer

use std::collections::VecDeque;

/// Maximum number of output lines retained per run
pub const OUTPUT_CAPACITY: usize = 100;

/// Fixed-capacity line buffer that drops the oldest line when full
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputBuffer {
    /// Create an empty buffer holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one if the buffer is full
    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of all buffered lines, oldest first
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(OUTPUT_CAPACITY)
    }
}
