use std::collections::VecDeque;

/// One plotted point: both received values against seconds since the session started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotSample {
    pub t_secs: f32,
    pub x: f32,
    pub y: f32,
}

/// Where received data ends up.
pub trait DisplaySink {
    fn plot(&mut self, sample: PlotSample);
    fn log(&mut self, line: String);
    fn clear_log(&mut self);
}

/// Fixed-capacity FIFO; pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct RollingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    /// Returns the evicted entry, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity { self.items.pop_front() } else { None };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }
}

/// Plot history plus the textual message log.
#[derive(Debug, Clone)]
pub struct Display {
    plot: RollingBuffer<PlotSample>,
    log: RollingBuffer<String>,
}

impl Display {
    pub fn new(plot_capacity: usize, log_capacity: usize) -> Self {
        Self { plot: RollingBuffer::new(plot_capacity), log: RollingBuffer::new(log_capacity) }
    }

    pub fn samples(&self) -> &RollingBuffer<PlotSample> {
        &self.plot
    }

    /// Newest line first, the way the log is shown.
    pub fn log_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.log.iter().rev().map(String::as_str)
    }
}

impl DisplaySink for Display {
    fn plot(&mut self, sample: PlotSample) {
        self.plot.push(sample);
    }

    fn log(&mut self, line: String) {
        self.log.push(line);
    }

    fn clear_log(&mut self) {
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest_first() {
        let mut buf = RollingBuffer::new(100);
        for i in 0..100 {
            assert_eq!(buf.push(i), None);
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.push(100), Some(0));
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.iter().next(), Some(&1));
        assert_eq!(buf.latest(), Some(&100));
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut buf = RollingBuffer::new(0);
        buf.push("a");
        assert_eq!(buf.push("b"), Some("a"));
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn log_reads_newest_first() {
        let mut display = Display::new(100, 3);
        for line in ["one", "two", "three", "four"] {
            display.log(line.to_string());
        }
        let lines: Vec<_> = display.log_lines().collect();
        assert_eq!(lines, vec!["four", "three", "two"]);
        display.clear_log();
        assert_eq!(display.log_lines().count(), 0);
    }
}
