use std::cell::RefCell;
use std::time::{Duration, Instant};

/// Statistics collected while streaming the dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub chunks_read: usize,
    pub bytes_read: usize,
    pub data_units: usize,
    pub lines_seen: usize,
    pub lines_matched: usize,
    pub lines_short: usize,
    pub lookups: usize,
    pub lookup_failures: usize,
    pub text_filtered: usize,
    pub rows_stored: usize,
    pub processing_time: Duration,
}

// Each worker counts into its own thread-local copy; the pool merges them at join
thread_local! {
    static THREAD_STATS: RefCell<ProcessingStats> = RefCell::new(ProcessingStats::default());
}

pub fn stats_add_chunk_read(bytes: usize) {
    THREAD_STATS.with(|stats| {
        let mut stats = stats.borrow_mut();
        stats.chunks_read += 1;
        stats.bytes_read += bytes;
    });
}

pub fn stats_add_data_unit() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().data_units += 1;
    });
}

pub fn stats_add_line_seen() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lines_seen += 1;
    });
}

pub fn stats_add_line_matched() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lines_matched += 1;
    });
}

pub fn stats_add_line_short() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lines_short += 1;
    });
}

pub fn stats_add_lookup() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lookups += 1;
    });
}

pub fn stats_add_lookup_failure() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lookup_failures += 1;
    });
}

pub fn stats_add_text_filtered() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().text_filtered += 1;
    });
}

pub fn stats_add_row_stored() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().rows_stored += 1;
    });
}

/// Take this thread's counters, leaving zeroes behind
pub fn take_thread_stats() -> ProcessingStats {
    THREAD_STATS.with(|stats| std::mem::take(&mut *stats.borrow_mut()))
}

impl ProcessingStats {
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.chunks_read += other.chunks_read;
        self.bytes_read += other.bytes_read;
        self.data_units += other.data_units;
        self.lines_seen += other.lines_seen;
        self.lines_matched += other.lines_matched;
        self.lines_short += other.lines_short;
        self.lookups += other.lookups;
        self.lookup_failures += other.lookup_failures;
        self.text_filtered += other.text_filtered;
        self.rows_stored += other.rows_stored;
    }

    pub fn finish(&mut self, started: Instant) {
        self.processing_time = started.elapsed();
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} matched, {} short",
            self.lines_seen, self.lines_matched, self.lines_short
        );

        output.push_str(&format!(
            "; {} chunks, {} bytes, {} data units",
            self.chunks_read, self.bytes_read, self.data_units
        ));

        if self.lookups > 0 {
            output.push_str(&format!(
                "; lookups: {} ({} failed)",
                self.lookups, self.lookup_failures
            ));
        }

        if self.text_filtered > 0 {
            output.push_str(&format!(", {} dropped by plot filter", self.text_filtered));
        }

        output.push_str(&format!("; {} rows", self.rows_stored));

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_seen > 0 {
            let lines_per_sec = (self.lines_seen as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_counters_are_taken_and_reset() {
        let _ = take_thread_stats();
        stats_add_line_seen();
        stats_add_line_seen();
        stats_add_line_matched();
        stats_add_chunk_read(100);

        let stats = take_thread_stats();
        assert_eq!(stats.lines_seen, 2);
        assert_eq!(stats.lines_matched, 1);
        assert_eq!(stats.bytes_read, 100);
        assert_eq!(take_thread_stats(), ProcessingStats::default());
    }

    #[test]
    fn test_counters_are_per_thread() {
        let _ = take_thread_stats();
        stats_add_lookup();
        let other = std::thread::spawn(|| {
            stats_add_lookup();
            stats_add_lookup();
            take_thread_stats()
        })
        .join()
        .unwrap();
        assert_eq!(other.lookups, 2);
        assert_eq!(take_thread_stats().lookups, 1);
    }

    #[test]
    fn test_merge_adds_fields() {
        let mut total = ProcessingStats {
            lines_seen: 3,
            rows_stored: 1,
            ..Default::default()
        };
        total.merge(&ProcessingStats {
            lines_seen: 4,
            rows_stored: 2,
            lookups: 1,
            ..Default::default()
        });
        assert_eq!(total.lines_seen, 7);
        assert_eq!(total.rows_stored, 3);
        assert_eq!(total.lookups, 1);
    }

    #[test]
    fn test_format_stats() {
        let stats = ProcessingStats {
            lines_seen: 10,
            lines_matched: 4,
            lookups: 2,
            lookup_failures: 1,
            rows_stored: 4,
            ..Default::default()
        };
        let text = stats.format_stats();
        assert!(text.starts_with("Lines processed: 10 total, 4 matched, 0 short"));
        assert!(text.contains("lookups: 2 (1 failed)"));
        assert!(text.contains("4 rows"));
    }
}
