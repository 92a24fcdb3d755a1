use contour_frame::StippleStats;

#[derive(Debug, Default)]
pub(crate) struct ProcessingStats {
    pub(crate) total_files: usize,
    pub(crate) processed: usize,
    pub(crate) failed: usize,
    pub(crate) skipped: usize,
    pub(crate) total_marks: usize,
}

impl ProcessingStats {
    pub(crate) fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, stats: &StippleStats) {
        self.processed += 1;
        self.total_marks += stats.primitives;
    }

    pub(crate) fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        (self.processed as f64 / self.total_files as f64) * 100.0
    }

    pub(crate) fn print_progress(&self) {
        println!(
            "Progress: {}/{} files processed, {} failed, {} marks drawn",
            self.processed + self.failed,
            self.total_files,
            self.failed,
            self.total_marks
        );
    }

    pub(crate) fn print_summary(&self) {
        println!("\n=== Processing Summary ===");
        println!("Total files: {}", self.total_files);
        println!("Successfully processed: {}", self.processed);
        println!("Failed: {}", self.failed);
        if self.skipped > 0 {
            println!("Skipped after an earlier failure: {}", self.skipped);
        }
        println!("Total marks drawn: {}", self.total_marks);
        println!("Success rate: {:.1}%", self.success_rate());
    }
}
