use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use log::warn;

use crate::config::BorderConfig;
use crate::error::{Error, Result};
use crate::frame::{generate_contour_border, BorderRender, ContourBorder};

/// Budget the interactive editor gives one border pass.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(30);

/// Runs [`generate_contour_border`] on a worker thread and gives up after
/// `budget`. An abandoned worker finishes on its own and its result is dropped;
/// it only ever touches its own copies of the inputs.
pub fn generate_with_budget(source: RgbaImage, config: BorderConfig, budget: Duration) -> Result<RgbaImage> {
    run_with_budget(budget, move || generate_contour_border(&source, &config))
}

/// Same as [`generate_with_budget`] but keeps the intermediate rasters.
pub fn render_with_budget(border: &ContourBorder, source: RgbaImage, budget: Duration) -> Result<BorderRender> {
    let border = border.clone();
    run_with_budget(budget, move || border.render(&source))
}

fn run_with_budget<T, F>(budget: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("contour-border".to_string())
        .spawn(move || {
            // The receiver is gone once the budget has elapsed.
            let _ = tx.send(job());
        })
        .map_err(|e| Error::Render(format!("failed to start border worker: {}", e)))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("border generation exceeded {:?}, abandoning it", budget);
            Err(Error::Timeout(budget))
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::Render("border worker panicked".to_string())),
    }
}
