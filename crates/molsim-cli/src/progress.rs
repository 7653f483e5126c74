use indicatif::{ProgressBar, ProgressStyle};
use molsim::engine::progress::{Progress, ProgressReporter};
use std::sync::Mutex;

/// Bridges engine progress events onto an indicatif bar on stderr.
///
/// The bar is created lazily on `RunStart` so the same reporter works for
/// both dynamics runs and minimizations. In quiet mode the events are
/// swallowed entirely.
pub fn reporter(quiet: bool) -> ProgressReporter<'static> {
    if quiet {
        return ProgressReporter::new();
    }

    let bar: Mutex<Option<ProgressBar>> = Mutex::new(None);
    ProgressReporter::with_callback(Box::new(move |event| {
        let mut guard = match bar.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        match event {
            Progress::RunStart { total_steps } => {
                let pb = ProgressBar::new(total_steps);
                pb.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .expect("progress template is valid")
                    .progress_chars("=>-"),
                );
                *guard = Some(pb);
            }
            Progress::StepDone => {
                if let Some(pb) = guard.as_ref() {
                    pb.inc(1);
                }
            }
            Progress::RunFinish => {
                if let Some(pb) = guard.take() {
                    pb.finish_and_clear();
                }
            }
            Progress::Message(message) => {
                if let Some(pb) = guard.as_ref() {
                    pb.set_message(message);
                }
            }
        }
    }))
}
