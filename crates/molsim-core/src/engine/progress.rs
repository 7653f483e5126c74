#[derive(Debug, Clone)]
pub enum Progress {
    /// A long-running loop is starting; `total_steps` bounds it.
    RunStart { total_steps: u64 },
    /// One loop iteration finished.
    StepDone,
    /// The loop finished, in whatever terminal state.
    RunFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// A no-overhead progress hook: sessions report events into it, and hosts
/// (CLI progress bars, embedding layers) decide how to render them. The
/// default reporter discards everything.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
