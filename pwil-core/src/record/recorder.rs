use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
///
/// Experiment-tracking clients are plugged in by implementing this trait.
/// When no client is configured, the scheduler simply holds no recorder.
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Flushes buffered values, if any, tagging them with `step`.
    fn flush(&mut self, _step: i64) {}
}
