mod activity_recorder;

pub use activity_recorder::{ActivityRecorder, RecordOutcome, RecorderSettings};
