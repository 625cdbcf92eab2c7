//! Event recording and progress display for replay runs.

mod events;
mod progress;

pub use events::{
    CsvEventWriter, EventFormat, EventRecord, EventWriter, JsonLinesEventWriter,
    create_event_writer,
};
pub use progress::{create_frame_progress, finish_progress, inc_progress};
