pub mod queue;
pub mod sample_buffer;
