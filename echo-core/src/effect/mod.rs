pub mod delay_line;
pub mod stereo_delay;
