pub mod audio_generation;
pub mod health;
pub mod realtime;
pub mod video_generation;
pub mod worker_callback;
