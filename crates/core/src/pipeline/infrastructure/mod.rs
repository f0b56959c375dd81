pub mod channel_render_sink;
pub mod frame_buffer_sink;
pub mod tick_scheduler;
