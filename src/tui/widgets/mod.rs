pub mod knobs;
pub mod loop_view;
