pub mod pipeline;
pub mod stitch_commands;
