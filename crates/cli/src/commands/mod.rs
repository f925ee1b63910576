pub mod entities;
pub mod output;
pub mod projects;
pub mod status;
pub mod synth;
